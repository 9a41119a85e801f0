/*!
safedrive REST API Server

Serves column lists and rendered charts to the browser dashboard.

```bash
safedrive-rest --port 3334 --load-sample-data
curl -X POST localhost:3334/api/v1/visualize \
     -H 'content-type: application/json' \
     -d '{"ref1": "REGION.RegionName", "ref2": "ACCIDENT.(사고건수)"}'
```

Every response body is wrapped as `{"status": "success", "data": ...}` or
`{"status": "error", "error": {"message": ..., "type": ...}}`.
*/

use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use safedrive::reader::{dataset, DuckDBReader};
use safedrive::writer::VegaLiteWriter;
use safedrive::{ChartKind, ColumnKind, ColumnRegistry, SafedriveError, Visualizer, VERSION};

#[derive(Parser)]
#[command(name = "safedrive-rest")]
#[command(about = "HTTP front end for the accident chart dashboard")]
#[command(version = VERSION)]
struct Cli {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, default_value_t = 3334)]
    port: u16,

    /// Allowed browser origins, comma-separated, or `*`
    #[arg(long, default_value = "*")]
    cors_origin: String,

    /// Accident store URI
    #[arg(long, default_value = "duckdb://memory")]
    reader: String,

    /// Column registry JSON (default: built-in accident columns)
    #[arg(long)]
    registry: Option<PathBuf>,

    /// Seed the store with the sample accident data set
    #[arg(long)]
    load_sample_data: bool,

    /// Load <TABLE>.csv file(s) at startup
    #[arg(long = "load-data")]
    load_data_files: Vec<PathBuf>,
}

#[derive(Clone)]
struct AppState {
    registry: Arc<ColumnRegistry>,
    /// DuckDB connections are Send but not Sync
    reader: Arc<Mutex<DuckDBReader>>,
}

#[derive(Debug, Deserialize)]
struct VisualizeRequest {
    ref1: String,
    ref2: String,
}

/// Response wrapper shared by every endpoint
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum Envelope<T> {
    Success { data: T },
    Error { error: ErrorBody },
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
    #[serde(rename = "type")]
    kind: &'static str,
}

fn success<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope::Success { data })
}

#[derive(Debug, Serialize)]
struct ColumnEntry {
    id: String,
    table: String,
    column: String,
    kind: ColumnKind,
    #[serde(rename = "virtual")]
    is_virtual: bool,
}

#[derive(Debug, Serialize)]
struct RenderedChart {
    title: String,
    chart_type: ChartKind,
    /// Vega-Lite document, ready for vega-embed
    spec: serde_json::Value,
    rows: usize,
    columns: Vec<String>,
    sql: String,
}

#[derive(Debug, Serialize)]
struct ServiceInfo {
    status: &'static str,
    version: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    features: Vec<&'static str>,
}

/// An error on its way to the client
struct ApiFailure {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiFailure {
    fn new(status: StatusCode, kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                message: message.into(),
                kind,
            },
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BadRequest", message)
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let body: Envelope<()> = Envelope::Error { error: self.body };
        (self.status, Json(body)).into_response()
    }
}

impl From<SafedriveError> for ApiFailure {
    fn from(err: SafedriveError) -> Self {
        use SafedriveError::*;

        let (status, kind) = match &err {
            MalformedIdentifier(_) => (StatusCode::BAD_REQUEST, "MalformedIdentifier"),
            Classification(_) => (StatusCode::BAD_REQUEST, "ClassificationError"),
            UnsupportedCombination(_) => (StatusCode::BAD_REQUEST, "UnsupportedCombination"),
            InvalidPlan(_) => (StatusCode::BAD_REQUEST, "InvalidPlan"),
            EmptyResult(_) => (StatusCode::UNPROCESSABLE_ENTITY, "EmptyResult"),
            ReaderError(_) => (StatusCode::BAD_GATEWAY, "ReaderError"),
            ConfigError(_) | WriterError(_) | InternalError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "InternalError")
            }
        };
        Self::new(status, kind, err.to_string())
    }
}

/// The dashboard must send two different, non-empty identifiers
fn validate_request(request: &VisualizeRequest) -> Result<(&str, &str), ApiFailure> {
    let (ref1, ref2) = (request.ref1.trim(), request.ref2.trim());
    if ref1.is_empty() || ref2.is_empty() {
        return Err(ApiFailure::bad_request("Both 'ref1' and 'ref2' are required"));
    }
    if ref1 == ref2 {
        return Err(ApiFailure::bad_request(format!(
            "Select two different columns (got '{}' twice)",
            ref1
        )));
    }
    Ok((ref1, ref2))
}

async fn list_columns(State(state): State<AppState>) -> Json<Envelope<Vec<ColumnEntry>>> {
    let registry = &state.registry;
    let columns = registry
        .all_columns()
        .into_iter()
        .map(|c| ColumnEntry {
            id: c.to_string(),
            table: c.table().to_string(),
            column: c.column().to_string(),
            kind: registry.kind_of(&c),
            is_virtual: registry.is_virtual(&c),
        })
        .collect();
    success(columns)
}

async fn visualize(
    State(state): State<AppState>,
    Json(request): Json<VisualizeRequest>,
) -> Result<Json<Envelope<RenderedChart>>, ApiFailure> {
    let (ref1, ref2) = validate_request(&request)?;

    let chart = {
        let reader = state
            .reader
            .lock()
            .map_err(|e| SafedriveError::InternalError(format!("Reader lock poisoned: {}", e)))?;
        Visualizer::new(&state.registry, &*reader).build_chart(ref1, ref2)?
    };

    let spec = VegaLiteWriter::new().render(&chart)?;
    Ok(success(RenderedChart {
        title: chart.spec.title.clone(),
        chart_type: chart.kind,
        spec,
        rows: chart.data.height(),
        columns: chart
            .data
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect(),
        sql: chart.sql,
    }))
}

async fn health() -> Json<Envelope<ServiceInfo>> {
    success(ServiceInfo {
        status: "healthy",
        version: VERSION,
        features: Vec::new(),
    })
}

async fn version() -> Json<Envelope<ServiceInfo>> {
    success(ServiceInfo {
        status: "ok",
        version: VERSION,
        features: vec!["duckdb", "vegalite"],
    })
}

async fn index() -> &'static str {
    "safedrive REST API - GET /api/v1/columns, POST /api/v1/visualize"
}

fn cors_layer(origins: &str) -> CorsLayer {
    let allow_origin = if origins.trim() == "*" {
        AllowOrigin::from(Any)
    } else {
        let list: Vec<HeaderValue> = origins
            .split(',')
            .filter_map(|origin| origin.trim().parse().ok())
            .collect();
        AllowOrigin::list(list)
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers([header::CONTENT_TYPE])
}

fn router(state: AppState, cors_origin: &str) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/v1/columns", get(list_columns))
        .route("/api/v1/visualize", post(visualize))
        .route("/api/v1/health", get(health))
        .route("/api/v1/version", get(version))
        .layer(cors_layer(cors_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "safedrive=info,safedrive_rest=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let registry = match &cli.registry {
        Some(path) => ColumnRegistry::from_path(path)?,
        None => ColumnRegistry::builtin()?,
    };

    let reader = dataset::open_store(&cli.reader, cli.load_sample_data, &cli.load_data_files)?;
    if let Err(e) = dataset::verify_registry(&reader, &registry) {
        // The columns endpoint still works; chart requests report the failure
        warn!("{}", e);
    }

    let state = AppState {
        registry: Arc::new(registry),
        reader: Arc::new(Mutex::new(reader)),
    };

    let addr: SocketAddr = format!("{}:{}", cli.host, cli.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(store = %cli.reader, "safedrive REST API listening on http://{}", addr);

    axum::serve(listener, router(state, &cli.cors_origin)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state() -> AppState {
        let reader = dataset::open_store::<PathBuf>("duckdb://memory", true, &[]).unwrap();
        AppState {
            registry: Arc::new(ColumnRegistry::builtin().unwrap()),
            reader: Arc::new(Mutex::new(reader)),
        }
    }

    fn request(ref1: &str, ref2: &str) -> VisualizeRequest {
        VisualizeRequest {
            ref1: ref1.to_string(),
            ref2: ref2.to_string(),
        }
    }

    fn data<T>(envelope: Envelope<T>) -> T {
        match envelope {
            Envelope::Success { data } => data,
            Envelope::Error { error } => panic!("unexpected error: {}", error.message),
        }
    }

    #[test]
    fn test_identical_refs_rejected() {
        let req = request("ACCIDENT.DayNight", " ACCIDENT.DayNight");
        let err = validate_request(&req).err().unwrap();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.body.kind, "BadRequest");
    }

    #[test]
    fn test_request_refs_are_trimmed() {
        assert!(validate_request(&request("", "ACCIDENT.DayNight")).is_err());

        let req = request(" ACCIDENT.DayNight ", "DRIVER.Gender");
        let (ref1, ref2) = validate_request(&req).ok().unwrap();
        assert_eq!((ref1, ref2), ("ACCIDENT.DayNight", "DRIVER.Gender"));
    }

    #[test]
    fn test_error_status_mapping() {
        let err = ApiFailure::from(SafedriveError::ReaderError("connection lost".to_string()));
        assert_eq!(err.status, StatusCode::BAD_GATEWAY);

        let err = ApiFailure::from(SafedriveError::UnsupportedCombination("x".to_string()));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.body.kind, "UnsupportedCombination");
    }

    #[test]
    fn test_envelope_shape() {
        let json = serde_json::to_value(Envelope::Success { data: 1 }).unwrap();
        assert_eq!(json, serde_json::json!({"status": "success", "data": 1}));

        let failure = ApiFailure::bad_request("nope");
        let json = serde_json::to_value(Envelope::<()>::Error { error: failure.body }).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"]["type"], "BadRequest");
    }

    #[tokio::test]
    async fn test_columns_endpoint_lists_registry() {
        let Json(envelope) = list_columns(State(sample_state())).await;
        let columns = data(envelope);

        assert_eq!(columns.len(), 18);
        assert!(columns
            .iter()
            .any(|c| c.id == "ACCIDENT.(사고건수)" && c.is_virtual));
    }

    #[tokio::test]
    async fn test_visualize_endpoint_renders_bar() {
        let result = visualize(
            State(sample_state()),
            Json(request("REGION.RegionName", "ACCIDENT.(사고건수)")),
        )
        .await;

        let Json(envelope) = result.ok().unwrap();
        let chart = data(envelope);
        assert_eq!(chart.chart_type, ChartKind::Bar);
        assert_eq!(chart.rows, 20);
        assert_eq!(chart.spec["mark"]["type"], "bar");
    }

    #[tokio::test]
    async fn test_visualize_endpoint_reports_unsupported() {
        let result = visualize(
            State(sample_state()),
            Json(request("ACCIDENT.(사고건수)", "ACCIDENT.DeathCount")),
        )
        .await;

        let err = result.err().unwrap();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.body.kind, "UnsupportedCombination");
        assert!(err.body.message.to_lowercase().contains("unsupported"));
    }

    #[tokio::test]
    async fn test_visualize_endpoint_reports_unknown_column() {
        let result = visualize(
            State(sample_state()),
            Json(request("ACCIDENT.Nope", "ACCIDENT.DayNight")),
        )
        .await;

        let err = result.err().unwrap();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.body.kind, "ClassificationError");
    }

    #[tokio::test]
    async fn test_visualize_endpoint_reports_empty_heatmap() {
        let reader = DuckDBReader::from_connection_string("duckdb://memory").unwrap();
        dataset::create_schema(&reader).unwrap();
        let state = AppState {
            registry: Arc::new(ColumnRegistry::builtin().unwrap()),
            reader: Arc::new(Mutex::new(reader)),
        };

        let result = visualize(
            State(state),
            Json(request("ACCIDENT.SevereInjuryCount", "ACCIDENT.MinorInjuryCount")),
        )
        .await;

        let err = result.err().unwrap();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.body.kind, "EmptyResult");
    }
}
