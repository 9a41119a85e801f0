/*!
# safedrive - Two-variable chart dispatch for traffic-accident data

Given two column identifiers such as `REGION.RegionName` and `ACCIDENT.DeathCount`,
safedrive classifies each column, picks a chart type, builds a single aggregation
query, runs it against the accident store and returns a renderable chart.

## Example

```rust,ignore
use safedrive::{ColumnRegistry, Visualizer};
use safedrive::reader::DuckDBReader;

let registry = ColumnRegistry::builtin()?;
let reader = DuckDBReader::from_connection_string("duckdb://accidents.db")?;
let visualizer = Visualizer::new(&registry, &reader);

match visualizer.dispatch("REGION.RegionName", "ACCIDENT.(사고건수)") {
    ChartResult::Rendered { chart, title } => println!("{}: {} rows", title, chart.data.height()),
    ChartResult::Failed { message } => eprintln!("{}", message),
}
```

## Architecture

- **Column identifiers** → classified by the [`registry`] (categorical, numeric, temporal)
- **Kind pair** → routed by the [`dispatch`] state machine to one of five chart strategies
- **Strategy** → builds a typed [`query`] plan, executes it through a [`reader`]
- **Result** → a renderer-independent [`plot`] spec, rendered by a [`writer`] (Vega-Lite)

## Core Components

- [`registry`] - Column identifiers, kinds and the bootstrap table
- [`query`] - Query plans and the query builder
- [`chart`] - The five chart strategies and `ChartResult`
- [`dispatch`] - Kind-pair routing and the `Visualizer` facade
- [`reader`] - Data store abstraction layer
- [`writer`] - Output format abstraction layer
*/

pub mod chart;
pub mod dispatch;
pub mod plot;
pub mod query;
pub mod reader;
pub mod registry;

#[cfg(feature = "vegalite")]
pub mod writer;

// Re-export key types for convenience
pub use chart::{Chart, ChartKind, ChartResult};
pub use dispatch::{Route, Visualizer};
pub use query::{AggFunc, QueryBuilder, QueryPlan};
pub use registry::{ColumnKind, ColumnRef, ColumnRegistry, Table};

// DataFrame abstraction (wraps Polars)
pub use polars::prelude::DataFrame;

/// Main library error type
#[derive(thiserror::Error, Debug)]
pub enum SafedriveError {
    #[error("Malformed column identifier '{0}': expected TABLE.column")]
    MalformedIdentifier(String),

    #[error("Cannot visualize selected combination: {0}")]
    Classification(String),

    #[error("Unsupported combination: {0}")]
    UnsupportedCombination(String),

    #[error("Query execution failed: {0}")]
    ReaderError(String),

    #[error("No data to plot: {0}")]
    EmptyResult(String),

    #[error("Invalid query plan: {0}")]
    InvalidPlan(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Output generation error: {0}")]
    WriterError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type Result<T> = std::result::Result<T, SafedriveError>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
