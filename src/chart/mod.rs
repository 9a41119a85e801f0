//! Chart strategies
//!
//! Each strategy covers one pairing of column kinds:
//!
//! | Strategy        | Operands                  | Value axis                |
//! |-----------------|---------------------------|---------------------------|
//! | bar             | categorical × numeric     | numeric, top 20           |
//! | line            | temporal × numeric        | numeric, chronological    |
//! | grouped bar     | categorical × categorical | accident count            |
//! | density heatmap | numeric × numeric         | row density (raw sample)  |
//! | multi-line      | temporal × categorical    | accident count            |
//!
//! A strategy builds exactly one query plan, the plan is executed once, and the
//! rows are mapped onto a [`ChartSpec`].

mod bar;
mod grouped_bar;
mod heatmap;
mod line;
mod multi_line;

pub use bar::BarStrategy;
pub use grouped_bar::GroupedBarStrategy;
pub use heatmap::DensityHeatmapStrategy;
pub use line::LineStrategy;
pub use multi_line::MultiLineStrategy;

use crate::plot::ChartSpec;
use crate::query::{QueryBuilder, QueryPlan};
use crate::reader::Reader;
use crate::{DataFrame, Result, SafedriveError};
use serde::Serialize;
use std::fmt;

/// Rows kept by the bar strategy
pub const BAR_TOP_N: usize = 20;

/// Raw rows sampled by the density heatmap
pub const HEATMAP_SAMPLE_LIMIT: usize = 10_000;

/// Which strategy produced a chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Bar,
    Line,
    GroupedBar,
    DensityHeatmap,
    MultiLine,
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChartKind::Bar => "bar",
            ChartKind::Line => "line",
            ChartKind::GroupedBar => "grouped bar",
            ChartKind::DensityHeatmap => "density heatmap",
            ChartKind::MultiLine => "multi-line",
        };
        f.write_str(name)
    }
}

/// A chart ready to be handed to a writer
#[derive(Debug, Clone)]
pub struct Chart {
    pub kind: ChartKind,
    pub spec: ChartSpec,
    pub data: DataFrame,
    pub plan: QueryPlan,
    /// The statement that produced `data`
    pub sql: String,
}

/// Outcome of a dispatch
///
/// Callers check for `Failed` to decide whether to show an error banner
/// instead of a chart.
#[derive(Debug, Clone)]
pub enum ChartResult {
    Rendered { chart: Chart, title: String },
    Failed { message: String },
}

impl ChartResult {
    pub fn chart(&self) -> Option<&Chart> {
        match self {
            ChartResult::Rendered { chart, .. } => Some(chart),
            ChartResult::Failed { .. } => None,
        }
    }

    pub fn is_rendered(&self) -> bool {
        matches!(self, ChartResult::Rendered { .. })
    }

    /// Title on success, error message on failure
    pub fn message(&self) -> &str {
        match self {
            ChartResult::Rendered { title, .. } => title,
            ChartResult::Failed { message } => message,
        }
    }
}

impl From<Result<Chart>> for ChartResult {
    fn from(result: Result<Chart>) -> Self {
        match result {
            Ok(chart) => {
                let title = chart.spec.title.clone();
                ChartResult::Rendered { chart, title }
            }
            Err(err) => err.into(),
        }
    }
}

impl From<SafedriveError> for ChartResult {
    fn from(err: SafedriveError) -> Self {
        ChartResult::Failed {
            message: err.to_string(),
        }
    }
}

/// One way of turning a column pair into a chart
///
/// Strategies have a fixed role per axis; the dispatcher reorders operands so
/// that categories and time always land on X and numbers on Y.
pub trait ChartStrategy {
    fn kind(&self) -> ChartKind;

    /// Human-readable title naming the operands
    fn title(&self) -> String;

    /// Build the single query this chart needs
    fn plan(&self, builder: &QueryBuilder<'_>) -> Result<QueryPlan>;

    /// Post-process fetched rows.
    /// Default: keep them unchanged
    fn finalize(&self, data: DataFrame) -> Result<DataFrame> {
        Ok(data)
    }

    /// Describe the chart to draw over the fetched rows
    fn spec(&self) -> ChartSpec;
}

/// Plan, execute and map one strategy
pub fn render<R: Reader + ?Sized>(
    strategy: &dyn ChartStrategy,
    builder: &QueryBuilder<'_>,
    reader: &R,
) -> Result<Chart> {
    let plan = strategy.plan(builder)?;
    let sql = plan.to_sql()?;
    tracing::debug!(kind = %strategy.kind(), "Executing SQL: {}", sql);

    let data = reader.execute(&sql)?;
    tracing::info!(kind = %strategy.kind(), rows = data.height(), "Data fetched");

    let data = strategy.finalize(data)?;
    let spec = strategy.spec();

    let missing: Vec<&str> = spec
        .fields()
        .into_iter()
        .filter(|field| data.column(field).is_err())
        .collect();
    if !missing.is_empty() {
        return Err(SafedriveError::ReaderError(format!(
            "Query result is missing column(s): {}",
            missing.join(", ")
        )));
    }

    Ok(Chart {
        kind: strategy.kind(),
        spec,
        data,
        plan,
        sql,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{ColumnRef, ColumnRegistry};
    use polars::prelude::*;

    /// Reader returning a fixed frame regardless of the query
    struct FixedReader(DataFrame);

    impl Reader for FixedReader {
        fn execute(&self, _sql: &str) -> Result<DataFrame> {
            Ok(self.0.clone())
        }

        fn validate_columns(&self, _sql: &str, _columns: &[String]) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_render_reports_missing_columns() {
        let registry = ColumnRegistry::builtin().unwrap();
        let builder = QueryBuilder::new(&registry);
        let strategy = LineStrategy::new(
            ColumnRef::new("ACCIDENT", "OccurYearMonth"),
            ColumnRef::new("ACCIDENT", "DeathCount"),
        );
        let reader = FixedReader(df! { "Other" => &[1i64, 2] }.unwrap());

        let err = render(&strategy, &builder, &reader).unwrap_err();
        assert!(err.to_string().contains("OccurYearMonth"));
    }

    #[test]
    fn test_render_keeps_plan_and_sql() {
        let registry = ColumnRegistry::builtin().unwrap();
        let builder = QueryBuilder::new(&registry);
        let strategy = LineStrategy::new(
            ColumnRef::new("ACCIDENT", "OccurYearMonth"),
            ColumnRef::new("ACCIDENT", "DeathCount"),
        );
        let reader = FixedReader(
            df! {
                "OccurYearMonth" => &["202301", "202302"],
                "Value" => &[3i64, 1],
            }
            .unwrap(),
        );

        let chart = render(&strategy, &builder, &reader).unwrap();
        assert_eq!(chart.kind, ChartKind::Line);
        assert_eq!(chart.sql, chart.plan.to_sql().unwrap());
        assert_eq!(chart.data.height(), 2);
    }

    #[test]
    fn test_chart_result_from_error() {
        let result: ChartResult =
            SafedriveError::EmptyResult("nothing".to_string()).into();
        assert!(!result.is_rendered());
        assert!(result.chart().is_none());
        assert_eq!(result.message(), "No data to plot: nothing");
    }
}
