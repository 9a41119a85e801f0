//! Kind-pair routing
//!
//! [`route`] classifies both operands and picks a strategy, swapping operands
//! so that each strategy sees its fixed axis roles. [`Visualizer`] is the
//! single entry point callers use: it turns every fault into a
//! [`ChartResult::Failed`].

use crate::chart::{
    self, BarStrategy, ChartKind, ChartResult, ChartStrategy, DensityHeatmapStrategy,
    GroupedBarStrategy, LineStrategy, MultiLineStrategy,
};
use crate::query::{QueryBuilder, QueryPlan};
use crate::reader::Reader;
use crate::registry::{ColumnKind, ColumnRef, ColumnRegistry};
use crate::{Chart, Result, SafedriveError};

/// Strategy selected for a pair of columns, with operands in axis order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Bar {
        category: ColumnRef,
        value: ColumnRef,
    },
    Line {
        time: ColumnRef,
        value: ColumnRef,
    },
    GroupedBar {
        category: ColumnRef,
        group: ColumnRef,
        count: ColumnRef,
    },
    DensityHeatmap {
        x: ColumnRef,
        y: ColumnRef,
    },
    MultiLine {
        time: ColumnRef,
        category: ColumnRef,
        count: ColumnRef,
    },
}

impl Route {
    pub fn kind(&self) -> ChartKind {
        match self {
            Route::Bar { .. } => ChartKind::Bar,
            Route::Line { .. } => ChartKind::Line,
            Route::GroupedBar { .. } => ChartKind::GroupedBar,
            Route::DensityHeatmap { .. } => ChartKind::DensityHeatmap,
            Route::MultiLine { .. } => ChartKind::MultiLine,
        }
    }

    pub fn strategy(&self) -> Box<dyn ChartStrategy> {
        match self.clone() {
            Route::Bar { category, value } => Box::new(BarStrategy::new(category, value)),
            Route::Line { time, value } => Box::new(LineStrategy::new(time, value)),
            Route::GroupedBar {
                category,
                group,
                count,
            } => Box::new(GroupedBarStrategy::new(category, group, count)),
            Route::DensityHeatmap { x, y } => Box::new(DensityHeatmapStrategy::new(x, y)),
            Route::MultiLine {
                time,
                category,
                count,
            } => Box::new(MultiLineStrategy::new(time, category, count)),
        }
    }
}

/// Pick a strategy for `(first, second)`
///
/// Never touches the data store.
pub fn route(registry: &ColumnRegistry, first: &ColumnRef, second: &ColumnRef) -> Result<Route> {
    use ColumnKind::*;

    let first_kind = registry.kind_of(first);
    let second_kind = registry.kind_of(second);
    let count = || registry.virtual_count().clone();

    match (first_kind, second_kind) {
        (Unknown, _) | (_, Unknown) => {
            let unknown = if first_kind == Unknown { first } else { second };
            Err(SafedriveError::Classification(format!(
                "'{}' is not a known column",
                unknown
            )))
        }
        (Categorical, Numeric) => Ok(Route::Bar {
            category: first.clone(),
            value: second.clone(),
        }),
        (Numeric, Categorical) => Ok(Route::Bar {
            category: second.clone(),
            value: first.clone(),
        }),
        (Temporal, Numeric) => Ok(Route::Line {
            time: first.clone(),
            value: second.clone(),
        }),
        (Numeric, Temporal) => Ok(Route::Line {
            time: second.clone(),
            value: first.clone(),
        }),
        (Categorical, Categorical) => Ok(Route::GroupedBar {
            category: first.clone(),
            group: second.clone(),
            count: count(),
        }),
        (Numeric, Numeric) => {
            if registry.is_virtual(first) || registry.is_virtual(second) {
                Err(SafedriveError::UnsupportedCombination(format!(
                    "'{}' x '{}': the accident count cannot be plotted against another number",
                    first, second
                )))
            } else {
                Ok(Route::DensityHeatmap {
                    x: first.clone(),
                    y: second.clone(),
                })
            }
        }
        (Temporal, Categorical) => Ok(Route::MultiLine {
            time: first.clone(),
            category: second.clone(),
            count: count(),
        }),
        (Categorical, Temporal) => Ok(Route::MultiLine {
            time: second.clone(),
            category: first.clone(),
            count: count(),
        }),
        (Temporal, Temporal) => Err(SafedriveError::UnsupportedCombination(format!(
            "'{}' x '{}': two time columns",
            first, second
        ))),
    }
}

/// Parse both identifiers and route them
fn resolve(registry: &ColumnRegistry, first: &str, second: &str) -> Result<Route> {
    let first = ColumnRef::parse(first)?;
    let second = ColumnRef::parse(second)?;
    let route = route(registry, &first, &second)?;
    tracing::debug!(
        first = %first,
        first_kind = %registry.kind_of(&first),
        second = %second,
        second_kind = %registry.kind_of(&second),
        "Routed to {}",
        route.kind()
    );
    Ok(route)
}

/// Classify and plan a pair without executing anything
pub fn plan(
    registry: &ColumnRegistry,
    first: &str,
    second: &str,
) -> Result<(ChartKind, QueryPlan)> {
    let route = resolve(registry, first, second)?;
    let plan = route.strategy().plan(&QueryBuilder::new(registry))?;
    Ok((route.kind(), plan))
}

/// Entry point for callers: two identifiers in, one [`ChartResult`] out
pub struct Visualizer<'a, R: Reader + ?Sized> {
    registry: &'a ColumnRegistry,
    reader: &'a R,
}

impl<'a, R: Reader + ?Sized> Visualizer<'a, R> {
    pub fn new(registry: &'a ColumnRegistry, reader: &'a R) -> Self {
        Self { registry, reader }
    }

    /// Every registered column, sorted
    pub fn available_columns(&self) -> Vec<ColumnRef> {
        self.registry.all_columns()
    }

    /// Build a chart for the pair, or report why it cannot be built
    ///
    /// At most one query is issued, and none when classification fails.
    pub fn dispatch(&self, first: &str, second: &str) -> ChartResult {
        self.build_chart(first, second).into()
    }

    /// Same as [`Visualizer::dispatch`], keeping the typed error
    pub fn build_chart(&self, first: &str, second: &str) -> Result<Chart> {
        tracing::info!(first, second, "Dispatching chart request");

        let result = resolve(self.registry, first, second).and_then(|route| {
            let builder = QueryBuilder::new(self.registry);
            chart::render(route.strategy().as_ref(), &builder, self.reader)
        });

        match &result {
            Ok(chart) => {
                tracing::info!(kind = %chart.kind, rows = chart.data.height(), "Chart rendered")
            }
            Err(err @ (SafedriveError::ReaderError(_) | SafedriveError::InternalError(_))) => {
                tracing::error!(first, second, "Chart failed: {}", err)
            }
            Err(err) => tracing::warn!(first, second, "Chart failed: {}", err),
        }
        result
    }
}
