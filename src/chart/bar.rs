//! Vertical bars: categorical × numeric, top values first

use super::{ChartKind, ChartStrategy, BAR_TOP_N};
use crate::plot::{AxisOrder, Channel, ChartSpec, FieldType, Mark};
use crate::query::{QueryBuilder, QueryPlan, SortKey, VALUE_COLUMN};
use crate::registry::ColumnRef;
use crate::{DataFrame, Result, SafedriveError};
use polars::prelude::SortMultipleOptions;

pub struct BarStrategy {
    category: ColumnRef,
    value: ColumnRef,
}

impl BarStrategy {
    pub fn new(category: ColumnRef, value: ColumnRef) -> Self {
        Self { category, value }
    }
}

impl ChartStrategy for BarStrategy {
    fn kind(&self) -> ChartKind {
        ChartKind::Bar
    }

    fn title(&self) -> String {
        format!("'{}' by '{}' (top {})", self.category, self.value, BAR_TOP_N)
    }

    fn plan(&self, builder: &QueryBuilder<'_>) -> Result<QueryPlan> {
        let agg = builder.value_agg(&self.value);
        Ok(builder
            .build(&self.category, &self.value, Some(agg))?
            .with_order_by(vec![SortKey::value_descending()])
            .with_limit(BAR_TOP_N))
    }

    /// Re-sort and cut in memory so the top-N shape holds for any reader
    fn finalize(&self, data: DataFrame) -> Result<DataFrame> {
        if data.column(VALUE_COLUMN).is_err() {
            return Ok(data);
        }
        let sorted = data
            .sort(
                [VALUE_COLUMN],
                SortMultipleOptions::default()
                    .with_order_descending(true)
                    .with_nulls_last(true)
                    .with_maintain_order(true),
            )
            .map_err(|e| SafedriveError::InternalError(format!("Failed to sort bars: {}", e)))?;
        Ok(sorted.head(Some(BAR_TOP_N)))
    }

    fn spec(&self) -> ChartSpec {
        // Nominal keeps numeric-looking category labels discrete
        let x = Channel::new(
            self.category.column(),
            self.category.to_string(),
            FieldType::Nominal,
        )
        .with_order(AxisOrder::Data);
        let y = Channel::new(VALUE_COLUMN, self.value.to_string(), FieldType::Quantitative);
        ChartSpec::new(self.title(), Mark::Bar, x, y)
    }
}
