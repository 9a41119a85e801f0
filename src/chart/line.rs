//! Line: temporal × numeric, chronological

use super::{ChartKind, ChartStrategy};
use crate::plot::{AxisOrder, Channel, ChartSpec, FieldType, Mark};
use crate::query::{QueryBuilder, QueryPlan, VALUE_COLUMN};
use crate::registry::ColumnRef;
use crate::Result;

pub struct LineStrategy {
    time: ColumnRef,
    value: ColumnRef,
}

impl LineStrategy {
    pub fn new(time: ColumnRef, value: ColumnRef) -> Self {
        Self { time, value }
    }
}

impl ChartStrategy for LineStrategy {
    fn kind(&self) -> ChartKind {
        ChartKind::Line
    }

    fn title(&self) -> String {
        format!("'{}' over '{}'", self.value, self.time)
    }

    fn plan(&self, builder: &QueryBuilder<'_>) -> Result<QueryPlan> {
        // The builder already orders by the group key
        builder.build(&self.time, &self.value, Some(builder.value_agg(&self.value)))
    }

    fn spec(&self) -> ChartSpec {
        let x = Channel::new(self.time.column(), self.time.to_string(), FieldType::Ordinal)
            .with_order(AxisOrder::Ascending);
        let y = Channel::new(VALUE_COLUMN, self.value.to_string(), FieldType::Quantitative);
        ChartSpec::new(self.title(), Mark::Line, x, y).with_points()
    }
}
