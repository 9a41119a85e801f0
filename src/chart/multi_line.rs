//! One counted line per category value over time

use super::{ChartKind, ChartStrategy};
use crate::plot::{AxisOrder, Channel, ChartSpec, FieldType, Mark};
use crate::query::{QueryBuilder, QueryPlan, VALUE_COLUMN};
use crate::registry::ColumnRef;
use crate::Result;

pub struct MultiLineStrategy {
    time: ColumnRef,
    category: ColumnRef,
    count: ColumnRef,
}

impl MultiLineStrategy {
    pub fn new(time: ColumnRef, category: ColumnRef, count: ColumnRef) -> Self {
        Self {
            time,
            category,
            count,
        }
    }
}

impl ChartStrategy for MultiLineStrategy {
    fn kind(&self) -> ChartKind {
        ChartKind::MultiLine
    }

    fn title(&self) -> String {
        format!(
            "'{}' over '{}' per '{}'",
            self.count, self.time, self.category
        )
    }

    fn plan(&self, builder: &QueryBuilder<'_>) -> Result<QueryPlan> {
        builder.build_grouped(
            &self.time,
            &self.category,
            &self.count,
            builder.value_agg(&self.count),
        )
    }

    fn spec(&self) -> ChartSpec {
        let x = Channel::new(self.time.column(), self.time.to_string(), FieldType::Ordinal)
            .with_order(AxisOrder::Ascending);
        let y = Channel::new(VALUE_COLUMN, self.count.to_string(), FieldType::Quantitative);
        let color = Channel::new(
            self.category.column(),
            self.category.to_string(),
            FieldType::Nominal,
        );
        ChartSpec::new(self.title(), Mark::Line, x, y)
            .with_color(color)
            .with_points()
    }
}
