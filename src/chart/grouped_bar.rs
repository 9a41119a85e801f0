//! Grouped bars: categorical × categorical, counted

use super::{ChartKind, ChartStrategy};
use crate::plot::{Channel, ChartSpec, FieldType, Mark};
use crate::query::{QueryBuilder, QueryPlan, VALUE_COLUMN};
use crate::registry::ColumnRef;
use crate::Result;

pub struct GroupedBarStrategy {
    category: ColumnRef,
    group: ColumnRef,
    count: ColumnRef,
}

impl GroupedBarStrategy {
    /// `group` becomes the colour channel, `count` the value axis
    pub fn new(category: ColumnRef, group: ColumnRef, count: ColumnRef) -> Self {
        Self {
            category,
            group,
            count,
        }
    }
}

impl ChartStrategy for GroupedBarStrategy {
    fn kind(&self) -> ChartKind {
        ChartKind::GroupedBar
    }

    fn title(&self) -> String {
        format!("'{}' by '{}' and '{}'", self.count, self.category, self.group)
    }

    fn plan(&self, builder: &QueryBuilder<'_>) -> Result<QueryPlan> {
        builder.build_grouped(
            &self.category,
            &self.group,
            &self.count,
            builder.value_agg(&self.count),
        )
    }

    fn spec(&self) -> ChartSpec {
        let x = Channel::new(
            self.category.column(),
            self.category.to_string(),
            FieldType::Nominal,
        );
        let y = Channel::new(VALUE_COLUMN, self.count.to_string(), FieldType::Quantitative);
        let color = Channel::new(self.group.column(), self.group.to_string(), FieldType::Nominal);
        ChartSpec::new(self.title(), Mark::Bar, x, y)
            .with_color(color)
            .grouped()
    }
}
