//! 2-D density of two raw numeric columns

use super::{ChartKind, ChartStrategy, HEATMAP_SAMPLE_LIMIT};
use crate::plot::{Channel, ChartSpec, FieldType, Mark};
use crate::query::{QueryBuilder, QueryPlan};
use crate::registry::ColumnRef;
use crate::{DataFrame, Result, SafedriveError};

pub struct DensityHeatmapStrategy {
    x: ColumnRef,
    y: ColumnRef,
}

impl DensityHeatmapStrategy {
    pub fn new(x: ColumnRef, y: ColumnRef) -> Self {
        Self { x, y }
    }
}

impl ChartStrategy for DensityHeatmapStrategy {
    fn kind(&self) -> ChartKind {
        ChartKind::DensityHeatmap
    }

    fn title(&self) -> String {
        format!("Density of '{}' vs '{}'", self.x, self.y)
    }

    /// Unaggregated pair, capped to bound overplotting
    fn plan(&self, builder: &QueryBuilder<'_>) -> Result<QueryPlan> {
        Ok(builder
            .build(&self.x, &self.y, None)?
            .with_limit(HEATMAP_SAMPLE_LIMIT))
    }

    fn finalize(&self, data: DataFrame) -> Result<DataFrame> {
        if data.height() == 0 {
            return Err(SafedriveError::EmptyResult(format!(
                "no rows for '{}' and '{}'",
                self.x, self.y
            )));
        }
        Ok(data)
    }

    fn spec(&self) -> ChartSpec {
        let x = Channel::new(self.x.column(), self.x.to_string(), FieldType::Quantitative).binned();
        let y = Channel::new(self.y.column(), self.y.to_string(), FieldType::Quantitative).binned();
        ChartSpec::new(self.title(), Mark::Rect, x, y).with_marginals()
    }
}
