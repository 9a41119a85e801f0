//! Renderer-independent chart specification
//!
//! Chart strategies describe *what* to draw with a [`ChartSpec`]; writers
//! decide *how* (see [`crate::writer`]).

use serde::{Deserialize, Serialize};

/// Mark drawn for each row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mark {
    Bar,
    Line,
    /// Binned 2-D density cells
    Rect,
}

/// How a channel's values are scaled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Unordered discrete categories
    Nominal,
    /// Discrete and ordered (year-month keys)
    Ordinal,
    /// Continuous numbers
    Quantitative,
}

/// Order in which a discrete axis lists its values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisOrder {
    /// Keep row order from the query
    Data,
    Ascending,
}

/// One encoding channel bound to a DataFrame column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    /// Column name in the fetched data
    pub field: String,
    /// Axis / legend title
    pub title: String,
    pub field_type: FieldType,
    pub order: Option<AxisOrder>,
    /// Bin continuous values into cells
    pub binned: bool,
}

impl Channel {
    pub fn new(field: impl Into<String>, title: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            field: field.into(),
            title: title.into(),
            field_type,
            order: None,
            binned: false,
        }
    }

    pub fn with_order(mut self, order: AxisOrder) -> Self {
        self.order = Some(order);
        self
    }

    pub fn binned(mut self) -> Self {
        self.binned = true;
        self
    }
}

/// Complete chart description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub title: String,
    pub mark: Mark,
    pub x: Channel,
    pub y: Channel,
    pub color: Option<Channel>,
    /// Place bars side by side per colour value instead of stacking
    pub offset_by_color: bool,
    pub point_markers: bool,
    pub marginal_histograms: bool,
}

impl ChartSpec {
    pub fn new(title: impl Into<String>, mark: Mark, x: Channel, y: Channel) -> Self {
        Self {
            title: title.into(),
            mark,
            x,
            y,
            color: None,
            offset_by_color: false,
            point_markers: false,
            marginal_histograms: false,
        }
    }

    pub fn with_color(mut self, color: Channel) -> Self {
        self.color = Some(color);
        self
    }

    pub fn grouped(mut self) -> Self {
        self.offset_by_color = true;
        self
    }

    pub fn with_points(mut self) -> Self {
        self.point_markers = true;
        self
    }

    pub fn with_marginals(mut self) -> Self {
        self.marginal_histograms = true;
        self
    }

    /// Columns this chart reads from the data
    pub fn fields(&self) -> Vec<&str> {
        let mut fields = vec![self.x.field.as_str(), self.y.field.as_str()];
        fields.extend(self.color.iter().map(|c| c.field.as_str()));
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_cover_all_channels() {
        let spec = ChartSpec::new(
            "t",
            Mark::Line,
            Channel::new("OccurYearMonth", "ACCIDENT.OccurYearMonth", FieldType::Ordinal),
            Channel::new("Value", "count", FieldType::Quantitative),
        )
        .with_color(Channel::new("Gender", "DRIVER.Gender", FieldType::Nominal));

        assert_eq!(spec.fields(), vec!["OccurYearMonth", "Value", "Gender"]);
    }

    #[test]
    fn test_builders_set_flags() {
        let spec = ChartSpec::new(
            "t",
            Mark::Bar,
            Channel::new("a", "a", FieldType::Nominal),
            Channel::new("b", "b", FieldType::Quantitative),
        )
        .grouped()
        .with_points()
        .with_marginals();

        assert!(spec.offset_by_color);
        assert!(spec.point_markers);
        assert!(spec.marginal_histograms);
        assert_eq!(serde_json::to_value(spec.mark).unwrap(), "bar");
    }
}
