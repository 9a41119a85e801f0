//! Vega-Lite JSON writer
//!
//! Converts a [`Chart`] into a Vega-Lite v6 specification with the fetched
//! rows inlined as data values.
//!
//! # Mapping
//!
//! ```text
//! ChartSpec          → Vega-Lite
//! ─────────────────────────────────────────
//! mark               → mark.type
//! x / y / color      → encoding.{x, y, color}
//! offset_by_color    → encoding.xOffset
//! point_markers      → mark.point
//! marginal_histograms → vconcat[ top, hconcat[ density, right ] ]
//! ```

mod data;
mod encoding;
mod layer;

use crate::writer::Writer;
use crate::{Chart, Result, SafedriveError};
use serde_json::{json, Value};

use data::dataframe_to_values;
use layer::build_view;

/// Vega-Lite JSON writer
pub struct VegaLiteWriter {
    /// Vega-Lite schema version
    schema: String,
}

impl VegaLiteWriter {
    /// Create a new Vega-Lite writer with default settings
    pub fn new() -> Self {
        Self {
            schema: "https://vega.github.io/schema/vega-lite/v6.json".to_string(),
        }
    }

    /// Build the Vega-Lite document as a JSON value
    pub fn render(&self, chart: &Chart) -> Result<Value> {
        self.validate(chart)?;

        let mut vl_spec = json!({
            "$schema": self.schema,
            "title": chart.spec.title,
            "data": {"values": dataframe_to_values(&chart.data)?},
        });

        let view = build_view(&chart.spec)?;
        let single_view = view.get("mark").is_some();
        if let Value::Object(body) = view {
            for (key, value) in body {
                vl_spec[key] = value;
            }
        }

        if single_view && vl_spec.get("width").is_none() {
            vl_spec["width"] = json!("container");
            vl_spec["height"] = json!("container");
        }

        vl_spec["config"] = dashboard_theme();
        Ok(vl_spec)
    }
}

/// White panels, dashed horizontal grid, Hangul-capable fonts
fn dashboard_theme() -> Value {
    let font = "Pretendard, 'Noto Sans KR', 'Malgun Gothic', sans-serif";
    json!({
        "font": font,
        "background": "#FFFFFF",
        "view": {"stroke": "#D9DEE4"},
        "range": {
            "category": [
                "#1F6FB2", "#F28E2B", "#3BA272", "#E15759", "#8C6BB1",
                "#9C755F", "#D37295", "#6B7A8F", "#B6992D", "#4EB3D3"
            ],
            "heatmap": {"scheme": "orangered"}
        },
        "axis": {
            "domainColor": "#8A94A0",
            "tickColor": "#8A94A0",
            "labelColor": "#3C4650",
            "labelFontSize": 11,
            "labelLimit": 160,
            "titleColor": "#1E2832",
            "titleFontSize": 13,
            "titleFontWeight": 600
        },
        "axisX": {"grid": false, "labelAngle": -40},
        "axisY": {"gridColor": "#E6EAEE", "gridDash": [3, 3]},
        "legend": {
            "labelFontSize": 11,
            "titleFontSize": 12,
            "titleFontWeight": 600,
            "orient": "right"
        },
        "title": {
            "fontSize": 16,
            "fontWeight": 700,
            "anchor": "start",
            "color": "#1E2832",
            "offset": 12
        },
        "bar": {"cornerRadiusEnd": 2},
        "line": {"strokeWidth": 2},
        "concat": {"spacing": 4}
    })
}

impl Default for VegaLiteWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Writer for VegaLiteWriter {
    fn write(&self, chart: &Chart) -> Result<String> {
        let vl_spec = self.render(chart)?;
        serde_json::to_string_pretty(&vl_spec).map_err(|e| {
            SafedriveError::WriterError(format!("Failed to serialize Vega-Lite JSON: {}", e))
        })
    }

    fn validate(&self, chart: &Chart) -> Result<()> {
        let missing: Vec<&str> = chart
            .spec
            .fields()
            .into_iter()
            .filter(|field| chart.data.column(field).is_err())
            .collect();
        if !missing.is_empty() {
            return Err(SafedriveError::WriterError(format!(
                "Chart data is missing encoded column(s): {}",
                missing.join(", ")
            )));
        }
        Ok(())
    }
}
