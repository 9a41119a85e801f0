//! Encoding channel construction for the Vega-Lite writer

use crate::plot::{AxisOrder, Channel, ChartSpec, FieldType};
use serde_json::{json, Map, Value};

/// Bins per axis for density cells and marginal histograms
pub(super) const DENSITY_MAXBINS: u32 = 30;

pub(super) fn field_type_name(field_type: FieldType) -> &'static str {
    match field_type {
        FieldType::Nominal => "nominal",
        FieldType::Ordinal => "ordinal",
        FieldType::Quantitative => "quantitative",
    }
}

/// Field definition for one channel
pub(super) fn build_field_def(channel: &Channel) -> Value {
    let mut def = json!({
        "field": channel.field,
        "type": field_type_name(channel.field_type),
        "title": channel.title,
    });

    match channel.order {
        // `null` keeps the order rows arrive in
        Some(AxisOrder::Data) => def["sort"] = Value::Null,
        Some(AxisOrder::Ascending) => def["sort"] = json!("ascending"),
        None => {}
    }

    if channel.binned {
        def["bin"] = json!({"maxbins": DENSITY_MAXBINS});
    }

    def
}

/// Field definition with axis labels suppressed (marginal plots)
pub(super) fn build_axisless_field_def(channel: &Channel) -> Value {
    let mut def = build_field_def(channel);
    def["axis"] = Value::Null;
    def
}

/// Row count per bin / cell
pub(super) fn count_def() -> Value {
    json!({
        "aggregate": "count",
        "type": "quantitative",
        "title": "count",
    })
}

/// x, y and colour channels of a single-view chart
pub(super) fn build_encoding(spec: &ChartSpec) -> Map<String, Value> {
    let mut encoding = Map::new();
    encoding.insert("x".to_string(), build_field_def(&spec.x));
    encoding.insert("y".to_string(), build_field_def(&spec.y));

    if let Some(color) = &spec.color {
        encoding.insert("color".to_string(), build_field_def(color));
    }

    encoding
}
