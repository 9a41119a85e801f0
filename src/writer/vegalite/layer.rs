//! Mark renderers for the Vega-Lite writer
//!
//! Each mark gets a renderer that adjusts the shared encoding and mark
//! definition. The density renderer expands the single view into a composed
//! view with marginal histograms.

use super::encoding::{build_axisless_field_def, build_encoding, count_def};
use crate::plot::{ChartSpec, Mark};
use crate::Result;
use serde_json::{json, Map, Value};

/// Marginal histogram thickness in pixels
const MARGINAL_SIZE: u32 = 80;
/// Density panel side length in pixels
const DENSITY_SIZE: u32 = 400;

pub(super) trait MarkRenderer {
    /// Modify the encoding map for this mark.
    /// Default: no modifications
    fn modify_encoding(&self, _encoding: &mut Map<String, Value>, _spec: &ChartSpec) -> Result<()> {
        Ok(())
    }

    /// Modify the mark definition.
    /// Default: no modifications
    fn modify_mark(&self, _mark: &mut Value, _spec: &ChartSpec) -> Result<()> {
        Ok(())
    }

    /// Turn the single view into the final view body.
    /// Default: return it unchanged
    fn finalize(&self, view: Value, _spec: &ChartSpec) -> Result<Value> {
        Ok(view)
    }
}

pub(super) fn mark_name(mark: Mark) -> &'static str {
    match mark {
        Mark::Bar => "bar",
        Mark::Line => "line",
        Mark::Rect => "rect",
    }
}

pub(super) fn get_renderer(mark: Mark) -> Box<dyn MarkRenderer> {
    match mark {
        Mark::Bar => Box::new(BarRenderer),
        Mark::Line => Box::new(LineRenderer),
        Mark::Rect => Box::new(DensityRenderer),
    }
}

// =============================================================================
// Bar
// =============================================================================

struct BarRenderer;

impl MarkRenderer for BarRenderer {
    fn modify_encoding(&self, encoding: &mut Map<String, Value>, spec: &ChartSpec) -> Result<()> {
        // Side-by-side bars: offset within each x band by the colour field
        if let (true, Some(color)) = (spec.offset_by_color, &spec.color) {
            encoding.insert(
                "xOffset".to_string(),
                json!({"field": color.field, "type": "nominal"}),
            );
        }
        Ok(())
    }
}

// =============================================================================
// Line
// =============================================================================

struct LineRenderer;

impl MarkRenderer for LineRenderer {
    fn modify_mark(&self, mark: &mut Value, spec: &ChartSpec) -> Result<()> {
        if spec.point_markers {
            mark["point"] = json!(true);
        }
        Ok(())
    }
}

// =============================================================================
// Density heatmap
// =============================================================================

struct DensityRenderer;

impl MarkRenderer for DensityRenderer {
    fn modify_encoding(&self, encoding: &mut Map<String, Value>, _spec: &ChartSpec) -> Result<()> {
        encoding.insert("color".to_string(), count_def());
        Ok(())
    }

    fn finalize(&self, mut view: Value, spec: &ChartSpec) -> Result<Value> {
        view["width"] = json!(DENSITY_SIZE);
        view["height"] = json!(DENSITY_SIZE);

        if !spec.marginal_histograms {
            return Ok(view);
        }

        let top = json!({
            "width": DENSITY_SIZE,
            "height": MARGINAL_SIZE,
            "mark": {"type": "bar"},
            "encoding": {
                "x": build_axisless_field_def(&spec.x),
                "y": count_def(),
            }
        });
        let right = json!({
            "width": MARGINAL_SIZE,
            "height": DENSITY_SIZE,
            "mark": {"type": "bar"},
            "encoding": {
                "x": count_def(),
                "y": build_axisless_field_def(&spec.y),
            }
        });

        Ok(json!({
            "vconcat": [
                top,
                {"hconcat": [view, right]}
            ]
        }))
    }
}

/// Single view for a spec before renderer finalisation
pub(super) fn build_view(spec: &ChartSpec) -> Result<Value> {
    let renderer = get_renderer(spec.mark);

    let mut mark = json!({"type": mark_name(spec.mark)});
    renderer.modify_mark(&mut mark, spec)?;

    let mut encoding = build_encoding(spec);
    renderer.modify_encoding(&mut encoding, spec)?;

    let view = json!({
        "mark": mark,
        "encoding": encoding,
    });
    renderer.finalize(view, spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plot::{Channel, FieldType};

    fn spec(mark: Mark) -> ChartSpec {
        ChartSpec::new(
            "t",
            mark,
            Channel::new("a", "A", FieldType::Nominal),
            Channel::new("Value", "V", FieldType::Quantitative),
        )
    }

    #[test]
    fn test_grouped_bar_offsets_by_color() {
        let spec = spec(Mark::Bar)
            .with_color(Channel::new("g", "G", FieldType::Nominal))
            .grouped();
        let view = build_view(&spec).unwrap();

        assert_eq!(view["encoding"]["xOffset"]["field"], "g");
        assert_eq!(view["encoding"]["color"]["field"], "g");
    }

    #[test]
    fn test_plain_bar_has_no_offset() {
        let view = build_view(&spec(Mark::Bar)).unwrap();
        assert!(view["encoding"].get("xOffset").is_none());
        assert_eq!(view["mark"]["type"], "bar");
    }

    #[test]
    fn test_line_points() {
        let view = build_view(&spec(Mark::Line).with_points()).unwrap();
        assert_eq!(view["mark"]["point"], true);
    }

    #[test]
    fn test_density_without_marginals_is_single_view() {
        let spec = ChartSpec::new(
            "t",
            Mark::Rect,
            Channel::new("x", "X", FieldType::Quantitative).binned(),
            Channel::new("y", "Y", FieldType::Quantitative).binned(),
        );
        let view = build_view(&spec).unwrap();

        assert_eq!(view["mark"]["type"], "rect");
        assert_eq!(view["encoding"]["color"]["aggregate"], "count");
        assert!(view.get("vconcat").is_none());
    }
}
