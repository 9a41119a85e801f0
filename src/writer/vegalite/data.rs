//! DataFrame to JSON conversion for the Vega-Lite writer

use crate::{DataFrame, Result, SafedriveError};
use polars::prelude::*;
use serde_json::{json, Map, Value};

/// Convert a DataFrame to Vega-Lite data values (array of objects)
pub(super) fn dataframe_to_values(df: &DataFrame) -> Result<Vec<Value>> {
    let mut values = Vec::with_capacity(df.height());
    let column_names = df.get_column_names();

    for row_idx in 0..df.height() {
        let mut row_obj = Map::new();

        for (column, name) in df.get_columns().iter().zip(&column_names) {
            let value = series_value_at(column.as_materialized_series(), row_idx)?;
            row_obj.insert(name.to_string(), value);
        }

        values.push(Value::Object(row_obj));
    }

    Ok(values)
}

fn cast_error(kind: &str, e: PolarsError) -> SafedriveError {
    SafedriveError::WriterError(format!("Failed to cast to {}: {}", kind, e))
}

/// Get a single value from a series at a given index as JSON Value
///
/// Strings stay strings even when they look numeric: year-month keys and
/// numeric-looking category codes must not turn into numbers.
pub(super) fn series_value_at(series: &Series, idx: usize) -> Result<Value> {
    use DataType::*;

    let value = match series.dtype() {
        Int8 => series.i8().map_err(|e| cast_error("i8", e))?.get(idx).map(|v| json!(v)),
        Int16 => series.i16().map_err(|e| cast_error("i16", e))?.get(idx).map(|v| json!(v)),
        Int32 => series.i32().map_err(|e| cast_error("i32", e))?.get(idx).map(|v| json!(v)),
        Int64 => series.i64().map_err(|e| cast_error("i64", e))?.get(idx).map(|v| json!(v)),
        UInt32 => series.u32().map_err(|e| cast_error("u32", e))?.get(idx).map(|v| json!(v)),
        UInt64 => series.u64().map_err(|e| cast_error("u64", e))?.get(idx).map(|v| json!(v)),
        Float32 => series.f32().map_err(|e| cast_error("f32", e))?.get(idx).map(|v| json!(v)),
        Float64 => series.f64().map_err(|e| cast_error("f64", e))?.get(idx).map(|v| json!(v)),
        Boolean => series.bool().map_err(|e| cast_error("bool", e))?.get(idx).map(|v| json!(v)),
        String => series.str().map_err(|e| cast_error("string", e))?.get(idx).map(|v| json!(v)),
        Date => {
            // Days since epoch to "YYYY-MM-DD"
            let physical = series.to_physical_repr();
            let days = physical.i32().map_err(|e| cast_error("date", e))?.get(idx);
            days.map(|days| date_value(days, series.name())).transpose()?
        }
        _ => match series.get(idx) {
            Ok(AnyValue::Null) => None,
            Ok(v) => Some(json!(v.to_string())),
            Err(e) => {
                return Err(SafedriveError::WriterError(format!(
                    "Failed to read value {} of '{}': {}",
                    idx,
                    series.name(),
                    e
                )))
            }
        },
    };

    Ok(value.unwrap_or(Value::Null))
}

fn date_value(days: i32, column: &str) -> Result<Value> {
    chrono::NaiveDate::from_ymd_opt(1970, 1, 1)
        .and_then(|epoch| epoch.checked_add_signed(chrono::Duration::days(i64::from(days))))
        .map(|date| json!(date.format("%Y-%m-%d").to_string()))
        .ok_or_else(|| {
            SafedriveError::WriterError(format!(
                "Date value {} in '{}' is out of range",
                days, column
            ))
        })
}
