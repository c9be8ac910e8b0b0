//! Settings value helpers: recursive default merging and loose scalar coercion.

use serde_json::{Number, Value};

use crate::stream_config::model::Settings;

/// Deep-merge `overrides` on top of `defaults`.
///
/// For each key, two mappings merge recursively; in every other case the
/// override value replaces the default. Key order follows `defaults`, with
/// keys only present in `overrides` appended in their own order.
pub fn merge_settings(defaults: &Settings, overrides: &Settings) -> Settings {
    let mut merged = defaults.clone();
    for (key, value) in overrides {
        let replacement = match (merged.get(key), value) {
            (Some(Value::Object(base)), Value::Object(over)) => {
                Value::Object(merge_settings(base, over))
            }
            _ => value.clone(),
        };
        merged.insert(key.clone(), replacement);
    }
    merged
}

/// String form used when comparing settings values loosely.
///
/// Booleans map to `"1"` / `""`, null to `""`, integral floats drop their
/// fractional part. Lists and mappings render as compact JSON so they only
/// compare equal to structurally identical values.
pub fn coerce_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => String::new(),
        Value::Number(number) => number_to_string(number),
        Value::String(text) => text.clone(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Loose equality over the coerced string forms.
pub fn loosely_equal(left: &Value, right: &Value) -> bool {
    coerce_to_string(left) == coerce_to_string(right)
}

fn number_to_string(number: &Number) -> String {
    if number.is_i64() || number.is_u64() {
        return number.to_string();
    }
    match number.as_f64() {
        Some(float) if float.is_finite() && float.fract() == 0.0 && float.abs() < 1e15 => {
            format!("{}", float as i64)
        }
        Some(float) => format!("{}", float),
        None => number.to_string(),
    }
}
