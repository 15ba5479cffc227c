//! Helpers for scalar metadata values.
//!
//! Metadata is authored in YAML, where the same logical key may appear as
//! `1` in one year and `"1"` in another. Lookups therefore go through a
//! rendered string key.

use serde_yaml::Value;

/// Reads an integer from a number or an integer-valued string.
pub fn value_to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|v| v.fract() == 0.0 && v.is_finite())
                .map(|v| v as i64)
        }),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        Value::Tagged(tagged) => value_to_i64(&tagged.value),
        _ => None,
    }
}

/// Renders a scalar as a lookup key; `None` for null and non-scalars.
///
/// Integer-valued floats render without a fractional part so that `3.0`
/// and `3` address the same entry.
pub fn scalar_key(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => {
            if let Some(v) = number.as_i64() {
                Some(v.to_string())
            } else if let Some(v) = number.as_u64() {
                Some(v.to_string())
            } else {
                let v = number.as_f64()?;
                if v.fract() == 0.0 && v.is_finite() {
                    Some(format!("{}", v as i64))
                } else {
                    Some(v.to_string())
                }
            }
        }
        Value::String(text) => Some(text.clone()),
        Value::Tagged(tagged) => scalar_key(&tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => None,
    }
}
