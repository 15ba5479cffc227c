//! Column access helpers over polars frames.

use polars::prelude::{AnyValue, DataFrame, NamedFrom, Series};

use crate::error::{DecodeError, Result};

pub fn any_to_i64(value: AnyValue) -> Option<i64> {
    match value {
        AnyValue::Null => None,
        AnyValue::Int8(value) => Some(value as i64),
        AnyValue::Int16(value) => Some(value as i64),
        AnyValue::Int32(value) => Some(value as i64),
        AnyValue::Int64(value) => Some(value),
        AnyValue::UInt8(value) => Some(value as i64),
        AnyValue::UInt16(value) => Some(value as i64),
        AnyValue::UInt32(value) => Some(value as i64),
        AnyValue::UInt64(value) => i64::try_from(value).ok(),
        AnyValue::Float32(value) => integral_float(value as f64),
        AnyValue::Float64(value) => integral_float(value),
        AnyValue::String(value) => parse_i64(value),
        AnyValue::StringOwned(value) => parse_i64(&value),
        _ => None,
    }
}

fn integral_float(value: f64) -> Option<i64> {
    (value.is_finite() && value.fract() == 0.0).then_some(value as i64)
}

pub fn parse_i64(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<i64>().ok()
}

/// Reads a column as nullable integers.
///
/// Integer dtypes, integral floats and integer-valued strings are accepted;
/// anything else reads as null.
pub fn integer_column(df: &DataFrame, name: &str) -> Result<Vec<Option<i64>>> {
    let column = df.column(name).map_err(|_| DecodeError::ColumnNotFound {
        column: name.to_string(),
    })?;
    let mut values = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        values.push(any_to_i64(column.get(idx)?));
    }
    Ok(values)
}

/// Adds or replaces string columns on `df`.
pub fn attach_string_columns(
    df: &mut DataFrame,
    columns: Vec<(String, Vec<Option<String>>)>,
) -> Result<()> {
    for (name, values) in columns {
        df.with_column(Series::new(name.into(), values))?;
    }
    Ok(())
}

/// Distinct values in order of first appearance, nulls skipped.
pub fn distinct<T: Copy + Eq + std::hash::Hash>(values: impl IntoIterator<Item = Option<T>>) -> Vec<T> {
    let mut seen = std::collections::HashSet::new();
    values
        .into_iter()
        .flatten()
        .filter(|value| seen.insert(*value))
        .collect()
}

#[cfg(test)]
mod tests {
    use polars::prelude::*;

    use super::*;

    #[test]
    fn integer_column_accepts_strings_and_floats() {
        let df = df! {
            "a" => [Some("12"), Some(" 7 "), Some("x"), None],
            "b" => [1.0, 2.5, 3.0, 4.0],
        }
        .unwrap();

        assert_eq!(
            integer_column(&df, "a").unwrap(),
            vec![Some(12), Some(7), None, None]
        );
        assert_eq!(
            integer_column(&df, "b").unwrap(),
            vec![Some(1), None, Some(3), Some(4)]
        );
    }

    #[test]
    fn missing_column_is_reported() {
        let df = df! { "a" => [1i64] }.unwrap();
        let err = integer_column(&df, "Year").unwrap_err();
        assert!(matches!(err, DecodeError::ColumnNotFound { column } if column == "Year"));
    }

    #[test]
    fn distinct_keeps_first_appearance_order() {
        assert_eq!(
            distinct([Some(3), None, Some(1), Some(3), Some(2), Some(1)]),
            vec![3, 1, 2]
        );
    }
}
