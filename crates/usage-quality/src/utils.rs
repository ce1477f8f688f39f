//! Shared utilities for the cleaning stages.
//!
//! Helpers for dtype checks, text parsing and title-casing, plus the
//! column-level frame plumbing every stage needs.

use polars::prelude::*;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType holds text.
#[inline]
pub fn is_text_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::String | DataType::Categorical(_, _))
}

// =============================================================================
// String Utilities
// =============================================================================

/// Parse a trimmed string as a finite number.
///
/// Blank text, unparseable text and non-finite results (`NaN`, `inf`) all
/// yield `None`.
///
/// # Example
///
/// ```rust,ignore
/// use usage_quality::utils::parse_numeric_string;
///
/// assert_eq!(parse_numeric_string(" 4.5 "), Some(4.5));
/// assert_eq!(parse_numeric_string("NaN"), None);
/// ```
pub fn parse_numeric_string(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Title-case a string.
///
/// The first letter after any non-letter is upper-cased and every other
/// letter lower-cased, so `"new york"` becomes `"New York"` and `"o'neil"`
/// becomes `"O'Neil"`.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_is_letter = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(c);
            prev_is_letter = false;
        }
    }
    out
}

/// Trim, title-case, and map blank text to `None`.
pub fn canonical_text(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(title_case(trimmed))
    }
}

// =============================================================================
// Frame Utilities
// =============================================================================

/// Read a column as `Option<f64>` values, casting if needed.
pub fn float_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<f64>>> {
    let series = df
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    Ok(series.f64()?.into_iter().collect())
}

/// Read a column as `Option<String>` values, casting if needed.
pub fn string_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<String>>> {
    let series = df
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::String)?;
    Ok(series
        .str()?
        .into_iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect())
}

/// Replace a column's values with new float values of the same length.
pub fn replace_float_column(
    df: &mut DataFrame,
    name: &str,
    values: Vec<Option<f64>>,
) -> PolarsResult<()> {
    df.replace(name, Series::new(name.into(), values))?;
    Ok(())
}

/// Keep only the rows whose mask entry is `true`.
pub fn keep_rows(df: &DataFrame, mask: &[bool]) -> PolarsResult<DataFrame> {
    if mask.iter().all(|&keep| keep) {
        return Ok(df.clone());
    }
    df.filter(&BooleanChunked::from_slice("mask".into(), mask))
}

/// Null count of a column, or zero if it is absent.
pub fn null_count(df: &DataFrame, name: &str) -> usize {
    df.column(name).map(|c| c.null_count()).unwrap_or(0)
}

// =============================================================================
// Tests
// =============================================================================
