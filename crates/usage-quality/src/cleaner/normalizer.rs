//! Per-column type coercion and categorical canonicalization.

use crate::dataset::Dataset;
use crate::error::{CleaningError, Result};
use crate::schema::{GENDER, LOCATION, Schema};
use crate::utils::{canonical_text, is_numeric_dtype, is_text_dtype, parse_numeric_string};
use once_cell::sync::Lazy;
use polars::prelude::*;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Built-in gender synonyms, keyed by the title-cased raw value.
static BASE_GENDER_SYNONYMS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("M", "Male"),
        ("F", "Female"),
        ("Homem", "Male"),
        ("Mulher", "Female"),
        ("Masculino", "Male"),
        ("Feminino", "Female"),
    ])
});

/// Coerces numeric columns to `Float64` and canonicalizes text columns.
///
/// Values that cannot be coerced become null. The normalizer never drops
/// rows and never fills a value in; that is left to the validator.
#[derive(Debug, Clone, Default)]
pub struct FieldNormalizer {
    extra_synonyms: HashMap<String, String>,
}

impl FieldNormalizer {
    /// Create a normalizer with extra gender synonyms layered over the
    /// built-in table. Keys are title-cased so lookups match normalized text.
    pub fn new(extra_synonyms: &BTreeMap<String, String>) -> Self {
        let extra_synonyms = extra_synonyms
            .iter()
            .filter_map(|(raw, canonical)| {
                Some((canonical_text(raw)?, canonical.trim().to_string()))
            })
            .collect();
        Self { extra_synonyms }
    }

    /// Canonical form of a raw gender value, or `None` if it is blank.
    ///
    /// Unmapped values pass through title-cased.
    pub fn canonical_gender(&self, raw: &str) -> Option<String> {
        let titled = canonical_text(raw)?;
        if let Some(mapped) = self.extra_synonyms.get(&titled) {
            return Some(mapped.clone());
        }
        match BASE_GENDER_SYNONYMS.get(titled.as_str()) {
            Some(mapped) => Some((*mapped).to_string()),
            None => Some(titled),
        }
    }

    /// Produce a new dataset with every schema column coerced.
    ///
    /// Columns outside the schema (such as `User_ID`) are carried unchanged.
    pub fn normalize(&self, dataset: &Dataset) -> Result<Dataset> {
        let mut frame = dataset.frame().clone();

        for spec in Schema::usage().columns() {
            let series = frame.column(spec.name)?.as_materialized_series().clone();
            let normalized = if spec.kind.is_numeric() {
                coerce_numeric(&series)?
            } else if spec.name == GENDER {
                self.map_text(&series, |s| self.canonical_gender(s))?
            } else if spec.name == LOCATION {
                self.map_text(&series, canonical_text)?
            } else {
                series
            };
            debug!(
                "Normalized '{}': {} nulls before, {} after",
                spec.name,
                frame.column(spec.name)?.null_count(),
                normalized.null_count()
            );
            frame.replace(spec.name, normalized)?;
        }

        Ok(Dataset::from_checked(frame))
    }

    fn map_text<F>(&self, series: &Series, f: F) -> Result<Series>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = as_text(series)?;
        let values: Vec<Option<String>> = text.str()?.into_iter().map(|v| v.and_then(&f)).collect();
        Ok(Series::new(series.name().clone(), values))
    }
}

/// Cast any column to a `Float64` series, turning unparseable text and
/// non-finite numbers into nulls.
pub(crate) fn coerce_numeric(series: &Series) -> Result<Series> {
    let values: Vec<Option<f64>> = if is_numeric_dtype(series.dtype()) {
        series
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|v| v.filter(|x| x.is_finite()).map(fold_negative_zero))
            .collect()
    } else {
        as_text(series)?
            .str()?
            .into_iter()
            .map(|v| v.and_then(parse_numeric_string).map(fold_negative_zero))
            .collect()
    };
    Ok(Series::new(series.name().clone(), values))
}

fn as_text(series: &Series) -> Result<Series> {
    if series.dtype() == &DataType::String {
        return Ok(series.clone());
    }
    if is_text_dtype(series.dtype())
        || is_numeric_dtype(series.dtype())
        || matches!(series.dtype(), DataType::Boolean | DataType::Null)
    {
        return Ok(series.cast(&DataType::String)?);
    }
    Err(CleaningError::UnsupportedColumnType {
        column: series.name().to_string(),
        dtype: series.dtype().to_string(),
    })
}

#[inline]
fn fold_negative_zero(v: f64) -> f64 {
    if v == 0.0 { 0.0 } else { v }
}
