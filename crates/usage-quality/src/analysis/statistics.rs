//! Descriptive statistics over polars columns.

use polars::lazy::dsl::pearson_corr;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

const PAIRS: &str = "pairs";
const COEFFICIENT: &str = "r";

/// Pearson correlation of two numeric columns over rows where both are present.
///
/// Returns `None` with fewer than two complete pairs or when either side is constant.
pub fn pearson(frame: &DataFrame, left: &str, right: &str) -> PolarsResult<Option<f64>> {
    let out = frame
        .clone()
        .lazy()
        .select([
            col(left).cast(DataType::Float64),
            col(right).cast(DataType::Float64),
        ])
        .filter(col(left).is_not_null().and(col(right).is_not_null()))
        .select([
            len().alias(PAIRS),
            pearson_corr(col(left), col(right)).alias(COEFFICIENT),
        ])
        .collect()?;

    let pairs = out
        .column(PAIRS)?
        .as_materialized_series()
        .cast(&DataType::UInt64)?
        .u64()?
        .get(0)
        .unwrap_or(0);
    let coefficient = out
        .column(COEFFICIENT)?
        .as_materialized_series()
        .cast(&DataType::Float64)?
        .f64()?
        .get(0);

    Ok(coefficient
        .filter(|r| pairs >= 2 && r.is_finite())
        .map(|r| r.clamp(-1.0, 1.0)))
}

/// Count, moments and five-number summary of one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub column: String,
    pub count: usize,
    pub mean: Option<f64>,
    /// Sample standard deviation (ddof = 1).
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q1: Option<f64>,
    pub median: Option<f64>,
    pub q3: Option<f64>,
    pub max: Option<f64>,
}

impl ColumnStats {
    /// Summarize a column, ignoring nulls. Quantiles use linear interpolation.
    pub fn from_column(column: &Column) -> PolarsResult<Self> {
        let series = column.as_materialized_series().cast(&DataType::Float64)?;
        let values = series.f64()?;

        Ok(Self {
            column: column.name().to_string(),
            count: values.len() - values.null_count(),
            mean: values.mean(),
            std: values.std(1),
            min: values.min(),
            q1: values.quantile(0.25, QuantileMethod::Linear)?,
            median: values.median(),
            q3: values.quantile(0.75, QuantileMethod::Linear)?,
            max: values.max(),
        })
    }
}
