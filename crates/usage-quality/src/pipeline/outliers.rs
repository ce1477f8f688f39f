//! Outlier rejection module.
//!
//! Removes rows holding extreme values using IQR fences, one column at a time.
//! Each column's fences are computed on the rows that survived the previous
//! column, so the column order in [`OUTLIER_COLUMNS`] is part of the result.

use crate::dataset::Dataset;
use crate::error::Result;
use crate::schema::OUTLIER_COLUMNS;
use crate::types::{CleaningRule, StageKind, StageReport};
use crate::utils::keep_rows;
use polars::prelude::*;
use serde::Serialize;
use tracing::{debug, warn};

/// Inclusive IQR fences for one column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IqrFence {
    pub q1: f64,
    pub q3: f64,
    pub lower: f64,
    pub upper: f64,
}

impl IqrFence {
    /// Fences `[Q1 - k*IQR, Q3 + k*IQR]` over `values`, ignoring nulls.
    /// Quartiles use linear interpolation.
    ///
    /// Returns `None` when there are no non-null values.
    pub fn compute(values: &Float64Chunked, multiplier: f64) -> PolarsResult<Option<Self>> {
        let q1 = values.quantile(0.25, QuantileMethod::Linear)?;
        let q3 = values.quantile(0.75, QuantileMethod::Linear)?;
        let (Some(q1), Some(q3)) = (q1, q3) else {
            return Ok(None);
        };
        let iqr = q3 - q1;
        Ok(Some(Self {
            q1,
            q3,
            lower: q1 - multiplier * iqr,
            upper: q3 + multiplier * iqr,
        }))
    }

    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

/// Per-column IQR outlier rejection. `Age` is never screened.
#[derive(Debug, Clone)]
pub struct OutlierFilter {
    multiplier: f64,
}

impl Default for OutlierFilter {
    fn default() -> Self {
        Self { multiplier: 3.0 }
    }
}

impl OutlierFilter {
    pub fn new(multiplier: f64) -> Self {
        Self { multiplier }
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Remove rows outside the fences of each screened column in turn.
    /// Null values are kept.
    pub fn filter(&self, dataset: &Dataset) -> Result<(Dataset, StageReport)> {
        let mut frame = dataset.frame().clone();
        let mut report = StageReport::new(StageKind::OutlierFilter, frame.height());

        for column in OUTLIER_COLUMNS {
            if frame.height() == 0 {
                break;
            }

            let series = frame
                .column(column)?
                .as_materialized_series()
                .cast(&DataType::Float64)?;
            let values = series.f64()?;
            let Some(fence) = IqrFence::compute(values, self.multiplier)? else {
                continue;
            };

            let mask: Vec<bool> = values
                .into_iter()
                .map(|v| v.is_none_or(|x| fence.contains(x)))
                .collect();
            let removed = mask.iter().filter(|&&keep| !keep).count();

            debug!(
                "Outliers in '{}': Q1={:.3}, Q3={:.3}, fences=[{:.3}, {:.3}], removed {}",
                column, fence.q1, fence.q3, fence.lower, fence.upper, removed
            );

            if removed > 0 {
                report.record(
                    CleaningRule::ExtremeOutlier,
                    Some(column),
                    removed,
                    format!(
                        "Outside IQR fences [{:.3}, {:.3}] (k = {})",
                        fence.lower, fence.upper, self.multiplier
                    ),
                );
                frame = keep_rows(&frame, &mask)?;
            }
        }

        if report.rows_in > 0 && frame.height() == 0 {
            warn!("Outlier filtering removed every row");
        }

        let rows_out = frame.height();
        Ok((Dataset::from_checked(frame), report.finish(rows_out, 0)))
    }
}
