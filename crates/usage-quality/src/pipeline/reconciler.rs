//! Cross-field consistency repair.
//!
//! The usage parts (social, productivity, gaming) are treated as ground
//! truth: the total is always re-derived from them, and daily screen time is
//! raised to at least that total.

use crate::config::PipelineConfig;
use crate::dataset::Dataset;
use crate::error::Result;
use crate::schema::{DAILY_SCREEN_TIME, GAMING, PRODUCTIVITY, SOCIAL_MEDIA, TOTAL_APP_USAGE};
use crate::types::{CleaningRule, StageKind, StageReport};
use crate::utils::{float_values, keep_rows, replace_float_column};
use tracing::{debug, warn};

/// Enforces `total == social + productivity + gaming` and `daily >= total`.
#[derive(Debug, Clone)]
pub struct ConsistencyReconciler {
    epsilon: f64,
    max_daily_hours: f64,
}

impl Default for ConsistencyReconciler {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl ConsistencyReconciler {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            epsilon: config.consistency_epsilon,
            max_daily_hours: config.max_daily_hours,
        }
    }

    /// Sum of the usage parts, in a fixed order so the result is reproducible.
    #[inline]
    pub fn parts_sum(social: f64, productivity: f64, gaming: f64) -> f64 {
        (social + productivity) + gaming
    }

    /// Repair totals and screen time in place.
    ///
    /// Rows whose parts add up to more than `max_daily_hours` cannot be
    /// repaired and are dropped here with `usage_exceeds_day`.
    pub fn reconcile(&self, dataset: &Dataset) -> Result<(Dataset, StageReport)> {
        let frame = dataset.frame();
        let height = frame.height();
        let mut report = StageReport::new(StageKind::Reconcile, height);

        let social = float_values(frame, SOCIAL_MEDIA)?;
        let productivity = float_values(frame, PRODUCTIVITY)?;
        let gaming = float_values(frame, GAMING)?;
        let mut total = float_values(frame, TOTAL_APP_USAGE)?;
        let mut daily = float_values(frame, DAILY_SCREEN_TIME)?;

        let mut keep = vec![true; height];
        let mut totals_fixed = 0;
        let mut daily_raised = 0;
        let mut over_day = 0;
        let mut rows_repaired = 0;

        for i in 0..height {
            let (Some(s), Some(p), Some(g)) = (social[i], productivity[i], gaming[i]) else {
                continue;
            };
            let sum = Self::parts_sum(s, p, g);

            if sum > self.max_daily_hours {
                keep[i] = false;
                over_day += 1;
                continue;
            }

            let mut repaired = false;
            if total[i].is_none_or(|t| (t - sum).abs() > self.epsilon) {
                totals_fixed += 1;
                repaired = true;
            }
            total[i] = Some(sum);

            if daily[i].is_none_or(|d| d < sum) {
                daily[i] = Some(sum);
                daily_raised += 1;
                repaired = true;
            }

            if repaired {
                rows_repaired += 1;
            }
        }

        report.record(
            CleaningRule::UsageExceedsDay,
            None,
            over_day,
            format!("Summed app usage exceeds {} hours", self.max_daily_hours),
        );
        report.record(
            CleaningRule::TotalRecomputed,
            Some(TOTAL_APP_USAGE),
            totals_fixed,
            "Total app usage set to the sum of social, productivity and gaming",
        );
        report.record(
            CleaningRule::ScreenTimeRaised,
            Some(DAILY_SCREEN_TIME),
            daily_raised,
            "Daily screen time raised to total app usage",
        );
        debug!(
            "Reconcile: {} totals recomputed, {} screen times raised, {} rows over a day",
            totals_fixed, daily_raised, over_day
        );

        let mut out = frame.clone();
        replace_float_column(&mut out, TOTAL_APP_USAGE, total)?;
        replace_float_column(&mut out, DAILY_SCREEN_TIME, daily)?;
        let out = keep_rows(&out, &keep)?;

        if height > 0 && out.height() == 0 {
            warn!("Reconciliation removed every row");
        }

        let rows_out = out.height();
        Ok((Dataset::from_checked(out), report.finish(rows_out, rows_repaired)))
    }
}
