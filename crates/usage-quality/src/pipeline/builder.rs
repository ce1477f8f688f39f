//! Main cleaning pipeline module.
//!
//! This module provides the core `Pipeline` struct and its builder. A
//! pipeline composes the stages in their fixed order:
//! normalize, validate, outlier filter, reconcile, deduplicate.

use crate::cleaner::{FieldNormalizer, RecordValidator, deduplicate};
use crate::config::PipelineConfig;
use crate::dataset::Dataset;
use crate::error::Result;
use crate::pipeline::outliers::OutlierFilter;
use crate::pipeline::progress::{
    CleaningStage, ClosureProgressReporter, ProgressReporter, ProgressUpdate,
};
use crate::pipeline::reconciler::ConsistencyReconciler;
use crate::schema::Schema;
use crate::types::{CleaningReport, CleaningRule, StageKind, StageReport};
use crate::utils::null_count;
use polars::prelude::DataFrame;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// The cleaned dataset and the audit trail of how it was produced.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub dataset: Dataset,
    pub report: CleaningReport,
    /// Wall-clock time of the run in milliseconds.
    pub duration_ms: u64,
}

/// The main cleaning pipeline.
///
/// Use [`Pipeline::builder()`] to create a new pipeline with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// use usage_quality::{Dataset, Pipeline, PipelineConfig};
///
/// let raw = Dataset::from_csv("smartphone_usage.csv")?;
/// let result = Pipeline::builder()
///     .config(PipelineConfig::builder().iqr_multiplier(3.0).build()?)
///     .on_progress(|update| {
///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
///     })
///     .build()?
///     .run(&raw)?;
///
/// println!("{} rows kept", result.dataset.height());
/// ```
pub struct Pipeline {
    config: PipelineConfig,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    normalizer: FieldNormalizer,
    validator: RecordValidator,
    outlier_filter: OutlierFilter,
    reconciler: ConsistencyReconciler,
}

// Pipeline may be moved to a worker thread by a host application
static_assertions::assert_impl_all!(Pipeline: Send);

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Check a raw frame against the schema and clean it.
    ///
    /// # Errors
    ///
    /// Returns `CleaningError::MissingColumn` if a required column is absent.
    pub fn process(&self, df: DataFrame) -> Result<PipelineResult> {
        self.finish(Dataset::new(df).and_then(|raw| self.run_stages(&raw)))
    }

    /// Clean a dataset. The input is left untouched.
    pub fn run(&self, raw: &Dataset) -> Result<PipelineResult> {
        self.finish(self.run_stages(raw))
    }

    fn finish(&self, outcome: Result<PipelineResult>) -> Result<PipelineResult> {
        match outcome {
            Ok(result) => {
                self.report_progress(ProgressUpdate::complete(format!(
                    "Cleaning complete: {} of {} rows kept",
                    result.report.rows_out(),
                    result.report.rows_in()
                )));
                Ok(result)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Pipeline error: {}", e);
                Err(e)
            }
        }
    }

    /// Report progress if a reporter is configured.
    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn stage_started(&self, stage: CleaningStage, rows: usize) {
        info!("{} ({} rows)...", stage.display_name(), rows);
        self.report_progress(ProgressUpdate::new(
            stage,
            0.0,
            format!("{}...", stage.display_name()),
        ));
    }

    fn stage_finished(&self, stage: CleaningStage, report: &StageReport) {
        self.report_progress(ProgressUpdate::new(
            stage,
            1.0,
            format!(
                "{}: {} -> {} rows, {} repaired",
                stage.display_name(),
                report.rows_in,
                report.rows_out,
                report.rows_repaired
            ),
        ));
    }

    fn run_stages(&self, raw: &Dataset) -> Result<PipelineResult> {
        let start_time = Instant::now();
        let mut stages = Vec::with_capacity(5);

        self.stage_started(CleaningStage::Normalizing, raw.height());
        let (normalized, report) = self.normalize(raw)?;
        self.stage_finished(CleaningStage::Normalizing, &report);
        stages.push(report);

        self.stage_started(CleaningStage::Validating, normalized.height());
        let (validated, report) = self.validator.validate(&normalized)?;
        self.stage_finished(CleaningStage::Validating, &report);
        stages.push(report);

        self.stage_started(CleaningStage::OutlierFiltering, validated.height());
        let (filtered, report) = self.outlier_filter.filter(&validated)?;
        self.stage_finished(CleaningStage::OutlierFiltering, &report);
        stages.push(report);

        self.stage_started(CleaningStage::Reconciling, filtered.height());
        let (reconciled, report) = self.reconciler.reconcile(&filtered)?;
        self.stage_finished(CleaningStage::Reconciling, &report);
        stages.push(report);

        let clean = if self.config.remove_duplicates {
            self.stage_started(CleaningStage::Deduplicating, reconciled.height());
            let (deduped, report) = deduplicate(&reconciled)?;
            self.stage_finished(CleaningStage::Deduplicating, &report);
            stages.push(report);
            deduped
        } else {
            reconciled
        };

        let report = CleaningReport::from_stages(stages);
        let duration_ms = start_time.elapsed().as_millis() as u64;
        info!(
            "Cleaning finished in {}ms: {} -> {} rows ({} dropped, {} repaired)",
            duration_ms,
            report.rows_in(),
            report.rows_out(),
            report.total_dropped(),
            report.total_repaired()
        );

        Ok(PipelineResult {
            dataset: clean,
            report,
            duration_ms,
        })
    }

    /// Normalize and log every newly nulled value as a coercion failure.
    fn normalize(&self, raw: &Dataset) -> Result<(Dataset, StageReport)> {
        let normalized = self.normalizer.normalize(raw)?;
        let mut report = StageReport::new(StageKind::Normalize, raw.height());
        for name in Schema::usage().column_names() {
            let delta = null_count(normalized.frame(), name)
                .saturating_sub(null_count(raw.frame(), name));
            report.record(
                CleaningRule::CoercionFailure,
                Some(name),
                delta,
                "Value could not be coerced and was set to null",
            );
        }
        let rows_out = normalized.height();
        Ok((normalized, report.finish(rows_out, 0)))
    }
}

/// Builder for [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<PipelineConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

impl PipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a progress reporter.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Pipeline, crate::config::ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(Pipeline {
            normalizer: FieldNormalizer::new(&config.gender_synonyms),
            validator: RecordValidator::from_config(&config),
            outlier_filter: OutlierFilter::new(config.iqr_multiplier),
            reconciler: ConsistencyReconciler::from_config(&config),
            progress_reporter: self.progress_reporter,
            config,
        })
    }
}
