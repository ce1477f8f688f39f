//! Smartphone Usage Data Quality Library
//!
//! Cleans tabular smartphone-usage records (age, gender, app usage hours,
//! screen time, app counts, location) into a dataset whose rows satisfy a
//! fixed set of validity and consistency invariants, and keeps an audit trail
//! of every row it dropped or repaired.
//!
//! # Overview
//!
//! A run is a fixed sequence of stages, each a function from a [`Dataset`] to
//! a new `Dataset` plus a [`StageReport`]:
//!
//! - **Normalize**: numeric coercion (unparseable values become null),
//!   gender synonyms, location title-casing
//! - **Validate**: missing values, age and app-count ranges, negative hours,
//!   the 24 hour screen time cap, duplicate rows
//! - **Outlier filter**: IQR fences per usage column, applied in order
//! - **Reconcile**: total usage re-derived from its parts, screen time raised
//!   to at least the total
//! - **Deduplicate**: a final sweep for rows made identical by earlier repairs
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use usage_quality::{Dataset, Pipeline, PipelineConfig};
//!
//! let raw = Dataset::from_csv("smartphone_usage.csv")?;
//!
//! let config = PipelineConfig::builder()
//!     .iqr_multiplier(3.0)
//!     .unmapped_gender(UnmappedGenderPolicy::Unknown)
//!     .build()?;
//!
//! let result = Pipeline::builder().config(config).build()?.run(&raw)?;
//!
//! println!("{} -> {} rows", result.report.rows_in(), result.report.rows_out());
//! for (rule, count) in result.report.dropped_by_rule() {
//!     println!("  dropped {count:>5}  {rule}");
//! }
//! ```
//!
//! # Analysis
//!
//! [`analysis::DatasetSummary`] describes a cleaned dataset (distributions,
//! age groups, correlations) and [`reporting::ReportGenerator`] writes it,
//! together with the cleaning report, to disk.

pub mod analysis;
pub mod cleaner;
pub mod config;
pub mod dataset;
pub mod error;
pub mod pipeline;
pub mod reporting;
pub mod schema;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use analysis::DatasetSummary;
pub use cleaner::{FieldNormalizer, RecordValidator};
pub use config::{
    ConfigValidationError, PipelineConfig, PipelineConfigBuilder, UnmappedGenderPolicy,
};
pub use dataset::Dataset;
pub use error::{CleaningError, Result as CleaningResult, ResultExt};
pub use pipeline::{
    CleaningStage, ClosureProgressReporter, ConsistencyReconciler, OutlierFilter, Pipeline,
    PipelineBuilder, PipelineResult, ProgressReporter, ProgressUpdate,
};
pub use reporting::{ReportGenerator, RunReport};
pub use schema::Schema;
pub use types::{ActionKind, CleaningReport, CleaningRule, RuleEntry, StageKind, StageReport};
