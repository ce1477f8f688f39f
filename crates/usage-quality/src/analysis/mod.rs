//! Descriptive analysis of a cleaned dataset.
//!
//! Everything here reads the pipeline's output only; nothing feeds back into
//! cleaning.

pub mod statistics;
mod summary;

pub use statistics::ColumnStats;
pub use summary::{
    AgeGroupStats, CORRELATION_COLUMNS, CategoryCount, Correlation, CorrelationDirection,
    CorrelationStrength, DatasetSummary, GroupMeans, SUMMARY_COLUMNS, UsageInsights,
};
