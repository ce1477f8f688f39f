//! Pipeline orchestration module.

mod builder;
pub mod outliers;
pub mod progress;
pub mod reconciler;

pub use builder::{Pipeline, PipelineBuilder, PipelineResult};
pub use outliers::{IqrFence, OutlierFilter};
pub use progress::{CleaningStage, ClosureProgressReporter, ProgressReporter, ProgressUpdate};
pub use reconciler::ConsistencyReconciler;
