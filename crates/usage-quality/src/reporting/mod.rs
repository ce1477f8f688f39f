//! Report generation module.
//!
//! Turns a finished [`PipelineResult`](crate::pipeline::PipelineResult) into
//! files on disk: the cleaned CSV and a JSON [`RunReport`] combining the
//! cleaning report with the descriptive summary.
//!
//! # Example
//!
//! ```rust,ignore
//! use usage_quality::reporting::ReportGenerator;
//!
//! let report = ReportGenerator::build_report("data/usage.csv", Some("outputs/usage_clean.csv"), &result)?;
//! println!("{}", serde_json::to_string_pretty(&report)?);
//!
//! let generator = ReportGenerator::new("outputs");
//! generator.write_report_to_file(&report, "usage")?;
//! ```

mod generator;

pub use generator::{ReportGenerator, RunReport};
