use crate::analysis::DatasetSummary;
use crate::dataset::Dataset;
use crate::error::{CleaningError, Result};
use crate::pipeline::PipelineResult;
use crate::types::CleaningReport;
use chrono::Local;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Share of removed rows above which the report carries a warning.
const HIGH_REMOVAL_PERCENTAGE: f64 = 30.0;

/// Everything known about one cleaning run.
///
/// Serialized as-is for `--json` output and for the `<stem>_report.json`
/// file written by [`ReportGenerator::write_report_to_file`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Local timestamp, `%Y-%m-%d %H:%M:%S`
    pub generated_at: String,
    pub input_file: String,
    pub output_file: Option<String>,
    pub rows_before: usize,
    pub rows_after: usize,
    pub rows_removed: usize,
    pub removed_percentage: f64,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    pub cleaning: CleaningReport,
    pub summary: DatasetSummary,
}

/// Writes cleaned datasets and run reports into one output directory.
pub struct ReportGenerator {
    output_dir: PathBuf,
}

impl ReportGenerator {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Assemble a [`RunReport`] from a finished run.
    ///
    /// The descriptive summary is computed here, over the clean dataset only.
    pub fn build_report(
        input_file: &str,
        output_file: Option<&str>,
        result: &PipelineResult,
    ) -> Result<RunReport> {
        let rows_before = result.report.rows_in();
        let rows_after = result.dataset.height();
        let rows_removed = rows_before.saturating_sub(rows_after);
        let removed_percentage = if rows_before == 0 {
            0.0
        } else {
            rows_removed as f64 / rows_before as f64 * 100.0
        };

        let mut warnings = Vec::new();
        if removed_percentage > HIGH_REMOVAL_PERCENTAGE {
            warnings.push(format!(
                "{:.1}% of rows were removed; check the input for systematic problems",
                removed_percentage
            ));
        }
        if rows_before > 0 && rows_after == 0 {
            warnings.push("No rows survived cleaning".to_string());
        }
        for message in &warnings {
            warn!("{}", message);
        }

        Ok(RunReport {
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            input_file: input_file.to_string(),
            output_file: output_file.map(String::from),
            rows_before,
            rows_after,
            rows_removed,
            removed_percentage,
            duration_ms: result.duration_ms,
            warnings,
            cleaning: result.report.clone(),
            summary: DatasetSummary::from_dataset(&result.dataset)?,
        })
    }

    /// Save the clean dataset as `<file_name>.csv` in the output directory.
    pub fn write_clean_csv(&self, dataset: &Dataset, file_name: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;
        let output_path = self.output_dir.join(format!("{}.csv", file_name));
        let mut file = File::create(&output_path)?;

        let mut frame = dataset.frame().clone();
        CsvWriter::new(&mut file)
            .include_header(true)
            .with_separator(b',')
            .with_quote_char(b'"')
            .finish(&mut frame)
            .map_err(|e| {
                CleaningError::OutputFailed(format!("{}: {}", output_path.display(), e))
            })?;

        info!("Dataset saved: {}", output_path.display());
        Ok(output_path)
    }

    /// Write `report` as pretty JSON to `<report_base_name>_report.json`.
    pub fn write_report_to_file(&self, report: &RunReport, report_base_name: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;

        let report_path = self
            .output_dir
            .join(format!("{}_report.json", report_base_name));
        let mut file = File::create(&report_path)?;
        file.write_all(serde_json::to_string_pretty(report)?.as_bytes())?;

        info!("Report saved: {}", report_path.display());
        Ok(report_path)
    }
}
