//! Full-row duplicate detection.

use crate::dataset::Dataset;
use crate::error::Result;
use crate::types::{CleaningRule, StageKind, StageReport};
use polars::prelude::*;
use tracing::debug;

const ROW_INDEX: &str = "__row_index";

/// Keep the first occurrence of every distinct row, in original order.
///
/// Rows are compared across all columns, extra columns included. Also returns
/// the original positions of the kept rows.
pub fn unique_rows(df: &DataFrame) -> PolarsResult<(DataFrame, Vec<usize>)> {
    if df.height() == 0 {
        return Ok((df.clone(), Vec::new()));
    }

    let columns: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let unique = df
        .with_row_index(ROW_INDEX.into(), None)?
        .unique_stable(Some(&columns), UniqueKeepStrategy::First, None)?;

    let kept = unique
        .column(ROW_INDEX)?
        .as_materialized_series()
        .cast(&DataType::UInt64)?
        .u64()?
        .into_no_null_iter()
        .map(|i| i as usize)
        .collect();

    Ok((unique.drop(ROW_INDEX)?, kept))
}

/// Remove fully duplicated rows, keeping the first occurrence.
pub fn deduplicate(dataset: &Dataset) -> Result<(Dataset, StageReport)> {
    let frame = dataset.frame();
    let mut report = StageReport::new(StageKind::Deduplicate, frame.height());

    let unique = frame.unique_stable(None, UniqueKeepStrategy::First, None)?;
    let duplicates = frame.height() - unique.height();
    report.record(
        CleaningRule::DuplicateRow,
        None,
        duplicates,
        "Identical to an earlier row across all columns",
    );
    debug!("Found {} duplicate rows", duplicates);

    let rows_out = unique.height();
    Ok((Dataset::from_checked(unique), report.finish(rows_out, 0)))
}
