//! The [`Dataset`] carrier: a polars `DataFrame` whose required columns have
//! been checked against the usage schema.

use crate::error::{Result, ResultExt};
use crate::schema::Schema;
use crate::utils;
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One row per record. Raw and clean datasets are distinct values; stages
/// never mutate the dataset they are given.
#[derive(Debug, Clone)]
pub struct Dataset {
    frame: DataFrame,
}

impl Dataset {
    /// Wrap a frame, failing with `MissingColumn` if a required column is absent.
    pub fn new(frame: DataFrame) -> Result<Self> {
        Schema::usage().check_columns(&frame)?;
        Ok(Self { frame })
    }

    /// Wrap a frame derived from an already checked dataset.
    pub(crate) fn from_checked(frame: DataFrame) -> Self {
        Self { frame }
    }

    /// Load and check a CSV file.
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let frame = read_csv_with_fallbacks(path)
            .context(format!("Loading {}", path.display()))?;
        Self::new(frame)
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn into_frame(self) -> DataFrame {
        self.frame
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn width(&self) -> usize {
        self.frame.width()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    pub fn column_names(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect()
    }

    /// Values of a column as floats, casting if needed.
    pub fn float_column(&self, name: &str) -> Result<Vec<Option<f64>>> {
        Ok(utils::float_values(&self.frame, name)?)
    }

    /// Values of a column as strings, casting if needed.
    pub fn string_column(&self, name: &str) -> Result<Vec<Option<String>>> {
        Ok(utils::string_values(&self.frame, name)?)
    }

    /// Cell-by-cell equality, treating nulls in the same position as equal.
    pub fn same_data(&self, other: &Dataset) -> bool {
        self.frame.equals_missing(&other.frame)
    }
}

impl From<Dataset> for DataFrame {
    fn from(dataset: Dataset) -> Self {
        dataset.frame
    }
}

/// Read a CSV file, retrying with progressively looser options.
///
/// The last strategy reads every column as text, which the normalizer then
/// coerces, so a stray word deep in a numeric column does not abort the load.
pub fn read_csv_with_fallbacks(path: &Path) -> Result<DataFrame> {
    // Strategy 1: inferred schema with quote handling
    match CsvReadOptions::default()
        .with_infer_schema_length(Some(100))
        .with_has_header(true)
        .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
        .finish()
    {
        Ok(df) => return Ok(df),
        Err(e) => debug!("Standard loading failed: {}", e),
    }

    // Strategy 2: full-file schema inference
    match CsvReadOptions::default()
        .with_infer_schema_length(None)
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
        .finish()
    {
        Ok(df) => return Ok(df),
        Err(e) => debug!("Full inference loading failed: {}", e),
    }

    // Strategy 3: everything as text
    Ok(CsvReadOptions::default()
        .with_infer_schema_length(Some(0))
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
        .finish()?)
}
