//! Fixed column contract for smartphone usage datasets.
//!
//! The schema is process-wide and read-only. Stages refer to columns through
//! the constants below rather than string literals.

use crate::error::{CleaningError, Result};
use once_cell::sync::Lazy;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

pub const USER_ID: &str = "User_ID";
pub const AGE: &str = "Age";
pub const GENDER: &str = "Gender";
pub const TOTAL_APP_USAGE: &str = "Total_App_Usage_Hours";
pub const DAILY_SCREEN_TIME: &str = "Daily_Screen_Time_Hours";
pub const NUMBER_OF_APPS: &str = "Number_of_Apps_Used";
pub const SOCIAL_MEDIA: &str = "Social_Media_Usage_Hours";
pub const PRODUCTIVITY: &str = "Productivity_App_Usage_Hours";
pub const GAMING: &str = "Gaming_App_Usage_Hours";
pub const LOCATION: &str = "Location";

/// Every hours-valued column. All must be finite and non-negative.
pub const USAGE_HOURS_COLUMNS: [&str; 5] = [
    TOTAL_APP_USAGE,
    DAILY_SCREEN_TIME,
    SOCIAL_MEDIA,
    PRODUCTIVITY,
    GAMING,
];

/// Columns screened for outliers, in the order the filter visits them.
/// `Age` is absent on purpose: it is range-checked only.
pub const OUTLIER_COLUMNS: [&str; 6] = [
    TOTAL_APP_USAGE,
    DAILY_SCREEN_TIME,
    NUMBER_OF_APPS,
    SOCIAL_MEDIA,
    PRODUCTIVITY,
    GAMING,
];

/// The parts whose sum defines `Total_App_Usage_Hours`.
pub const USAGE_PART_COLUMNS: [&str; 3] = [SOCIAL_MEDIA, PRODUCTIVITY, GAMING];

/// Semantic type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Integer,
    Float,
    Category,
    Text,
}

impl ColumnKind {
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnKind::Integer | ColumnKind::Float)
    }
}

/// Declaration of a single required column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub kind: ColumnKind,
    /// Inclusive bounds; `None` on either side means unbounded.
    pub range: Option<(Option<f64>, Option<f64>)>,
}

impl ColumnSpec {
    const fn new(name: &'static str, kind: ColumnKind) -> Self {
        Self {
            name,
            kind,
            range: None,
        }
    }

    const fn bounded(name: &'static str, kind: ColumnKind, min: f64, max: Option<f64>) -> Self {
        Self {
            name,
            kind,
            range: Some((Some(min), max)),
        }
    }
}

/// Ordered set of required columns.
#[derive(Debug)]
pub struct Schema {
    columns: Vec<ColumnSpec>,
}

static USAGE_SCHEMA: Lazy<Schema> = Lazy::new(|| Schema {
    columns: vec![
        ColumnSpec::bounded(AGE, ColumnKind::Integer, 10.0, Some(120.0)),
        ColumnSpec::new(GENDER, ColumnKind::Category),
        ColumnSpec::bounded(TOTAL_APP_USAGE, ColumnKind::Float, 0.0, None),
        ColumnSpec::bounded(DAILY_SCREEN_TIME, ColumnKind::Float, 0.0, Some(24.0)),
        ColumnSpec::bounded(NUMBER_OF_APPS, ColumnKind::Integer, 0.0, Some(200.0)),
        ColumnSpec::bounded(SOCIAL_MEDIA, ColumnKind::Float, 0.0, None),
        ColumnSpec::bounded(PRODUCTIVITY, ColumnKind::Float, 0.0, None),
        ColumnSpec::bounded(GAMING, ColumnKind::Float, 0.0, None),
        ColumnSpec::new(LOCATION, ColumnKind::Text),
    ],
});

impl Schema {
    /// The smartphone usage schema.
    pub fn usage() -> &'static Schema {
        &USAGE_SCHEMA
    }

    /// Required columns in declaration order.
    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|c| c.name)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Whether `name` is a required column with a numeric kind.
    pub fn is_numeric(&self, name: &str) -> bool {
        self.column(name).is_some_and(|c| c.kind.is_numeric())
    }

    pub fn usage_hours_columns(&self) -> &'static [&'static str] {
        &USAGE_HOURS_COLUMNS
    }

    pub fn outlier_columns(&self) -> &'static [&'static str] {
        &OUTLIER_COLUMNS
    }

    /// Fail with `MissingColumn` for the first required column absent from `df`.
    pub fn check_columns(&self, df: &DataFrame) -> Result<()> {
        let present = df.get_column_names();
        for spec in &self.columns {
            if !present.iter().any(|name| name.as_str() == spec.name) {
                return Err(CleaningError::MissingColumn(spec.name.to_string()));
            }
        }
        Ok(())
    }
}
