//! Configuration types for the cleaning pipeline.
//!
//! Every threshold the engine applies lives here, with defaults matching the
//! usage dataset contract. Use [`PipelineConfig::builder()`] for a validated
//! configuration, or [`PipelineConfig::from_json_file`] to load one from disk.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// What the validator does with a `Gender` value that is neither "Male" nor
/// "Female" after synonym mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnmappedGenderPolicy {
    /// Drop the row (rule `gender_unrecognized`)
    #[default]
    Drop,
    /// Replace the value with "Unknown" and keep the row (rule `gender_bucketed`)
    Unknown,
    /// Keep the value as normalized
    Keep,
}

/// Configuration for the cleaning pipeline.
///
/// # Example
///
/// ```rust,ignore
/// use usage_quality::config::{PipelineConfig, UnmappedGenderPolicy};
///
/// let config = PipelineConfig::builder()
///     .iqr_multiplier(1.5)
///     .unmapped_gender(UnmappedGenderPolicy::Unknown)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Inclusive valid range for `Age`. Rows outside are dropped.
    /// Default: (10, 120)
    pub age_range: (f64, f64),

    /// Inclusive valid range for `Number_of_Apps_Used`. Rows outside are dropped.
    /// Default: (0, 200)
    pub apps_range: (f64, f64),

    /// Hours in a day. Daily screen time above this is clamped, and rows whose
    /// summed app usage exceeds it are dropped during reconciliation.
    /// Default: 24.0
    pub max_daily_hours: f64,

    /// Multiplier k for the IQR fences `[Q1 - k*IQR, Q3 + k*IQR]`.
    /// Default: 3.0
    pub iqr_multiplier: f64,

    /// Tolerance below which a total/parts mismatch is not counted as a repair.
    /// The total is always overwritten with the parts sum.
    /// Default: 0.0 (exact)
    pub consistency_epsilon: f64,

    /// Whether to remove fully duplicated rows.
    /// Default: true
    pub remove_duplicates: bool,

    /// Handling of gender values the synonym table does not resolve.
    /// Default: Drop
    pub unmapped_gender: UnmappedGenderPolicy,

    /// Extra gender synonyms, keyed by the title-cased raw value.
    /// Default: empty
    pub gender_synonyms: BTreeMap<String, String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            age_range: (10.0, 120.0),
            apps_range: (0.0, 200.0),
            max_daily_hours: 24.0,
            iqr_multiplier: 3.0,
            consistency_epsilon: 0.0,
            remove_duplicates: true,
            unmapped_gender: UnmappedGenderPolicy::default(),
            gender_synonyms: BTreeMap::new(),
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: PipelineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        check_range("age_range", self.age_range)?;
        check_range("apps_range", self.apps_range)?;

        if !self.max_daily_hours.is_finite() || self.max_daily_hours <= 0.0 {
            return Err(ConfigValidationError::InvalidDailyCap(self.max_daily_hours));
        }

        if !self.iqr_multiplier.is_finite() || self.iqr_multiplier <= 0.0 {
            return Err(ConfigValidationError::InvalidMultiplier(self.iqr_multiplier));
        }

        if !self.consistency_epsilon.is_finite() || self.consistency_epsilon < 0.0 {
            return Err(ConfigValidationError::InvalidEpsilon(
                self.consistency_epsilon,
            ));
        }

        Ok(())
    }
}

fn check_range(field: &str, (min, max): (f64, f64)) -> Result<(), ConfigValidationError> {
    if !min.is_finite() || !max.is_finite() || min > max {
        return Err(ConfigValidationError::InvalidRange {
            field: field.to_string(),
            min,
            max,
        });
    }
    Ok(())
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid range for '{field}': [{min}, {max}] (bounds must be finite and ordered)")]
    InvalidRange { field: String, min: f64, max: f64 },

    #[error("Invalid daily hours cap: {0} (must be positive)")]
    InvalidDailyCap(f64),

    #[error("Invalid IQR multiplier: {0} (must be positive and finite)")]
    InvalidMultiplier(f64),

    #[error("Invalid consistency epsilon: {0} (must be non-negative)")]
    InvalidEpsilon(f64),
}

/// Builder for [`PipelineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    age_range: Option<(f64, f64)>,
    apps_range: Option<(f64, f64)>,
    max_daily_hours: Option<f64>,
    iqr_multiplier: Option<f64>,
    consistency_epsilon: Option<f64>,
    remove_duplicates: Option<bool>,
    unmapped_gender: Option<UnmappedGenderPolicy>,
    gender_synonyms: BTreeMap<String, String>,
}

impl PipelineConfigBuilder {
    /// Set the inclusive valid age range.
    pub fn age_range(mut self, min: f64, max: f64) -> Self {
        self.age_range = Some((min, max));
        self
    }

    /// Set the inclusive valid range for the number of apps used.
    pub fn apps_range(mut self, min: f64, max: f64) -> Self {
        self.apps_range = Some((min, max));
        self
    }

    /// Set the daily hours cap.
    pub fn max_daily_hours(mut self, hours: f64) -> Self {
        self.max_daily_hours = Some(hours);
        self
    }

    /// Set the IQR fence multiplier.
    ///
    /// # Arguments
    /// * `k` - Positive multiplier (1.5 is the textbook "mild" fence, 3.0 "extreme")
    pub fn iqr_multiplier(mut self, k: f64) -> Self {
        self.iqr_multiplier = Some(k);
        self
    }

    /// Set the tolerance for counting total/parts mismatches as repairs.
    pub fn consistency_epsilon(mut self, epsilon: f64) -> Self {
        self.consistency_epsilon = Some(epsilon);
        self
    }

    /// Enable or disable duplicate row removal.
    pub fn remove_duplicates(mut self, remove: bool) -> Self {
        self.remove_duplicates = Some(remove);
        self
    }

    /// Set the policy for unrecognized gender values.
    pub fn unmapped_gender(mut self, policy: UnmappedGenderPolicy) -> Self {
        self.unmapped_gender = Some(policy);
        self
    }

    /// Add an extra gender synonym on top of the built-in table.
    pub fn gender_synonym(mut self, raw: impl Into<String>, canonical: impl Into<String>) -> Self {
        self.gender_synonyms.insert(raw.into(), canonical.into());
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `PipelineConfig` or an error if validation fails.
    pub fn build(self) -> Result<PipelineConfig, ConfigValidationError> {
        let defaults = PipelineConfig::default();
        let config = PipelineConfig {
            age_range: self.age_range.unwrap_or(defaults.age_range),
            apps_range: self.apps_range.unwrap_or(defaults.apps_range),
            max_daily_hours: self.max_daily_hours.unwrap_or(defaults.max_daily_hours),
            iqr_multiplier: self.iqr_multiplier.unwrap_or(defaults.iqr_multiplier),
            consistency_epsilon: self
                .consistency_epsilon
                .unwrap_or(defaults.consistency_epsilon),
            remove_duplicates: self.remove_duplicates.unwrap_or(true),
            unmapped_gender: self.unmapped_gender.unwrap_or_default(),
            gender_synonyms: self.gender_synonyms,
        };

        config.validate()?;
        Ok(config)
    }
}
