//! Report types shared by the cleaning stages.
//!
//! Every stage produces a [`StageReport`]; the pipeline collects them into a
//! [`CleaningReport`] that is immutable once the run finishes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The stages of a cleaning run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Normalize,
    Validate,
    OutlierFilter,
    Reconcile,
    Deduplicate,
}

impl StageKind {
    /// Get a human-readable display name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Normalize => "Normalize",
            Self::Validate => "Validate",
            Self::OutlierFilter => "Outlier Filter",
            Self::Reconcile => "Reconcile",
            Self::Deduplicate => "Deduplicate",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// What a rule does to the row it fires on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// The row is removed.
    Dropped,
    /// A field is corrected in place and the row is kept.
    Repaired,
    /// A field could not be coerced and was set to null.
    Nulled,
}

/// Named cleaning rules. Every drop or repair is attributed to exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleaningRule {
    /// Non-numeric or non-finite text in a numeric column.
    CoercionFailure,
    /// A required field is null.
    MissingValue,
    /// Age outside the configured range.
    AgeOutOfRange,
    /// Fractional age rounded to an integer.
    AgeRounded,
    /// Negative hours clamped to zero.
    NegativeHours,
    /// Daily screen time above the cap clamped to the cap.
    ScreenTimeCapped,
    /// App count outside the configured range.
    AppsOutOfRange,
    /// Fractional app count rounded to an integer.
    AppsRounded,
    /// Gender not resolvable to Male/Female.
    GenderUnrecognized,
    /// Unresolvable gender replaced by "Unknown".
    GenderBucketed,
    /// Row identical to an earlier row across all columns.
    DuplicateRow,
    /// Value outside the IQR fences of its column.
    ExtremeOutlier,
    /// Total usage overwritten with the sum of its parts.
    TotalRecomputed,
    /// Daily screen time raised to the total usage.
    ScreenTimeRaised,
    /// Summed app usage exceeds the hours in a day.
    UsageExceedsDay,
}

impl CleaningRule {
    pub fn action(&self) -> ActionKind {
        match self {
            Self::CoercionFailure => ActionKind::Nulled,
            Self::MissingValue
            | Self::AgeOutOfRange
            | Self::AppsOutOfRange
            | Self::GenderUnrecognized
            | Self::DuplicateRow
            | Self::ExtremeOutlier
            | Self::UsageExceedsDay => ActionKind::Dropped,
            Self::AgeRounded
            | Self::NegativeHours
            | Self::ScreenTimeCapped
            | Self::AppsRounded
            | Self::GenderBucketed
            | Self::TotalRecomputed
            | Self::ScreenTimeRaised => ActionKind::Repaired,
        }
    }

    /// Get a human-readable display name for the rule.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::CoercionFailure => "Coercion Failure",
            Self::MissingValue => "Missing Value",
            Self::AgeOutOfRange => "Age Out Of Range",
            Self::AgeRounded => "Age Rounded",
            Self::NegativeHours => "Negative Hours",
            Self::ScreenTimeCapped => "Screen Time Capped",
            Self::AppsOutOfRange => "Apps Out Of Range",
            Self::AppsRounded => "Apps Rounded",
            Self::GenderUnrecognized => "Gender Unrecognized",
            Self::GenderBucketed => "Gender Bucketed",
            Self::DuplicateRow => "Duplicate Row",
            Self::ExtremeOutlier => "Extreme Outlier",
            Self::TotalRecomputed => "Total Recomputed",
            Self::ScreenTimeRaised => "Screen Time Raised",
            Self::UsageExceedsDay => "Usage Exceeds Day",
        }
    }
}

impl fmt::Display for CleaningRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Tally of one rule firing, optionally scoped to a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleEntry {
    pub rule: CleaningRule,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    /// Rows dropped, or values repaired/nulled.
    pub count: usize,
    /// Human-readable reason.
    pub reason: String,
}

/// Counts and rule entries for one stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: StageKind,
    pub rows_in: usize,
    pub rows_out: usize,
    pub rows_dropped: usize,
    /// Distinct surviving rows with at least one repair.
    pub rows_repaired: usize,
    pub entries: Vec<RuleEntry>,
}

impl StageReport {
    pub(crate) fn new(stage: StageKind, rows_in: usize) -> Self {
        Self {
            stage,
            rows_in,
            rows_out: rows_in,
            rows_dropped: 0,
            rows_repaired: 0,
            entries: Vec::new(),
        }
    }

    /// Record `count` firings of `rule`. Zero counts are ignored and repeated
    /// (rule, column) pairs accumulate into one entry.
    pub(crate) fn record(
        &mut self,
        rule: CleaningRule,
        column: Option<&str>,
        count: usize,
        reason: impl Into<String>,
    ) {
        if count == 0 {
            return;
        }
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| e.rule == rule && e.column.as_deref() == column)
        {
            entry.count += count;
            return;
        }
        self.entries.push(RuleEntry {
            rule,
            column: column.map(str::to_string),
            count,
            reason: reason.into(),
        });
    }

    /// Seal the counts once the stage's output is known.
    pub(crate) fn finish(mut self, rows_out: usize, rows_repaired: usize) -> Self {
        self.rows_out = rows_out;
        self.rows_dropped = self.rows_in.saturating_sub(rows_out);
        self.rows_repaired = rows_repaired;
        self
    }

    pub fn entry(&self, rule: CleaningRule, column: Option<&str>) -> Option<&RuleEntry> {
        self.entries
            .iter()
            .find(|e| e.rule == rule && e.column.as_deref() == column)
    }

    /// Total count for `rule` across all columns.
    pub fn count_for(&self, rule: CleaningRule) -> usize {
        self.entries
            .iter()
            .filter(|e| e.rule == rule)
            .map(|e| e.count)
            .sum()
    }

    /// Sum of counts of all drop rules. Equals `rows_dropped`.
    pub fn dropped_by_rules(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.rule.action() == ActionKind::Dropped)
            .map(|e| e.count)
            .sum()
    }

    /// Whether this stage changed nothing.
    pub fn is_noop(&self) -> bool {
        self.rows_dropped == 0 && self.entries.is_empty()
    }
}

/// Audit trail of a whole cleaning run.
///
/// Built by the pipeline and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningReport {
    stages: Vec<StageReport>,
}

impl CleaningReport {
    pub(crate) fn from_stages(stages: Vec<StageReport>) -> Self {
        Self { stages }
    }

    pub fn stages(&self) -> &[StageReport] {
        &self.stages
    }

    pub fn stage(&self, kind: StageKind) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.stage == kind)
    }

    /// Rows entering the first stage.
    pub fn rows_in(&self) -> usize {
        self.stages.first().map(|s| s.rows_in).unwrap_or(0)
    }

    /// Rows leaving the last stage.
    pub fn rows_out(&self) -> usize {
        self.stages.last().map(|s| s.rows_out).unwrap_or(0)
    }

    pub fn total_dropped(&self) -> usize {
        self.stages.iter().map(|s| s.rows_dropped).sum()
    }

    pub fn total_repaired(&self) -> usize {
        self.stages.iter().map(|s| s.rows_repaired).sum()
    }

    /// Dropped-row counts per rule across all stages.
    pub fn dropped_by_rule(&self) -> BTreeMap<CleaningRule, usize> {
        self.tally(ActionKind::Dropped)
    }

    /// Repaired-value counts per rule across all stages.
    pub fn repaired_by_rule(&self) -> BTreeMap<CleaningRule, usize> {
        self.tally(ActionKind::Repaired)
    }

    fn tally(&self, action: ActionKind) -> BTreeMap<CleaningRule, usize> {
        let mut out = BTreeMap::new();
        for entry in self.stages.iter().flat_map(|s| &s.entries) {
            if entry.rule.action() == action {
                *out.entry(entry.rule).or_insert(0) += entry.count;
            }
        }
        out
    }

    /// Whether the run neither dropped, repaired nor nulled anything.
    pub fn is_clean(&self) -> bool {
        self.stages.iter().all(StageReport::is_noop)
    }
}

// ============================================================================
// Tests
// ============================================================================
