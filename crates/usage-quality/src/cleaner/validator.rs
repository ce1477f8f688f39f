//! Per-row range and sanity checks.
//!
//! The validator walks each row through a fixed sequence of checks. A row is
//! dropped by the first check that rejects it, and repairs are only counted
//! for rows that survive the whole stage.

use crate::cleaner::dedup::unique_rows;
use crate::config::{PipelineConfig, UnmappedGenderPolicy};
use crate::dataset::Dataset;
use crate::error::Result;
use crate::schema::*;
use crate::schema::Schema;
use crate::types::{CleaningRule, StageKind, StageReport};
use crate::utils::{float_values, keep_rows, string_values};
use polars::prelude::*;
use tracing::{debug, warn};

const MALE: &str = "Male";
const FEMALE: &str = "Female";
const UNKNOWN_GENDER: &str = "Unknown";

/// A repair applied to one field of a row.
type Repair = (CleaningRule, &'static str);

/// Row-level accept/repair/reject decisions over a normalized dataset.
#[derive(Debug, Clone)]
pub struct RecordValidator {
    age_range: (f64, f64),
    apps_range: (f64, f64),
    max_daily_hours: f64,
    unmapped_gender: UnmappedGenderPolicy,
    remove_duplicates: bool,
}

impl Default for RecordValidator {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

/// Outcome of checking one row.
enum RowOutcome {
    Keep(Vec<Repair>),
    Drop(CleaningRule, Option<&'static str>),
}

/// Column-major working copy of the fields the validator touches.
struct Columns {
    age: Vec<Option<f64>>,
    apps: Vec<Option<f64>>,
    hours: Vec<Vec<Option<f64>>>,
    gender: Vec<Option<String>>,
    location: Vec<Option<String>>,
}

impl Columns {
    fn load(frame: &DataFrame) -> Result<Self> {
        let hours = USAGE_HOURS_COLUMNS
            .iter()
            .map(|name| float_values(frame, name))
            .collect::<PolarsResult<Vec<_>>>()?;
        Ok(Self {
            age: float_values(frame, AGE)?,
            apps: float_values(frame, NUMBER_OF_APPS)?,
            hours,
            gender: string_values(frame, GENDER)?,
            location: string_values(frame, LOCATION)?,
        })
    }

    /// First required column that is null in row `i`.
    fn first_null(&self, i: usize) -> Option<&'static str> {
        for spec in Schema::usage().columns() {
            let is_null = match spec.name {
                AGE => self.age[i].is_none(),
                NUMBER_OF_APPS => self.apps[i].is_none(),
                GENDER => self.gender[i].is_none(),
                LOCATION => self.location[i].is_none(),
                name => USAGE_HOURS_COLUMNS
                    .iter()
                    .position(|c| *c == name)
                    .is_some_and(|idx| self.hours[idx][i].is_none()),
            };
            if is_null {
                return Some(spec.name);
            }
        }
        None
    }
}

impl RecordValidator {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            age_range: config.age_range,
            apps_range: config.apps_range,
            max_daily_hours: config.max_daily_hours,
            unmapped_gender: config.unmapped_gender,
            remove_duplicates: config.remove_duplicates,
        }
    }

    /// Validate a normalized dataset.
    ///
    /// Checks, in order: required fields present, age in range (then
    /// rounded), negative hours clamped, daily screen time capped, app count
    /// in range (then rounded), gender policy, and finally duplicate removal.
    pub fn validate(&self, dataset: &Dataset) -> Result<(Dataset, StageReport)> {
        let frame = dataset.frame();
        let height = frame.height();
        let mut report = StageReport::new(StageKind::Validate, height);
        let mut cols = Columns::load(frame)?;

        let mut keep = vec![true; height];
        let mut repairs: Vec<Vec<Repair>> = vec![Vec::new(); height];

        for i in 0..height {
            match self.check_row(&mut cols, i) {
                RowOutcome::Keep(row_repairs) => repairs[i] = row_repairs,
                RowOutcome::Drop(rule, column) => {
                    keep[i] = false;
                    report.record(rule, column, 1, self.reason(rule));
                }
            }
        }

        let mut out = frame.clone();
        out.replace(AGE, integer_series(AGE, &cols.age, &keep))?;
        out.replace(NUMBER_OF_APPS, integer_series(NUMBER_OF_APPS, &cols.apps, &keep))?;
        for (name, values) in USAGE_HOURS_COLUMNS.iter().zip(cols.hours) {
            out.replace(name, Series::new((*name).into(), values))?;
        }
        out.replace(GENDER, Series::new(GENDER.into(), cols.gender))?;
        let mut out = keep_rows(&out, &keep)?;

        let mut survivors: Vec<usize> = (0..height).filter(|&i| keep[i]).collect();

        if self.remove_duplicates {
            let (unique, kept) = unique_rows(&out)?;
            let duplicates = out.height() - unique.height();
            if duplicates > 0 {
                report.record(
                    CleaningRule::DuplicateRow,
                    None,
                    duplicates,
                    "Identical to an earlier row across all columns",
                );
                out = unique;
                survivors = kept.into_iter().map(|pos| survivors[pos]).collect();
            }
        }

        let mut rows_repaired = 0;
        for &i in &survivors {
            if !repairs[i].is_empty() {
                rows_repaired += 1;
            }
            for &(rule, column) in &repairs[i] {
                report.record(rule, Some(column), 1, self.reason(rule));
            }
        }

        for entry in &report.entries {
            debug!(
                "Validate: {} on {:?}: {}",
                entry.rule.display_name(),
                entry.column,
                entry.count
            );
        }
        if height > 0 && out.height() == 0 {
            warn!("Validation removed every row");
        }

        let rows_out = out.height();
        Ok((Dataset::from_checked(out), report.finish(rows_out, rows_repaired)))
    }

    fn check_row(&self, cols: &mut Columns, i: usize) -> RowOutcome {
        if let Some(column) = cols.first_null(i) {
            return RowOutcome::Drop(CleaningRule::MissingValue, Some(column));
        }

        let mut repairs = Vec::new();

        let age = cols.age[i].unwrap_or_default();
        if age < self.age_range.0 || age > self.age_range.1 {
            return RowOutcome::Drop(CleaningRule::AgeOutOfRange, Some(AGE));
        }
        let rounded = age.round();
        if rounded != age {
            cols.age[i] = Some(rounded);
            repairs.push((CleaningRule::AgeRounded, AGE));
        }

        for (idx, name) in USAGE_HOURS_COLUMNS.iter().enumerate() {
            if let Some(v) = cols.hours[idx][i]
                && v < 0.0
            {
                cols.hours[idx][i] = Some(0.0);
                repairs.push((CleaningRule::NegativeHours, *name));
            }
        }

        let daily_idx = daily_index();
        if let Some(v) = cols.hours[daily_idx][i]
            && v > self.max_daily_hours
        {
            cols.hours[daily_idx][i] = Some(self.max_daily_hours);
            repairs.push((CleaningRule::ScreenTimeCapped, DAILY_SCREEN_TIME));
        }

        let apps = cols.apps[i].unwrap_or_default();
        if apps < self.apps_range.0 || apps > self.apps_range.1 {
            return RowOutcome::Drop(CleaningRule::AppsOutOfRange, Some(NUMBER_OF_APPS));
        }
        let rounded = apps.round();
        if rounded != apps {
            cols.apps[i] = Some(rounded);
            repairs.push((CleaningRule::AppsRounded, NUMBER_OF_APPS));
        }

        let recognized = matches!(cols.gender[i].as_deref(), Some(MALE) | Some(FEMALE));
        if !recognized {
            match self.unmapped_gender {
                UnmappedGenderPolicy::Drop => {
                    return RowOutcome::Drop(CleaningRule::GenderUnrecognized, Some(GENDER));
                }
                UnmappedGenderPolicy::Unknown => {
                    if cols.gender[i].as_deref() != Some(UNKNOWN_GENDER) {
                        cols.gender[i] = Some(UNKNOWN_GENDER.to_string());
                        repairs.push((CleaningRule::GenderBucketed, GENDER));
                    }
                }
                UnmappedGenderPolicy::Keep => {}
            }
        }

        RowOutcome::Keep(repairs)
    }

    fn reason(&self, rule: CleaningRule) -> String {
        match rule {
            CleaningRule::MissingValue => "Required field is null".to_string(),
            CleaningRule::AgeOutOfRange => format!(
                "Age outside [{}, {}]",
                self.age_range.0, self.age_range.1
            ),
            CleaningRule::AgeRounded => "Age rounded to nearest integer".to_string(),
            CleaningRule::NegativeHours => "Negative hours clamped to 0".to_string(),
            CleaningRule::ScreenTimeCapped => {
                format!("Daily screen time clamped to {}", self.max_daily_hours)
            }
            CleaningRule::AppsOutOfRange => format!(
                "Number of apps outside [{}, {}]",
                self.apps_range.0, self.apps_range.1
            ),
            CleaningRule::AppsRounded => "Number of apps rounded to nearest integer".to_string(),
            CleaningRule::GenderUnrecognized => "Gender is neither Male nor Female".to_string(),
            CleaningRule::GenderBucketed => "Unrecognized gender mapped to Unknown".to_string(),
            other => other.display_name().to_string(),
        }
    }
}

fn daily_index() -> usize {
    USAGE_HOURS_COLUMNS
        .iter()
        .position(|c| *c == DAILY_SCREEN_TIME)
        .unwrap_or(1)
}

/// Build an `Int64` series from whole-number floats. Rows about to be
/// dropped become null.
fn integer_series(name: &str, values: &[Option<f64>], keep: &[bool]) -> Series {
    let ints: Vec<Option<i64>> = values
        .iter()
        .zip(keep)
        .map(|(v, &k)| if k { v.map(|x| x as i64) } else { None })
        .collect();
    Series::new(name.into(), ints)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::float_values;
    use pretty_assertions::assert_eq;

    struct Row {
        age: f64,
        gender: &'static str,
        total: f64,
        daily: f64,
        apps: f64,
        social: f64,
        productivity: f64,
        gaming: f64,
        location: &'static str,
    }

    fn good_row() -> Row {
        Row {
            age: 30.0,
            gender: "Male",
            total: 3.0,
            daily: 5.0,
            apps: 20.0,
            social: 1.0,
            productivity: 1.0,
            gaming: 1.0,
            location: "Chicago",
        }
    }

    fn dataset(rows: &[Row]) -> Dataset {
        let frame = df! {
            AGE => rows.iter().map(|r| r.age).collect::<Vec<_>>(),
            GENDER => rows.iter().map(|r| r.gender).collect::<Vec<_>>(),
            TOTAL_APP_USAGE => rows.iter().map(|r| r.total).collect::<Vec<_>>(),
            DAILY_SCREEN_TIME => rows.iter().map(|r| r.daily).collect::<Vec<_>>(),
            NUMBER_OF_APPS => rows.iter().map(|r| r.apps).collect::<Vec<_>>(),
            SOCIAL_MEDIA => rows.iter().map(|r| r.social).collect::<Vec<_>>(),
            PRODUCTIVITY => rows.iter().map(|r| r.productivity).collect::<Vec<_>>(),
            GAMING => rows.iter().map(|r| r.gaming).collect::<Vec<_>>(),
            LOCATION => rows.iter().map(|r| r.location).collect::<Vec<_>>(),
        }
        .unwrap();
        Dataset::new(frame).unwrap()
    }

    #[test]
    fn test_clean_rows_untouched() {
        let (out, report) = RecordValidator::default()
            .validate(&dataset(&[good_row()]))
            .unwrap();
        assert_eq!(out.height(), 1);
        assert!(report.is_noop());
        assert_eq!(out.frame().column(AGE).unwrap().dtype(), &DataType::Int64);
        assert_eq!(
            out.frame().column(NUMBER_OF_APPS).unwrap().dtype(),
            &DataType::Int64
        );
    }

    #[test]
    fn test_null_field_dropped() {
        let mut frame = dataset(&[good_row(), good_row()]).into_frame();
        frame
            .replace(
                GAMING,
                Series::new(GAMING.into(), &[Some(1.0), None::<f64>]),
            )
            .unwrap();
        let (out, report) = RecordValidator::default()
            .validate(&Dataset::new(frame).unwrap())
            .unwrap();
        assert_eq!(out.height(), 1);
        assert_eq!(
            report.entry(CleaningRule::MissingValue, Some(GAMING)).unwrap().count,
            1
        );
    }

    #[test]
    fn test_age_out_of_range_dropped_and_rounded() {
        let rows = [
            Row { age: 200.0, ..good_row() },
            Row { age: 9.9, ..good_row() },
            Row { age: 10.5, ..good_row() },
            Row { age: 120.0, gender: "Female", ..good_row() },
        ];
        let (out, report) = RecordValidator::default().validate(&dataset(&rows)).unwrap();

        assert_eq!(out.height(), 2);
        assert_eq!(report.count_for(CleaningRule::AgeOutOfRange), 2);
        assert_eq!(report.count_for(CleaningRule::AgeRounded), 1);
        assert_eq!(report.rows_repaired, 1);
        assert_eq!(
            float_values(out.frame(), AGE).unwrap(),
            vec![Some(11.0), Some(120.0)]
        );
    }

    #[test]
    fn test_negative_hours_clamped_per_column() {
        let rows = [Row {
            social: -5.0,
            gaming: -1.0,
            ..good_row()
        }];
        let (out, report) = RecordValidator::default().validate(&dataset(&rows)).unwrap();

        assert_eq!(out.height(), 1);
        assert_eq!(float_values(out.frame(), SOCIAL_MEDIA).unwrap(), vec![Some(0.0)]);
        assert_eq!(float_values(out.frame(), GAMING).unwrap(), vec![Some(0.0)]);
        assert_eq!(
            report.entry(CleaningRule::NegativeHours, Some(SOCIAL_MEDIA)).unwrap().count,
            1
        );
        assert_eq!(
            report.entry(CleaningRule::NegativeHours, Some(GAMING)).unwrap().count,
            1
        );
        assert_eq!(report.rows_repaired, 1);
    }

    #[test]
    fn test_screen_time_capped() {
        let rows = [Row { daily: 30.0, ..good_row() }];
        let (out, report) = RecordValidator::default().validate(&dataset(&rows)).unwrap();
        assert_eq!(
            float_values(out.frame(), DAILY_SCREEN_TIME).unwrap(),
            vec![Some(24.0)]
        );
        assert_eq!(report.count_for(CleaningRule::ScreenTimeCapped), 1);
    }

    #[test]
    fn test_apps_out_of_range_dropped_not_clamped() {
        let rows = [
            Row { apps: 500.0, ..good_row() },
            Row { apps: -1.0, ..good_row() },
            Row { apps: 12.6, gender: "Female", ..good_row() },
        ];
        let (out, report) = RecordValidator::default().validate(&dataset(&rows)).unwrap();

        assert_eq!(out.height(), 1);
        assert_eq!(report.count_for(CleaningRule::AppsOutOfRange), 2);
        assert_eq!(float_values(out.frame(), NUMBER_OF_APPS).unwrap(), vec![Some(13.0)]);
    }

    #[test]
    fn test_repairs_on_dropped_rows_not_counted() {
        let rows = [Row {
            social: -2.0,
            apps: 500.0,
            ..good_row()
        }];
        let (out, report) = RecordValidator::default().validate(&dataset(&rows)).unwrap();
        assert_eq!(out.height(), 0);
        assert_eq!(report.count_for(CleaningRule::NegativeHours), 0);
        assert_eq!(report.count_for(CleaningRule::AppsOutOfRange), 1);
        assert_eq!(report.rows_repaired, 0);
    }

    #[test]
    fn test_gender_policies() {
        let rows = [good_row(), Row { gender: "Other", ..good_row() }];

        let (out, report) = RecordValidator::default().validate(&dataset(&rows)).unwrap();
        assert_eq!(out.height(), 1);
        assert_eq!(report.count_for(CleaningRule::GenderUnrecognized), 1);

        let config = PipelineConfig::builder()
            .unmapped_gender(UnmappedGenderPolicy::Unknown)
            .build()
            .unwrap();
        let (out, report) = RecordValidator::from_config(&config)
            .validate(&dataset(&rows))
            .unwrap();
        assert_eq!(out.height(), 2);
        assert_eq!(report.count_for(CleaningRule::GenderBucketed), 1);
        assert_eq!(
            string_values(out.frame(), GENDER).unwrap()[1],
            Some("Unknown".to_string())
        );

        let config = PipelineConfig::builder()
            .unmapped_gender(UnmappedGenderPolicy::Keep)
            .build()
            .unwrap();
        let (out, report) = RecordValidator::from_config(&config)
            .validate(&dataset(&rows))
            .unwrap();
        assert_eq!(out.height(), 2);
        assert!(report.is_noop());
    }

    #[test]
    fn test_duplicates_removed_keep_first() {
        let rows = [
            good_row(),
            Row { location: "Houston", ..good_row() },
            good_row(),
        ];
        let (out, report) = RecordValidator::default().validate(&dataset(&rows)).unwrap();
        assert_eq!(out.height(), 2);
        assert_eq!(report.count_for(CleaningRule::DuplicateRow), 1);
        assert_eq!(
            string_values(out.frame(), LOCATION).unwrap(),
            vec![Some("Chicago".to_string()), Some("Houston".to_string())]
        );
    }

    #[test]
    fn test_repairs_counted_for_rows_kept_after_dedup() {
        let rows = [
            good_row(),
            good_row(),
            Row { social: -1.0, ..good_row() },
            Row { social: -1.0, ..good_row() },
        ];
        let (out, report) = RecordValidator::default().validate(&dataset(&rows)).unwrap();
        assert_eq!(out.height(), 2);
        assert_eq!(report.count_for(CleaningRule::DuplicateRow), 2);
        assert_eq!(report.count_for(CleaningRule::NegativeHours), 1);
        assert_eq!(report.rows_repaired, 1);
        assert_eq!(
            float_values(out.frame(), SOCIAL_MEDIA).unwrap(),
            vec![Some(1.0), Some(0.0)]
        );
    }

    #[test]
    fn test_text_with_control_characters_not_merged() {
        let rows = [good_row(), Row { location: "Chicago\u{1f}1", ..good_row() }];
        let mut frame = dataset(&rows).into_frame();
        frame
            .with_column(Series::new(USER_ID.into(), &["1\u{1f}2", "2"]))
            .unwrap();

        let (out, report) = RecordValidator::default()
            .validate(&Dataset::new(frame).unwrap())
            .unwrap();
        assert_eq!(out.height(), 2);
        assert_eq!(report.count_for(CleaningRule::DuplicateRow), 0);
    }

    #[test]
    fn test_duplicates_kept_when_disabled() {
        let config = PipelineConfig::builder().remove_duplicates(false).build().unwrap();
        let (out, _) = RecordValidator::from_config(&config)
            .validate(&dataset(&[good_row(), good_row()]))
            .unwrap();
        assert_eq!(out.height(), 2);
    }

    #[test]
    fn test_first_failing_rule_wins() {
        let rows = [Row {
            age: 5.0,
            apps: 500.0,
            gender: "Other",
            ..good_row()
        }];
        let (_, report) = RecordValidator::default().validate(&dataset(&rows)).unwrap();
        assert_eq!(report.dropped_by_rules(), 1);
        assert_eq!(report.count_for(CleaningRule::AgeOutOfRange), 1);
        assert_eq!(report.rows_dropped, 1);
    }

    #[test]
    fn test_empty_dataset() {
        let (out, report) = RecordValidator::default().validate(&dataset(&[])).unwrap();
        assert!(out.is_empty());
        assert_eq!(report.rows_in, 0);
        assert_eq!(report.rows_out, 0);
    }
}
