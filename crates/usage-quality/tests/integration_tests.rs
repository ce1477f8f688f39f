//! Integration tests for the cleaning pipeline.
//!
//! These tests drive the public API end to end, from a CSV fixture or small
//! hand-built tables, and check the cleaned rows and the cleaning report.

mod common;

use common::{UsageRow, assert_clean, dataset, fixtures_path, frame};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use usage_quality::schema::*;
use usage_quality::{
    CleaningError, CleaningRule, CleaningStage, Dataset, DatasetSummary, Pipeline, PipelineConfig,
    ReportGenerator, StageKind, UnmappedGenderPolicy,
};

// ============================================================================
// Helper Functions
// ============================================================================

fn load_fixture() -> Dataset {
    Dataset::from_csv(fixtures_path().join("smartphone_usage_sample.csv"))
        .expect("fixture should load")
}

fn default_pipeline() -> Pipeline {
    Pipeline::builder().build().unwrap()
}

fn scratch_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "usage_quality_it_{}_{}",
        name,
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

// ============================================================================
// Fixture Pipeline Tests
// ============================================================================

#[test]
fn test_fixture_row_accounting() {
    let result = default_pipeline().run(&load_fixture()).unwrap();
    let report = &result.report;

    assert_eq!(report.rows_in(), 18);
    assert_eq!(report.rows_out(), 12);
    assert_eq!(result.dataset.height(), 12);

    let expected: BTreeMap<CleaningRule, usize> = [
        (CleaningRule::MissingValue, 2),
        (CleaningRule::AgeOutOfRange, 1),
        (CleaningRule::AppsOutOfRange, 1),
        (CleaningRule::GenderUnrecognized, 1),
        (CleaningRule::DuplicateRow, 1),
    ]
    .into_iter()
    .collect();
    assert_eq!(report.dropped_by_rule(), expected);
    assert_eq!(report.total_dropped(), 6);
}

#[test]
fn test_fixture_repairs() {
    let result = default_pipeline().run(&load_fixture()).unwrap();
    let report = &result.report;

    let repaired = report.repaired_by_rule();
    assert_eq!(repaired.get(&CleaningRule::AgeRounded), Some(&1));
    assert_eq!(repaired.get(&CleaningRule::NegativeHours), Some(&1));
    assert_eq!(repaired.get(&CleaningRule::TotalRecomputed), Some(&1));
    assert_eq!(repaired.get(&CleaningRule::ScreenTimeRaised), Some(&1));

    let normalize = report.stage(StageKind::Normalize).unwrap();
    assert_eq!(
        normalize
            .entry(CleaningRule::CoercionFailure, Some(AGE))
            .map(|e| e.count),
        Some(1)
    );

    let validate = report.stage(StageKind::Validate).unwrap();
    assert!(validate.entry(CleaningRule::MissingValue, Some(AGE)).is_some());
    assert!(
        validate
            .entry(CleaningRule::MissingValue, Some(TOTAL_APP_USAGE))
            .is_some()
    );

    let outliers = report.stage(StageKind::OutlierFilter).unwrap();
    assert!(outliers.is_noop());
}

#[test]
fn test_fixture_output_invariants() {
    let config = PipelineConfig::default();
    let result = default_pipeline().run(&load_fixture()).unwrap();
    assert_clean(&result.dataset, &config);

    let genders = result.dataset.string_column(GENDER).unwrap();
    let males = genders.iter().filter(|g| g.as_deref() == Some("Male")).count();
    assert_eq!(males, 6);

    let locations: Vec<String> = result
        .dataset
        .string_column(LOCATION)
        .unwrap()
        .into_iter()
        .flatten()
        .collect();
    assert!(locations.iter().all(|l| {
        ["Chicago", "Phoenix", "Houston", "Sao Paulo"].contains(&l.as_str())
    }));
}

#[test]
fn test_fixture_keeps_extra_columns() {
    let result = default_pipeline().run(&load_fixture()).unwrap();
    assert!(result.dataset.column_names().iter().any(|c| c == USER_ID));

    let ids: Vec<Option<f64>> = result.dataset.float_column(USER_ID).unwrap();
    assert_eq!(ids.first(), Some(&Some(1.0)));
    assert!(!ids.contains(&Some(6.0)));
    assert!(!ids.contains(&Some(11.0)));
}

#[test]
fn test_fixture_summary() {
    let result = default_pipeline().run(&load_fixture()).unwrap();
    let summary = DatasetSummary::from_dataset(&result.dataset).unwrap();

    assert_eq!(summary.rows, 12);
    let total = summary.column(TOTAL_APP_USAGE).unwrap();
    assert_eq!(total.count, 12);
    assert!(total.min.unwrap() >= 0.0);
    assert_eq!(summary.gender_distribution.len(), 2);
    assert_eq!(summary.location_distribution[0].value, "Chicago");
}

// ============================================================================
// Record Rule Tests
// ============================================================================

#[test]
fn test_total_derived_from_parts() {
    let raw = dataset(&[UsageRow {
        total: 5.0,
        daily: 8.0,
        ..Default::default()
    }]);
    let result = default_pipeline().run(&raw).unwrap();

    assert_eq!(
        result.dataset.float_column(TOTAL_APP_USAGE).unwrap(),
        vec![Some(3.0)]
    );
    assert_eq!(
        result
            .report
            .stage(StageKind::Reconcile)
            .unwrap()
            .count_for(CleaningRule::TotalRecomputed),
        1
    );
}

#[test]
fn test_screen_time_raised_to_total() {
    let raw = dataset(&[UsageRow {
        total: 5.0,
        daily: 2.0,
        social: 2.0,
        productivity: 2.0,
        gaming: 1.0,
        ..Default::default()
    }]);
    let result = default_pipeline().run(&raw).unwrap();

    assert_eq!(
        result.dataset.float_column(DAILY_SCREEN_TIME).unwrap(),
        vec![Some(5.0)]
    );
    assert_eq!(
        result.report.repaired_by_rule().get(&CleaningRule::ScreenTimeRaised),
        Some(&1)
    );
}

#[test]
fn test_age_range_not_iqr() {
    let mut rows: Vec<UsageRow> = (0..8)
        .map(|i| UsageRow {
            age: 20.0 + i as f64,
            apps: 20.0 + i as f64,
            ..Default::default()
        })
        .collect();
    rows.push(UsageRow {
        age: 200.0,
        apps: 28.0,
        ..Default::default()
    });
    rows.push(UsageRow {
        age: 119.0,
        apps: 29.0,
        ..Default::default()
    });

    let result = default_pipeline().run(&dataset(&rows)).unwrap();
    let ages = result.dataset.float_column(AGE).unwrap();

    assert!(!ages.contains(&Some(200.0)));
    assert!(ages.contains(&Some(119.0)));
    assert_eq!(
        result
            .report
            .stage(StageKind::Validate)
            .unwrap()
            .count_for(CleaningRule::AgeOutOfRange),
        1
    );
    assert_eq!(
        result
            .report
            .stage(StageKind::OutlierFilter)
            .unwrap()
            .entry(CleaningRule::ExtremeOutlier, Some(AGE)),
        None
    );
}

#[test]
fn test_negative_hours_clamped_apps_dropped() {
    let rows = vec![
        UsageRow {
            social: -5.0,
            total: 2.0,
            ..Default::default()
        },
        UsageRow {
            apps: 500.0,
            location: "Phoenix".to_string(),
            ..Default::default()
        },
    ];
    let result = default_pipeline().run(&dataset(&rows)).unwrap();

    assert_eq!(result.dataset.height(), 1);
    assert_eq!(
        result.dataset.float_column(SOCIAL_MEDIA).unwrap(),
        vec![Some(0.0)]
    );
    assert_eq!(
        result.dataset.float_column(TOTAL_APP_USAGE).unwrap(),
        vec![Some(2.0)]
    );

    let dropped = result.report.dropped_by_rule();
    assert_eq!(dropped.get(&CleaningRule::AppsOutOfRange), Some(&1));
    assert_eq!(dropped.len(), 1);
}

#[test]
fn test_unmapped_gender_policies() {
    let rows = vec![
        UsageRow::default(),
        UsageRow {
            gender: "non-binary".to_string(),
            location: "Houston".to_string(),
            ..Default::default()
        },
    ];

    let run = |policy| {
        let config = PipelineConfig::builder()
            .unmapped_gender(policy)
            .build()
            .unwrap();
        Pipeline::builder()
            .config(config)
            .build()
            .unwrap()
            .run(&dataset(&rows))
            .unwrap()
    };

    let dropped = run(UnmappedGenderPolicy::Drop);
    assert_eq!(dropped.dataset.height(), 1);

    let bucketed = run(UnmappedGenderPolicy::Unknown);
    assert_eq!(
        bucketed.dataset.string_column(GENDER).unwrap(),
        vec![Some("Female".to_string()), Some("Unknown".to_string())]
    );
    assert_eq!(
        bucketed.report.repaired_by_rule().get(&CleaningRule::GenderBucketed),
        Some(&1)
    );

    let kept = run(UnmappedGenderPolicy::Keep);
    assert_eq!(
        kept.dataset.string_column(GENDER).unwrap(),
        vec![Some("Female".to_string()), Some("Non-Binary".to_string())]
    );
}

#[test]
fn test_no_dedup_keeps_duplicates() {
    let rows = vec![UsageRow::default(), UsageRow::default()];
    let config = PipelineConfig::builder()
        .remove_duplicates(false)
        .build()
        .unwrap();
    let result = Pipeline::builder()
        .config(config)
        .build()
        .unwrap()
        .run(&dataset(&rows))
        .unwrap();

    assert_eq!(result.dataset.height(), 2);
    assert!(result.report.stage(StageKind::Deduplicate).is_none());
}

#[test]
fn test_reconciliation_duplicates_swept() {
    // Identical except for the stale total, which reconciliation rewrites.
    let rows = vec![
        UsageRow::default(),
        UsageRow {
            total: 4.0,
            ..Default::default()
        },
    ];
    let result = default_pipeline().run(&dataset(&rows)).unwrap();

    assert_eq!(result.dataset.height(), 1);
    let dedup = result.report.stage(StageKind::Deduplicate).unwrap();
    assert_eq!(dedup.count_for(CleaningRule::DuplicateRow), 1);
}

// ============================================================================
// Pipeline Property Tests
// ============================================================================

#[test]
fn test_idempotent_on_clean_output() {
    let pipeline = default_pipeline();
    let first = pipeline.run(&load_fixture()).unwrap();
    let second = pipeline.run(&first.dataset).unwrap();

    assert!(second.dataset.same_data(&first.dataset));
    assert!(second.report.is_clean(), "{:?}", second.report);
    assert_eq!(second.report.total_repaired(), 0);
    assert_eq!(second.report.total_dropped(), 0);
}

#[test]
fn test_stage_conservation() {
    let result = default_pipeline().run(&load_fixture()).unwrap();
    let stages = result.report.stages();

    assert_eq!(stages.len(), 5);
    for stage in stages {
        assert!(stage.rows_out <= stage.rows_in);
        assert_eq!(stage.dropped_by_rules(), stage.rows_in - stage.rows_out);
    }
    for pair in stages.windows(2) {
        assert_eq!(pair[0].rows_out, pair[1].rows_in);
    }

    let dropped: usize = result.report.dropped_by_rule().values().sum();
    assert_eq!(dropped, result.report.rows_in() - result.report.rows_out());
}

#[test]
fn test_missing_column_is_fatal() {
    let frame = frame(&[UsageRow::default()]).drop(LOCATION).unwrap();
    let err = default_pipeline().process(frame).unwrap_err();

    assert!(err.is_malformed_input());
    assert_eq!(err.error_code(), "MALFORMED_INPUT");
    assert!(matches!(err, CleaningError::MissingColumn(ref c) if c == LOCATION));
}

#[test]
fn test_empty_input() {
    let result = default_pipeline().run(&dataset(&[])).unwrap();
    assert!(result.dataset.is_empty());
    assert!(result.report.is_clean());
}

#[test]
fn test_progress_covers_every_stage() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();

    Pipeline::builder()
        .on_progress(move |update| seen_clone.lock().unwrap().push(update.stage))
        .build()
        .unwrap()
        .run(&load_fixture())
        .unwrap();

    let seen = seen.lock().unwrap();
    for stage in [
        CleaningStage::Normalizing,
        CleaningStage::Validating,
        CleaningStage::OutlierFiltering,
        CleaningStage::Reconciling,
        CleaningStage::Deduplicating,
    ] {
        assert!(seen.contains(&stage), "missing {:?}", stage);
    }
    assert_eq!(seen.last(), Some(&CleaningStage::Complete));
}

#[test]
fn test_failure_reported_to_progress() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();

    let frame = frame(&[UsageRow::default()]).drop(GAMING).unwrap();
    let result = Pipeline::builder()
        .on_progress(move |update| seen_clone.lock().unwrap().push(update.stage))
        .build()
        .unwrap()
        .process(frame);

    assert!(result.is_err());
    assert_eq!(seen.lock().unwrap().last(), Some(&CleaningStage::Failed));
}

// ============================================================================
// File Output Tests
// ============================================================================

#[test]
fn test_csv_round_trip_stays_clean() {
    let dir = scratch_dir("round_trip");
    let generator = ReportGenerator::new(&dir);
    let pipeline = default_pipeline();

    let first = pipeline.run(&load_fixture()).unwrap();
    let path = generator
        .write_clean_csv(&first.dataset, "sample_clean")
        .unwrap();

    let reloaded = Dataset::from_csv(&path).unwrap();
    assert_eq!(reloaded.height(), first.dataset.height());

    let second = pipeline.run(&reloaded).unwrap();
    assert!(second.report.is_clean());
    assert_eq!(second.dataset.height(), first.dataset.height());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_report_file_written() {
    let dir = scratch_dir("report");
    let generator = ReportGenerator::new(&dir);
    let result = default_pipeline().run(&load_fixture()).unwrap();

    let report = ReportGenerator::build_report("smartphone_usage_sample.csv", None, &result).unwrap();
    assert_eq!(report.rows_before, 18);
    assert_eq!(report.rows_after, 12);
    assert_eq!(report.rows_removed, 6);

    let path = generator
        .write_report_to_file(&report, "smartphone_usage_sample")
        .unwrap();
    assert!(path.ends_with("smartphone_usage_sample_report.json"));

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["rows_after"], 12);
    assert_eq!(json["cleaning"]["stages"][0]["stage"], "normalize");

    let _ = std::fs::remove_dir_all(&dir);
}
