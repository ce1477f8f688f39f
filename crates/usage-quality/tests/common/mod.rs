//! Shared helpers for the integration and property tests.

#![allow(dead_code)]

use polars::prelude::*;
use std::path::PathBuf;
use usage_quality::schema::*;
use usage_quality::{Dataset, PipelineConfig};

pub fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// One input record, with every field given as raw text or a number.
#[derive(Debug, Clone)]
pub struct UsageRow {
    pub age: f64,
    pub gender: String,
    pub total: f64,
    pub daily: f64,
    pub apps: f64,
    pub social: f64,
    pub productivity: f64,
    pub gaming: f64,
    pub location: String,
}

impl Default for UsageRow {
    fn default() -> Self {
        Self {
            age: 30.0,
            gender: "Female".to_string(),
            total: 3.0,
            daily: 5.0,
            apps: 20.0,
            social: 1.0,
            productivity: 1.0,
            gaming: 1.0,
            location: "Chicago".to_string(),
        }
    }
}

pub fn frame(rows: &[UsageRow]) -> DataFrame {
    df! {
        AGE => rows.iter().map(|r| r.age).collect::<Vec<_>>(),
        GENDER => rows.iter().map(|r| r.gender.clone()).collect::<Vec<_>>(),
        TOTAL_APP_USAGE => rows.iter().map(|r| r.total).collect::<Vec<_>>(),
        DAILY_SCREEN_TIME => rows.iter().map(|r| r.daily).collect::<Vec<_>>(),
        NUMBER_OF_APPS => rows.iter().map(|r| r.apps).collect::<Vec<_>>(),
        SOCIAL_MEDIA => rows.iter().map(|r| r.social).collect::<Vec<_>>(),
        PRODUCTIVITY => rows.iter().map(|r| r.productivity).collect::<Vec<_>>(),
        GAMING => rows.iter().map(|r| r.gaming).collect::<Vec<_>>(),
        LOCATION => rows.iter().map(|r| r.location.clone()).collect::<Vec<_>>(),
    }
    .unwrap()
}

pub fn dataset(rows: &[UsageRow]) -> Dataset {
    Dataset::new(frame(rows)).unwrap()
}

fn column(dataset: &Dataset, name: &str) -> Vec<f64> {
    dataset
        .float_column(name)
        .unwrap()
        .into_iter()
        .map(|v| v.expect("clean data has no nulls"))
        .collect()
}

/// Assert every row of a pipeline output satisfies the record invariants.
pub fn assert_clean(dataset: &Dataset, config: &PipelineConfig) {
    let age = column(dataset, AGE);
    let apps = column(dataset, NUMBER_OF_APPS);
    let total = column(dataset, TOTAL_APP_USAGE);
    let daily = column(dataset, DAILY_SCREEN_TIME);
    let social = column(dataset, SOCIAL_MEDIA);
    let productivity = column(dataset, PRODUCTIVITY);
    let gaming = column(dataset, GAMING);
    let genders = dataset.string_column(GENDER).unwrap();
    let locations = dataset.string_column(LOCATION).unwrap();

    for i in 0..dataset.height() {
        assert!(age[i] >= config.age_range.0 && age[i] <= config.age_range.1, "age {}", age[i]);
        assert_eq!(age[i].fract(), 0.0);
        assert!(apps[i] >= config.apps_range.0 && apps[i] <= config.apps_range.1, "apps {}", apps[i]);
        assert_eq!(apps[i].fract(), 0.0);

        for hours in [total[i], daily[i], social[i], productivity[i], gaming[i]] {
            assert!(hours.is_finite() && hours >= 0.0, "hours {}", hours);
        }
        assert!(daily[i] <= config.max_daily_hours, "daily {}", daily[i]);
        assert_eq!(total[i], (social[i] + productivity[i]) + gaming[i]);
        assert!(daily[i] >= total[i], "daily {} < total {}", daily[i], total[i]);

        let gender = genders[i].as_deref().unwrap();
        assert!(gender == "Male" || gender == "Female", "gender {}", gender);
        assert!(locations[i].is_some());
    }

    let unique = dataset
        .frame()
        .unique_stable(None, UniqueKeepStrategy::First, None)
        .unwrap();
    assert_eq!(unique.height(), dataset.height(), "duplicate rows in output");
}
