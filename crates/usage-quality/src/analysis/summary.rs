use super::statistics::{ColumnStats, pearson};
use crate::dataset::Dataset;
use crate::error::Result;
use crate::schema::{
    AGE, DAILY_SCREEN_TIME, GAMING, GENDER, LOCATION, NUMBER_OF_APPS, PRODUCTIVITY, SOCIAL_MEDIA,
    TOTAL_APP_USAGE,
};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Numeric columns described by the summary, in report order.
pub const SUMMARY_COLUMNS: [&str; 7] = [
    AGE,
    TOTAL_APP_USAGE,
    DAILY_SCREEN_TIME,
    NUMBER_OF_APPS,
    SOCIAL_MEDIA,
    PRODUCTIVITY,
    GAMING,
];

/// Columns taking part in the correlation matrix.
pub const CORRELATION_COLUMNS: [&str; 4] =
    [AGE, TOTAL_APP_USAGE, DAILY_SCREEN_TIME, NUMBER_OF_APPS];

/// `(upper bound, label)` for right-inclusive age bins starting above zero.
const AGE_BINS: [(f64, &str); 5] = [
    (25.0, "18-25"),
    (35.0, "26-35"),
    (45.0, "36-45"),
    (55.0, "46-55"),
    (100.0, "56+"),
];

const AGE_GROUP: &str = "Age_Group";
const COUNT: &str = "count";

const NOTABLE_CORRELATION: f64 = 0.3;
const STRONG_CORRELATION: f64 = 0.7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub value: String,
    pub count: usize,
    pub percentage: f64,
}

/// Means of every summary column for one category value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMeans {
    pub group: String,
    pub count: usize,
    pub means: BTreeMap<String, f64>,
}

impl GroupMeans {
    pub fn mean_of(&self, column: &str) -> Option<f64> {
        self.means.get(column).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgeGroupStats {
    pub label: String,
    pub count: usize,
    pub apps_mean: Option<f64>,
    pub apps_std: Option<f64>,
    pub total_usage_mean: Option<f64>,
    pub total_usage_std: Option<f64>,
    pub social_media_mean: Option<f64>,
    pub gaming_mean: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationDirection {
    Positive,
    Negative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationStrength {
    Weak,
    Moderate,
    Strong,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correlation {
    pub left: String,
    pub right: String,
    pub coefficient: f64,
    pub direction: CorrelationDirection,
    pub strength: CorrelationStrength,
}

impl Correlation {
    fn new(left: &str, right: &str, coefficient: f64) -> Self {
        let direction = if coefficient >= 0.0 {
            CorrelationDirection::Positive
        } else {
            CorrelationDirection::Negative
        };
        let magnitude = coefficient.abs();
        let strength = if magnitude > STRONG_CORRELATION {
            CorrelationStrength::Strong
        } else if magnitude > NOTABLE_CORRELATION {
            CorrelationStrength::Moderate
        } else {
            CorrelationStrength::Weak
        };
        Self {
            left: left.to_string(),
            right: right.to_string(),
            coefficient,
            direction,
            strength,
        }
    }

    pub fn is_notable(&self) -> bool {
        self.strength != CorrelationStrength::Weak
    }

    /// e.g. "strong positive"
    pub fn describe(&self) -> String {
        let strength = match self.strength {
            CorrelationStrength::Strong => "strong",
            CorrelationStrength::Moderate => "moderate",
            CorrelationStrength::Weak => "weak",
        };
        let direction = match self.direction {
            CorrelationDirection::Positive => "positive",
            CorrelationDirection::Negative => "negative",
        };
        format!("{strength} {direction}")
    }
}

/// Headline averages over the clean data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageInsights {
    pub mean_age: Option<f64>,
    pub mean_total_app_usage: Option<f64>,
    pub mean_daily_screen_time: Option<f64>,
    pub mean_social_media: Option<f64>,
    pub mean_productivity: Option<f64>,
    pub mean_gaming: Option<f64>,
    pub mean_apps_used: Option<f64>,
}

/// Descriptive statistics of a cleaned dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub rows: usize,
    pub column_stats: Vec<ColumnStats>,
    pub gender_distribution: Vec<CategoryCount>,
    pub gender_means: Vec<GroupMeans>,
    pub location_distribution: Vec<CategoryCount>,
    /// Ordered by mean daily screen time, highest first.
    pub location_means: Vec<GroupMeans>,
    pub age_groups: Vec<AgeGroupStats>,
    /// Every defined pair of [`CORRELATION_COLUMNS`], by |r| descending.
    pub correlations: Vec<Correlation>,
    pub insights: UsageInsights,
}

impl DatasetSummary {
    pub fn from_dataset(dataset: &Dataset) -> Result<Self> {
        let frame = dataset.frame();

        let column_stats: Vec<ColumnStats> = SUMMARY_COLUMNS
            .iter()
            .map(|&name| ColumnStats::from_column(frame.column(name)?))
            .collect::<PolarsResult<_>>()?;

        let gender_distribution = distribution(frame, GENDER)?;
        let gender_means = group_means(frame, GENDER)?;

        let location_distribution = distribution(frame, LOCATION)?;
        let mut location_means = group_means(frame, LOCATION)?;
        location_means.sort_by(|a, b| {
            let ma = a.mean_of(DAILY_SCREEN_TIME).unwrap_or(f64::NEG_INFINITY);
            let mb = b.mean_of(DAILY_SCREEN_TIME).unwrap_or(f64::NEG_INFINITY);
            mb.total_cmp(&ma).then_with(|| a.group.cmp(&b.group))
        });

        let age_groups = age_groups(frame)?;
        let correlations = correlations(frame)?;

        let col_mean = |name: &str| {
            column_stats
                .iter()
                .find(|s| s.column == name)
                .and_then(|s| s.mean)
        };
        let insights = UsageInsights {
            mean_age: col_mean(AGE),
            mean_total_app_usage: col_mean(TOTAL_APP_USAGE),
            mean_daily_screen_time: col_mean(DAILY_SCREEN_TIME),
            mean_social_media: col_mean(SOCIAL_MEDIA),
            mean_productivity: col_mean(PRODUCTIVITY),
            mean_gaming: col_mean(GAMING),
            mean_apps_used: col_mean(NUMBER_OF_APPS),
        };

        debug!(
            "Summary: {} rows, {} genders, {} locations, {} age groups, {} notable correlations",
            dataset.height(),
            gender_distribution.len(),
            location_distribution.len(),
            age_groups.len(),
            correlations.iter().filter(|c| c.is_notable()).count()
        );

        Ok(Self {
            rows: dataset.height(),
            column_stats,
            gender_distribution,
            gender_means,
            location_distribution,
            location_means,
            age_groups,
            correlations,
            insights,
        })
    }

    pub fn column(&self, name: &str) -> Option<&ColumnStats> {
        self.column_stats.iter().find(|s| s.column == name)
    }

    /// Correlations with |r| above the notable threshold.
    pub fn notable_correlations(&self) -> impl Iterator<Item = &Correlation> {
        self.correlations.iter().filter(|c| c.is_notable())
    }
}

/// Value counts ordered by count descending, then value.
fn distribution(frame: &DataFrame, key: &str) -> PolarsResult<Vec<CategoryCount>> {
    let values = frame.column(key)?.as_materialized_series().drop_nulls();
    let total = values.len();
    let counts = values.value_counts(true, false, COUNT.into(), false)?;

    let names = counts
        .column(key)?
        .as_materialized_series()
        .cast(&DataType::String)?;
    let tallies = counts
        .column(COUNT)?
        .as_materialized_series()
        .cast(&DataType::UInt64)?;

    let mut out: Vec<CategoryCount> = names
        .str()?
        .into_iter()
        .zip(tallies.u64()?)
        .filter_map(|(value, count)| Some((value?, count? as usize)))
        .map(|(value, count)| CategoryCount {
            value: value.to_string(),
            count,
            percentage: count as f64 / total as f64 * 100.0,
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    Ok(out)
}

/// Per-category means of every summary column, ordered like [`distribution`].
fn group_means(frame: &DataFrame, key: &str) -> PolarsResult<Vec<GroupMeans>> {
    let mut aggs = vec![len().alias(COUNT)];
    aggs.extend(
        SUMMARY_COLUMNS
            .iter()
            .map(|&name| col(name).cast(DataType::Float64).mean()),
    );

    let grouped = frame
        .clone()
        .lazy()
        .filter(col(key).is_not_null())
        .group_by([col(key)])
        .agg(aggs)
        .collect()?;

    let groups = grouped
        .column(key)?
        .as_materialized_series()
        .cast(&DataType::String)?;
    let counts = row_counts(&grouped)?;

    let mut out = Vec::with_capacity(grouped.height());
    for (i, group) in groups.str()?.into_iter().enumerate() {
        let Some(group) = group else {
            continue;
        };
        let mut means = BTreeMap::new();
        for name in SUMMARY_COLUMNS {
            if let Some(mean) = float_at(&grouped, name, i)? {
                means.insert(name.to_string(), mean);
            }
        }
        out.push(GroupMeans {
            group: group.to_string(),
            count: counts[i],
            means,
        });
    }
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.group.cmp(&b.group)));
    Ok(out)
}

fn row_counts(grouped: &DataFrame) -> PolarsResult<Vec<usize>> {
    let counts = grouped
        .column(COUNT)?
        .as_materialized_series()
        .cast(&DataType::UInt64)?;
    Ok(counts
        .u64()?
        .into_iter()
        .map(|c| c.unwrap_or(0) as usize)
        .collect())
}

fn float_at(frame: &DataFrame, name: &str, row: usize) -> PolarsResult<Option<f64>> {
    let series = frame
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    Ok(series.f64()?.get(row))
}

fn age_bin(age: f64) -> Option<usize> {
    if age <= 0.0 {
        return None;
    }
    AGE_BINS.iter().position(|(upper, _)| age <= *upper)
}

fn age_groups(frame: &DataFrame) -> PolarsResult<Vec<AgeGroupStats>> {
    let ages = frame
        .column(AGE)?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    let labels: Vec<Option<&str>> = ages
        .f64()?
        .into_iter()
        .map(|age| age.and_then(age_bin).map(|bin| AGE_BINS[bin].1))
        .collect();

    let mut binned = frame.clone();
    binned.with_column(Series::new(AGE_GROUP.into(), labels))?;

    let apps = col(NUMBER_OF_APPS).cast(DataType::Float64);
    let total = col(TOTAL_APP_USAGE).cast(DataType::Float64);
    let grouped = binned
        .lazy()
        .filter(col(AGE_GROUP).is_not_null())
        .group_by([col(AGE_GROUP)])
        .agg([
            len().alias(COUNT),
            apps.clone().mean().alias("apps_mean"),
            apps.std(1).alias("apps_std"),
            total.clone().mean().alias("total_usage_mean"),
            total.std(1).alias("total_usage_std"),
            col(SOCIAL_MEDIA).cast(DataType::Float64).mean(),
            col(GAMING).cast(DataType::Float64).mean(),
        ])
        .collect()?;

    let group_labels = grouped
        .column(AGE_GROUP)?
        .as_materialized_series()
        .cast(&DataType::String)?;
    let rows_by_label: HashMap<String, usize> = group_labels
        .str()?
        .into_iter()
        .enumerate()
        .filter_map(|(i, label)| Some((label?.to_string(), i)))
        .collect();
    let counts = row_counts(&grouped)?;

    let mut out = Vec::with_capacity(rows_by_label.len());
    for (_, label) in AGE_BINS {
        let Some(&i) = rows_by_label.get(label) else {
            continue;
        };
        out.push(AgeGroupStats {
            label: label.to_string(),
            count: counts[i],
            apps_mean: float_at(&grouped, "apps_mean", i)?,
            apps_std: float_at(&grouped, "apps_std", i)?,
            total_usage_mean: float_at(&grouped, "total_usage_mean", i)?,
            total_usage_std: float_at(&grouped, "total_usage_std", i)?,
            social_media_mean: float_at(&grouped, SOCIAL_MEDIA, i)?,
            gaming_mean: float_at(&grouped, GAMING, i)?,
        });
    }
    Ok(out)
}

fn correlations(frame: &DataFrame) -> PolarsResult<Vec<Correlation>> {
    let mut out = Vec::new();
    for (i, left) in CORRELATION_COLUMNS.iter().enumerate() {
        for right in &CORRELATION_COLUMNS[i + 1..] {
            if let Some(r) = pearson(frame, left, right)? {
                out.push(Correlation::new(left, right, r));
            }
        }
    }
    out.sort_by(|a, b| b.coefficient.abs().total_cmp(&a.coefficient.abs()));
    Ok(out)
}
