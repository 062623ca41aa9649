//! Counts, rates, speed statistics, rankings, and time series over any
//! record subset. Empty input degrades every figure to zero.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use chrono::{Datelike, Local, NaiveDate};
use serde::{Serialize, Serializer};

use super::record::{fold_key, is_unknown, Category, Record, VerificationResult};

/// Owner placeholder used by some exports in place of an empty field.
const OWNER_NOT_INFORMED: &str = "Não informado";

/// A percentage rounded to one decimal place. Serializes as text (`"42.9"`)
/// so consumers show exactly the rounded figure.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Percentage(f64);

impl Percentage {
    /// `part / whole * 100`, or zero when `whole` is zero.
    pub fn of(part: usize, whole: usize) -> Self {
        if whole == 0 {
            return Self(0.0);
        }
        Self((part as f64 / whole as f64 * 1000.0).round() / 10.0)
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}

impl Serialize for Percentage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub total: usize,
    pub approved_count: usize,
    pub rejected_count: usize,
    pub unknown_count: usize,
    pub approval_rate: Percentage,
    pub rejection_rate: Percentage,
    pub distinct_state_count: usize,
    pub distinct_city_count: usize,
    pub expired_count: usize,
    pub expired_rate: Percentage,
    /// Mean over records with a positive first-lane speed, rounded.
    pub average_nominal_speed: u64,
    pub min_nominal_speed: f64,
    pub max_nominal_speed: f64,
}

/// Compute metrics with "now" fixed to `today`.
pub fn compute_metrics_at(records: &[Record], today: NaiveDate) -> Metrics {
    let mut approved = 0;
    let mut rejected = 0;
    let mut expired = 0;
    let mut states: HashSet<&str> = HashSet::new();
    let mut cities: HashSet<String> = HashSet::new();
    let mut speed_sum = 0.0;
    let mut speed_n = 0usize;
    let mut min_speed = f64::INFINITY;
    let mut max_speed = 0.0f64;

    for r in records {
        match r.last_result {
            VerificationResult::Approved => approved += 1,
            VerificationResult::Rejected => rejected += 1,
            VerificationResult::Unknown => {}
        }
        if r.is_expired(today) {
            expired += 1;
        }
        if !is_unknown(&r.state_code) {
            states.insert(r.state_code.as_str());
        }
        if !is_unknown(&r.city) {
            cities.insert(fold_key(&r.city));
        }
        let speed = r.first_lane_speed();
        if speed > 0.0 {
            speed_sum += speed;
            speed_n += 1;
            min_speed = min_speed.min(speed);
            max_speed = max_speed.max(speed);
        }
    }

    let total = records.len();
    let metrics = Metrics {
        total,
        approved_count: approved,
        rejected_count: rejected,
        unknown_count: total - approved - rejected,
        approval_rate: Percentage::of(approved, total),
        rejection_rate: Percentage::of(rejected, total),
        distinct_state_count: states.len(),
        distinct_city_count: cities.len(),
        expired_count: expired,
        expired_rate: Percentage::of(expired, total),
        average_nominal_speed: if speed_n == 0 {
            0
        } else {
            (speed_sum / speed_n as f64).round() as u64
        },
        min_nominal_speed: if speed_n == 0 { 0.0 } else { min_speed },
        max_nominal_speed: max_speed,
    };
    tracing::debug!(total, approved, rejected, expired, "computed metrics");
    metrics
}

/// Compute metrics against the local calendar date.
pub fn compute_metrics(records: &[Record]) -> Metrics {
    compute_metrics_at(records, Local::now().date_naive())
}

/// One ranking or series bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bucket {
    pub value: String,
    pub count: usize,
}

fn rankable(category: Category, value: &str) -> bool {
    !is_unknown(value) && !(category == Category::Owner && value == OWNER_NOT_INFORMED)
}

/// Up to `n` most frequent values of `category`, by count descending. Values
/// differing only in case share a bucket labelled with the first spelling
/// seen. Ties keep first-encountered order. Sentinel values are not ranked.
pub fn top_n(records: &[Record], category: Category, n: usize) -> Vec<Bucket> {
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut buckets: Vec<Bucket> = Vec::new();
    for r in records {
        let value = r.category_value(category);
        if !rankable(category, value) {
            continue;
        }
        match slots.get(&fold_key(value)) {
            Some(&i) => buckets[i].count += 1,
            None => {
                slots.insert(fold_key(value), buckets.len());
                buckets.push(Bucket { value: value.trim().to_string(), count: 1 });
            }
        }
    }
    // sort_by is stable
    buckets.sort_by(|a, b| b.count.cmp(&a.count));
    buckets.truncate(n);
    buckets
}

/// Sorted unique values of a category, for filter option lists. Values are
/// unique up to case; each keeps its first spelling.
pub fn distinct(records: &[Record], category: Category) -> Vec<String> {
    let mut seen: BTreeMap<String, &str> = BTreeMap::new();
    for value in records
        .iter()
        .map(|r| r.category_value(category))
        .filter(|v| rankable(category, v))
    {
        seen.entry(fold_key(value)).or_insert(value.trim());
    }
    seen.into_values().map(str::to_string).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Trends {
    /// Counts per canonical result, always all three.
    pub result_distribution: Vec<Bucket>,
    /// `YYYY-MM` of `validUntilDate`, ascending.
    pub validity_by_month: Vec<Bucket>,
    /// Last N calendar years of `lastVerificationDate`, ascending, zeros kept.
    pub verifications_by_year: Vec<Bucket>,
}

pub fn result_distribution(records: &[Record]) -> Vec<Bucket> {
    VerificationResult::all()
        .into_iter()
        .map(|res| Bucket {
            value: res.label().to_string(),
            count: records.iter().filter(|r| r.last_result == res).count(),
        })
        .collect()
}

pub fn validity_by_month(records: &[Record]) -> Vec<Bucket> {
    let mut months: BTreeMap<String, usize> = BTreeMap::new();
    for d in records.iter().filter_map(|r| r.valid_until_date.date()) {
        *months.entry(d.format("%Y-%m").to_string()).or_default() += 1;
    }
    months
        .into_iter()
        .map(|(value, count)| Bucket { value, count })
        .collect()
}

/// Longest year series `verifications_by_year` builds.
pub const MAX_TREND_YEARS: usize = 1000;

/// Verifications per calendar year for the `years` years ending in `today`'s
/// year, capped at [`MAX_TREND_YEARS`].
pub fn verifications_by_year(records: &[Record], years: usize, today: NaiveDate) -> Vec<Bucket> {
    if years == 0 {
        return Vec::new();
    }
    let back = i32::try_from(years.min(MAX_TREND_YEARS) - 1).unwrap_or(0);
    let current = today.year();
    let first = current.saturating_sub(back);
    let mut counts: BTreeMap<i32, usize> = (first..=current).map(|y| (y, 0)).collect();
    for d in records.iter().filter_map(|r| r.last_verification_date.date()) {
        if let Some(c) = counts.get_mut(&d.year()) {
            *c += 1;
        }
    }
    counts
        .into_iter()
        .map(|(y, count)| Bucket { value: y.to_string(), count })
        .collect()
}

pub fn trends_at(records: &[Record], years: usize, today: NaiveDate) -> Trends {
    Trends {
        result_distribution: result_distribution(records),
        validity_by_month: validity_by_month(records),
        verifications_by_year: verifications_by_year(records, years, today),
    }
}

pub fn trends(records: &[Record], years: usize) -> Trends {
    trends_at(records, years, Local::now().date_naive())
}
