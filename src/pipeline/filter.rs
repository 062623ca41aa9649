//! Composable record predicates.
//!
//! Every criterion is independently optional and all supplied criteria are
//! AND-ed. Output preserves the relative order of the input, which makes
//! `filter(filter(r, c), c) == filter(r, c)` hold for any criteria.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use super::index::RecordIndex;
use super::record::{is_unknown, parse_date, parse_date_arg, Category, DateKind, Record, VerificationResult};
use super::states::{self, Region};
use crate::error::{Error, Result};

/// Inclusive date bounds on one of the record's dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub field: DateKind,
    #[serde(default, deserialize_with = "lenient_date")]
    pub start: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub end: Option<NaiveDate>,
}

/// Inclusive bounds on the first lane's nominal speed.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VelocityRange {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterCriteria {
    /// State code or name, exact match.
    pub state: Option<String>,
    /// City, exact match.
    pub city: Option<String>,
    /// Any result spelling; compared after canonicalization.
    pub result_category: Option<String>,
    /// Substring of the instrument type.
    pub instrument_type: Option<String>,
    pub free_text: Option<String>,
    pub date_range: Option<DateRange>,
    pub velocity_range: Option<VelocityRange>,
    #[serde(deserialize_with = "lenient_region")]
    pub region: Option<Region>,
}

fn lenient_date<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<NaiveDate>, D::Error> {
    let raw: Option<String> = Option::deserialize(d)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => parse_date(s)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid date '{s}'"))),
    }
}

fn lenient_region<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<Region>, D::Error> {
    let raw: Option<String> = Option::deserialize(d)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => Region::from_str(s)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown region '{s}'"))),
    }
}

fn non_empty(s: &Option<String>) -> Option<&str> {
    s.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl FilterCriteria {
    /// True when no criterion constrains anything.
    pub fn is_empty(&self) -> bool {
        non_empty(&self.state).is_none()
            && non_empty(&self.city).is_none()
            && non_empty(&self.result_category).is_none()
            && non_empty(&self.instrument_type).is_none()
            && non_empty(&self.free_text).is_none()
            && self
                .date_range
                .as_ref()
                .is_none_or(|r| r.start.is_none() && r.end.is_none())
            && self
                .velocity_range
                .is_none_or(|r| r.min.is_none() && r.max.is_none())
            && self.region.is_none()
    }

    /// Criteria set in `other` replace the ones here; unset ones are kept.
    pub fn overlay(self, other: FilterCriteria) -> Self {
        Self {
            state: other.state.or(self.state),
            city: other.city.or(self.city),
            result_category: other.result_category.or(self.result_category),
            instrument_type: other.instrument_type.or(self.instrument_type),
            free_text: other.free_text.or(self.free_text),
            date_range: other.date_range.or(self.date_range),
            velocity_range: other.velocity_range.or(self.velocity_range),
            region: other.region.or(self.region),
        }
    }
}

/// Criteria with every string lower-cased once, ready to test records.
struct Matcher {
    state: Option<String>,
    city: Option<String>,
    result: Option<VerificationResult>,
    instrument_type: Option<String>,
    free_text: Option<String>,
    date_range: Option<(DateKind, Option<NaiveDate>, Option<NaiveDate>)>,
    speed: Option<(Option<f64>, Option<f64>)>,
    region: Option<Region>,
}

impl Matcher {
    fn new(c: &FilterCriteria) -> Self {
        let lower = |s: &Option<String>| non_empty(s).map(str::to_lowercase);
        Self {
            state: lower(&c.state),
            city: lower(&c.city),
            result: non_empty(&c.result_category).map(VerificationResult::parse),
            instrument_type: lower(&c.instrument_type),
            free_text: lower(&c.free_text),
            date_range: c
                .date_range
                .as_ref()
                .filter(|r| r.start.is_some() || r.end.is_some())
                .map(|r| (r.field, r.start, r.end)),
            speed: c
                .velocity_range
                .filter(|r| r.min.is_some() || r.max.is_some())
                .map(|r| (r.min, r.max)),
            region: c.region,
        }
    }

    fn matches(&self, r: &Record) -> bool {
        if let Some(state) = &self.state {
            if r.state_code.to_lowercase() != *state && r.state_name.to_lowercase() != *state {
                return false;
            }
        }
        if let Some(city) = &self.city {
            if r.city.to_lowercase() != *city {
                return false;
            }
        }
        if let Some(result) = self.result {
            if r.last_result != result {
                return false;
            }
        }
        if let Some(kind) = &self.instrument_type {
            if !r.instrument_type.to_lowercase().contains(kind.as_str()) {
                return false;
            }
        }
        if let Some(text) = &self.free_text {
            if !r.search_text().contains(text.as_str()) {
                return false;
            }
        }
        if let Some((field, start, end)) = self.date_range {
            let Some(d) = r.date(field) else {
                return false;
            };
            if start.is_some_and(|s| d < s) || end.is_some_and(|e| d > e) {
                return false;
            }
        }
        if let Some((min, max)) = self.speed {
            let speed = r.first_lane_speed();
            if min.is_some_and(|m| speed < m) || max.is_some_and(|m| speed > m) {
                return false;
            }
        }
        if let Some(region) = self.region {
            if states::by_code(&r.state_code).map(|uf| uf.region) != Some(region) {
                return false;
            }
        }
        true
    }
}

/// Positions of matching records, ascending.
pub fn filter_positions(records: &[Record], criteria: &FilterCriteria) -> Vec<usize> {
    if criteria.is_empty() {
        return (0..records.len()).collect();
    }
    let matcher = Matcher::new(criteria);
    let out: Vec<usize> = records
        .iter()
        .enumerate()
        .filter(|(_, r)| matcher.matches(r))
        .map(|(i, _)| i)
        .collect();
    tracing::debug!(input = records.len(), output = out.len(), "filtered records");
    out
}

/// Matching records, cloned, in input order.
pub fn filter(records: &[Record], criteria: &FilterCriteria) -> Vec<Record> {
    filter_positions(records, criteria)
        .into_iter()
        .map(|i| records[i].clone())
        .collect()
}

/// Same result as [`filter_positions`], but narrows candidates through the
/// index when a categorical criterion is present. Free-text-only criteria
/// fall back to a full scan, as do criteria naming the `"N/A"` sentinel,
/// which the index does not hold.
pub fn filter_indexed(records: &[Record], index: &RecordIndex, criteria: &FilterCriteria) -> Vec<usize> {
    if index.len() != records.len() {
        return filter_positions(records, criteria);
    }
    let mut candidates: Option<&[usize]> = None;
    let lookups = [
        (Category::State, non_empty(&criteria.state).map(str::to_string)),
        (Category::City, non_empty(&criteria.city).map(str::to_string)),
        (
            Category::Result,
            non_empty(&criteria.result_category)
                .map(|s| VerificationResult::parse(s).label().to_string()),
        ),
    ];
    for (category, value) in &lookups {
        if let Some(value) = value {
            if is_unknown(value) {
                return filter_positions(records, criteria);
            }
            let found = index.positions(*category, value);
            if candidates.is_none_or(|c| found.len() < c.len()) {
                candidates = Some(found);
            }
        }
    }

    let Some(candidates) = candidates else {
        return filter_positions(records, criteria);
    };
    let matcher = Matcher::new(criteria);
    candidates
        .iter()
        .copied()
        .filter(|&i| matcher.matches(&records[i]))
        .collect()
}

/// Flat, string-typed form of [`FilterCriteria`] used by the CLI, MCP tools,
/// and plugin flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "mcp", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct CriteriaParams {
    /// State code or name (exact, case-insensitive)
    pub state: Option<String>,
    /// City (exact, case-insensitive)
    pub city: Option<String>,
    /// Result: approved, rejected, unknown, or any source spelling
    pub result: Option<String>,
    /// Instrument type substring
    pub instrument_type: Option<String>,
    /// Free-text search over state, city, site, owner, result, type
    pub search: Option<String>,
    /// Region: norte, nordeste, centro-oeste, sudeste, sul
    pub region: Option<String>,
    /// Date the range applies to: lastVerification (default) or validUntil
    pub date_field: Option<String>,
    /// Inclusive lower date bound (DD/MM/YYYY or YYYY-MM-DD)
    pub date_from: Option<String>,
    /// Inclusive upper date bound (DD/MM/YYYY or YYYY-MM-DD)
    pub date_to: Option<String>,
    /// Minimum nominal speed of the first lane
    pub speed_min: Option<f64>,
    /// Maximum nominal speed of the first lane
    pub speed_max: Option<f64>,
}

impl CriteriaParams {
    pub fn into_criteria(self) -> Result<FilterCriteria> {
        let parse_bound = |s: &Option<String>| non_empty(s).map(parse_date_arg).transpose();
        let start = parse_bound(&self.date_from)?;
        let end = parse_bound(&self.date_to)?;
        let date_range = if start.is_some() || end.is_some() {
            let field = match non_empty(&self.date_field) {
                None => DateKind::LastVerification,
                Some(f) => DateKind::from_str(f).ok_or_else(|| Error::UnknownOption {
                    kind: "date field",
                    value: f.to_string(),
                    expected: "lastVerification, validUntil",
                })?,
            };
            Some(DateRange { field, start, end })
        } else {
            None
        };

        let region = non_empty(&self.region)
            .map(|r| {
                Region::from_str(r).ok_or_else(|| Error::UnknownOption {
                    kind: "region",
                    value: r.to_string(),
                    expected: "norte, nordeste, centro-oeste, sudeste, sul",
                })
            })
            .transpose()?;

        let velocity_range = (self.speed_min.is_some() || self.speed_max.is_some()).then_some(VelocityRange {
            min: self.speed_min,
            max: self.speed_max,
        });

        Ok(FilterCriteria {
            state: self.state,
            city: self.city,
            result_category: self.result,
            instrument_type: self.instrument_type,
            free_text: self.search,
            date_range,
            velocity_range,
            region,
        })
    }
}
