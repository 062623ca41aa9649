//! Canonical record schema produced by the normalizer.
//!
//! Every textual field is populated: absent source values become the
//! [`UNKNOWN`] sentinel. Dates keep their source text for display and carry
//! the parsed calendar value (or `None` when unparsable) for comparisons.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// Sentinel for textual fields missing from the source record.
pub const UNKNOWN: &str = "N/A";

/// True for empty strings and the sentinel.
pub fn is_unknown(s: &str) -> bool {
    let t = s.trim();
    t.is_empty() || t == UNKNOWN
}

/// Grouping key for categorical values: trimmed and lower-cased. Lookups,
/// rankings, option lists, and distinct counts all group by it.
pub fn fold_key(s: &str) -> String {
    s.trim().to_lowercase()
}

// ── Dates ────────────────────────────────────────────────────────────────────

/// Parse a calendar date. Accepts `DD/MM/YYYY` (source format) and
/// `YYYY-MM-DD`, optionally followed by an ISO time part.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if is_unknown(s) {
        return None;
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%d/%m/%Y") {
        return Some(d);
    }
    let date_part = s.split(['T', ' ']).next().unwrap_or(s);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Parse a user-supplied date bound, rejecting garbage instead of ignoring it.
pub fn parse_date_arg(s: &str) -> Result<NaiveDate> {
    parse_date(s).ok_or_else(|| Error::InvalidDate(s.to_string()))
}

/// A date field as it appeared in the source plus its parsed value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateField {
    raw: String,
    parsed: Option<NaiveDate>,
}

impl DateField {
    pub fn new(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::missing();
        }
        Self {
            raw: trimmed.to_string(),
            parsed: parse_date(trimmed),
        }
    }

    pub fn missing() -> Self {
        Self {
            raw: UNKNOWN.to_string(),
            parsed: None,
        }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            raw: date.format("%d/%m/%Y").to_string(),
            parsed: Some(date),
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.parsed
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl Default for DateField {
    fn default() -> Self {
        Self::missing()
    }
}

impl Serialize for DateField {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for DateField {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::new(&raw))
    }
}

// ── Verification result ──────────────────────────────────────────────────────

/// Canonical outcome of a verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum VerificationResult {
    Approved,
    Rejected,
    #[default]
    Unknown,
}

impl VerificationResult {
    /// Map any historical spelling onto the canonical value.
    ///
    /// Rejection words are checked first: "inválido" contains "válido".
    pub fn parse(s: &str) -> Self {
        let folded = fold_accents(&s.trim().to_lowercase());
        if folded.is_empty() || folded == "n/a" {
            return Self::Unknown;
        }
        const REJECTED: &[&str] = &["reprov", "rejeit", "invalid", "reject", "nao aprov"];
        const APPROVED: &[&str] = &["aprov", "valid", "approv"];
        if REJECTED.iter().any(|k| folded.contains(k)) {
            Self::Rejected
        } else if APPROVED.iter().any(|k| folded.contains(k)) {
            Self::Approved
        } else {
            Self::Unknown
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::Unknown => "Unknown",
        }
    }

    /// CSS-style status class used by the table and card views.
    pub fn status_class(&self) -> &'static str {
        match self {
            Self::Approved => "aprovado",
            Self::Rejected => "reprovado",
            Self::Unknown => "pendente",
        }
    }

    pub fn all() -> [Self; 3] {
        [Self::Approved, Self::Rejected, Self::Unknown]
    }
}

/// Strip the Portuguese diacritics that show up in result spellings.
pub fn fold_accents(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'ê' | 'è' => 'e',
            'í' | 'ì' => 'i',
            'ó' | 'ô' | 'õ' | 'ò' => 'o',
            'ú' | 'ü' | 'ù' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

// ── Record ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lane {
    pub lane_number: String,
    pub registry_number: String,
    pub serial_number: String,
    pub direction: String,
    /// Nominal speed in km/h; `0.0` when absent or unparsable.
    pub nominal_speed: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub date: DateField,
    pub result: VerificationResult,
    pub raw_result: String,
    pub site: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub name: String,
    pub city: String,
    pub state: String,
}

impl Owner {
    pub fn unknown() -> Self {
        Self {
            name: UNKNOWN.into(),
            city: UNKNOWN.into(),
            state: UNKNOWN.into(),
        }
    }

    pub fn is_known(&self) -> bool {
        !is_unknown(&self.name)
    }
}

impl Default for Owner {
    fn default() -> Self {
        Self::unknown()
    }
}

/// One verification event for one measurement instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub state_code: String,
    pub state_name: String,
    pub city: String,
    pub verification_site: String,
    pub last_verification_date: DateField,
    pub valid_until_date: DateField,
    pub last_result: VerificationResult,
    /// Result as spelled by the source, for display.
    pub raw_result: String,
    pub instrument_type: String,
    pub verification_code: String,
    pub technician: String,
    pub lanes: Vec<Lane>,
    pub history: Vec<HistoryEntry>,
    pub owner: Owner,
}

/// Which date a date-range filter or trend looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DateKind {
    LastVerification,
    ValidUntil,
}

impl DateKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "lastverification" | "lastverificationdate" | "last_verification" | "verification" => {
                Some(Self::LastVerification)
            }
            "validuntil" | "validuntildate" | "valid_until" | "validity" | "expiry" => {
                Some(Self::ValidUntil)
            }
            _ => None,
        }
    }
}

/// Grouping dimensions shared by the index, rankings, and distinct values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    State,
    City,
    Type,
    Result,
    Owner,
}

impl Category {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "state" | "estado" | "uf" => Some(Self::State),
            "city" | "cidade" | "municipio" => Some(Self::City),
            "type" | "tipo" | "instrumenttype" => Some(Self::Type),
            "result" | "resultado" | "status" => Some(Self::Result),
            "owner" | "proprietario" => Some(Self::Owner),
            _ => None,
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        Self::from_str(s).ok_or_else(|| Error::UnknownCategory(s.to_string()))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::State => "state",
            Self::City => "city",
            Self::Type => "type",
            Self::Result => "result",
            Self::Owner => "owner",
        }
    }

    pub fn all() -> [Self; 5] {
        [Self::State, Self::City, Self::Type, Self::Result, Self::Owner]
    }
}

impl Record {
    /// Nominal speed of the first lane, `0.0` when there are no lanes.
    pub fn first_lane_speed(&self) -> f64 {
        self.lanes.first().map(|l| l.nominal_speed).unwrap_or(0.0)
    }

    pub fn date(&self, kind: DateKind) -> Option<NaiveDate> {
        match kind {
            DateKind::LastVerification => self.last_verification_date.date(),
            DateKind::ValidUntil => self.valid_until_date.date(),
        }
    }

    /// Display value of a grouping dimension. States prefer the full name.
    pub fn category_value(&self, category: Category) -> &str {
        match category {
            Category::State => {
                if is_unknown(&self.state_name) {
                    &self.state_code
                } else {
                    &self.state_name
                }
            }
            Category::City => &self.city,
            Category::Type => &self.instrument_type,
            Category::Result => self.last_result.label(),
            Category::Owner => &self.owner.name,
        }
    }

    /// Lower-cased concatenation searched by the free-text filter.
    pub fn search_text(&self) -> String {
        [
            self.state_code.as_str(),
            self.state_name.as_str(),
            self.city.as_str(),
            self.verification_site.as_str(),
            self.owner.name.as_str(),
            self.last_result.label(),
            self.raw_result.as_str(),
            self.instrument_type.as_str(),
        ]
        .join(" ")
        .to_lowercase()
    }

    /// True when `validUntilDate` is strictly before `today`.
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.valid_until_date.date().is_some_and(|d| d < today)
    }
}
