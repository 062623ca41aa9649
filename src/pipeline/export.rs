//! Flat exports (quoted CSV, pretty JSON) and display rows for renderers.

use chrono::NaiveDate;
use csv::{QuoteStyle, WriterBuilder};
use serde::Serialize;

use super::record::{Record, UNKNOWN};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        Self::from_str(s).ok_or_else(|| Error::UnknownOption {
            kind: "export format",
            value: s.to_string(),
            expected: "json, csv",
        })
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }
}

/// CSV header, in column order.
pub const CSV_COLUMNS: [&str; 11] = [
    "stateCode",
    "stateName",
    "city",
    "verificationSite",
    "lastVerificationDate",
    "validUntilDate",
    "lastResult",
    "instrumentType",
    "ownerName",
    "laneCount",
    "nominalSpeed",
];

/// Speed without a trailing `.0`; the sentinel when there is none.
pub fn format_speed(speed: f64) -> String {
    if speed <= 0.0 {
        UNKNOWN.to_string()
    } else if speed.fract() == 0.0 {
        format!("{speed:.0}")
    } else {
        speed.to_string()
    }
}

fn csv_row(r: &Record) -> [String; 11] {
    [
        r.state_code.clone(),
        r.state_name.clone(),
        r.city.clone(),
        r.verification_site.clone(),
        r.last_verification_date.as_str().to_string(),
        r.valid_until_date.as_str().to_string(),
        r.raw_result.clone(),
        r.instrument_type.clone(),
        r.owner.name.clone(),
        r.lanes.len().to_string(),
        format_speed(r.first_lane_speed()),
    ]
}

/// Every field double-quoted; embedded quotes are doubled.
pub fn to_csv(records: &[Record]) -> Result<String> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_writer(Vec::new());
    writer
        .write_record(CSV_COLUMNS)
        .map_err(|e| Error::Export(e.to_string()))?;
    for r in records {
        writer
            .write_record(csv_row(r))
            .map_err(|e| Error::Export(e.to_string()))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| Error::Export(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| Error::Export(e.to_string()))
}

pub fn to_json(records: &[Record]) -> Result<String> {
    Ok(serde_json::to_string_pretty(records)?)
}

pub fn export(records: &[Record], format: ExportFormat) -> Result<String> {
    let out = match format {
        ExportFormat::Json => to_json(records)?,
        ExportFormat::Csv => to_csv(records)?,
    };
    tracing::debug!(count = records.len(), format = format.extension(), bytes = out.len(), "exported records");
    Ok(out)
}

/// `dados-inmetro-YYYY-MM-DD.{json,csv}`
pub fn export_file_name(format: ExportFormat, date: NaiveDate) -> String {
    format!("dados-inmetro-{}.{}", date.format("%Y-%m-%d"), format.extension())
}

/// Display strings for one table row or card.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewRow {
    pub state: String,
    pub state_name: String,
    pub city: String,
    pub site: String,
    pub last_verification: String,
    pub valid_until: String,
    pub result: String,
    pub status_class: &'static str,
    pub instrument_type: String,
    pub owner: String,
    pub lanes: usize,
    pub nominal_speed: String,
    pub expired: bool,
}

impl ViewRow {
    pub fn from_record(r: &Record, today: NaiveDate) -> Self {
        Self {
            state: r.state_code.clone(),
            state_name: r.state_name.clone(),
            city: r.city.clone(),
            site: r.verification_site.clone(),
            last_verification: r.last_verification_date.as_str().to_string(),
            valid_until: r.valid_until_date.as_str().to_string(),
            result: r.raw_result.clone(),
            status_class: r.last_result.status_class(),
            instrument_type: r.instrument_type.clone(),
            owner: r.owner.name.clone(),
            lanes: r.lanes.len(),
            nominal_speed: match format_speed(r.first_lane_speed()) {
                s if s == UNKNOWN => s,
                s => format!("{s} km/h"),
            },
            expired: r.is_expired(today),
        }
    }
}

pub fn view_rows(records: &[Record], today: NaiveDate) -> Vec<ViewRow> {
    records.iter().map(|r| ViewRow::from_record(r, today)).collect()
}
