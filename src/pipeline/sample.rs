//! Bundled sample dataset, compiled into the binary.
//!
//! Used when no network data is available. Mixes the PascalCase feed layout
//! with the older lowercase layout so both paths of the normalizer run.

use serde_json::Value;

use super::normalize::normalize_all;
use super::record::Record;

const SAMPLE_JSON: &str = include_str!("../../data/sample.json");

/// Raw sample records. A corrupt bundle yields an empty set.
pub fn sample_raw() -> Vec<Value> {
    match serde_json::from_str::<Vec<Value>>(SAMPLE_JSON) {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!(error = %e, "bundled sample is not a JSON array");
            Vec::new()
        }
    }
}

pub fn sample_records() -> Vec<Record> {
    normalize_all(&sample_raw())
}
