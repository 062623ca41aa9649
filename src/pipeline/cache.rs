//! Dataset fingerprinting and snapshot metadata.
//!
//! Always compiled. Only the SQLite backend (`storage.rs`) requires the
//! `cache` feature.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use siphasher::sip::SipHasher13;
use std::hash::{Hash, Hasher};
use std::time::{SystemTime, UNIX_EPOCH};

use super::record::Record;

/// Metadata stored alongside a cached raw dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    /// SipHash of the serialized payload (detects data changes).
    pub fingerprint: u64,
    pub row_count: usize,
    /// Crate version when the snapshot was written (detects upgrades).
    pub version: String,
    /// Unix timestamp when the snapshot was written.
    pub created_at: u64,
}

impl SnapshotMeta {
    pub fn new(fingerprint: u64, row_count: usize) -> Self {
        Self {
            fingerprint,
            row_count,
            version: env!("CARGO_PKG_VERSION").to_string(),
            created_at: now_secs(),
        }
    }

    pub fn age_secs(&self, now: u64) -> u64 {
        now.saturating_sub(self.created_at)
    }
}

pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn sip_json(value: &impl Serialize) -> u64 {
    let json = serde_json::to_string(value).unwrap_or_default();
    let mut hasher = SipHasher13::new();
    json.hash(&mut hasher);
    hasher.finish()
}

/// Fingerprint of a raw dataset as fetched or loaded.
pub fn fingerprint_raw(raw: &[Value]) -> u64 {
    if raw.is_empty() {
        return 0;
    }
    sip_json(&raw)
}

/// Fingerprint of a normalized record set.
pub fn fingerprint_records(records: &[Record]) -> u64 {
    if records.is_empty() {
        return 0;
    }
    sip_json(&records)
}

/// A snapshot is usable when written by this crate version and, if a
/// maximum age is configured, no older than that.
pub fn is_valid(meta: &SnapshotMeta, max_age_secs: Option<u64>, now: u64) -> bool {
    meta.version == env!("CARGO_PKG_VERSION") && max_age_secs.is_none_or(|max| meta.age_secs(now) <= max)
}
