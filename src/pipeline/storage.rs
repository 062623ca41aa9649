//! SQLite-backed store for the last loaded raw dataset per origin.
//!
//! One row per origin; a new load of the same origin replaces the old one.
//! Opt-in via the `cache` feature.

use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use super::cache::{fingerprint_raw, SnapshotMeta};
use super::source::DataOrigin;
use crate::error::{Error, Result};

fn cache_err(context: &str, e: impl std::fmt::Display) -> Error {
    Error::Cache(format!("{context}: {e}"))
}

pub struct SnapshotStore {
    conn: Connection,
}

impl SnapshotStore {
    /// Open (or create) a snapshot database at the given path.
    pub fn open_or_create(path: &str) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| cache_err(&format!("open '{path}'"), e))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(|e| cache_err("set PRAGMA", e))?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS dataset_snapshots (
                origin       TEXT PRIMARY KEY,
                fingerprint  INTEGER NOT NULL,
                row_count    INTEGER NOT NULL,
                version      TEXT NOT NULL,
                created_at   INTEGER NOT NULL,
                payload      BLOB NOT NULL
            );",
        )
        .map_err(|e| cache_err("create schema", e))?;

        Ok(Self { conn })
    }

    /// Store (upsert) the raw rows of one origin. Returns the written metadata.
    pub fn put(&self, origin: DataOrigin, rows: &[Value]) -> Result<SnapshotMeta> {
        let payload = serde_json::to_vec(rows)?;
        let meta = SnapshotMeta::new(fingerprint_raw(rows), rows.len());
        self.conn
            .execute(
                "INSERT INTO dataset_snapshots (origin, fingerprint, row_count, version, created_at, payload)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(origin)
                 DO UPDATE SET fingerprint = excluded.fingerprint,
                               row_count = excluded.row_count,
                               version = excluded.version,
                               created_at = excluded.created_at,
                               payload = excluded.payload",
                params![
                    origin.as_str(),
                    meta.fingerprint as i64,
                    meta.row_count as i64,
                    meta.version,
                    meta.created_at as i64,
                    payload,
                ],
            )
            .map_err(|e| cache_err("upsert snapshot", e))?;
        tracing::debug!(origin = origin.as_str(), rows = rows.len(), "snapshot stored");
        Ok(meta)
    }

    /// Retrieve the snapshot of one origin. `None` on miss.
    pub fn get(&self, origin: DataOrigin) -> Result<Option<(SnapshotMeta, Vec<Value>)>> {
        let row = self
            .conn
            .query_row(
                "SELECT fingerprint, row_count, version, created_at, payload
                 FROM dataset_snapshots WHERE origin = ?1",
                params![origin.as_str()],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, Vec<u8>>(4)?,
                    ))
                },
            )
            .optional()
            .map_err(|e| cache_err("query snapshot", e))?;

        let Some((fingerprint, row_count, version, created_at, payload)) = row else {
            return Ok(None);
        };
        let rows: Vec<Value> = serde_json::from_slice(&payload)?;
        let meta = SnapshotMeta {
            fingerprint: fingerprint as u64,
            row_count: row_count as usize,
            version,
            created_at: created_at as u64,
        };
        Ok(Some((meta, rows)))
    }

    /// Delete one origin's snapshot, or all of them when `origin` is `None`.
    pub fn invalidate(&self, origin: Option<DataOrigin>) -> Result<usize> {
        match origin {
            Some(o) => self
                .conn
                .execute("DELETE FROM dataset_snapshots WHERE origin = ?1", params![o.as_str()])
                .map_err(|e| cache_err("invalidate", e)),
            None => self
                .conn
                .execute("DELETE FROM dataset_snapshots", [])
                .map_err(|e| cache_err("invalidate all", e)),
        }
    }

    pub fn info(&self) -> Result<Vec<SnapshotInfo>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT origin, fingerprint, row_count, version, created_at, length(payload)
                 FROM dataset_snapshots
                 ORDER BY created_at DESC",
            )
            .map_err(|e| cache_err("prepare info query", e))?;

        let rows = stmt
            .query_map([], |row| {
                Ok(SnapshotInfo {
                    origin: row.get::<_, String>(0)?,
                    fingerprint: row.get::<_, i64>(1)? as u64,
                    row_count: row.get::<_, i64>(2)? as usize,
                    version: row.get(3)?,
                    created_at: row.get::<_, i64>(4)? as u64,
                    payload_bytes: row.get::<_, i64>(5)? as usize,
                })
            })
            .map_err(|e| cache_err("query info", e))?;

        rows.map(|r| r.map_err(|e| cache_err("read row", e))).collect()
    }

    /// Total size of the database file in bytes (approximate).
    pub fn db_size_bytes(&self) -> Result<u64> {
        let page_count: i64 = self
            .conn
            .query_row("PRAGMA page_count", [], |row| row.get(0))
            .map_err(|e| cache_err("page_count", e))?;
        let page_size: i64 = self
            .conn
            .query_row("PRAGMA page_size", [], |row| row.get(0))
            .map_err(|e| cache_err("page_size", e))?;
        Ok((page_count * page_size) as u64)
    }
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotInfo {
    pub origin: String,
    pub fingerprint: u64,
    pub row_count: usize,
    pub version: String,
    pub created_at: u64,
    pub payload_bytes: usize,
}
