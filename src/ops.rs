//! Shared operation wrappers for all interfaces (CLI, MCP, plugin).
//!
//! Each `op_*` function is a pure, synchronous wrapper around one or more
//! `pipeline` modules. Input is raw records of any naming convention and
//! output is `serde_json::Value`, with no dependency on rmcp, clap, or
//! nu-plugin.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::pipeline::app_state::{AppState, ViewConfig};
use crate::pipeline::export::{self, ExportFormat};
use crate::pipeline::filter::{filter, CriteriaParams, FilterCriteria};
use crate::pipeline::index::RecordIndex;
use crate::pipeline::metrics;
use crate::pipeline::normalize::normalize_all;
use crate::pipeline::paginate::{page_window, paginate};
use crate::pipeline::record::Category;
use crate::pipeline::sort::{sort, FieldPath, SortDirection, SortState};

#[cfg(feature = "cache")]
use crate::pipeline::{cache, source::DataOrigin, storage};

fn to_json(value: &impl Serialize) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

// ── Operations ───────────────────────────────────────────────────────────────

/// Canonical records.
pub fn op_normalize(rows: &[Value]) -> Result<Value> {
    to_json(&normalize_all(rows))
}

/// Canonical records matching the criteria, in input order.
pub fn op_filter(rows: &[Value], params: CriteriaParams) -> Result<Value> {
    op_filter_criteria(rows, &params.into_criteria()?)
}

pub fn op_filter_criteria(rows: &[Value], criteria: &FilterCriteria) -> Result<Value> {
    let records = normalize_all(rows);
    to_json(&filter(&records, criteria))
}

pub fn op_metrics(rows: &[Value]) -> Result<Value> {
    to_json(&metrics::compute_metrics(&normalize_all(rows)))
}

pub fn op_top(rows: &[Value], category: &str, n: usize) -> Result<Value> {
    let category = Category::parse(category)?;
    let top = metrics::top_n(&normalize_all(rows), category, n);
    to_json(&top)
}

pub fn op_trends(rows: &[Value], years: usize) -> Result<Value> {
    to_json(&metrics::trends(&normalize_all(rows), years))
}

pub fn op_sort(rows: &[Value], column: &str, direction: &str) -> Result<Value> {
    let path = FieldPath::parse(column)?;
    let direction = SortDirection::parse(direction)?;
    to_json(&sort(&normalize_all(rows), &path, direction))
}

/// One page of canonical records plus the page-button window.
pub fn op_paginate(rows: &[Value], page: usize, page_size: usize, window_radius: usize) -> Result<Value> {
    let records = normalize_all(rows);
    let page = paginate(&records, page, page_size);
    let window = page_window(page.page, page.total_pages, window_radius);
    let mut out = to_json(&page)?;
    if let Some(obj) = out.as_object_mut() {
        obj.insert("window".into(), json!(window));
    }
    Ok(out)
}

/// Export text (JSON or quoted CSV) plus the suggested file name.
pub fn op_export(rows: &[Value], format: &str) -> Result<Value> {
    let format = ExportFormat::parse(format)?;
    let content = export::export(&normalize_all(rows), format)?;
    Ok(json!({
        "fileName": export::export_file_name(format, today()),
        "format": format,
        "content": content,
    }))
}

/// Same as [`op_export`] but returns the bare text, for stdout/file output.
pub fn op_export_text(rows: &[Value], format: &str) -> Result<String> {
    let format = ExportFormat::parse(format)?;
    export::export(&normalize_all(rows), format)
}

/// Records whose category value equals `value`, via the index.
pub fn op_lookup(rows: &[Value], category: &str, value: &str) -> Result<Value> {
    let category = Category::parse(category)?;
    let records = normalize_all(rows);
    let index = RecordIndex::build(&records);
    to_json(&index.lookup(&records, category, value))
}

pub fn op_distinct(rows: &[Value], category: &str) -> Result<Value> {
    let category = Category::parse(category)?;
    to_json(&metrics::distinct(&normalize_all(rows), category))
}

/// Parameters for a full pipeline pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "mcp", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct QueryParams {
    #[serde(flatten)]
    pub criteria: CriteriaParams,
    /// Sort column, e.g. city, owner.name, validUntilDate
    pub sort: Option<String>,
    /// asc or desc
    pub direction: Option<String>,
    /// 1-based page
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

/// Filter, sort, and paginate in one pass; returns metrics, rankings, the
/// requested page, and the page-button window.
pub fn op_query(rows: &[Value], params: QueryParams, view: &ViewConfig) -> Result<Value> {
    let criteria = params.criteria.into_criteria()?;
    let sort_state = params
        .sort
        .as_deref()
        .map(|column| -> Result<_> {
            let direction = params
                .direction
                .as_deref()
                .map(SortDirection::parse)
                .transpose()?
                .unwrap_or_default();
            Ok(SortState::new(FieldPath::parse(column)?, direction))
        })
        .transpose()?;

    let mut view = view.clone();
    if let Some(size) = params.page_size {
        view.page_size = size.max(1);
    }
    let state = AppState::new(normalize_all(rows), view)
        .with_criteria(criteria)
        .with_sort(sort_state)
        .with_page(params.page.unwrap_or(1));
    to_json(&state.snapshot())
}

/// Flat display rows for table/card renderers.
pub fn op_view(rows: &[Value]) -> Result<Value> {
    to_json(&export::view_rows(&normalize_all(rows), today()))
}

// ── Cache management operations ─────────────────────────────────────────────

#[cfg(not(feature = "cache"))]
fn cache_disabled() -> Error {
    Error::Cache("feature not enabled. Build with --features cache".into())
}

/// Return info about a snapshot database.
pub fn op_cache_info(#[cfg_attr(not(feature = "cache"), allow(unused))] cache_path: &str) -> Result<Value> {
    #[cfg(feature = "cache")]
    {
        let store = storage::SnapshotStore::open_or_create(cache_path)?;
        let snapshots = store.info()?;
        return Ok(json!({
            "path": cache_path,
            "sizeBytes": store.db_size_bytes()?,
            "total": snapshots.len(),
            "snapshots": snapshots,
        }));
    }

    #[cfg(not(feature = "cache"))]
    Err(cache_disabled())
}

/// Clear one origin's snapshot, or all when `origin` is `None`.
pub fn op_cache_clear(
    #[cfg_attr(not(feature = "cache"), allow(unused))] cache_path: &str,
    origin: Option<&str>,
) -> Result<Value> {
    #[cfg(feature = "cache")]
    {
        let store = storage::SnapshotStore::open_or_create(cache_path)?;
        let parsed = origin
            .map(|o| {
                DataOrigin::from_str(o).ok_or_else(|| Error::UnknownOption {
                    kind: "origin",
                    value: o.to_string(),
                    expected: "network, sample",
                })
            })
            .transpose()?;
        let deleted = store.invalidate(parsed)?;
        return Ok(json!({
            "path": cache_path,
            "deleted": deleted,
            "origin": origin.unwrap_or("all"),
        }));
    }

    #[cfg(not(feature = "cache"))]
    {
        let _ = origin;
        Err(cache_disabled())
    }
}

/// Cached network rows if present and still valid.
#[cfg(feature = "cache")]
pub fn cached_rows(cache_path: &str, max_age_secs: Option<u64>) -> Result<Option<Vec<Value>>> {
    let store = storage::SnapshotStore::open_or_create(cache_path)?;
    Ok(match store.get(DataOrigin::Network)? {
        Some((meta, rows)) if cache::is_valid(&meta, max_age_secs, cache::now_secs()) => {
            tracing::info!(rows = rows.len(), age_secs = meta.age_secs(cache::now_secs()), "using cached snapshot");
            Some(rows)
        }
        Some(_) => {
            tracing::debug!("cached snapshot is stale");
            None
        }
        None => None,
    })
}

#[cfg(feature = "cache")]
pub fn store_rows(cache_path: &str, origin: DataOrigin, rows: &[Value]) -> Result<()> {
    let store = storage::SnapshotStore::open_or_create(cache_path)?;
    store.put(origin, rows)?;
    Ok(())
}
