//! Immutable application state for an interactive table view.
//!
//! Each transition returns a new [`AppState`]; nothing is patched in place.
//! The record set and its index are shared between states through `Arc`,
//! and the derived view (filtered then sorted positions) is recomputed on
//! every transition that can change it.

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use super::cache::fingerprint_records;
use super::filter::{filter_indexed, FilterCriteria};
use super::index::RecordIndex;
use super::metrics::{compute_metrics_at, top_n, Bucket, Metrics};
use super::paginate::{clamp_page, page_window, paginate, total_pages, Page};
use super::record::{Category, Record};
use super::sort::{sort_positions, FieldPath, SortState};

/// Display settings shared by every view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub page_size: usize,
    /// Delay applied to free-text input before filtering.
    pub debounce_ms: u64,
    /// Length of list rankings (cities, owners).
    pub ranking_size: usize,
    /// Length of chart rankings (states, instrument types).
    pub chart_ranking_size: usize,
    /// Page buttons shown on each side of the current page.
    pub page_window_radius: usize,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            page_size: 25,
            debounce_ms: 300,
            ranking_size: 5,
            chart_ranking_size: 10,
            page_window_radius: 2,
        }
    }
}

/// A loaded record set with its index. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Dataset {
    records: Arc<Vec<Record>>,
    index: Arc<RecordIndex>,
    fingerprint: u64,
}

impl Dataset {
    pub fn new(records: Vec<Record>) -> Self {
        let fingerprint = fingerprint_records(&records);
        let index = RecordIndex::build(&records);
        Self {
            records: Arc::new(records),
            index: Arc::new(index),
            fingerprint,
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn index(&self) -> &RecordIndex {
        &self.index
    }

    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rankings {
    pub states: Vec<Bucket>,
    pub cities: Vec<Bucket>,
    pub owners: Vec<Bucket>,
    pub types: Vec<Bucket>,
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub metrics: Metrics,
    pub rankings: Rankings,
    pub page: Page<Record>,
    pub page_window: Vec<usize>,
    pub criteria: FilterCriteria,
    pub sort: Option<SortState>,
}

#[derive(Debug, Clone)]
pub struct AppState {
    dataset: Dataset,
    criteria: FilterCriteria,
    sort: Option<SortState>,
    page: usize,
    view_config: ViewConfig,
    view: Arc<Vec<usize>>,
}

impl AppState {
    pub fn new(records: Vec<Record>, view_config: ViewConfig) -> Self {
        Self {
            dataset: Dataset::new(records),
            criteria: FilterCriteria::default(),
            sort: None,
            page: 1,
            view_config,
            view: Arc::new(Vec::new()),
        }
        .recompute()
    }

    fn recompute(mut self) -> Self {
        let records = self.dataset.records();
        let mut positions = filter_indexed(records, self.dataset.index(), &self.criteria);
        if let Some(sort) = &self.sort {
            sort_positions(records, &mut positions, &sort.column, sort.direction);
        }
        self.page = clamp_page(self.page, total_pages(positions.len(), self.view_config.page_size));
        tracing::debug!(
            total = records.len(),
            visible = positions.len(),
            page = self.page,
            "view recomputed"
        );
        self.view = Arc::new(positions);
        self
    }

    /// Replace the record set. The index is rebuilt only when the content
    /// actually changed.
    pub fn with_records(&self, records: Vec<Record>) -> Self {
        let fingerprint = fingerprint_records(&records);
        let dataset = if fingerprint == self.dataset.fingerprint
            && records.len() == self.dataset.records().len()
        {
            self.dataset.clone()
        } else {
            Dataset::new(records)
        };
        Self {
            dataset,
            ..self.clone()
        }
        .recompute()
    }

    /// New criteria always reset to the first page.
    pub fn with_criteria(&self, criteria: FilterCriteria) -> Self {
        Self {
            criteria,
            page: 1,
            ..self.clone()
        }
        .recompute()
    }

    pub fn with_sort(&self, sort: Option<SortState>) -> Self {
        Self {
            sort,
            ..self.clone()
        }
        .recompute()
    }

    pub fn click_sort(&self, column: FieldPath) -> Self {
        self.with_sort(Some(SortState::click(self.sort.as_ref(), column)))
    }

    /// Page changes only reslice; the view itself is unchanged.
    pub fn with_page(&self, page: usize) -> Self {
        let pages = total_pages(self.view.len(), self.view_config.page_size);
        Self {
            page: clamp_page(page, pages),
            ..self.clone()
        }
    }

    pub fn with_page_size(&self, page_size: usize) -> Self {
        Self {
            view_config: ViewConfig {
                page_size: page_size.max(1),
                ..self.view_config.clone()
            },
            page: 1,
            ..self.clone()
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn sort(&self) -> Option<&SortState> {
        self.sort.as_ref()
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn view_config(&self) -> &ViewConfig {
        &self.view_config
    }

    /// Filtered and sorted records, in view order.
    pub fn view_records(&self) -> Vec<Record> {
        let records = self.dataset.records();
        self.view.iter().map(|&i| records[i].clone()).collect()
    }

    pub fn snapshot_at(&self, today: NaiveDate) -> Snapshot {
        let visible = self.view_records();
        let cfg = &self.view_config;
        let page = paginate(&visible, self.page, cfg.page_size);
        Snapshot {
            metrics: compute_metrics_at(&visible, today),
            rankings: Rankings {
                states: top_n(&visible, Category::State, cfg.chart_ranking_size),
                cities: top_n(&visible, Category::City, cfg.ranking_size),
                owners: top_n(&visible, Category::Owner, cfg.ranking_size),
                types: top_n(&visible, Category::Type, cfg.chart_ranking_size),
            },
            page_window: page_window(page.page, page.total_pages, cfg.page_window_radius),
            page,
            criteria: self.criteria.clone(),
            sort: self.sort.clone(),
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshot_at(Local::now().date_naive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::sample::sample_records;
    use crate::pipeline::sort::SortDirection;

    fn state() -> AppState {
        AppState::new(
            sample_records(),
            ViewConfig {
                page_size: 4,
                ..ViewConfig::default()
            },
        )
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn initial_view_is_everything() {
        let s = state();
        let snap = s.snapshot_at(today());
        assert_eq!(snap.metrics.total, 15);
        assert_eq!(snap.page.total_pages, 4);
        assert_eq!(snap.page.items.len(), 4);
        assert_eq!(snap.page_window, [1, 2, 3]);
    }

    #[test]
    fn transitions_do_not_mutate_previous_state() {
        let s = state().with_page(3);
        let filtered = s.with_criteria(FilterCriteria {
            result_category: Some("rejected".into()),
            ..Default::default()
        });
        assert_eq!(s.page(), 3);
        assert_eq!(s.view_records().len(), 15);
        assert_eq!(filtered.page(), 1);
        assert_eq!(filtered.view_records().len(), 4);
        assert!(Arc::ptr_eq(&s.dataset.records, &filtered.dataset.records));
    }

    #[test]
    fn page_is_clamped() {
        let s = state().with_page(99);
        assert_eq!(s.page(), 4);
        let snap = s.snapshot_at(today());
        assert_eq!(snap.page.items.len(), 3);
        assert_eq!(state().with_page_size(100).with_page(2).page(), 1);
    }

    #[test]
    fn click_sort_toggles() {
        let city = FieldPath::parse("city").unwrap();
        let asc = state().click_sort(city.clone());
        let desc = asc.click_sort(city);
        assert_eq!(asc.sort().unwrap().direction, SortDirection::Asc);
        assert_eq!(desc.sort().unwrap().direction, SortDirection::Desc);
        let first_asc = asc.view_records()[0].city.clone();
        let last_desc = desc.view_records().last().unwrap().city.clone();
        assert_eq!(first_asc, last_desc);
    }

    #[test]
    fn with_records_skips_rebuild_for_same_content() {
        let s = state();
        let same = s.with_records(sample_records());
        assert!(Arc::ptr_eq(&s.dataset.index, &same.dataset.index));
        let fewer = s.with_records(sample_records().into_iter().take(3).collect());
        assert!(!Arc::ptr_eq(&s.dataset.index, &fewer.dataset.index));
        assert_eq!(fewer.view_records().len(), 3);
    }

    #[test]
    fn criteria_and_sort_survive_reload() {
        let s = state()
            .with_criteria(FilterCriteria {
                state: Some("SP".into()),
                ..Default::default()
            })
            .with_records(sample_records());
        assert_eq!(s.view_records().len(), 1);
    }

    #[test]
    fn snapshot_rankings() {
        let snap = state().snapshot_at(today());
        assert_eq!(snap.rankings.states.len(), 10);
        assert_eq!(snap.rankings.cities.len(), 5);
        // "Não informado" is not ranked.
        assert_eq!(snap.rankings.owners.len(), 2);
        assert_eq!(snap.rankings.types[0].value, "Medidor de Combustível Líquido");
        assert_eq!(snap.rankings.types[0].count, 12);
    }
}
