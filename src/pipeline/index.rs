//! Grouping maps from lower-cased category value to record positions.

use std::collections::HashMap;

use super::record::{fold_key, is_unknown, Category, Record};

/// Per-category lookup built in one pass over the record set.
///
/// States are indexed under both their code and their name so either form
/// answers a lookup. Sentinel values are not indexed.
#[derive(Debug, Clone, Default)]
pub struct RecordIndex {
    state: HashMap<String, Vec<usize>>,
    city: HashMap<String, Vec<usize>>,
    kind: HashMap<String, Vec<usize>>,
    result: HashMap<String, Vec<usize>>,
    owner: HashMap<String, Vec<usize>>,
    len: usize,
}

impl RecordIndex {
    pub fn build(records: &[Record]) -> Self {
        let mut index = Self {
            len: records.len(),
            ..Self::default()
        };
        for (pos, r) in records.iter().enumerate() {
            push(&mut index.state, &r.state_code, pos);
            if !r.state_name.eq_ignore_ascii_case(&r.state_code) {
                push(&mut index.state, &r.state_name, pos);
            }
            push(&mut index.city, &r.city, pos);
            push(&mut index.kind, &r.instrument_type, pos);
            push(&mut index.result, r.last_result.label(), pos);
            push(&mut index.owner, &r.owner.name, pos);
        }
        tracing::debug!(
            records = records.len(),
            states = index.state.len(),
            cities = index.city.len(),
            "built record index"
        );
        index
    }

    fn map(&self, category: Category) -> &HashMap<String, Vec<usize>> {
        match category {
            Category::State => &self.state,
            Category::City => &self.city,
            Category::Type => &self.kind,
            Category::Result => &self.result,
            Category::Owner => &self.owner,
        }
    }

    /// Positions whose category value equals `value`, case-insensitively.
    pub fn positions(&self, category: Category, value: &str) -> &[usize] {
        self.map(category)
            .get(&fold_key(value))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Records at the indexed positions, in source order.
    pub fn lookup<'a>(&self, records: &'a [Record], category: Category, value: &str) -> Vec<&'a Record> {
        self.positions(category, value)
            .iter()
            .filter_map(|&i| records.get(i))
            .collect()
    }

    /// Number of distinct keys per category.
    pub fn key_count(&self, category: Category) -> usize {
        self.map(category).len()
    }

    /// Size of the record set the index was built from.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

fn push(map: &mut HashMap<String, Vec<usize>>, value: &str, pos: usize) {
    if is_unknown(value) {
        return;
    }
    map.entry(fold_key(value)).or_default().push(pos);
}
