//! Named filter presets persisted as a JSON file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::filter::FilterCriteria;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedFilter {
    pub name: String,
    pub criteria: FilterCriteria,
}

/// Presets in insertion order. Names are unique; adding an existing name
/// replaces that preset in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SavedFilters {
    filters: Vec<SavedFilter>,
}

impl SavedFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &str, criteria: FilterCriteria) {
        let name = name.trim().to_string();
        match self.filters.iter_mut().find(|f| f.name == name) {
            Some(existing) => existing.criteria = criteria,
            None => self.filters.push(SavedFilter { name, criteria }),
        }
    }

    /// Returns whether a preset was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.filters.len();
        self.filters.retain(|f| f.name != name.trim());
        self.filters.len() != before
    }

    pub fn get(&self, name: &str) -> Option<&FilterCriteria> {
        self.filters
            .iter()
            .find(|f| f.name == name.trim())
            .map(|f| &f.criteria)
    }

    pub fn names(&self) -> Vec<&str> {
        self.filters.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Load presets from `path`. A missing file is an empty set.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| Error::Config {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sp() -> FilterCriteria {
        FilterCriteria {
            state: Some("SP".into()),
            ..Default::default()
        }
    }

    #[test]
    fn add_replaces_same_name() {
        let mut presets = SavedFilters::new();
        presets.add("mine", sp());
        presets.add("other", FilterCriteria::default());
        presets.add("mine", FilterCriteria {
            city: Some("Campinas".into()),
            ..Default::default()
        });
        assert_eq!(presets.names(), ["mine", "other"]);
        assert_eq!(presets.get("mine").unwrap().city.as_deref(), Some("Campinas"));
    }

    #[test]
    fn remove() {
        let mut presets = SavedFilters::new();
        presets.add("mine", sp());
        assert!(presets.remove("mine"));
        assert!(!presets.remove("mine"));
        assert!(presets.is_empty());
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("presets.json");
        let mut presets = SavedFilters::new();
        presets.add("sp", sp());
        presets.save(&path).unwrap();
        let loaded = SavedFilters::load(&path).unwrap();
        assert_eq!(loaded, presets);
    }

    #[test]
    fn missing_file_is_empty_and_bad_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(SavedFilters::load(&dir.path().join("none.json")).unwrap().is_empty());
        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{not json").unwrap();
        assert!(SavedFilters::load(&bad).is_err());
    }
}
