use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::pipeline::app_state::ViewConfig;
use crate::pipeline::source::SourceConfig;

pub const CONFIG_ENV: &str = "MEDIDORES_CONFIG";
pub const LOG_ENV: &str = "MEDIDORES_LOG";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// SQLite snapshot database. Caching is off when unset.
    pub path: Option<String>,
    /// Snapshots older than this are ignored. No limit when unset.
    pub max_age_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub view: ViewConfig,
    pub cache: CacheConfig,
}

impl Config {
    /// Parse a config file; JSON for `.json`, TOML otherwise.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config_err = |message: String| Error::Config {
            path: path.display().to_string(),
            message,
        };
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            serde_json::from_str(&text).map_err(|e| config_err(e.to_string()))
        } else {
            toml::from_str(&text).map_err(|e| config_err(e.to_string()))
        }
    }

    /// Resolve configuration in this order:
    ///
    /// 1. `explicit` (the `--config` flag)
    /// 2. `$MEDIDORES_CONFIG`
    /// 3. `$XDG_CONFIG_HOME/medidores/config.{toml,json}`
    /// 4. `~/.config/medidores/config.{toml,json}`
    /// 5. built-in defaults
    ///
    /// Missing files fall through. A malformed explicit file is an error;
    /// malformed files found by discovery are logged and skipped.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        Self::resolve_with(explicit, |key| std::env::var(key).ok())
    }

    pub fn resolve_with(explicit: Option<&Path>, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(path) = explicit {
            if path.exists() {
                tracing::debug!(path = %path.display(), "loading explicit config");
                return Self::from_file(path);
            }
            tracing::warn!(path = %path.display(), "config file not found, continuing");
        }

        for path in discovery_paths(&env) {
            if !path.exists() {
                continue;
            }
            match Self::from_file(&path) {
                Ok(config) => {
                    tracing::debug!(path = %path.display(), "loaded config");
                    return Ok(config);
                }
                Err(e) => tracing::warn!(error = %e, "skipping config"),
            }
        }
        Ok(Self::default())
    }
}

fn discovery_paths(env: &impl Fn(&str) -> Option<String>) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(p) = env(CONFIG_ENV).filter(|p| !p.is_empty()) {
        paths.push(PathBuf::from(p));
    }
    let mut dirs = Vec::new();
    if let Some(xdg) = env("XDG_CONFIG_HOME").filter(|p| !p.is_empty()) {
        dirs.push(PathBuf::from(xdg).join("medidores"));
    }
    if let Some(home) = env("HOME").filter(|p| !p.is_empty()) {
        dirs.push(PathBuf::from(home).join(".config").join("medidores"));
    }
    for dir in dirs {
        paths.push(dir.join("config.toml"));
        paths.push(dir.join("config.json"));
    }
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &Path)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.display().to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_found() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::resolve_with(None, env_of(&[("HOME", dir.path())])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.view.page_size, 25);
        assert_eq!(config.view.debounce_ms, 300);
        assert_eq!(config.source.states.len(), 27);
    }

    #[test]
    fn explicit_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("medidores.toml");
        std::fs::write(
            &path,
            "[source]\ncors_proxy = \"https://corsproxy.io/?\"\nstates = [\"SP\", \"RJ\"]\n\n[view]\npage_size = 10\n",
        )
        .unwrap();
        let config = Config::resolve_with(Some(&path), env_of(&[])).unwrap();
        assert_eq!(config.view.page_size, 10);
        assert_eq!(config.view.ranking_size, 5);
        assert_eq!(config.source.states, ["SP", "RJ"]);
        assert_eq!(config.source.cors_proxy.as_deref(), Some("https://corsproxy.io/?"));
    }

    #[test]
    fn env_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.json");
        std::fs::write(&path, r#"{"cache": {"path": "/tmp/m.db", "max_age_secs": 60}}"#).unwrap();
        let config = Config::resolve_with(None, env_of(&[(CONFIG_ENV, &path)])).unwrap();
        assert_eq!(config.cache.path.as_deref(), Some("/tmp/m.db"));
        assert_eq!(config.cache.max_age_secs, Some(60));
    }

    #[test]
    fn xdg_before_home() {
        let xdg = tempfile::tempdir().unwrap();
        let home = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(xdg.path().join("medidores")).unwrap();
        std::fs::write(xdg.path().join("medidores/config.toml"), "[view]\npage_size = 7\n").unwrap();
        std::fs::create_dir_all(home.path().join(".config/medidores")).unwrap();
        std::fs::write(home.path().join(".config/medidores/config.toml"), "[view]\npage_size = 9\n").unwrap();

        let env = env_of(&[("XDG_CONFIG_HOME", xdg.path()), ("HOME", home.path())]);
        assert_eq!(Config::resolve_with(None, env).unwrap().view.page_size, 7);
        let env = env_of(&[("HOME", home.path())]);
        assert_eq!(Config::resolve_with(None, env).unwrap().view.page_size, 9);
    }

    #[test]
    fn malformed_explicit_is_error_discovered_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "view = [").unwrap();
        assert!(Config::resolve_with(Some(&bad), env_of(&[])).is_err());
        let config = Config::resolve_with(None, env_of(&[(CONFIG_ENV, &bad)])).unwrap();
        assert_eq!(config, Config::default());
    }
}
