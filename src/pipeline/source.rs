//! Per-state open-data loading with partial success and sample fallback.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use url::Url;

use super::sample;
use super::states;
use crate::error::{Error, Result};

pub const DEFAULT_HOST: &str = "https://servicos.rbmlq.gov.br";

/// Where the loaded dataset came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataOrigin {
    Network,
    Sample,
    Cache,
}

impl DataOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Sample => "sample",
            Self::Cache => "cache",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "network" => Some(Self::Network),
            "sample" => Some(Self::Sample),
            "cache" => Some(Self::Cache),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Scheme and host of the open-data service.
    pub host: String,
    /// Prefix prepended verbatim to every request URL, e.g. `https://corsproxy.io/?`.
    pub cors_proxy: Option<String>,
    /// State codes to fetch, in concatenation order.
    pub states: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            cors_proxy: None,
            states: states::all_codes(),
            timeout_secs: 30,
        }
    }
}

impl SourceConfig {
    /// `{proxy}{host}/dados-abertos/{UF}/medidores.json`
    pub fn state_url(&self, uf: &str) -> Result<String> {
        let fetch_err = |message: String| Error::Fetch {
            state: uf.to_string(),
            message,
        };
        let host = Url::parse(self.host.trim()).map_err(|e| fetch_err(format!("invalid host '{}': {e}", self.host)))?;
        if host.host_str().is_none() {
            return Err(fetch_err(format!("host '{}' has no hostname", self.host)));
        }
        let code = uf.trim().to_uppercase();
        if states::by_code(&code).is_none() {
            return Err(fetch_err("unknown state code".to_string()));
        }
        let base = host.as_str().trim_end_matches('/');
        let target = format!("{base}/dados-abertos/{code}/medidores.json");
        Ok(match self.cors_proxy.as_deref().map(str::trim) {
            Some(proxy) if !proxy.is_empty() => format!("{proxy}{target}"),
            _ => target,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedState {
    pub state: String,
    pub error: String,
}

/// Outcome of one load: raw rows plus per-state bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadReport {
    pub records: Vec<Value>,
    pub loaded_states: Vec<String>,
    pub failed_states: Vec<FailedState>,
    pub origin: DataOrigin,
}

impl LoadReport {
    pub fn from_sample() -> Self {
        Self {
            records: sample::sample_raw(),
            loaded_states: Vec::new(),
            failed_states: Vec::new(),
            origin: DataOrigin::Sample,
        }
    }

    /// Everything but the rows, for logs and status lines.
    pub fn summary(&self) -> Value {
        json!({
            "origin": self.origin,
            "records": self.records.len(),
            "loadedStates": self.loaded_states,
            "failedStates": self.failed_states,
        })
    }
}

/// Stamp the state code onto rows that do not carry one. Per-state files
/// sometimes omit it since the path already says which state they are.
fn tag_state(rows: &mut [Value], uf: &str) {
    const STATE_KEYS: [&str; 4] = ["stateCode", "SiglaUf", "uf", "estado"];
    for row in rows {
        if let Some(obj) = row.as_object_mut() {
            if !STATE_KEYS.iter().any(|k| obj.contains_key(*k)) {
                obj.insert("SiglaUf".into(), Value::String(uf.to_string()));
            }
        }
    }
}

/// Concatenate per-state outcomes in the given order. Failures are logged
/// and recorded; they never abort the other states.
pub fn merge_outcomes(outcomes: Vec<(String, Result<Vec<Value>>)>) -> LoadReport {
    let mut report = LoadReport {
        records: Vec::new(),
        loaded_states: Vec::new(),
        failed_states: Vec::new(),
        origin: DataOrigin::Network,
    };
    for (uf, outcome) in outcomes {
        match outcome {
            Ok(mut rows) => {
                tag_state(&mut rows, &uf);
                tracing::debug!(state = %uf, rows = rows.len(), "state loaded");
                report.records.extend(rows);
                report.loaded_states.push(uf);
            }
            Err(e) => {
                tracing::warn!(state = %uf, error = %e, "state fetch failed");
                report.failed_states.push(FailedState {
                    state: uf,
                    error: e.to_string(),
                });
            }
        }
    }
    tracing::info!(
        records = report.records.len(),
        loaded = report.loaded_states.len(),
        failed = report.failed_states.len(),
        "network load finished"
    );
    report
}

/// Replace an empty network result with the bundled sample. Failed states
/// stay in the report so callers can still show them.
pub fn with_fallback(report: LoadReport) -> LoadReport {
    if !report.records.is_empty() {
        return report;
    }
    tracing::warn!(
        failed = report.failed_states.len(),
        "no network data, using bundled sample"
    );
    LoadReport {
        failed_states: report.failed_states,
        ..LoadReport::from_sample()
    }
}

#[cfg(feature = "fetch")]
async fn fetch_state(client: &reqwest::Client, config: &SourceConfig, uf: &str) -> Result<Vec<Value>> {
    let fetch_err = |message: String| Error::Fetch {
        state: uf.to_string(),
        message,
    };
    let url = config.state_url(uf)?;
    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| fetch_err(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(fetch_err(format!("HTTP {status}")));
    }
    let body: Value = response.json().await.map_err(|e| fetch_err(e.to_string()))?;
    match body {
        Value::Array(rows) => Ok(rows),
        other => Err(fetch_err(format!(
            "expected a JSON array, got {}",
            match other {
                Value::Object(_) => "an object",
                Value::Null => "null",
                _ => "a scalar",
            }
        ))),
    }
}

/// Fetch every configured state concurrently and merge the outcomes.
#[cfg(feature = "fetch")]
pub async fn fetch_all(config: &SourceConfig) -> Result<LoadReport> {
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(config.timeout_secs.max(1)))
        .build()
        .map_err(|e| Error::Fetch {
            state: "*".into(),
            message: e.to_string(),
        })?;
    let client = &client;
    let requests = config.states.iter().map(|uf| async move {
        (uf.clone(), fetch_state(client, config, uf).await)
    });
    let outcomes = futures_util::future::join_all(requests).await;
    Ok(merge_outcomes(outcomes))
}

/// Network load with sample fallback. Never fails: a broken client setup
/// is treated like every state failing.
#[cfg(feature = "fetch")]
pub async fn load(config: &SourceConfig) -> LoadReport {
    match fetch_all(config).await {
        Ok(report) => with_fallback(report),
        Err(e) => {
            tracing::warn!(error = %e, "fetch setup failed");
            LoadReport {
                failed_states: vec![FailedState {
                    state: "*".into(),
                    error: e.to_string(),
                }],
                ..LoadReport::from_sample()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_url_plain_and_proxied() {
        let mut config = SourceConfig::default();
        assert_eq!(
            config.state_url("sp").unwrap(),
            "https://servicos.rbmlq.gov.br/dados-abertos/SP/medidores.json"
        );
        config.cors_proxy = Some("https://corsproxy.io/?".into());
        assert_eq!(
            config.state_url("DF").unwrap(),
            "https://corsproxy.io/?https://servicos.rbmlq.gov.br/dados-abertos/DF/medidores.json"
        );
    }

    #[test]
    fn state_url_rejects_bad_input() {
        let config = SourceConfig::default();
        assert!(config.state_url("XX").is_err());
        let bad = SourceConfig { host: "not a url".into(), ..SourceConfig::default() };
        assert!(bad.state_url("SP").is_err());
    }

    #[test]
    fn default_covers_all_units() {
        assert_eq!(SourceConfig::default().states.len(), 27);
    }

    #[test]
    fn partial_success_keeps_order() {
        let outcomes = vec![
            ("SP".to_string(), Ok(vec![json!({"Municipio": "A"})])),
            (
                "RJ".to_string(),
                Err(Error::Fetch { state: "RJ".into(), message: "HTTP 500".into() }),
            ),
            ("MG".to_string(), Ok(vec![json!({"Municipio": "B"}), json!({"SiglaUf": "MG"})])),
        ];
        let report = merge_outcomes(outcomes);
        assert_eq!(report.origin, DataOrigin::Network);
        assert_eq!(report.records.len(), 3);
        assert_eq!(report.records[0]["SiglaUf"], "SP");
        assert_eq!(report.records[1]["Municipio"], "B");
        assert_eq!(report.loaded_states, ["SP", "MG"]);
        assert_eq!(report.failed_states.len(), 1);
        assert_eq!(report.failed_states[0].state, "RJ");
        assert_eq!(with_fallback(report.clone()), report);
    }

    #[test]
    fn all_failed_falls_back_to_sample() {
        let outcomes = vec![(
            "SP".to_string(),
            Err(Error::Fetch { state: "SP".into(), message: "timeout".into() }),
        )];
        let report = with_fallback(merge_outcomes(outcomes));
        assert_eq!(report.origin, DataOrigin::Sample);
        assert!(!report.records.is_empty());
        assert_eq!(report.failed_states.len(), 1);
        assert_eq!(report.summary()["origin"], "sample");
    }

    #[cfg(feature = "fetch")]
    #[tokio::test]
    async fn unreachable_host_loads_sample() {
        let config = SourceConfig {
            host: "http://127.0.0.1:9".into(),
            states: vec!["SP".into(), "RJ".into()],
            timeout_secs: 2,
            ..SourceConfig::default()
        };
        let report = load(&config).await;
        assert_eq!(report.origin, DataOrigin::Sample);
        assert_eq!(report.failed_states.len(), 2);
        assert!(!report.records.is_empty());
    }
}
