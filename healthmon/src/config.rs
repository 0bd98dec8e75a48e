//! Session configuration: defaults, optional JSON file, env overrides.
//! File lives at $XDG_CONFIG_HOME/healthmon/config.json (fallback ~/.config/healthmon/config.json)

use serde::Deserialize;
use std::{fs, path::Path, path::PathBuf, time::Duration};

use crate::error::{Error, Result};
use crate::profiles::config_dir;

pub const DEFAULT_API_BASE: &str = "http://localhost:8000";

/// What the transport does once it has fallen back to polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushRetry {
    /// Stay on polling until the session is restarted.
    Manual,
    /// Re-attempt the push channel on this interval while polling.
    Every(Duration),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    pub api_base: String,
    pub poll_interval: Duration,
    pub ws_path: String,
    pub metrics_path: String,
    pub health_path: String,
    pub push_retry: PushRetry,
    pub connect_timeout: Option<Duration>,
    pub health_interval: Option<Duration>,
    pub request_timeout: Duration,
    pub tls_ca: Option<PathBuf>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.into(),
            poll_interval: Duration::from_millis(2000),
            ws_path: "/ws".into(),
            metrics_path: "/metrics".into(),
            health_path: "/health".into(),
            push_retry: PushRetry::Manual,
            connect_timeout: None,
            health_interval: None,
            request_timeout: Duration::from_secs(10),
            tls_ca: None,
        }
    }
}

// On-disk shape; every key optional, durations in milliseconds.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    api_base: Option<String>,
    poll_ms: Option<u64>,
    ws_path: Option<String>,
    metrics_path: Option<String>,
    health_path: Option<String>,
    push_retry_ms: Option<u64>,
    connect_timeout_ms: Option<u64>,
    health_interval_ms: Option<u64>,
    request_timeout_ms: Option<u64>,
    tls_ca: Option<PathBuf>,
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

impl MonitorConfig {
    /// Defaults, then the config file if present, then environment.
    pub fn load() -> Result<Self> {
        let mut cfg = Self::default();
        let path = config_path();
        if path.exists() {
            cfg.apply_file(&path)?;
        }
        cfg.apply_env(|k| std::env::var(k).ok())?;
        Ok(cfg)
    }

    pub fn apply_file(&mut self, path: &Path) -> Result<()> {
        let data = fs::read_to_string(path).map_err(|source| Error::ConfigFile {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ConfigFile = serde_json::from_str(&data)?;
        if let Some(v) = file.api_base {
            self.api_base = v;
        }
        if let Some(ms) = file.poll_ms {
            self.poll_interval = millis(ms);
        }
        if let Some(v) = file.ws_path {
            self.ws_path = v;
        }
        if let Some(v) = file.metrics_path {
            self.metrics_path = v;
        }
        if let Some(v) = file.health_path {
            self.health_path = v;
        }
        if let Some(ms) = file.push_retry_ms {
            self.push_retry = retry_from_ms(ms);
        }
        if let Some(ms) = file.connect_timeout_ms {
            self.connect_timeout = optional_millis(ms);
        }
        if let Some(ms) = file.health_interval_ms {
            self.health_interval = optional_millis(ms);
        }
        if let Some(ms) = file.request_timeout_ms {
            self.request_timeout = millis(ms);
        }
        if file.tls_ca.is_some() {
            self.tls_ca = file.tls_ca;
        }
        Ok(())
    }

    /// Override from `HEALTHMON_*` variables; `lookup` is injectable for tests.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let ms = |key: &str| -> Result<Option<u64>> {
            match lookup(key) {
                None => Ok(None),
                Some(v) if v.trim().is_empty() => Ok(None),
                Some(v) => v.trim().parse::<u64>().map(Some).map_err(|_| Error::ConfigValue {
                    key: key.to_string(),
                    value: v,
                }),
            }
        };

        if let Some(v) = lookup("HEALTHMON_API_BASE").filter(|v| !v.trim().is_empty()) {
            self.api_base = v;
        }
        if let Some(v) = ms("HEALTHMON_POLL_MS")? {
            self.poll_interval = millis(v);
        }
        if let Some(v) = lookup("HEALTHMON_WS_PATH") {
            self.ws_path = v;
        }
        if let Some(v) = lookup("HEALTHMON_METRICS_PATH") {
            self.metrics_path = v;
        }
        if let Some(v) = lookup("HEALTHMON_HEALTH_PATH") {
            self.health_path = v;
        }
        if let Some(v) = ms("HEALTHMON_PUSH_RETRY_MS")? {
            self.push_retry = retry_from_ms(v);
        }
        if let Some(v) = ms("HEALTHMON_CONNECT_TIMEOUT_MS")? {
            self.connect_timeout = optional_millis(v);
        }
        if let Some(v) = ms("HEALTHMON_HEALTH_INTERVAL_MS")? {
            self.health_interval = optional_millis(v);
        }
        Ok(())
    }
}

// A zero interval would spin the poll loop.
fn millis(ms: u64) -> Duration {
    Duration::from_millis(ms.max(1))
}

fn optional_millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

/// 0 means manual reconnect only.
pub fn retry_from_ms(ms: u64) -> PushRetry {
    match optional_millis(ms) {
        Some(d) => PushRetry::Every(d),
        None => PushRetry::Manual,
    }
}
