//! Canonical types produced from the server's loosely-shaped JSON.

use serde::Serialize;

/// Untyped payload as received from either transport.
pub type RawPayload = serde_json::Value;

/// Boot time is either an epoch timestamp or a preformatted string.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BootTime {
    Epoch(f64),
    Text(String),
}

/// Load averages in 1m / 5m / 15m order, or a server-formatted string.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Load {
    Values(Vec<f64>),
    Text(String),
}

/// One normalized metrics record. Every field is optional: a missing or
/// malformed value on the wire stays `None` rather than turning into zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Reading {
    pub cpu_percent: Option<f64>,
    pub mem_used_bytes: Option<f64>,
    pub mem_total_bytes: Option<f64>,
    pub mem_percent: Option<f64>,
    pub uptime_seconds: Option<f64>,
    pub boot_time: Option<BootTime>,
    pub load: Option<Load>,
    pub host: Option<String>,
}

/// Charting point: milliseconds since the Unix epoch plus cpu/mem percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    pub timestamp: i64,
    pub cpu: Option<f64>,
    pub mem: Option<f64>,
}

impl Sample {
    pub fn from_reading(timestamp: i64, r: &Reading) -> Self {
        Self {
            timestamp,
            cpu: r.cpu_percent,
            mem: r.mem_percent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// Initial push attempt in flight.
    Connecting,
    /// Push channel open; polling inactive.
    Live,
    /// Polling fallback active.
    Degraded,
    /// Session torn down by `stop()`; no channel or timer remains.
    Stopped,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Live => "live",
            ConnectionState::Degraded => "degraded",
            ConnectionState::Stopped => "stopped",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Unhealthy,
    Unknown,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Ok => "ok",
            HealthStatus::Unhealthy => "unhealthy",
            HealthStatus::Unknown => "unknown",
        }
    }
}

/// Everything a display layer needs from one transport session.
#[derive(Debug, Clone, Serialize)]
pub struct LiveView {
    /// Bumped on every start/stop; history resets with it.
    pub session: u64,
    pub state: ConnectionState,
    pub reading: Option<Reading>,
    /// Last payload exactly as received, for raw and key-filtered views.
    pub raw: Option<RawPayload>,
    pub history: Vec<Sample>,
}

impl Default for LiveView {
    fn default() -> Self {
        Self {
            session: 0,
            state: ConnectionState::Connecting,
            reading: None,
            raw: None,
            history: Vec::new(),
        }
    }
}
