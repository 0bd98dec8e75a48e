//! Target endpoint: base address plus the derived push and pull URLs.

use url::Url;

use crate::config::MonitorConfig;
use crate::error::{Error, Result};

/// Immutable for a session; a new target means a new `Endpoint`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    base: String,
    push: std::result::Result<String, String>,
    health: String,
    metrics: String,
}

impl Endpoint {
    pub fn new(base: &str, cfg: &MonitorConfig) -> Self {
        let base = clean_base(base);
        let push = push_url(&base, &cfg.ws_path).map_err(|e| match e {
            Error::InvalidEndpoint { reason, .. } => reason,
            other => other.to_string(),
        });
        Self {
            health: format!("{base}{}", cfg.health_path),
            metrics: format!("{base}{}", cfg.metrics_path),
            push,
            base,
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// WebSocket URL, or why one could not be derived from the base.
    pub fn push_url(&self) -> Result<&str> {
        self.push.as_deref().map_err(|reason| Error::InvalidEndpoint {
            base: self.base.clone(),
            reason: reason.to_string(),
        })
    }

    pub fn health_url(&self) -> &str {
        &self.health
    }

    pub fn metrics_url(&self) -> &str {
        &self.metrics
    }
}

pub fn clean_base(base: &str) -> String {
    base.trim().trim_end_matches('/').to_string()
}

/// http -> ws, https -> wss; anything else has no push variant.
pub fn push_url(base: &str, ws_path: &str) -> Result<String> {
    let invalid = |reason: &str| Error::InvalidEndpoint {
        base: base.to_string(),
        reason: reason.to_string(),
    };
    let parsed = Url::parse(base).map_err(|e| invalid(&e.to_string()))?;
    let scheme = match parsed.scheme() {
        "http" => "ws",
        "https" => "wss",
        other => return Err(invalid(&format!("unsupported scheme '{other}'"))),
    };
    if parsed.host_str().is_none() {
        return Err(invalid("missing host"));
    }
    // Replace only the scheme prefix so any base path survives.
    let rest = &base[parsed.scheme().len()..];
    let joined = format!("{scheme}{rest}{ws_path}");
    Url::parse(&joined).map_err(|e| invalid(&e.to_string()))?;
    Ok(joined)
}

/// True when `url` can actually be requested over http(s).
pub fn is_requestable(url: &str) -> bool {
    Url::parse(url)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false)
}
