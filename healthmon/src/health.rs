//! Liveness probe against the health path, separate from the metrics channel.

use serde_json::Value;
use tracing::debug;

use crate::endpoint::{is_requestable, Endpoint};
use crate::error::Error;
use crate::http::PullClient;
use crate::types::HealthStatus;

#[derive(Clone, Debug)]
pub struct HealthProbe {
    client: PullClient,
}

impl HealthProbe {
    pub fn new(client: PullClient) -> Self {
        Self { client }
    }

    /// One request. `Ok` only for `{"status": "ok"}`, judged on the body alone
    /// so an error status with that body still counts; `Unknown` when the
    /// health URL cannot be requested at all.
    pub async fn check(&self, endpoint: &Endpoint) -> HealthStatus {
        let url = endpoint.health_url();
        if !is_requestable(url) {
            debug!("health: cannot request '{url}'");
            return HealthStatus::Unknown;
        }
        match self.client.get_json_any_status(url).await {
            Ok(body) => status_of(&body),
            // The builder rejects some URLs that still parse; nothing was sent.
            Err(Error::Http(e)) if e.is_builder() => HealthStatus::Unknown,
            Err(e) => {
                debug!("health: {url}: {e}");
                HealthStatus::Unhealthy
            }
        }
    }
}

pub fn status_of(body: &Value) -> HealthStatus {
    match body.get("status").and_then(Value::as_str) {
        Some("ok") => HealthStatus::Ok,
        _ => HealthStatus::Unhealthy,
    }
}
