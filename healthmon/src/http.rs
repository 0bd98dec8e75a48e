//! Pull side: one shared reqwest client for metrics polling and health checks.

use reqwest::header::CACHE_CONTROL;
use serde_json::Value;

use crate::config::MonitorConfig;
use crate::error::{Error, Result};
use crate::tls;

#[derive(Clone, Debug)]
pub struct PullClient {
    client: reqwest::Client,
}

impl PullClient {
    pub fn new(cfg: &MonitorConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().timeout(cfg.request_timeout);
        if let Some(path) = cfg.tls_ca.as_deref() {
            for cert in tls::reqwest_certs(path)? {
                builder = builder.add_root_certificate(cert);
            }
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    /// GET `url` and parse the body as JSON. Non-2xx is an error.
    pub async fn get_json(&self, url: &str) -> Result<Value> {
        self.fetch(url, true).await
    }

    /// Like `get_json`, but the body is parsed whatever the status code.
    pub async fn get_json_any_status(&self, url: &str) -> Result<Value> {
        self.fetch(url, false).await
    }

    async fn fetch(&self, url: &str, success_only: bool) -> Result<Value> {
        let res = self
            .client
            .get(url)
            .header(CACHE_CONTROL, "no-store")
            .send()
            .await?;
        let status = res.status();
        if success_only && !status.is_success() {
            return Err(Error::Status(status));
        }
        let body = res.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}
