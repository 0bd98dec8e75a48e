//! Error type shared by the transport helpers, probes and config loaders.

use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid endpoint '{base}': {reason}")]
    InvalidEndpoint { base: String, reason: String },

    #[error("push channel connect failed: {0}")]
    PushConnect(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("push channel did not open within {0:?}")]
    ConnectTimeout(Duration),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected http status {0}")]
    Status(reqwest::StatusCode),

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to load TLS CA from {path}: {reason}")]
    TlsCa { path: PathBuf, reason: String },

    #[error("failed to read config {path}: {source}")]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid value for {key}: {value}")]
    ConfigValue { key: String, value: String },
}

pub type Result<T> = std::result::Result<T, Error>;
