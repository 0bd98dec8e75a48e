//! Library surface for healthmon: transport supervision and payload normalization.

pub mod config;
pub mod endpoint;
pub mod error;
pub mod format;
pub mod health;
pub mod history;
pub mod http;
pub mod monitor;
pub mod normalize;
pub mod profiles;
pub mod tls;
pub mod transport;
pub mod types;
pub mod ws;

pub use error::{Error, Result};
pub use monitor::Monitor;
pub use normalize::normalize;
pub use transport::TransportManager;
