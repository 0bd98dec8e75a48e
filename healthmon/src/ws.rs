//! Push channel: WebSocket connect helpers and frame decoding.

use std::{io::Read, sync::Arc, time::Duration};

use flate2::read::GzDecoder;
use rustls::ClientConfig;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async, connect_async_tls_with_config, tungstenite::Message, Connector,
    MaybeTlsStream, WebSocketStream,
};

use crate::error::{Error, Result};
use crate::types::RawPayload;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// Connect to the push endpoint; a custom CA applies to wss:// only
pub async fn connect(url: &str, tls: Option<Arc<ClientConfig>>) -> Result<WsStream> {
    let (ws, _) = match tls {
        Some(cfg) if url.starts_with("wss://") => {
            connect_async_tls_with_config(url, None, false, Some(Connector::Rustls(cfg))).await?
        }
        _ => connect_async(url).await?,
    };
    Ok(ws)
}

/// `connect` bounded by an optional open timeout.
pub async fn connect_within(
    url: &str,
    tls: Option<Arc<ClientConfig>>,
    limit: Option<Duration>,
) -> Result<WsStream> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, connect(url, tls))
            .await
            .map_err(|_| Error::ConnectTimeout(limit))?,
        None => connect(url, tls).await,
    }
}

/// What one inbound message means for the session.
#[derive(Debug)]
pub enum Frame {
    Payload(RawPayload),
    /// Undecodable or not a JSON object; dropped without a state change.
    Malformed,
    /// Control traffic (ping/pong/raw frames).
    Control,
    Closed,
}

pub fn decode(msg: Message) -> Frame {
    match msg {
        Message::Text(text) => payload_from_slice(text.as_bytes()),
        Message::Binary(bytes) => {
            if is_gzip(&bytes) {
                match gunzip(&bytes) {
                    Some(raw) => payload_from_slice(&raw),
                    None => Frame::Malformed,
                }
            } else {
                payload_from_slice(&bytes)
            }
        }
        Message::Close(_) => Frame::Closed,
        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => Frame::Control,
    }
}

/// Parse a body as a metrics payload; anything but a JSON object is rejected.
pub fn parse_payload(bytes: &[u8]) -> Option<RawPayload> {
    serde_json::from_slice::<RawPayload>(bytes)
        .ok()
        .filter(|v| v.is_object())
}

fn payload_from_slice(bytes: &[u8]) -> Frame {
    parse_payload(bytes).map_or(Frame::Malformed, Frame::Payload)
}

fn is_gzip(bytes: &[u8]) -> bool {
    bytes.len() >= 2 && bytes[0] == 0x1f && bytes[1] == 0x8b
}

fn gunzip(bytes: &[u8]) -> Option<Vec<u8>> {
    let mut dec = GzDecoder::new(bytes);
    let mut out = Vec::new();
    dec.read_to_end(&mut out).ok()?;
    Some(out)
}
