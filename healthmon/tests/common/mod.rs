//! In-process mock of the metrics server: /ws, /metrics and /health.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use healthmon::config::MonitorConfig;
use healthmon::types::{ConnectionState, LiveView};
use tokio::sync::{broadcast, watch};

#[derive(Clone, Debug)]
pub enum PushCmd {
    Text(String),
    Binary(Vec<u8>),
    Close,
    /// Drop the TCP connection without a close handshake.
    Abort,
}

#[derive(Clone)]
pub struct MockState {
    pub metrics_hits: Arc<AtomicUsize>,
    pub ws_accepted: Arc<AtomicUsize>,
    pub ws_open: Arc<AtomicUsize>,
    pub ws_enabled: Arc<AtomicBool>,
    pub metrics_reply: Arc<Mutex<(StatusCode, String)>>,
    pub health_reply: Arc<Mutex<(StatusCode, String)>>,
    pub push: broadcast::Sender<PushCmd>,
}

pub struct MockServer {
    pub addr: SocketAddr,
    pub state: MockState,
}

impl MockServer {
    pub async fn start() -> Self {
        let (push, _) = broadcast::channel(64);
        let state = MockState {
            metrics_hits: Arc::new(AtomicUsize::new(0)),
            ws_accepted: Arc::new(AtomicUsize::new(0)),
            ws_open: Arc::new(AtomicUsize::new(0)),
            ws_enabled: Arc::new(AtomicBool::new(true)),
            metrics_reply: Arc::new(Mutex::new((
                StatusCode::OK,
                r#"{"cpu_percent": 10.0, "ram": {"used": 1, "total": 4}}"#.to_string(),
            ))),
            health_reply: Arc::new(Mutex::new((
                StatusCode::OK,
                r#"{"status": "ok"}"#.to_string(),
            ))),
            push,
        };
        let app = Router::new()
            .route("/ws", get(ws_handler))
            .route("/metrics", get(metrics_handler))
            .route("/health", get(health_handler))
            .with_state(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock");
        let addr = listener.local_addr().expect("mock addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Self { addr, state }
    }

    pub fn base(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn hits(&self) -> usize {
        self.state.metrics_hits.load(Ordering::SeqCst)
    }

    pub fn ws_open(&self) -> usize {
        self.state.ws_open.load(Ordering::SeqCst)
    }

    pub fn ws_accepted(&self) -> usize {
        self.state.ws_accepted.load(Ordering::SeqCst)
    }

    pub fn set_ws_enabled(&self, on: bool) {
        self.state.ws_enabled.store(on, Ordering::SeqCst);
    }

    pub fn set_metrics(&self, status: StatusCode, body: &str) {
        *self.state.metrics_reply.lock().unwrap() = (status, body.to_string());
    }

    pub fn set_health(&self, status: StatusCode, body: &str) {
        *self.state.health_reply.lock().unwrap() = (status, body.to_string());
    }

    pub fn push(&self, cmd: PushCmd) {
        let _ = self.state.push.send(cmd);
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(st): State<MockState>) -> Response {
    if !st.ws_enabled.load(Ordering::SeqCst) {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    ws.on_upgrade(move |socket| handle_socket(socket, st))
}

async fn handle_socket(mut socket: WebSocket, st: MockState) {
    // Subscribe before counting so a test that waits on ws_open never loses a frame
    let mut rx = st.push.subscribe();
    st.ws_accepted.fetch_add(1, Ordering::SeqCst);
    st.ws_open.fetch_add(1, Ordering::SeqCst);
    loop {
        tokio::select! {
            cmd = rx.recv() => match cmd {
                Ok(PushCmd::Text(t)) => {
                    if socket.send(Message::Text(t)).await.is_err() { break; }
                }
                Ok(PushCmd::Binary(b)) => {
                    if socket.send(Message::Binary(b)).await.is_err() { break; }
                }
                Ok(PushCmd::Abort) => break,
                Ok(PushCmd::Close) | Err(_) => {
                    let _ = socket.send(Message::Close(None)).await;
                    break;
                }
            },
            msg = socket.recv() => match msg {
                Some(Ok(_)) => {}
                _ => break,
            },
        }
    }
    drop(socket);
    st.ws_open.fetch_sub(1, Ordering::SeqCst);
}

async fn metrics_handler(State(st): State<MockState>) -> impl IntoResponse {
    st.metrics_hits.fetch_add(1, Ordering::SeqCst);
    let (status, body) = st.metrics_reply.lock().unwrap().clone();
    (status, [(header::CONTENT_TYPE, "application/json")], body)
}

async fn health_handler(State(st): State<MockState>) -> impl IntoResponse {
    let (status, body) = st.health_reply.lock().unwrap().clone();
    (status, [(header::CONTENT_TYPE, "application/json")], body)
}

/// Fast intervals so tests finish quickly.
pub fn test_config() -> MonitorConfig {
    MonitorConfig {
        poll_interval: Duration::from_millis(50),
        request_timeout: Duration::from_secs(2),
        ..MonitorConfig::default()
    }
}

pub async fn wait_state(rx: &mut watch::Receiver<LiveView>, state: ConnectionState) {
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|v| v.state == state))
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {state:?}"))
        .expect("transport dropped");
}

pub async fn wait_until<F: Fn() -> bool>(what: &str, cond: F) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !cond() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for {what}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
