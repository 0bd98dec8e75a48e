//! Channel supervision: push first, polling fallback, optional push retry.
//!
//! A session is a single task that owns whichever data source is active (the
//! WebSocket stream while `Live`, the poll interval while `Degraded`) together
//! with the session's `HistoryBuffer`. Payloads are handled one at a time,
//! normalize -> append -> publish, in arrival order.

use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use futures_util::StreamExt;
use rustls::ClientConfig;
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{interval_at, Instant, Interval, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::config::{MonitorConfig, PushRetry};
use crate::endpoint::Endpoint;
use crate::error::Result;
use crate::history::HistoryBuffer;
use crate::http::PullClient;
use crate::normalize::normalize;
use crate::tls;
use crate::types::{ConnectionState, LiveView, RawPayload, Sample};
use crate::ws::{self, Frame, WsStream};

type Attempt = Pin<Box<dyn Future<Output = Result<WsStream>> + Send>>;

pub struct TransportManager {
    cfg: Arc<MonitorConfig>,
    client: PullClient,
    tls: Option<Arc<ClientConfig>>,
    view: Arc<watch::Sender<LiveView>>,
    task: Option<JoinHandle<()>>,
    last_session: u64,
}

impl TransportManager {
    pub fn new(cfg: Arc<MonitorConfig>) -> Result<Self> {
        let client = PullClient::new(&cfg)?;
        Self::with_client(cfg, client)
    }

    pub fn with_client(cfg: Arc<MonitorConfig>, client: PullClient) -> Result<Self> {
        let tls = cfg.tls_ca.as_deref().map(tls::client_config).transpose()?;
        let (tx, _) = watch::channel(LiveView::default());
        Ok(Self {
            cfg,
            client,
            tls,
            view: Arc::new(tx),
            task: None,
            last_session: 0,
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<LiveView> {
        self.view.subscribe()
    }

    /// Latest published view.
    pub fn view(&self) -> LiveView {
        self.view.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Tear down whatever is running, then begin a fresh session in
    /// `Connecting` with an empty history. Must be called inside a runtime.
    pub fn start(&mut self, endpoint: Endpoint) {
        self.stop();
        let id = self.last_session;
        self.view.send_replace(LiveView {
            session: id,
            ..LiveView::default()
        });
        info!("transport: session {id} connecting to {}", endpoint.base());

        let session = Session {
            id,
            endpoint,
            cfg: Arc::clone(&self.cfg),
            client: self.client.clone(),
            tls: self.tls.clone(),
            history: HistoryBuffer::new(),
            view: Arc::clone(&self.view),
        };
        self.task = Some(tokio::spawn(session.run()));
    }

    /// Cancel the channel and the poll timer, then publish `Stopped`. The last
    /// reading and history stay visible until the next `start`. Safe to call
    /// repeatedly.
    pub fn stop(&mut self) {
        let was_running = match self.task.take() {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        };
        // Retire the session id so a task caught mid-poll cannot publish.
        self.last_session += 1;
        let retired = self.last_session;
        self.view.send_if_modified(|v| {
            v.session = retired;
            if v.state == ConnectionState::Stopped {
                return false;
            }
            v.state = ConnectionState::Stopped;
            true
        });
        if was_running {
            info!("transport: session {} stopped", retired - 1);
        }
    }
}

impl Drop for TransportManager {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

struct Session {
    id: u64,
    endpoint: Endpoint,
    cfg: Arc<MonitorConfig>,
    client: PullClient,
    tls: Option<Arc<ClientConfig>>,
    history: HistoryBuffer,
    view: Arc<watch::Sender<LiveView>>,
}

impl Session {
    async fn run(mut self) {
        let push_url = match self.endpoint.push_url() {
            Ok(u) => Some(u.to_string()),
            Err(e) => {
                warn!("transport: {e}; polling only");
                None
            }
        };

        let mut channel = match push_url.clone() {
            Some(url) => match self.open(url).await {
                Ok(ws) => Some(ws),
                Err(e) => {
                    warn!("transport: {e}");
                    None
                }
            },
            None => None,
        };

        loop {
            channel = match channel {
                Some(ws) => {
                    self.set_state(ConnectionState::Live);
                    self.run_live(ws).await;
                    None
                }
                None => {
                    self.set_state(ConnectionState::Degraded);
                    // Only returns once a retry has reopened the push channel.
                    Some(self.run_degraded(push_url.as_deref()).await)
                }
            };
        }
    }

    fn open(&self, url: String) -> Attempt {
        let tls = self.tls.clone();
        let limit = self.cfg.connect_timeout;
        Box::pin(async move { ws::connect_within(&url, tls, limit).await })
    }

    async fn run_live(&mut self, mut ws: WsStream) {
        while let Some(msg) = ws.next().await {
            match msg {
                Ok(msg) => match ws::decode(msg) {
                    Frame::Payload(raw) => self.ingest(&raw),
                    Frame::Malformed => debug!("transport: dropped malformed push frame"),
                    Frame::Control => {}
                    Frame::Closed => break,
                },
                Err(e) => {
                    warn!("transport: push channel error: {e}");
                    break;
                }
            }
        }
        info!("transport: push channel closed, falling back to polling");
    }

    async fn run_degraded(&mut self, push_url: Option<&str>) -> WsStream {
        let every = self.cfg.poll_interval;
        let mut poll = interval_at(Instant::now() + every, every);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut retry = match (self.cfg.push_retry, push_url) {
            (PushRetry::Every(d), Some(_)) => Some(ticker(d)),
            _ => None,
        };
        let mut attempt: Option<Attempt> = None;

        loop {
            tokio::select! {
                _ = poll.tick() => self.poll_once().await,
                _ = next_tick(&mut retry), if attempt.is_none() => {
                    if let Some(url) = push_url {
                        debug!("transport: retrying push channel");
                        attempt = Some(self.open(url.to_string()));
                    }
                }
                res = in_flight(&mut attempt), if attempt.is_some() => {
                    attempt = None;
                    match res {
                        Ok(ws) => return ws,
                        Err(e) => debug!("transport: push retry failed: {e}"),
                    }
                }
            }
        }
    }

    async fn poll_once(&mut self) {
        match self.client.get_json(self.endpoint.metrics_url()).await {
            Ok(raw) if raw.is_object() => self.ingest(&raw),
            Ok(_) => debug!("transport: dropped non-object pull response"),
            Err(e) => debug!("transport: poll failed: {e}"),
        }
    }

    fn ingest(&mut self, raw: &RawPayload) {
        let reading = normalize(raw);
        let now = chrono::Utc::now().timestamp_millis();
        self.history.append(Sample::from_reading(now, &reading));
        let history = self.history.snapshot();
        let id = self.id;
        self.view.send_if_modified(|v| {
            if v.session != id {
                return false;
            }
            v.reading = Some(reading);
            v.raw = Some(raw.clone());
            v.history = history;
            true
        });
    }

    fn set_state(&self, state: ConnectionState) {
        let id = self.id;
        let changed = self.view.send_if_modified(|v| {
            if v.session != id || v.state == state {
                return false;
            }
            v.state = state;
            true
        });
        if changed {
            info!("transport: session {id} is {}", state.as_str());
        }
    }
}

fn ticker(every: Duration) -> Interval {
    let mut t = interval_at(Instant::now() + every, every);
    t.set_missed_tick_behavior(MissedTickBehavior::Delay);
    t
}

async fn next_tick(t: &mut Option<Interval>) {
    match t {
        Some(t) => {
            t.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn in_flight(attempt: &mut Option<Attempt>) -> Result<WsStream> {
    match attempt {
        Some(f) => f.await,
        None => std::future::pending().await,
    }
}
