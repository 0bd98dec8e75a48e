//! Session coordinator: one transport plus one health probe per endpoint.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use tokio::{sync::watch, task::JoinHandle};
use tracing::info;

use crate::config::MonitorConfig;
use crate::endpoint::Endpoint;
use crate::error::Result;
use crate::health::HealthProbe;
use crate::http::PullClient;
use crate::transport::TransportManager;
use crate::types::{HealthStatus, LiveView};

pub struct Monitor {
    cfg: Arc<MonitorConfig>,
    transport: TransportManager,
    probe: HealthProbe,
    health: Arc<watch::Sender<HealthStatus>>,
    health_gen: Arc<AtomicU64>,
    health_task: Option<JoinHandle<()>>,
    endpoint: Option<Endpoint>,
}

impl Monitor {
    pub fn new(cfg: MonitorConfig) -> Result<Self> {
        let cfg = Arc::new(cfg);
        let client = PullClient::new(&cfg)?;
        let transport = TransportManager::with_client(Arc::clone(&cfg), client.clone())?;
        let (health, _) = watch::channel(HealthStatus::Unknown);
        Ok(Self {
            cfg,
            transport,
            probe: HealthProbe::new(client),
            health: Arc::new(health),
            health_gen: Arc::new(AtomicU64::new(0)),
            health_task: None,
            endpoint: None,
        })
    }

    pub fn endpoint(&self) -> Option<&Endpoint> {
        self.endpoint.as_ref()
    }

    pub fn live(&self) -> watch::Receiver<LiveView> {
        self.transport.subscribe()
    }

    pub fn health(&self) -> watch::Receiver<HealthStatus> {
        self.health.subscribe()
    }

    /// Full stop, then start against `base`. Nothing from the previous target
    /// survives: history, reading and health all reset.
    pub fn set_endpoint(&mut self, base: &str) {
        let endpoint = Endpoint::new(base, &self.cfg);
        info!("monitor: target {}", endpoint.base());
        self.restart(endpoint);
    }

    /// Restart against the current target (manual push recovery).
    pub fn reconnect(&mut self) {
        if let Some(endpoint) = self.endpoint.clone() {
            info!("monitor: reconnecting to {}", endpoint.base());
            self.restart(endpoint);
        }
    }

    pub fn stop(&mut self) {
        self.transport.stop();
        self.stop_health();
    }

    fn restart(&mut self, endpoint: Endpoint) {
        self.stop();
        self.transport.start(endpoint.clone());
        self.start_health(endpoint.clone());
        self.endpoint = Some(endpoint);
    }

    fn stop_health(&mut self) {
        if let Some(task) = self.health_task.take() {
            task.abort();
        }
        self.health_gen.fetch_add(1, Ordering::SeqCst);
    }

    fn start_health(&mut self, endpoint: Endpoint) {
        let gen = self.health_gen.load(Ordering::SeqCst);
        self.health.send_replace(HealthStatus::Unknown);

        let probe = self.probe.clone();
        let tx = Arc::clone(&self.health);
        let current = Arc::clone(&self.health_gen);
        let every = self.cfg.health_interval;
        self.health_task = Some(tokio::spawn(async move {
            loop {
                let status = probe.check(&endpoint).await;
                tx.send_if_modified(|v| {
                    if current.load(Ordering::SeqCst) != gen || *v == status {
                        return false;
                    }
                    *v = status;
                    true
                });
                match every {
                    Some(every) => tokio::time::sleep(every).await,
                    None => break,
                }
            }
        }));
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        if let Some(task) = self.health_task.take() {
            task.abort();
        }
    }
}
