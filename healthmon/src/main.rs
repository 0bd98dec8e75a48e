//! Entry point for the healthmon client. Parses args, resolves the target and
//! logs one status line per reading.

use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context};
use healthmon::config::{retry_from_ms, MonitorConfig};
use healthmon::endpoint::Endpoint;
use healthmon::format::status_line;
use healthmon::health::HealthProbe;
use healthmon::http::PullClient;
use healthmon::profiles::{load_profiles, ProfileRequest, ResolveProfile};
use healthmon::types::{HealthStatus, LiveView};
use healthmon::{normalize, Monitor};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const USAGE: &str = "[--tls-ca CERT_PEM|-t CERT_PEM] [--profile NAME|-P NAME] [--poll-ms N] [--push-retry-ms N] [--health-interval-ms N] [--once] [http://HOST:PORT]";

#[derive(Debug, Default)]
struct ParsedArgs {
    url: Option<String>,
    tls_ca: Option<String>,
    profile: Option<String>,
    poll_ms: Option<u64>,
    push_retry_ms: Option<u64>,
    health_interval_ms: Option<u64>,
    once: bool,
}

fn parse_ms(flag: &str, v: Option<String>) -> Result<u64, String> {
    let v = v.ok_or_else(|| format!("{flag} needs a value"))?;
    v.parse::<u64>()
        .map_err(|_| format!("{flag}: '{v}' is not a number of milliseconds"))
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<ParsedArgs, String> {
    let mut it = args.into_iter();
    let prog = it.next().unwrap_or_else(|| "healthmon".into());
    let mut parsed = ParsedArgs::default();

    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                return Err(format!("Usage: {prog} {USAGE}"));
            }
            "--tls-ca" | "-t" => {
                parsed.tls_ca = it.next();
            }
            "--profile" | "-P" => {
                parsed.profile = it.next();
            }
            "--poll-ms" => parsed.poll_ms = Some(parse_ms(&arg, it.next())?),
            "--push-retry-ms" => parsed.push_retry_ms = Some(parse_ms(&arg, it.next())?),
            "--health-interval-ms" => {
                parsed.health_interval_ms = Some(parse_ms(&arg, it.next())?)
            }
            "--once" => {
                parsed.once = true;
            }
            _ if arg.starts_with("--tls-ca=") => {
                if let Some((_, v)) = arg.split_once('=') {
                    if !v.is_empty() {
                        parsed.tls_ca = Some(v.to_string());
                    }
                }
            }
            _ if arg.starts_with("--profile=") => {
                if let Some((_, v)) = arg.split_once('=') {
                    if !v.is_empty() {
                        parsed.profile = Some(v.to_string());
                    }
                }
            }
            _ if arg.starts_with('-') => {
                return Err(format!("Unknown flag '{arg}'. Usage: {prog} {USAGE}"));
            }
            _ => {
                if parsed.url.is_none() {
                    parsed.url = Some(arg);
                } else {
                    return Err(format!("Unexpected argument. Usage: {prog} {USAGE}"));
                }
            }
        }
    }
    Ok(parsed)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // stdout is reserved for status lines
    let fmt_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let parsed = match parse_args(env::args()) {
        Ok(v) => v,
        Err(msg) => {
            eprintln!("{msg}");
            if msg.starts_with("Usage:") {
                return Ok(());
            }
            std::process::exit(2);
        }
    };

    init_tracing();
    let _ = rustls::crypto::ring::default_provider().install_default();

    let mut cfg = MonitorConfig::load().context("loading configuration")?;

    let req = ProfileRequest {
        profile_name: parsed.profile.clone(),
        url: parsed.url.clone(),
        tls_ca: parsed.tls_ca.clone(),
    };
    let (base, tls_ca) = match req.resolve(&load_profiles()) {
        ResolveProfile::Direct(u, t) | ResolveProfile::Loaded(u, t) => (u, t),
        ResolveProfile::Missing(name) => bail!("profile '{name}' not found"),
        ResolveProfile::None => (cfg.api_base.clone(), None),
    };
    if let Some(ca) = tls_ca {
        cfg.tls_ca = Some(PathBuf::from(ca));
    }
    if let Some(ms) = parsed.poll_ms {
        cfg.poll_interval = std::time::Duration::from_millis(ms.max(1));
    }
    if let Some(ms) = parsed.push_retry_ms {
        cfg.push_retry = retry_from_ms(ms);
    }
    if let Some(ms) = parsed.health_interval_ms {
        cfg.health_interval = (ms > 0).then(|| std::time::Duration::from_millis(ms));
    }
    cfg.api_base = base;

    if parsed.once {
        return run_once(&cfg).await;
    }
    run(cfg).await
}

// Single health check and pull; prints the normalized reading and the raw
// payload as JSON.
async fn run_once(cfg: &MonitorConfig) -> anyhow::Result<()> {
    let client = PullClient::new(cfg)?;
    let endpoint = Endpoint::new(&cfg.api_base, cfg);
    let health = HealthProbe::new(client.clone()).check(&endpoint).await;
    let raw = client
        .get_json(endpoint.metrics_url())
        .await
        .with_context(|| format!("fetching {}", endpoint.metrics_url()))?;
    let out = serde_json::json!({
        "health": health,
        "reading": normalize(&raw),
        "raw": raw,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

async fn run(cfg: MonitorConfig) -> anyhow::Result<()> {
    let base = cfg.api_base.clone();
    let mut monitor = Monitor::new(cfg)?;
    let mut live = monitor.live();
    let mut health = monitor.health();
    monitor.set_endpoint(&base);

    let mut last_seen = None;
    loop {
        tokio::select! {
            changed = live.changed() => {
                if changed.is_err() { break; }
                let view: LiveView = live.borrow_and_update().clone();
                // Only print when a new sample arrived, not on bare state changes
                let newest = view.history.last().map(|s| (view.session, s.timestamp, view.history.len()));
                if newest.is_some() && newest != last_seen {
                    let status: HealthStatus = *health.borrow();
                    println!("{}", status_line(view.state, status, view.reading.as_ref()));
                }
                last_seen = newest;
            }
            changed = health.changed() => {
                if changed.is_err() { break; }
                tracing::info!("health: {}", health.borrow_and_update().as_str());
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    monitor.stop();
    Ok(())
}
