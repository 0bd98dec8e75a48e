//! Small display helpers: human-readable sizes, percentages, durations.

use chrono::{DateTime, Local, TimeZone};

use crate::types::{BootTime, ConnectionState, HealthStatus, Load, Reading};

const NONE: &str = "-";

pub fn human(b: f64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut x = b;
    let mut i = 0;
    while x >= 1024.0 && i < UNITS.len() - 1 {
        x /= 1024.0;
        i += 1;
    }
    if x < 10.0 {
        format!("{x:.2} {}", UNITS[i])
    } else {
        format!("{x:.1} {}", UNITS[i])
    }
}

pub fn bytes(b: Option<f64>) -> String {
    b.map(human).unwrap_or_else(|| NONE.into())
}

pub fn pct(p: Option<f64>) -> String {
    p.map(|p| format!("{p:.1}%")).unwrap_or_else(|| NONE.into())
}

pub fn duration(secs: Option<f64>) -> String {
    let Some(secs) = secs.filter(|s| *s >= 0.0) else {
        return NONE.into();
    };
    let s = secs.floor() as u64;
    let (d, h, m) = (s / 86_400, (s % 86_400) / 3_600, (s % 3_600) / 60);
    format!("{d}d {h}h {m}m")
}

pub fn load(l: Option<&Load>) -> String {
    match l {
        Some(Load::Values(v)) => v
            .iter()
            .map(|x| format!("{x:.2}"))
            .collect::<Vec<_>>()
            .join(" / "),
        Some(Load::Text(s)) => s.clone(),
        None => NONE.into(),
    }
}

/// Epoch seconds in local time; strings that parse as RFC 3339 are reformatted,
/// anything else is shown as-is.
pub fn boot_time(b: Option<&BootTime>) -> String {
    match b {
        Some(BootTime::Epoch(secs)) => Local
            .timestamp_millis_opt((secs * 1000.0) as i64)
            .single()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| secs.to_string()),
        Some(BootTime::Text(s)) => DateTime::parse_from_rfc3339(s)
            .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|_| s.clone()),
        None => NONE.into(),
    }
}

pub fn memory(r: &Reading) -> String {
    match (r.mem_used_bytes, r.mem_total_bytes) {
        (Some(used), Some(total)) => {
            format!("{} / {} ({})", human(used), human(total), pct(r.mem_percent))
        }
        _ => NONE.into(),
    }
}

/// One-line summary used by the headless binary.
pub fn status_line(state: ConnectionState, health: HealthStatus, r: Option<&Reading>) -> String {
    let Some(r) = r else {
        return format!("[{}] health={} no data yet", state.as_str(), health.as_str());
    };
    let mut line = format!(
        "[{}] health={} host={} cpu={} mem={} up={} load={}",
        state.as_str(),
        health.as_str(),
        r.host.as_deref().unwrap_or(NONE),
        pct(r.cpu_percent),
        memory(r),
        duration(r.uptime_seconds),
        load(r.load.as_ref()),
    );
    if r.boot_time.is_some() {
        line.push_str(&format!(" boot={}", boot_time(r.boot_time.as_ref())));
    }
    line
}
