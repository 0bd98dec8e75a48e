//! Payload normalization across server schema variants.

use healthmon::normalize;
use healthmon::types::{BootTime, Load, Reading};
use serde_json::json;

#[test]
fn reference_server_payload() {
    let raw = json!({
        "ts": 1700000000.5,
        "host": "web-1",
        "os": "Linux 6.1",
        "uptime_sec": 93784,
        "cpu_percent": 42.5,
        "ram": {"total": 8000000000u64, "used": 2000000000u64, "percent": 25.0},
        "loadavg": {"1": 0.5, "5": 0.25, "15": 0.125},
        "disks": {},
        "net": {}
    });
    let r = normalize(&raw);
    assert_eq!(r.cpu_percent, Some(42.5));
    assert_eq!(r.mem_used_bytes, Some(2e9));
    assert_eq!(r.mem_total_bytes, Some(8e9));
    assert_eq!(r.mem_percent, Some(25.0));
    assert_eq!(r.uptime_seconds, Some(93784.0));
    assert_eq!(r.load, Some(Load::Values(vec![0.5, 0.25, 0.125])));
    assert_eq!(r.host.as_deref(), Some("web-1"));
    assert_eq!(r.boot_time, None);
}

#[test]
fn first_alias_wins() {
    let r = normalize(&json!({"cpu": 1.0, "cpu_percent": 2.0, "cpu_usage": 3.0}));
    assert_eq!(r.cpu_percent, Some(1.0));
    let r = normalize(&json!({"cpu_percent": 2.0, "cpu_usage": 3.0}));
    assert_eq!(r.cpu_percent, Some(2.0));

    let r = normalize(&json!({
        "memory": {"used": 1, "total": 2},
        "ram": {"used": 3, "total": 4},
        "virtual_memory": {"used": 5, "total": 6}
    }));
    assert_eq!(r.mem_used_bytes, Some(3.0));
    assert_eq!(r.mem_total_bytes, Some(4.0));

    let r = normalize(&json!({"uptime": 1, "uptime_seconds": 2, "uptime_sec": 3}));
    assert_eq!(r.uptime_seconds, Some(3.0));

    let r = normalize(&json!({"boot": 10, "boot_time": 20}));
    assert_eq!(r.boot_time, Some(BootTime::Epoch(20.0)));

    let r = normalize(&json!({"load_avg": "x", "loadavg": "y", "load": "z"}));
    assert_eq!(r.load, Some(Load::Text("z".into())));

    let r = normalize(&json!({"platform": "p", "machine": "m", "node": "n", "hostname": "h"}));
    assert_eq!(r.host.as_deref(), Some("h"));
}

#[test]
fn null_alias_is_not_present() {
    let r = normalize(&json!({"cpu": null, "cpu_percent": 9.5}));
    assert_eq!(r.cpu_percent, Some(9.5));
}

#[test]
fn wrong_type_is_none_not_zero() {
    let r = normalize(&json!({"cpu": "high", "cpu_percent": 9.5, "uptime_sec": true}));
    assert_eq!(r.cpu_percent, None);
    assert_eq!(r.uptime_seconds, None);
}

#[test]
fn mem_percent_derived_from_used_and_total() {
    let r = normalize(&json!({"mem": {"used": 4096, "total": 8192}}));
    assert_eq!(r.mem_percent, Some(50.0));

    let r = normalize(&json!({"ram": {"used": 4096}}));
    assert_eq!(r.mem_percent, None);

    let r = normalize(&json!({"ram": {"used": 0, "total": 0}}));
    assert_eq!(r.mem_percent, None);

    let r = normalize(&json!({"ram": {"used": 1, "total": 4, "percent": 99.0}}));
    assert_eq!(r.mem_percent, Some(99.0));

    let r = normalize(&json!({"ram": 512}));
    assert_eq!(r.mem_used_bytes, None);
    assert_eq!(r.mem_percent, None);
}

#[test]
fn load_shapes() {
    let r = normalize(&json!({"load": {"1m": 0.5, "5m": 0.3, "15m": 0.1}}));
    assert_eq!(r.load, Some(Load::Values(vec![0.5, 0.3, 0.1])));

    let r = normalize(&json!({"load": {"15": 3.0, "1": 1.0, "5": 2.0}}));
    assert_eq!(r.load, Some(Load::Values(vec![1.0, 2.0, 3.0])));

    let r = normalize(&json!({"load_avg": [0.9, 0.8, 0.7]}));
    assert_eq!(r.load, Some(Load::Values(vec![0.9, 0.8, 0.7])));

    let r = normalize(&json!({"load": "0.10 0.20 0.30"}));
    assert_eq!(r.load, Some(Load::Text("0.10 0.20 0.30".into())));

    // Arrays keep whatever length the server sends
    let r = normalize(&json!({"load": [1.5]}));
    assert_eq!(r.load, Some(Load::Values(vec![1.5])));
    let r = normalize(&json!({"load": [0.4, 0.3, 0.2, 0.1]}));
    assert_eq!(r.load, Some(Load::Values(vec![0.4, 0.3, 0.2, 0.1])));

    // Incomplete or non-numeric shapes are dropped rather than padded with zeros
    let r = normalize(&json!({"load": {"1m": 0.5}}));
    assert_eq!(r.load, None);
    let r = normalize(&json!({"load": [0.5, "x", 0.1]}));
    assert_eq!(r.load, None);
    let r = normalize(&json!({"load": []}));
    assert_eq!(r.load, None);
}

#[test]
fn boot_time_number_or_string() {
    let r = normalize(&json!({"boot_time": 1700000000}));
    assert_eq!(r.boot_time, Some(BootTime::Epoch(1.7e9)));
    let r = normalize(&json!({"boot": "2024-01-01T00:00:00Z"}));
    assert_eq!(
        r.boot_time,
        Some(BootTime::Text("2024-01-01T00:00:00Z".into()))
    );
    let r = normalize(&json!({"boot": {"nested": 1}}));
    assert_eq!(r.boot_time, None);
}

#[test]
fn empty_host_falls_through() {
    let r = normalize(&json!({"host": "", "hostname": "real"}));
    assert_eq!(r.host.as_deref(), Some("real"));
    let r = normalize(&json!({"host": ["a"]}));
    assert_eq!(r.host, None);
}

#[test]
fn total_on_any_json() {
    for raw in [
        json!(null),
        json!(42),
        json!("cpu"),
        json!([{"cpu": 1}]),
        json!({}),
        json!({"cpu": {"deep": [1, 2]}, "ram": [1, 2], "load": 7}),
    ] {
        let r = normalize(&raw);
        assert_eq!(r.cpu_percent, None, "{raw}");
        assert_eq!(r.mem_percent, None, "{raw}");
        assert_eq!(r.load, None, "{raw}");
    }
    assert_eq!(normalize(&json!({})), Reading::default());
}
