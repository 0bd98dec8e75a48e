//! Maps the many server payload shapes onto one `Reading`.
//!
//! Each canonical field has an ordered list of aliases. The first alias that is
//! present (key exists and is not null) wins; its value is then coerced. A value
//! of the wrong type resolves to `None`, it never falls through to the next
//! alias and never becomes zero.

use serde_json::{Map, Value};

use crate::types::{BootTime, Load, RawPayload, Reading};

const CPU_KEYS: &[&str] = &["cpu", "cpu_percent", "cpu_usage"];
const MEM_KEYS: &[&str] = &["ram", "memory", "mem", "virtual_memory"];
const UPTIME_KEYS: &[&str] = &["uptime_sec", "uptime_seconds", "uptime"];
const BOOT_KEYS: &[&str] = &["boot_time", "boot"];
const LOAD_KEYS: &[&str] = &["load", "loadavg", "load_avg"];
const HOST_KEYS: &[&str] = &["host", "hostname", "node", "machine", "platform"];

// Object-form load averages: one alias pair per slot, in 1m/5m/15m order.
const LOAD_SLOTS: [[&str; 2]; 3] = [["1", "1m"], ["5", "5m"], ["15", "15m"]];

pub fn normalize(raw: &RawPayload) -> Reading {
    let Some(obj) = raw.as_object() else {
        return Reading::default();
    };

    let cpu_percent = first_present(obj, CPU_KEYS).and_then(number);

    let mem = first_present(obj, MEM_KEYS).and_then(Value::as_object);
    let mem_used_bytes = mem.and_then(|m| m.get("used")).and_then(number);
    let mem_total_bytes = mem.and_then(|m| m.get("total")).and_then(number);
    let mem_percent = mem
        .and_then(|m| m.get("percent"))
        .and_then(number)
        .or_else(|| match (mem_used_bytes, mem_total_bytes) {
            (Some(used), Some(total)) if total > 0.0 => Some(used / total * 100.0),
            _ => None,
        });

    Reading {
        cpu_percent,
        mem_used_bytes,
        mem_total_bytes,
        mem_percent,
        uptime_seconds: first_present(obj, UPTIME_KEYS).and_then(number),
        boot_time: first_present(obj, BOOT_KEYS).and_then(boot_time),
        load: first_present(obj, LOAD_KEYS).and_then(load),
        host: host(obj),
    }
}

fn first_present<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find(|v| !v.is_null())
}

fn number(v: &Value) -> Option<f64> {
    v.as_f64().filter(|n| n.is_finite())
}

fn boot_time(v: &Value) -> Option<BootTime> {
    match v {
        Value::String(s) => Some(BootTime::Text(s.clone())),
        other => number(other).map(BootTime::Epoch),
    }
}

fn load(v: &Value) -> Option<Load> {
    match v {
        Value::String(s) => Some(Load::Text(s.clone())),
        // Any non-empty all-numeric array; servers differ on how many averages they send.
        Value::Array(items) if !items.is_empty() => items
            .iter()
            .map(number)
            .collect::<Option<Vec<f64>>>()
            .map(Load::Values),
        Value::Object(map) => LOAD_SLOTS
            .iter()
            .map(|aliases| first_present(map, aliases).and_then(number))
            .collect::<Option<Vec<f64>>>()
            .map(Load::Values),
        _ => None,
    }
}

// Empty host strings are skipped like missing keys; the first usable alias wins.
fn host(obj: &Map<String, Value>) -> Option<String> {
    let v = HOST_KEYS
        .iter()
        .filter_map(|k| obj.get(*k))
        .find(|v| !v.is_null() && v.as_str() != Some(""))?;
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
