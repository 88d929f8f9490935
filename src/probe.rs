//! Field probing over explorer JSON whose shape is not guaranteed.
//!
//! Each logical field is described by an ordered table of JSON paths. The
//! probing functions walk the table and return the first value that is
//! present and coerces to the requested type, so the spelling variants an
//! upstream API may use are listed in one auditable place.

use chrono::DateTime;
use ethers_core::types::U256;
use serde_json::{Map, Value};

use crate::units::parse_u256;

/// A path into a JSON document, one object key per segment.
pub type Path = &'static [&'static str];

/// Ordered spelling variants for one field.
pub type Rules = &'static [Path];

pub fn lookup<'a>(json: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = json;
    for key in path {
        current = current.as_object()?.get(*key)?;
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

/// First value present under any of `rules`, without coercion.
pub fn first<'a>(json: &'a Value, rules: Rules) -> Option<&'a Value> {
    rules.iter().find_map(|path| lookup(json, path))
}

fn probe_with<'a, T>(json: &'a Value, rules: Rules, coerce: impl Fn(&'a Value) -> Option<T>) -> Option<T> {
    rules
        .iter()
        .filter_map(|path| lookup(json, path))
        .find_map(coerce)
}

pub fn probe_u64(json: &Value, rules: Rules) -> Option<u64> {
    probe_with(json, rules, as_u64)
}

pub fn probe_f64(json: &Value, rules: Rules) -> Option<f64> {
    probe_with(json, rules, as_f64)
}

pub fn probe_u256(json: &Value, rules: Rules) -> Option<U256> {
    probe_with(json, rules, as_u256)
}

pub fn probe_string(json: &Value, rules: Rules) -> Option<String> {
    probe_with(json, rules, as_string)
}

pub fn probe_address(json: &Value, rules: Rules) -> Option<String> {
    probe_with(json, rules, as_address)
}

pub fn probe_timestamp(json: &Value, rules: Rules) -> Option<i64> {
    probe_with(json, rules, as_timestamp)
}

pub fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| f as u64)
        }),
        Value::String(s) => {
            let s = s.trim();
            if let Some(v) = parse_u256(s) {
                return (v <= U256::from(u64::MAX)).then(|| v.as_u64());
            }
            s.parse::<f64>()
                .ok()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| f as u64)
        }
        _ => None,
    }
}

pub fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

pub fn as_u256(value: &Value) -> Option<U256> {
    match value {
        Value::Number(n) => n.as_u64().map(U256::from).or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0)
                .and_then(|f| U256::from_dec_str(&format!("{:.0}", f)).ok())
        }),
        Value::String(s) => parse_u256(s),
        _ => None,
    }
}

pub fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Addresses arrive either as plain strings or as objects carrying the
/// address under `hash` or `address`.
pub fn as_address(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Object(obj) => obj
            .get("hash")
            .or_else(|| obj.get("address"))
            .or_else(|| obj.get("address_hash"))
            .and_then(as_string),
        _ => None,
    }
}

/// Unix seconds from a number, a numeric string or an ISO-8601 string.
pub fn as_timestamp(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
            .filter(|t| *t > 0),
        Value::String(s) => {
            let s = s.trim();
            if s.contains('T') {
                DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.timestamp())
            } else {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite() && *f > 0.0)
                    .map(|f| f as i64)
            }
        }
        _ => None,
    }
}

/// Locates the record array inside a listing response. `keys` are tried in
/// order; a bare top-level array is tried after the first `root_after` keys.
pub fn find_array<'a>(json: &'a Value, keys: &[&str], root_after: usize) -> Option<&'a Vec<Value>> {
    let keyed = move |key: &&str| json.get(*key).and_then(Value::as_array).filter(|a| !a.is_empty());
    keys.iter()
        .take(root_after)
        .find_map(keyed)
        .or_else(|| json.as_array().filter(|a| !a.is_empty()))
        .or_else(|| keys.iter().skip(root_after).find_map(keyed))
}

/// Any top-level array whose first element carries one of `marker_fields`.
pub fn find_array_by_marker<'a>(json: &'a Value, marker_fields: &[&str]) -> Option<&'a Vec<Value>> {
    let obj: &Map<String, Value> = json.as_object()?;
    obj.values().filter_map(Value::as_array).find(|arr| {
        arr.first()
            .and_then(Value::as_object)
            .map(|first| marker_fields.iter().any(|f| first.get(*f).map_or(false, |v| !v.is_null())))
            .unwrap_or(false)
    })
}
