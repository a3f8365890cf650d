//! JSON equality by canonical serialization
//!
//! Both sides are rendered with sorted object keys and normalized numbers,
//! then compared as strings. Key order is insignificant; types are not
//! (`123` and `"123"` differ).

use std::fmt::Write as _;

use serde_json::Value;

use super::{Mismatch, MismatchSubject};
use crate::format::{DateFormat, parse_instant};

/// How strings are treated before comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonMode {
    /// Strings compare byte-for-byte
    #[default]
    Exact,
    /// Strings that parse as RFC3339 or RFC7231 date-times compare by instant
    CoerceDates,
}

/// Render `value` in canonical form.
#[must_use]
pub fn canonical_json(value: &Value, mode: JsonMode) -> String {
    let mut out = String::new();
    write_canonical(value, mode, &mut out);
    out
}

/// Canonical-form equality.
///
/// # Errors
///
/// Returns a body [`Mismatch`] with both canonical renderings and the path of
/// the first difference.
pub fn json_equal(expected: &Value, actual: &Value, mode: JsonMode) -> Result<(), Mismatch> {
    let expected_text = canonical_json(expected, mode);
    let actual_text = canonical_json(actual, mode);
    if expected_text == actual_text {
        return Ok(());
    }
    let mismatch = Mismatch::new(MismatchSubject::Body, expected_text, actual_text);
    Err(match first_difference(expected, actual, mode, "$") {
        Some(path) => mismatch.with_detail(format!("first difference at {path}")),
        None => mismatch,
    })
}

fn write_canonical(value: &Value, mode: JsonMode, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => {
            let _ = write!(out, "{b}");
        }
        Value::Number(n) => out.push_str(&canonical_number(n)),
        Value::String(s) => out.push_str(&canonical_string(s, mode)),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, mode, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key.as_str()], mode, out);
            }
            out.push('}');
        }
    }
}

/// Integral floats render as integers (`123.0` -> `123`).
fn canonical_number(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 9_007_199_254_740_992.0 => {
            format!("{}", f as i64)
        }
        _ => n.to_string(),
    }
}

fn canonical_string(s: &str, mode: JsonMode) -> String {
    if mode == JsonMode::CoerceDates {
        let instant = parse_instant(s, DateFormat::Rfc3339)
            .or_else(|_| parse_instant(s, DateFormat::Rfc7231));
        if let Ok(instant) = instant {
            return format!("date({})", instant.timestamp_millis());
        }
    }
    Value::String(s.to_string()).to_string()
}

fn first_difference(expected: &Value, actual: &Value, mode: JsonMode, path: &str) -> Option<String> {
    match (expected, actual) {
        (Value::Object(e), Value::Object(a)) => {
            let mut keys: Vec<&String> = e.keys().chain(a.keys()).collect();
            keys.sort();
            keys.dedup();
            keys.into_iter().find_map(|key| {
                let child = format!("{path}.{key}");
                match (e.get(key.as_str()), a.get(key.as_str())) {
                    (Some(ev), Some(av)) => first_difference(ev, av, mode, &child),
                    _ => Some(child),
                }
            })
        }
        (Value::Array(e), Value::Array(a)) if e.len() == a.len() => e
            .iter()
            .zip(a)
            .enumerate()
            .find_map(|(i, (ev, av))| first_difference(ev, av, mode, &format!("{path}[{i}]"))),
        _ if canonical_json(expected, mode) == canonical_json(actual, mode) => None,
        _ => Some(path.to_string()),
    }
}
