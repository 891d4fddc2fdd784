//! Key casing between the wire (snake_case) and the library (camelCase).
//!
//! # Design
//! Conversion walks objects and arrays recursively. A key listed as
//! passthrough is itself converted, but its value is copied verbatim so
//! opaque user maps (event `metadata`, for example) keep the keys the caller
//! chose. Non-ASCII characters and digits are never re-cased.

use serde_json::{Map, Value};

/// Keys whose children are copied without re-casing.
pub const DEFAULT_PASSTHROUGH_KEYS: &[&str] = &["metadata"];

/// `requestId` -> `request_id`.
pub fn to_snake_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for ch in key.chars() {
        if ch.is_ascii_uppercase() {
            if !out.is_empty() {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// `request_id` -> `requestId`.
///
/// An underscore that is not followed by a lowercase ASCII letter is kept,
/// so `address_2` survives a snake -> camel -> snake trip unchanged.
pub fn to_camel_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut pending_underscore = false;
    for ch in key.chars() {
        if ch == '_' && !out.is_empty() {
            if pending_underscore {
                out.push('_');
            }
            pending_underscore = true;
            continue;
        }
        if pending_underscore {
            pending_underscore = false;
            if ch.is_ascii_lowercase() {
                out.push(ch.to_ascii_uppercase());
                continue;
            }
            out.push('_');
        }
        out.push(ch);
    }
    if pending_underscore {
        out.push('_');
    }
    out
}

/// Convert every object key in `value` to snake_case.
pub fn keys_to_snake<S: AsRef<str>>(value: Value, passthrough: &[S]) -> Value {
    convert_keys(value, passthrough, to_snake_case)
}

/// Convert every object key in `value` to camelCase.
pub fn keys_to_camel<S: AsRef<str>>(value: Value, passthrough: &[S]) -> Value {
    convert_keys(value, passthrough, to_camel_case)
}

fn convert_keys<S: AsRef<str>>(value: Value, passthrough: &[S], convert: fn(&str) -> String) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, child) in map {
                let converted = convert(&key);
                let child = if is_passthrough(passthrough, &key, &converted) {
                    child
                } else {
                    convert_keys(child, passthrough, convert)
                };
                out.insert(converted, child);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| convert_keys(item, passthrough, convert))
                .collect(),
        ),
        other => other,
    }
}

fn is_passthrough<S: AsRef<str>>(passthrough: &[S], original: &str, converted: &str) -> bool {
    passthrough
        .iter()
        .any(|key| key.as_ref() == original || key.as_ref() == converted)
}
