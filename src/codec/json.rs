//! JSON
//!
//! Validation and re-layout work on the raw text so member order and number
//! spelling survive. Decoded values are `serde_json::Value` trees; numbers
//! keep their integer/float distinction and objects iterate in key order.

use serde::de::IgnoredAny;
use serde_json::error::Category;
use serde_json::Value;

use crate::contract::misuse;
use crate::status::{codes, FatResult, Failure};

/// Type tag of a decoded value.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Null = 0,
    Bool = 1,
    Number = 2,
    String = 3,
    Array = 4,
    Object = 5,
}

pub fn kind_of(value: &Value) -> ValueKind {
    match value {
        Value::Null => ValueKind::Null,
        Value::Bool(_) => ValueKind::Bool,
        Value::Number(_) => ValueKind::Number,
        Value::String(_) => ValueKind::String,
        Value::Array(_) => ValueKind::Array,
        Value::Object(_) => ValueKind::Object,
    }
}

/// Whether `data` is exactly one well-formed JSON value.
pub fn valid(data: &[u8]) -> bool {
    serde_json::from_slice::<IgnoredAny>(data).is_ok()
}

fn check(data: &[u8]) -> FatResult<()> {
    serde_json::from_slice::<IgnoredAny>(data)
        .map(|_| ())
        .map_err(|e| Failure::syntax(codes::JSON_SYNTAX, e.to_string()))
}

/// Strip insignificant whitespace.
pub fn compact(src: &[u8]) -> FatResult<Vec<u8>> {
    check(src)?;
    Ok(relayout(src, None))
}

/// Put each element on its own line. Lines after the first start with
/// `prefix` followed by one `indent` per nesting level.
pub fn indent(src: &[u8], prefix: &str, indent: &str) -> FatResult<Vec<u8>> {
    check(src)?;
    Ok(relayout(src, Some((prefix, indent))))
}

/// Decode one value. Empty input is EOF.
pub fn unmarshal(data: &[u8]) -> FatResult<Value> {
    if data.iter().all(u8::is_ascii_whitespace) {
        return Err(Failure::eof());
    }
    serde_json::from_slice(data).map_err(|e| match e.classify() {
        Category::Syntax | Category::Eof => Failure::syntax(codes::JSON_SYNTAX, e.to_string()),
        Category::Data | Category::Io => Failure::other(codes::JSON_OTHER, e.to_string()),
    })
}

pub fn marshal(value: &Value) -> FatResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| Failure::other(codes::JSON_OTHER, e.to_string()))
}

pub fn marshal_indent(value: &Value, prefix: &str, indent_str: &str) -> FatResult<Vec<u8>> {
    let compact = marshal(value)?;
    Ok(relayout(&compact, Some((prefix, indent_str))))
}

pub fn as_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        other => wrong_kind("json as_bool", other),
    }
}

pub fn as_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => wrong_kind("json as_string", other),
    }
}

pub fn as_number_string(value: &Value) -> String {
    match value {
        Value::Number(n) => n.to_string(),
        other => wrong_kind("json as_number_string", other),
    }
}

pub fn array_len(value: &Value) -> usize {
    match value {
        Value::Array(items) => items.len(),
        other => wrong_kind("json array_len", other),
    }
}

/// Element `index`; out of range is misuse.
pub fn array_get(value: &Value, index: usize) -> Value {
    match value {
        Value::Array(items) => match items.get(index) {
            Some(item) => item.clone(),
            None => misuse(
                "json array_get",
                format!("index {} out of range for length {}", index, items.len()),
            ),
        },
        other => wrong_kind("json array_get", other),
    }
}

/// Member names in sorted order.
pub fn object_keys(value: &Value) -> Vec<String> {
    match value {
        Value::Object(map) => map.keys().cloned().collect(),
        other => wrong_kind("json object_keys", other),
    }
}

pub fn object_get(value: &Value, key: &str) -> Option<Value> {
    match value {
        Value::Object(map) => map.get(key).cloned(),
        other => wrong_kind("json object_get", other),
    }
}

#[track_caller]
fn wrong_kind(op: &'static str, value: &Value) -> ! {
    misuse(op, format!("value is {:?}", kind_of(value)))
}

/// Rewrite already validated JSON text, dropping whitespace outside strings
/// and optionally breaking lines.
fn relayout(src: &[u8], layout: Option<(&str, &str)>) -> Vec<u8> {
    let mut out = Vec::with_capacity(src.len());
    let mut depth = 0usize;
    let mut i = 0;

    let newline = |out: &mut Vec<u8>, depth: usize| {
        if let Some((prefix, indent)) = layout {
            out.push(b'\n');
            out.extend_from_slice(prefix.as_bytes());
            for _ in 0..depth {
                out.extend_from_slice(indent.as_bytes());
            }
        }
    };

    while i < src.len() {
        let c = src[i];
        match c {
            b'"' => {
                let start = i;
                i += 1;
                while i < src.len() && src[i] != b'"' {
                    if src[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
                out.extend_from_slice(&src[start..(i + 1).min(src.len())]);
            }
            b'{' | b'[' => {
                let close = if c == b'{' { b'}' } else { b']' };
                let mut j = i + 1;
                while j < src.len() && src[j].is_ascii_whitespace() {
                    j += 1;
                }
                if j < src.len() && src[j] == close {
                    out.push(c);
                    out.push(close);
                    i = j;
                } else {
                    out.push(c);
                    depth += 1;
                    newline(&mut out, depth);
                }
            }
            b'}' | b']' => {
                depth = depth.saturating_sub(1);
                newline(&mut out, depth);
                out.push(c);
            }
            b',' => {
                out.push(c);
                newline(&mut out, depth);
            }
            b':' => {
                out.push(c);
                if layout.is_some() {
                    out.push(b' ');
                }
            }
            c if c.is_ascii_whitespace() => {}
            c => out.push(c),
        }
        i += 1;
    }
    out
}
