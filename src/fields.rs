//! Derivation of structured fields from a [`LogContext`] and an optional
//! payload.
//!
//! Fields come out in a fixed order: correlation id, source, duration,
//! method, url (or host/path/query), user, headers, status code, body.
//! Consumers should still key by name rather than position.

use crate::context::{ContextUrl, LogContext};
use crate::record::Field;
use serde::Serialize;
use std::borrow::Cow;
use std::time::SystemTime;

pub const CORRELATION_ID: &str = "correlation_id";
pub const SOURCE: &str = "source";
pub const DURATION: &str = "duration";
pub const HTTP_METHOD: &str = "http.method";
pub const HTTP_URL: &str = "http.url";
pub const HTTP_HOST: &str = "http.host";
pub const HTTP_PATH: &str = "http.path";
pub const HTTP_QUERY: &str = "http.query";
pub const USER_ID: &str = "user.id";
pub const USER_IP: &str = "user.ip";
pub const HTTP_HEADERS: &str = "http.headers";
pub const HTTP_STATUS_CODE: &str = "http.status_code";
pub const BODY: &str = "body";
pub const ERROR_CAUSES: &str = "error.causes";

/// Payload attached to a record. The constructor picks how the bytes or
/// value are turned into the `body` field, which is always a string.
#[derive(Debug, Clone)]
pub enum Body<'a> {
    /// Bytes expected to hold JSON; compacted, or kept as text when invalid.
    Json(&'a [u8]),
    /// Already-serialized bytes, attached as they are.
    Raw(&'a [u8]),
    /// A structured value, rendered as compact JSON.
    Value(serde_json::Value),
    /// A value whose serialization failed.
    Unserializable(String),
}

impl<'a> Body<'a> {
    pub fn json(bytes: &'a [u8]) -> Self {
        Body::Json(bytes)
    }

    pub fn raw(bytes: &'a [u8]) -> Self {
        Body::Raw(bytes)
    }

    pub fn serialize<T: Serialize + ?Sized>(value: &T) -> Body<'static> {
        match serde_json::to_value(value) {
            Ok(value) => Body::Value(value),
            Err(e) => Body::Unserializable(e.to_string()),
        }
    }

    /// Text for the `body` field, or `None` for an empty byte payload.
    pub fn render(&self) -> Option<String> {
        match self {
            Body::Json(bytes) if bytes.is_empty() => None,
            Body::Raw(bytes) if bytes.is_empty() => None,
            Body::Json(bytes) => Some(
                compact_json(bytes).unwrap_or_else(|| String::from_utf8_lossy(bytes).into_owned()),
            ),
            Body::Raw(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
            Body::Value(value) => Some(value.to_string()),
            Body::Unserializable(reason) => Some(format!("<unserializable body: {}>", reason)),
        }
    }
}

impl From<serde_json::Value> for Body<'static> {
    fn from(value: serde_json::Value) -> Self {
        Body::Value(value)
    }
}

/// Strip insignificant whitespace from valid JSON, leaving every token as
/// written. Numbers, key order and repeated keys survive untouched.
fn compact_json(bytes: &[u8]) -> Option<String> {
    serde_json::from_slice::<serde::de::IgnoredAny>(bytes).ok()?;

    let mut out = Vec::with_capacity(bytes.len());
    let mut in_string = false;
    let mut escaped = false;
    for &b in bytes {
        if in_string {
            out.push(b);
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b' ' | b'\t' | b'\n' | b'\r' => {}
            b'"' => {
                in_string = true;
                out.push(b);
            }
            _ => out.push(b),
        }
    }
    String::from_utf8(out).ok()
}

/// Flatten headers into `key=value` pairs separated by spaces. Values of
/// repeated keys are joined with commas under the first occurrence.
pub fn flatten_headers(headers: &[(&str, &str)]) -> String {
    let mut merged: Vec<(&str, Cow<'_, str>)> = Vec::with_capacity(headers.len());
    for (key, value) in headers {
        match merged.iter_mut().find(|entry| entry.0 == *key) {
            Some((_, existing)) => {
                let joined = existing.to_mut();
                joined.push(',');
                joined.push_str(value);
            }
            None => merged.push((*key, Cow::Borrowed(*value))),
        }
    }

    merged
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build the ordered field list for one record.
///
/// Never fails: undecodable bodies degrade to text and missing optional
/// context data is simply left out.
pub fn extract_fields<C: LogContext + ?Sized>(
    ctx: &C,
    body: Option<&Body<'_>>,
    status: Option<u16>,
    headers: Option<&[(&str, &str)]>,
) -> Vec<Field> {
    let mut fields = Vec::with_capacity(8);

    fields.push(Field::new(CORRELATION_ID, ctx.correlation_id()));

    if let Some(source) = present(ctx.source()) {
        fields.push(Field::new(SOURCE, source));
    }

    let elapsed = match ctx.started_at() {
        Some(start) => SystemTime::now().duration_since(start).unwrap_or_default(),
        None => ctx.start_time().elapsed(),
    };
    fields.push(Field::new(DURATION, elapsed.as_secs_f64()));

    if let Some(method) = present(ctx.method()) {
        fields.push(Field::new(HTTP_METHOD, method));
    }

    match ctx.url() {
        Some(ContextUrl::Parsed(url)) => {
            if let Some(host) = url.host_str() {
                let host = match url.port() {
                    Some(port) => format!("{}:{}", host, port),
                    None => host.to_string(),
                };
                fields.push(Field::new(HTTP_HOST, host));
            }
            fields.push(Field::new(HTTP_PATH, url.path()));
            if let Some(query) = present(url.query()) {
                fields.push(Field::new(HTTP_QUERY, query));
            }
        }
        Some(ContextUrl::Raw(raw)) if !raw.is_empty() => {
            fields.push(Field::new(HTTP_URL, raw));
        }
        _ => {}
    }

    if let Some(user_id) = present(ctx.user_id()) {
        fields.push(Field::new(USER_ID, user_id));
    }
    if let Some(ip) = present(ctx.ip_address()) {
        fields.push(Field::new(USER_IP, ip));
    }

    if let Some(headers) = headers.filter(|h| !h.is_empty()) {
        fields.push(Field::new(HTTP_HEADERS, flatten_headers(headers)));
    }

    if let Some(status) = status {
        fields.push(Field::new(HTTP_STATUS_CODE, status));
    }

    if let Some(body) = body.and_then(Body::render) {
        fields.push(Field::new(BODY, body));
    }

    fields
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
