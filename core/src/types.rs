//! Request and result types for the ip2geo API.
//!
//! # Design
//! The remote API returns whatever fields it knows about an address, so the
//! JSON result is kept as an untyped `serde_json::Map` instead of a fixed
//! struct. Every other format is handed back verbatim.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

/// Response encoding requested through the `format` query parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Format {
    Json,
    Xml,
    Yaml,
    Jsonp,
    /// A value the client does not know; forwarded as-is and answered raw.
    Other(String),
}

impl Format {
    /// Map a wire value to a `Format`. The empty string means "no format".
    pub fn from_param(value: &str) -> Option<Format> {
        let format = match value {
            "" => return None,
            "json" => Format::Json,
            "xml" => Format::Xml,
            "yaml" => Format::Yaml,
            "jsonp" => Format::Jsonp,
            other => Format::Other(other.to_string()),
        };
        Some(format)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Format::Json => "json",
            Format::Xml => "xml",
            Format::Yaml => "yaml",
            Format::Jsonp => "jsonp",
            Format::Other(other) => other,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs of a single lookup. Absent fields are omitted from the request.
///
/// Setters treat an empty string as "absent", matching the wire contract
/// where an empty value is never sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupRequest {
    pub ip: Option<String>,
    pub format: Option<Format>,
    pub callback: Option<String>,
}

impl LookupRequest {
    /// A lookup of the caller's own address in the default format.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a request from the three raw parameters, empty meaning absent.
    pub fn from_params(ip: &str, format: &str, callback: &str) -> Self {
        Self::new()
            .ip(ip)
            .format_param(format)
            .callback(callback)
    }

    pub fn ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = non_empty(ip.into());
        self
    }

    pub fn format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    pub fn format_param(mut self, format: &str) -> Self {
        self.format = Format::from_param(format);
        self
    }

    pub fn callback(mut self, callback: impl Into<String>) -> Self {
        self.callback = non_empty(callback.into());
        self
    }

    /// Whether the body should be decoded as a JSON object.
    pub fn expects_json(&self) -> bool {
        matches!(self.format, None | Some(Format::Json))
    }
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

/// Outcome of a successful lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LookupResult {
    /// Decoded body for the default and `json` formats.
    Json(Map<String, Value>),
    /// Verbatim body for every other format.
    Raw(String),
}

impl LookupResult {
    pub fn as_json(&self) -> Option<&Map<String, Value>> {
        match self {
            LookupResult::Json(map) => Some(map),
            LookupResult::Raw(_) => None,
        }
    }

    pub fn as_raw(&self) -> Option<&str> {
        match self {
            LookupResult::Raw(body) => Some(body),
            LookupResult::Json(_) => None,
        }
    }

    pub fn into_json(self) -> Option<Map<String, Value>> {
        match self {
            LookupResult::Json(map) => Some(map),
            LookupResult::Raw(_) => None,
        }
    }

    /// Field of a JSON result. Always `None` for raw results.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_json().and_then(|map| map.get(key))
    }

    /// The `error` message of a JSON payload that carries `success: false`.
    ///
    /// The client never turns such payloads into errors; this is for callers
    /// that want to. A missing `error` field yields a generic message.
    pub fn reported_failure(&self) -> Option<&str> {
        let map = self.as_json()?;
        if map.get("success").and_then(Value::as_bool) != Some(false) {
            return None;
        }
        Some(
            map.get("error")
                .and_then(Value::as_str)
                .unwrap_or("ip2geo API reported a failure"),
        )
    }
}
