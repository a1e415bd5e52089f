//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! These types describe an ip2geo request and its response as plain data.
//! `Ip2GeoClient::build_lookup` produces an `HttpRequest` and
//! `Ip2GeoClient::parse_lookup` consumes an `HttpResponse`; neither touches
//! the network. `transport::execute` is the single place that does, and
//! callers with their own HTTP stack can skip it entirely.

use std::time::Duration;

/// HTTP method for a request. The ip2geo API only answers GETs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
}

/// An HTTP request described as plain data.
///
/// `url` is fully encoded, query string included. `timeout` bounds the whole
/// round-trip and is copied from the client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub timeout: Duration,
}

/// An HTTP response described as plain data.
///
/// The body is kept as bytes; the client decides how to interpret it based
/// on the requested format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}
