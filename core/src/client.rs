//! Request builder, response parser and blocking lookup for the ip2geo API.
//!
//! # Design
//! `Ip2GeoClient` holds only its configuration and a ureq agent; nothing
//! changes between calls. A lookup is split into `build_lookup`, which
//! validates the inputs and produces an `HttpRequest`, and `parse_lookup`,
//! which interprets an `HttpResponse` according to the requested format.
//! `lookup` runs both around a single call to `transport::execute`.
//!
//! JSON payloads are decoded but not judged: a body carrying
//! `"success": false` is still an `Ok` result.

use serde_json::{Map, Value};
use tracing::debug;
use ureq::Agent;
use url::Url;

use crate::config::ClientConfig;
use crate::error::LookupError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::transport;
use crate::types::{Format, LookupRequest, LookupResult};

const CALLBACK_REQUIRES_JSONP: &str = "callback can only be used when format is jsonp";

/// Synchronous, stateless client for the ip2geo API.
///
/// Cheap to clone; clones share the underlying connection agent and may be
/// used from several threads at once.
#[derive(Clone)]
pub struct Ip2GeoClient {
    config: ClientConfig,
    agent: Agent,
}

impl Ip2GeoClient {
    /// Client for the public endpoint with the default timeout. `api_key`
    /// may be empty.
    pub fn new(api_key: &str) -> Self {
        Self::with_config(ClientConfig::new(api_key))
    }

    pub fn with_config(config: ClientConfig) -> Self {
        Self {
            config,
            agent: transport::new_agent(),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Look up `request.ip`, or the caller's address when it is absent.
    ///
    /// Issues exactly one GET and blocks until it completes or the configured
    /// timeout elapses.
    pub fn lookup(&self, request: &LookupRequest) -> Result<LookupResult, LookupError> {
        let http_request = self.build_lookup(request)?;
        debug!(
            ip = request.ip.as_deref().unwrap_or("<caller>"),
            format = request.format.as_ref().map(Format::as_str).unwrap_or("json"),
            "ip2geo lookup"
        );
        let response = transport::execute(&self.agent, &http_request)?;
        self.parse_lookup(request, response)
    }

    pub fn build_lookup(&self, request: &LookupRequest) -> Result<HttpRequest, LookupError> {
        if request.callback.is_some() && request.format != Some(Format::Jsonp) {
            return Err(LookupError::Validation(CALLBACK_REQUIRES_JSONP));
        }

        let mut url = Url::parse(&self.config.base_url)
            .map_err(|e| LookupError::InvalidBaseUrl(format!("{}: {e}", self.config.base_url)))?;

        if let Some(ip) = &request.ip {
            url.path_segments_mut()
                .map_err(|()| {
                    LookupError::InvalidBaseUrl(format!(
                        "{}: cannot append a path segment",
                        self.config.base_url
                    ))
                })?
                .pop_if_empty()
                .push(ip);
        }

        let params = self.query_params(request);
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }

        Ok(HttpRequest {
            method: HttpMethod::Get,
            url: url.into(),
            timeout: self.config.timeout,
        })
    }

    pub fn parse_lookup(
        &self,
        request: &LookupRequest,
        response: HttpResponse,
    ) -> Result<LookupResult, LookupError> {
        if request.expects_json() {
            // A bare `null` body decodes to an empty mapping.
            let map: Option<Map<String, Value>> =
                serde_json::from_slice(&response.body).map_err(LookupError::Decode)?;
            return Ok(LookupResult::Json(map.unwrap_or_default()));
        }
        let body = match String::from_utf8(response.body) {
            Ok(body) => body,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        };
        Ok(LookupResult::Raw(body))
    }

    /// Query parameters in wire order: key, format, callback.
    fn query_params<'a>(&'a self, request: &'a LookupRequest) -> Vec<(&'static str, &'a str)> {
        let mut params = Vec::with_capacity(3);
        if !self.config.api_key.is_empty() {
            params.push(("key", self.config.api_key.as_str()));
        }
        if let Some(format) = &request.format {
            params.push(("format", format.as_str()));
        }
        if let Some(callback) = &request.callback {
            params.push(("callback", callback.as_str()));
        }
        params
    }
}

impl std::fmt::Debug for Ip2GeoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ip2GeoClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
