//! Blocking execution of an `HttpRequest` with ureq.
//!
//! # Design
//! This is the only module that performs network I/O. HTTP status codes are
//! returned as data (`http_status_as_error(false)`), so the only failures
//! surfaced here are "no response" (`Transport`) and "unreadable body"
//! (`Io`). The response is consumed and dropped before returning on every
//! path.

use tracing::{trace, warn};
use ureq::Agent;

use crate::error::LookupError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Build the agent shared by every lookup of one client.
pub(crate) fn new_agent() -> Agent {
    Agent::config_builder()
        .http_status_as_error(false)
        .build()
        .new_agent()
}

/// Execute `request` and read its full body.
///
/// Blocks until the body is read or `request.timeout` elapses.
pub fn execute(agent: &Agent, request: &HttpRequest) -> Result<HttpResponse, LookupError> {
    let builder = match request.method {
        HttpMethod::Get => agent.get(&request.url),
    };

    let mut response = builder
        .config()
        .timeout_global(Some(request.timeout))
        .build()
        .call()
        .map_err(|e| {
            warn!("ip2geo request failed: {}", e);
            LookupError::Transport(e)
        })?;

    let status = response.status().as_u16();
    // Bodies are read without a size limit.
    let body = response
        .body_mut()
        .with_config()
        .limit(u64::MAX)
        .read_to_vec()
        .map_err(|e| {
            warn!("ip2geo response body read failed (status {}): {}", status, e);
            LookupError::Io(e)
        })?;

    trace!(status, bytes = body.len(), "ip2geo response received");
    Ok(HttpResponse { status, body })
}
