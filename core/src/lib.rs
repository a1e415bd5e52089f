//! Synchronous client for the ip2geo IP-geolocation API.
//!
//! # Overview
//! Looks up an IP address (or the caller's own address) with one blocking
//! HTTP GET and returns either the decoded JSON object or, for the `xml`,
//! `yaml` and `jsonp` formats, the raw response body.
//!
//! # Design
//! - `Ip2GeoClient` is stateless: configuration in, results out.
//! - A lookup is split into `build_lookup` (produces request) and
//!   `parse_lookup` (consumes response); `transport::execute` is the only
//!   code that touches the network, so callers can bring their own HTTP
//!   stack and still reuse validation and parsing.
//! - JSON payloads are returned as untyped maps and are not judged; see
//!   `LookupResult::reported_failure` for callers that want to.
//!
//! ```no_run
//! use ip2geo_core::{Ip2GeoClient, LookupRequest};
//!
//! let client = Ip2GeoClient::new("");
//! let result = client.lookup(&LookupRequest::new().ip("8.8.8.8"))?;
//! println!("{:?}", result.get("country"));
//! # Ok::<(), ip2geo_core::LookupError>(())
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod transport;
pub mod types;

pub use client::Ip2GeoClient;
pub use config::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
pub use error::LookupError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use types::{Format, LookupRequest, LookupResult};
