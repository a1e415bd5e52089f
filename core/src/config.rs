//! Client configuration.

use std::time::Duration;

/// Endpoint of the public ip2geo API.
pub const DEFAULT_BASE_URL: &str = "https://api.ip2geoapi.com/ip";

/// Upper bound on a single lookup round-trip unless overridden.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Settings an `Ip2GeoClient` is built from.
///
/// An empty `api_key` means unauthenticated, rate-limited use.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_key: String,
    pub timeout: Duration,
    pub base_url: String,
}

impl ClientConfig {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Point the client somewhere else, e.g. a local stub. A trailing `/` is
    /// stripped.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            timeout: DEFAULT_TIMEOUT,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

// Hand-written so the key never ends up in logs.
impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let key = if self.api_key.is_empty() { "" } else { "<redacted>" };
        f.debug_struct("ClientConfig")
            .field("api_key", &key)
            .field("timeout", &self.timeout)
            .field("base_url", &self.base_url)
            .finish()
    }
}
