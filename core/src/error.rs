//! Error types for the ip2geo client.
//!
//! # Design
//! Each variant marks the stage of a lookup that failed, so callers can tell
//! "fix your arguments" (`Validation`, `InvalidBaseUrl`) apart from "the API
//! could not be reached" (`Transport`) and "the API answered with something
//! unusable" (`Io`, `Decode`). There is no variant for a payload reporting
//! `success: false`: such payloads are returned to the caller undecided.

/// Errors returned by `Ip2GeoClient`.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    /// The argument combination is invalid. Raised before any network I/O.
    #[error("{0}")]
    Validation(&'static str),

    /// The configured base URL cannot be parsed or cannot carry a path.
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),

    /// No response was obtained: DNS failure, refused connection, timeout.
    #[error("unable to reach ip2geo API")]
    Transport(#[source] ureq::Error),

    /// The connection succeeded but the body could not be read in full.
    #[error("failed to read ip2geo API response body")]
    Io(#[source] ureq::Error),

    /// A JSON-format body is not a JSON object.
    #[error("invalid JSON response from API")]
    Decode(#[source] serde_json::Error),
}

impl LookupError {
    /// Whether the request never left the client.
    pub fn is_pre_flight(&self) -> bool {
        matches!(self, LookupError::Validation(_) | LookupError::InvalidBaseUrl(_))
    }
}
