use reqwest::StatusCode;
use thiserror::Error;

use crate::fetch::find_blocked;

#[derive(Error, Debug)]
pub enum UnfurlError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("HTTP client error: {0}")]
    Client(String),

    #[error("Fetch failed: {0}")]
    Fetch(reqwest::Error),

    #[error("{url} returned HTTP {status}")]
    Status { status: StatusCode, url: String },

    #[error("Blocked address: {0}")]
    BlockedAddress(String),
}

/// Map reqwest errors to UnfurlError, surfacing non-success responses as
/// `Status` and refused targets (from the resolver or redirect policy) as
/// `BlockedAddress`, so callers can match without digging into reqwest.
impl From<reqwest::Error> for UnfurlError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(blocked) = find_blocked(&e) {
            return UnfurlError::BlockedAddress(blocked.ip.to_string());
        }
        if let Some(status) = e.status() {
            let url = e.url().map(|u| u.to_string()).unwrap_or_default();
            return UnfurlError::Status { status, url };
        }
        if e.is_builder() {
            return UnfurlError::Client(e.to_string());
        }
        UnfurlError::Fetch(e)
    }
}

impl UnfurlError {
    /// True for failures that happened on the wire (DNS, connect, timeout,
    /// bad status) rather than while preparing the request.
    pub fn is_transport(&self) -> bool {
        matches!(self, UnfurlError::Fetch(_) | UnfurlError::Status { .. })
    }
}

pub type UnfurlResult<T> = Result<T, UnfurlError>;
