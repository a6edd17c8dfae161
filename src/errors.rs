//! Error types for the monitor API client

use std::fmt;

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// No endpoint has been configured
    InvalidEndpoint,

    /// The transport produced a response that could not be read
    InvalidResponse,

    /// Response body did not match the expected schema
    Decoding(String),

    /// Connection, DNS, TLS or timeout failure
    Network(String),

    /// The server rejected the credential (HTTP 403)
    Authentication,

    /// Any other non-2xx status code
    Server(u16),

    /// Fallback for failures not otherwise classified
    Unknown,
}

impl ApiError {
    /// Classify an HTTP status code. Returns `None` for 2xx.
    pub fn from_status(code: u16) -> Option<Self> {
        match code {
            200..=299 => None,
            403 => Some(ApiError::Authentication),
            _ => Some(ApiError::Server(code)),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::InvalidEndpoint => write!(f, "Invalid URL"),
            ApiError::InvalidResponse => write!(f, "Invalid server response"),
            ApiError::Decoding(msg) => write!(f, "Failed to parse response: {}", msg),
            ApiError::Network(msg) => write!(f, "Network error: {}", msg),
            ApiError::Authentication => write!(f, "Authentication failed - Invalid API key"),
            ApiError::Server(code) => write!(f, "Server error: HTTP {}", code),
            ApiError::Unknown => write!(f, "Unknown error occurred"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decoding(err.to_string())
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            ApiError::Unknown
        } else if err.is_timeout() || err.is_connect() {
            ApiError::Network(err.to_string())
        } else if err.is_body() || err.is_decode() {
            ApiError::InvalidResponse
        } else {
            ApiError::Network(err.to_string())
        }
    }
}
