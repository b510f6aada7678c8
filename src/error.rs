use std::time::Duration;

use crate::RawResponse;

/// Boxed error returned by transformers and validators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Invalid or incomplete request configuration. Raised before any
    /// network activity and never retried.
    #[error("configuration error: {0}")]
    Config(String),
    /// Network or request execution error from `reqwest`.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    /// Non-success HTTP status, or a timeout modeled as status 408.
    #[error("{message}")]
    Http {
        /// HTTP status code (408 for timeouts).
        status: u16,
        /// `"HTTP <status>: <text>"` or `"Request timeout after <ms>ms"`.
        message: String,
        /// Raw response snapshot; absent for timeouts.
        response: Option<Box<RawResponse>>,
    },
    /// Response body or final typed value could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
    /// A transformer or validator rejected the payload.
    #[error("transformer {stage} failed: {source}")]
    Transform {
        /// Zero-based position of the failing stage in the pipeline.
        stage: usize,
        source: BoxError,
    },
}

impl FetchError {
    pub(crate) fn timeout(timeout: Duration) -> Self {
        Self::Http {
            status: 408,
            message: format!("Request timeout after {}ms", timeout.as_millis()),
            response: None,
        }
    }

    pub(crate) fn from_response(response: RawResponse) -> Self {
        Self::Http {
            status: response.status.as_u16(),
            message: format!("HTTP {}: {}", response.status.as_u16(), response.status_text()),
            response: Some(Box::new(response)),
        }
    }

    /// Returns the HTTP-like status code carried by this error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the raw response attached to an HTTP status error.
    pub fn response(&self) -> Option<&RawResponse> {
        match self {
            Self::Http { response, .. } => response.as_deref(),
            _ => None,
        }
    }

    /// True when this error was synthesized by the per-attempt timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::Http {
                status: 408,
                response: None,
                ..
            }
        )
    }
}
