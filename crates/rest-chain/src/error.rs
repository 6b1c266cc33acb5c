//! Error types for request building and execution

use crate::media_type::MediaTypeError;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Boxed error returned by a [`Transport`](crate::transport::Transport)
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Everything that can go wrong between assembling a request and filling
/// the caller's result containers. Every failure is single-attempt.
#[derive(Error, Debug)]
pub enum RestError {
    /// The accumulated base URL did not parse
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Method, header name or header value rejected while building the request
    #[error("Failed to build request: {0}")]
    RequestBuild(#[from] http::Error),

    /// Network or connection failure reported by the transport
    #[error("Transport error: {0}")]
    Transport(#[source] BoxError),

    /// Response content type does not contain the accept type
    #[error("Expected Response Content-Type [{got}] to match/contain Request Accept [{want}]")]
    ContentTypeMismatch { got: String, want: String },

    /// Failure while draining the response body
    #[error("Failed to read response body: {0}")]
    BodyRead(#[source] reqwest::Error),

    /// Decoding into the result container at `index` failed
    #[error("Failed to unmarshal response into result {index}: {source}")]
    Deserialization {
        index: usize,
        #[source]
        source: MediaTypeError,
    },

    /// Encoding a typed request body failed
    #[error("Failed to marshal request body: {0}")]
    Marshal(#[source] MediaTypeError),
}

/// Result type for REST operations
pub type RestResult<T> = Result<T, RestError>;

/// Error category for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestErrorCategory {
    /// DNS, TCP or TLS failures
    Connection,
    Timeout,
    /// The request could not be assembled
    Request,
    /// The response could not be turned into results
    Response,
    Unknown,
}

impl RestError {
    pub fn category(&self) -> RestErrorCategory {
        match self {
            RestError::InvalidUrl(_) | RestError::RequestBuild(_) | RestError::Marshal(_) => {
                RestErrorCategory::Request
            }
            RestError::Transport(source) => match source.downcast_ref::<reqwest::Error>() {
                Some(e) => classify_reqwest(e),
                None => RestErrorCategory::Unknown,
            },
            RestError::BodyRead(e) if e.is_timeout() => RestErrorCategory::Timeout,
            RestError::ContentTypeMismatch { .. }
            | RestError::BodyRead(_)
            | RestError::Deserialization { .. } => RestErrorCategory::Response,
        }
    }

    /// Error message with credentials, tokens and private addresses removed
    pub fn sanitized_message(&self) -> String {
        sanitize_error_message(&self.to_string())
    }
}

fn classify_reqwest(e: &reqwest::Error) -> RestErrorCategory {
    if e.is_timeout() {
        RestErrorCategory::Timeout
    } else if e.is_connect() {
        RestErrorCategory::Connection
    } else if e.is_builder() || e.is_request() {
        RestErrorCategory::Request
    } else {
        RestErrorCategory::Unknown
    }
}

static REDACTIONS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"(https?)://[^@/\s:]+:[^@/\s]+@", "$1://[REDACTED]@"),
        (
            r"\b(10\.\d+|172\.(1[6-9]|2[0-9]|3[01])|192\.168)\.\d+\.\d+\b",
            "[INTERNAL_IP]",
        ),
        (
            r"(?i)(authorization:\s*bearer|bearer|api[_-]?key|token|session)\s*[:=]?\s*[^\s;&]+",
            "$1: [REDACTED]",
        ),
    ]
    .into_iter()
    .map(|(pattern, replacement)| (Regex::new(pattern).expect("valid regex"), replacement))
    .collect()
});

fn sanitize_error_message(msg: &str) -> String {
    REDACTIONS
        .iter()
        .fold(msg.to_string(), |acc, (re, replacement)| {
            re.replace_all(&acc, *replacement).into_owned()
        })
}
