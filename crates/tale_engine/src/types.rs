use std::fmt;

use thiserror::Error;

/// A failed backend request.
///
/// `message` is what the view shows inline: the server's own text when the
/// response carried one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

impl ApiError {
    pub(crate) fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiErrorKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    TooLarge { max_bytes: u64 },
    Decode,
    Network,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiErrorKind::InvalidUrl => write!(f, "invalid url"),
            ApiErrorKind::HttpStatus(code) => write!(f, "http status {code}"),
            ApiErrorKind::Timeout => write!(f, "timeout"),
            ApiErrorKind::TooLarge { max_bytes } => {
                write!(f, "response larger than {max_bytes} bytes")
            }
            ApiErrorKind::Decode => write!(f, "undecodable response"),
            ApiErrorKind::Network => write!(f, "network error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LaunchError {
    /// Input incomplete; no request was issued.
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Remote(#[from] ApiError),
    /// A launch is already in flight.
    #[error("a launch is already in progress")]
    Busy,
}
