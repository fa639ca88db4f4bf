//! Error types for API calls.

/// Result type alias for API calls.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by [`crate::Client`] and its backends.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The API answered with a failure status or `success: false`.
    #[error("HTTP [{status}] {message}")]
    Http {
        /// Response status code.
        status: u16,
        /// `msg`, else `errors`, else the raw body.
        message: String,
    },

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response could not be interpreted.
    #[error("invalid API response: {0}")]
    InvalidResponse(String),

    /// A JMESPath query was invalid or failed to evaluate.
    #[error("invalid query: {0}")]
    Query(String),

    /// A JMESPath query evaluated to null.
    #[error("null response from transform")]
    NullTransform,

    /// Host or token was not configured.
    #[error("missing config: {0} required")]
    MissingConfig(String),
}

impl Error {
    /// Create an HTTP error.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// HTTP status, if the error came from a response.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the API reported the object as missing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::http(code, format!("HTTP {code}")),
            other => Self::Transport(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

impl From<Error> for deploygraph::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Http { status, message } => Self::remote(Some(status), message),
            Error::MissingConfig(_) | Error::Query(_) => Self::config(err.to_string()),
            Error::NullTransform => Self::remote(None, err.to_string()),
            Error::Transport(message) | Error::InvalidResponse(message) => Self::remote(None, message),
        }
    }
}
