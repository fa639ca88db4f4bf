//! Error types for deploy passes.
//!
//! Every error propagates synchronously to the caller. Nothing here is
//! retried: a failure partway through a pass leaves earlier remote effects
//! applied and aborts the remaining operations.

use std::io;
use std::path::PathBuf;

/// Result type alias for deploy operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while extracting or executing operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed directive in the configuration document.
    ///
    /// The message starts with the dotted key path of the offending directive.
    #[error("{0}")]
    Config(String),

    /// A `${id:path:name}` token or an implicit lookup matched nothing.
    #[error("{path}:{name} not found")]
    LookupNotFound {
        /// Canonical collection path that was searched.
        path: String,
        /// Object name that was looked up.
        name: String,
    },

    /// The remote API reported a failure.
    #[error("HTTP [{}] {message}", status_text(.status))]
    Remote {
        /// HTTP status code if one was received.
        status: Option<u16>,
        /// Message extracted from the response.
        message: String,
    },

    /// A create call answered without an id by either known convention.
    #[error("entity id not found in POST response for {path}")]
    AmbiguousCreateResponse {
        /// Path the create request was sent to.
        path: String,
    },

    /// IO error while reading a local file.
    #[error("IO error at {path}: {source}")]
    Io {
        /// Path involved in the error.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },

    /// A configuration document could not be parsed.
    #[error("invalid document {path}: {message}")]
    Document {
        /// File the document was read from.
        path: PathBuf,
        /// Parser message.
        message: String,
    },
}

fn status_text(status: &Option<u16>) -> String {
    status.map_or_else(|| "-".to_string(), |s| s.to_string())
}

impl Error {
    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an IO error with path context.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a remote error.
    pub fn remote(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Remote {
            status,
            message: message.into(),
        }
    }

    /// Whether this error means "the remote object does not exist".
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::LookupNotFound { .. } | Self::Remote { status: Some(404), .. }
        )
    }
}
