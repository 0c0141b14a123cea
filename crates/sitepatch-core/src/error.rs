//! Error types and handling for sitepatch-core operations.
//!
//! Errors are grouped into a handful of categories so callers can map them
//! onto user-facing responses without matching every variant:
//!
//! - **Input errors**: missing fields, unknown models, unsupported providers
//! - **Transport errors**: HTTP failures, missing response bodies, provider messages
//! - **Content errors**: the model answered but produced nothing usable
//! - **Local errors**: I/O, configuration, project storage
//!
//! Protocol anomalies inside a model response (an unmatched marker, a search
//! block that does not match, an unknown page path) are *not* errors. The
//! patch extractor skips them and keeps going.
//!
//! ```rust
//! use sitepatch_core::Error;
//!
//! let err = Error::Provider("You have exceeded your monthly included credits".into());
//! assert!(err.is_quota_exceeded());
//! assert_eq!(err.category(), "provider");
//! ```

use thiserror::Error;

/// Substring that providers use when an account ran out of credits.
const QUOTA_EXCEEDED_MARKER: &str = "exceeded your monthly included credits";

/// The main error type for sitepatch-core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Network operation failed.
    ///
    /// The underlying `reqwest::Error` is preserved so connection and timeout
    /// failures can be told apart from malformed requests.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration is invalid or inaccessible.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An inbound request is missing required fields.
    #[error("{0}")]
    Validation(String),

    /// The requested model is not in the catalog.
    #[error("Invalid model selected")]
    InvalidModel(String),

    /// The selected model cannot be served by the requested provider.
    #[error("The selected model does not support the {provider} provider.")]
    ProviderUnsupported {
        /// Provider id sent by the caller.
        provider: String,
    },

    /// The transport answered without a body to read.
    #[error("No response body from LM Studio")]
    NoResponseBody,

    /// The model response contained nothing actionable.
    #[error("No content returned from the model")]
    NoContent,

    /// The provider rejected the request.
    ///
    /// Carries the provider's own message, which is inspected for quota hints.
    #[error("{0}")]
    Provider(String),

    /// Requested resource was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Project storage operation failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// The operation was cancelled by the caller.
    #[error("Operation cancelled")]
    Cancelled,

    /// Generic error for uncategorized failures.
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl Error {
    /// Check if the error might go away on retry.
    ///
    /// Returns `true` for network timeouts, connection failures and
    /// interrupted I/O. Everything else is treated as permanent.
    ///
    /// ```rust
    /// use sitepatch_core::Error;
    /// use std::io;
    ///
    /// assert!(Error::Io(io::Error::new(io::ErrorKind::TimedOut, "timeout")).is_recoverable());
    /// assert!(!Error::NoContent.is_recoverable());
    /// ```
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network(e) => e.is_timeout() || e.is_connect(),
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::Interrupted
            ),
            _ => false,
        }
    }

    /// Whether the provider reported an exhausted credit quota.
    ///
    /// Detection is a substring match on the rendered message, since
    /// providers only report this condition in prose.
    #[must_use]
    pub fn is_quota_exceeded(&self) -> bool {
        self.to_string().contains(QUOTA_EXCEEDED_MARKER)
    }

    /// Get the error category as a string identifier.
    ///
    /// Useful for structured logging:
    ///
    /// ```rust
    /// use sitepatch_core::Error;
    ///
    /// let err = Error::NoResponseBody;
    /// tracing::warn!(category = err.category(), "request failed: {err}");
    /// ```
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Network(_) => "network",
            Self::Serialization(_) => "serialization",
            Self::Config(_) => "config",
            Self::Validation(_) => "validation",
            Self::InvalidModel(_) => "invalid_model",
            Self::ProviderUnsupported { .. } => "provider_unsupported",
            Self::NoResponseBody => "no_response_body",
            Self::NoContent => "no_content",
            Self::Provider(_) => "provider",
            Self::NotFound(_) => "not_found",
            Self::Storage(_) => "storage",
            Self::Cancelled => "cancelled",
            Self::Other(_) => "other",
        }
    }
}

/// Convenience type alias for `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
