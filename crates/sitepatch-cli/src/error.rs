//! CLI error handling with semantic exit codes.
//!
//! Errors map to exit codes by category so scripts can react to the kind of
//! failure without parsing messages.
//!
//! | Code | Category | Description |
//! |------|----------|-------------|
//! | 0 | Success | Command completed successfully |
//! | 1 | `Internal` | Unexpected/internal error |
//! | 2 | `Usage` | Invalid arguments, request or configuration |
//! | 3 | `NotFound` | Project or file not found |
//! | 4 | `Model` | The model or provider rejected the request |
//! | 5 | `Network` | LM Studio could not be reached |
//! | 6 | `Timeout` | Operation timed out |
//! | 130 | `Cancelled` | Interrupted with Ctrl-C |
//!
//! ```bash
//! sitepatch edit ./site --model qwen2.5-coder --prompt "add a footer"
//! case $? in
//!     0) echo "Updated" ;;
//!     4) echo "Model refused" ;;
//!     5) echo "Is LM Studio running?" ;;
//! esac
//! ```

use std::fmt;

use sitepatch_core::{ApiFailure, Error as CoreError};

/// Semantic error category determining the exit code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorCategory {
    /// Unexpected or internal error (exit code 1).
    Internal = 1,

    /// Invalid arguments, request fields or configuration (exit code 2).
    Usage = 2,

    /// Project directory or input file not found (exit code 3).
    NotFound = 3,

    /// The model or provider rejected the request (exit code 4).
    ///
    /// Covers unknown models, exhausted quota and empty answers.
    Model = 4,

    /// Network failure talking to the model server (exit code 5).
    Network = 5,

    /// Operation timed out (exit code 6).
    Timeout = 6,

    /// Interrupted by the user (exit code 130).
    Cancelled = 130,
}

impl ErrorCategory {
    /// Get the exit code for this category.
    #[must_use]
    pub const fn exit_code(self) -> u8 {
        self as u8
    }

    /// Get a short description of this error category.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Internal => "internal error",
            Self::Usage => "usage error",
            Self::NotFound => "not found",
            Self::Model => "model error",
            Self::Network => "network error",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
        }
    }

    /// Infer the error category from an error message.
    ///
    /// Fallback for errors that carry no structured category.
    #[must_use]
    pub fn infer_from_message(msg: &str) -> Self {
        let msg_lower = msg.to_lowercase();

        // Before Network so "connection timed out" lands here
        if msg_lower.contains("timeout") || msg_lower.contains("timed out") {
            return Self::Timeout;
        }

        if msg_lower.contains("network")
            || msg_lower.contains("connection")
            || msg_lower.contains("dns")
            || msg_lower.contains("unreachable")
        {
            return Self::Network;
        }

        if msg_lower.contains("not found")
            || msg_lower.contains("no such file")
            || msg_lower.contains("does not exist")
        {
            return Self::NotFound;
        }

        if msg_lower.contains("invalid")
            || msg_lower.contains("missing")
            || msg_lower.contains("configuration")
        {
            return Self::Usage;
        }

        if msg_lower.contains("cancelled") || msg_lower.contains("interrupted") {
            return Self::Cancelled;
        }

        Self::Internal
    }

    /// Category of a core library error.
    #[must_use]
    pub fn from_core(err: &CoreError) -> Self {
        match err {
            CoreError::Validation(_)
            | CoreError::Config(_)
            | CoreError::InvalidModel(_)
            | CoreError::ProviderUnsupported { .. } => Self::Usage,
            CoreError::NotFound(_) => Self::NotFound,
            CoreError::Network(e) if e.is_timeout() => Self::Timeout,
            CoreError::Network(_) => Self::Network,
            CoreError::NoResponseBody | CoreError::NoContent | CoreError::Provider(_) => {
                Self::Model
            },
            CoreError::Cancelled => Self::Cancelled,
            CoreError::Io(_)
            | CoreError::Serialization(_)
            | CoreError::Storage(_)
            | CoreError::Other(_) => Self::Internal,
        }
    }

    /// Category of a rejected handler request.
    #[must_use]
    pub fn from_failure(failure: &ApiFailure) -> Self {
        match failure.status {
            400 if failure.body.error.is_some() => Self::Usage,
            400 | 402 => Self::Model,
            _ => match Self::infer_from_message(failure.text()) {
                Self::Internal => Self::Network,
                other => other,
            },
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// A CLI error with an explicit category.
#[derive(Debug)]
pub struct CliError {
    /// The semantic category of this error.
    pub category: ErrorCategory,
    /// The underlying error with full context.
    pub source: anyhow::Error,
}

impl CliError {
    /// Create a new CLI error with explicit category.
    pub fn new(category: ErrorCategory, source: impl Into<anyhow::Error>) -> Self {
        Self {
            category,
            source: source.into(),
        }
    }

    /// Create a not-found error.
    pub fn not_found(source: impl Into<anyhow::Error>) -> Self {
        Self::new(ErrorCategory::NotFound, source)
    }

    /// Create a cancellation error.
    pub fn cancelled(source: impl Into<anyhow::Error>) -> Self {
        Self::new(ErrorCategory::Cancelled, source)
    }

    /// Get the exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.category.exit_code()
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        Self::new(ErrorCategory::from_core(&err), err)
    }
}

impl From<ApiFailure> for CliError {
    fn from(failure: ApiFailure) -> Self {
        Self::new(ErrorCategory::from_failure(&failure), failure)
    }
}

/// Determine the category of an `anyhow::Error`.
///
/// Structured errors anywhere in the chain win over message inference.
#[must_use]
pub fn category_from_error(err: &anyhow::Error) -> ErrorCategory {
    if let Some(cli_err) = err.downcast_ref::<CliError>() {
        return cli_err.category;
    }
    for cause in err.chain() {
        if let Some(core) = cause.downcast_ref::<CoreError>() {
            return ErrorCategory::from_core(core);
        }
        if let Some(failure) = cause.downcast_ref::<ApiFailure>() {
            return ErrorCategory::from_failure(failure);
        }
    }

    ErrorCategory::infer_from_message(&err.to_string())
}

/// Suggestion printed after errors that may go away on retry.
#[must_use]
pub fn retry_hint(err: &anyhow::Error) -> Option<&'static str> {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<CoreError>())
        .any(CoreError::is_recoverable)
        .then_some("LM Studio may still be starting or loading the model; try again shortly")
}
