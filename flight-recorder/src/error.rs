//! Error types for flight recorder operations
//!
//! Errors fall into three groups:
//! - Validation errors raised synchronously while building or configuring a
//!   recorder (zero capacity, blank source names, malformed config)
//! - State errors for operations attempted on a disposed recorder
//! - External errors reported by the event stream the recorder subscribes to
//!
//! Capture-time failures (a transform returning an error or panicking) are
//! never surfaced as `RecorderError`. They are contained inside the capture
//! pipeline and described by [`CaptureFailure`] instead.
//!
//! # Example
//!
//! ```rust
//! use flight_recorder::error::{ErrorCategory, RecorderError};
//!
//! let err = RecorderError::InvalidCapacity;
//! assert_eq!(err.category(), ErrorCategory::Validation);
//! assert_eq!(err.error_code(), "INVALID_CAPACITY");
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for recorder operations
pub type Result<T> = std::result::Result<T, RecorderError>;

/// Boxed error returned by fallible transforms
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error category for grouping related errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Caller passed an invalid argument or configuration
    Validation,
    /// Operation not allowed in the recorder's current state
    State,
    /// The event stream rejected a request
    External,
}

/// Errors that can occur while building or driving a recorder
#[derive(Error, Debug)]
pub enum RecorderError {
    /// Ring buffer capacity must be at least one slot
    #[error("Invalid capacity: a flight recorder needs at least one slot.")]
    InvalidCapacity,

    /// Argument was empty, blank or otherwise unusable
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// The recorder was disposed and no longer accepts registrations
    #[error("Recorder disposed: create a new recorder to enable more sources.")]
    Disposed,

    /// The event stream refused a subscription request
    #[error("Subscription failed: {reason}")]
    Subscription { reason: String },

    /// Configuration could not be parsed
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
}

impl RecorderError {
    /// Shorthand for an [`RecorderError::InvalidArgument`]
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        RecorderError::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Returns the error category for grouping
    pub fn category(&self) -> ErrorCategory {
        match self {
            RecorderError::InvalidCapacity
            | RecorderError::InvalidArgument { .. }
            | RecorderError::Config(_) => ErrorCategory::Validation,

            RecorderError::Disposed => ErrorCategory::State,

            RecorderError::Subscription { .. } => ErrorCategory::External,
        }
    }

    /// Returns the stable error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            RecorderError::InvalidCapacity => "INVALID_CAPACITY",
            RecorderError::InvalidArgument { .. } => "INVALID_ARGUMENT",
            RecorderError::Disposed => "RECORDER_DISPOSED",
            RecorderError::Subscription { .. } => "SUBSCRIPTION_FAILED",
            RecorderError::Config(_) => "CONFIG_ERROR",
        }
    }
}

/// A transform failure that was contained by the capture pipeline
///
/// Handed to [`FailurePolicy::Substitute`](crate::pipeline::FailurePolicy)
/// callbacks so a sentinel can describe what went wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureFailure {
    /// The transform returned an error
    Error(String),
    /// The transform (or filter) panicked
    Panic(String),
}

impl CaptureFailure {
    /// Builds a failure from a caught panic payload
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        CaptureFailure::Panic(message)
    }

    /// Failure message without the kind prefix
    pub fn message(&self) -> &str {
        match self {
            CaptureFailure::Error(m) | CaptureFailure::Panic(m) => m,
        }
    }
}

impl fmt::Display for CaptureFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureFailure::Error(m) => write!(f, "transform error: {}", m),
            CaptureFailure::Panic(m) => write!(f, "transform panicked: {}", m),
        }
    }
}
