//! Runtime Error Types
//!
//! Faults raised while driving a connection, and the failure record that
//! is reported back to the client.

use std::fmt;

use thiserror::Error;

use crate::bolt::{FailureMessage, Status};

// ============================================================================
// RuntimeError
// ============================================================================

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Runtime error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    /// A transaction was torn down behind the client's back and the
    /// reason is being surfaced now.
    #[error("The transaction has been terminated ({0}). Retry your operation in a new transaction")]
    TransactionTerminated(Status),

    /// The empty processor was asked to do real work.
    #[error("Unable to run statements: no statement processor is bound")]
    NoStatementProcessor,

    /// Statement or transaction failure reported by a processor.
    #[error("{status}: {message}")]
    Statement { status: Status, message: String },

    /// Message not allowed in the current state.
    #[error("Message {message} cannot be handled by a session in the {state} state")]
    InvalidRequest {
        message: &'static str,
        state: &'static str,
    },

    /// RESET/interrupt bookkeeping is out of sync.
    #[error("Interrupt counter decremented below zero")]
    InterruptCounterUnderflow,

    /// Message arrived after the connection was closed.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Anything else that must bring the connection down.
    #[error("Fatal error: {0}")]
    Fatal(String),
}

impl RuntimeError {
    /// Create a statement error.
    pub fn statement(status: Status, message: impl Into<String>) -> Self {
        Self::Statement {
            status,
            message: message.into(),
        }
    }

    /// Create an invalid request error.
    pub fn invalid_request(message: &'static str, state: &'static str) -> Self {
        Self::InvalidRequest { message, state }
    }

    /// Create a fatal error.
    pub fn fatal(msg: impl Into<String>) -> Self {
        Self::Fatal(msg.into())
    }

    /// Check if the connection cannot continue after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InterruptCounterUnderflow | Self::ConnectionClosed | Self::Fatal(_)
        )
    }

    /// Status reported to the client for this error.
    pub fn status(&self) -> Status {
        match self {
            Self::TransactionTerminated(status) => *status,
            Self::NoStatementProcessor | Self::InvalidRequest { .. } => Status::RequestInvalid,
            Self::Statement { status, .. } => *status,
            Self::InterruptCounterUnderflow | Self::ConnectionClosed | Self::Fatal(_) => {
                Status::GeneralError
            }
        }
    }
}

// ============================================================================
// BoltFailure
// ============================================================================

/// An error on its way to the client.
///
/// Immutable once built. This is what travels through
/// [`ResultSink::mark_failed`](crate::runtime::ResultSink::mark_failed) and
/// what is buffered as the pending error of a connection.
#[derive(Debug, Clone, PartialEq)]
pub struct BoltFailure {
    status: Status,
    message: String,
    fatal: bool,
}

impl BoltFailure {
    /// Create a recoverable failure.
    pub fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            fatal: false,
        }
    }

    /// Create a failure after which the connection is closed.
    pub fn fatal(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            fatal: true,
        }
    }

    /// Status code of the failure.
    pub fn status(&self) -> Status {
        self.status
    }

    /// Human readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Check if the connection cannot continue.
    pub fn is_fatal(&self) -> bool {
        self.fatal
    }

    /// Build the FAILURE message sent to the client.
    pub fn to_message(&self) -> FailureMessage {
        FailureMessage::from_status(self.status, &self.message)
    }
}

impl From<&RuntimeError> for BoltFailure {
    fn from(err: &RuntimeError) -> Self {
        let message = match err {
            RuntimeError::Statement { message, .. } => message.clone(),
            other => other.to_string(),
        };
        Self {
            status: err.status(),
            message,
            fatal: err.is_fatal(),
        }
    }
}

impl From<RuntimeError> for BoltFailure {
    fn from(err: RuntimeError) -> Self {
        Self::from(&err)
    }
}

impl fmt::Display for BoltFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}
