//! Bolt status codes.
//!
//! Every FAILURE sent to a client carries a status code of the form
//! `Neo.<Classification>.<Category>.<Title>`. The runtime never invents
//! codes on the fly; it picks one of the [`Status`] values below.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Error classification, the second segment of a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    /// The client sent something wrong. Retrying the same request fails again.
    ClientError,
    /// A temporary condition. The same request may succeed later.
    TransientError,
    /// The server failed.
    DatabaseError,
}

impl Classification {
    /// Get the classification as it appears in status codes.
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::ClientError => "ClientError",
            Classification::TransientError => "TransientError",
            Classification::DatabaseError => "DatabaseError",
        }
    }
}

/// A status reported to the client alongside a failure.
///
/// Also used as the reason attached to a terminated transaction, which is
/// why it is `Copy`: the runtime stores it and hands it back later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    /// Malformed or out-of-order request.
    RequestInvalid,
    /// Request fields could not be interpreted.
    RequestInvalidFormat,
    /// Credentials were rejected.
    AuthenticationFailed,
    /// Caller lacks permission.
    Unauthorized,
    /// Statement did not parse.
    SyntaxError,
    /// Statement parsed but is not meaningful.
    SemanticError,
    /// Statement references a missing parameter.
    ParameterMissing,
    /// No transaction is open.
    TransactionNotFound,
    /// Named database does not exist.
    DatabaseNotFound,
    /// Unclassified server failure.
    GeneralError,
    /// Statement execution failed inside the engine.
    ExecutionFailed,
    /// Transaction was terminated explicitly (kill, RESET, shutdown).
    TransactionTerminated,
    /// Transaction exceeded its timeout and was terminated.
    TransactionTimedOut,
    /// Deadlock detected, transaction rolled back.
    DeadlockDetected,
    /// Database is not available right now.
    DatabaseUnavailable,
}

impl Status {
    /// Get the full status code.
    pub fn code(&self) -> &'static str {
        match self {
            Status::RequestInvalid => "Neo.ClientError.Request.Invalid",
            Status::RequestInvalidFormat => "Neo.ClientError.Request.InvalidFormat",
            Status::AuthenticationFailed => "Neo.ClientError.Security.AuthenticationFailed",
            Status::Unauthorized => "Neo.ClientError.Security.Unauthorized",
            Status::SyntaxError => "Neo.ClientError.Statement.SyntaxError",
            Status::SemanticError => "Neo.ClientError.Statement.SemanticError",
            Status::ParameterMissing => "Neo.ClientError.Statement.ParameterMissing",
            Status::TransactionNotFound => "Neo.ClientError.Transaction.TransactionNotFound",
            Status::DatabaseNotFound => "Neo.ClientError.Database.DatabaseNotFound",
            Status::GeneralError => "Neo.DatabaseError.General.UnknownError",
            Status::ExecutionFailed => "Neo.DatabaseError.Statement.ExecutionFailed",
            Status::TransactionTerminated => "Neo.TransientError.Transaction.Terminated",
            Status::TransactionTimedOut => "Neo.TransientError.Transaction.TransactionTimedOut",
            Status::DeadlockDetected => "Neo.TransientError.Transaction.DeadlockDetected",
            Status::DatabaseUnavailable => "Neo.TransientError.General.DatabaseUnavailable",
        }
    }

    /// Get the classification segment of the code.
    pub fn classification(&self) -> Classification {
        match self {
            Status::GeneralError | Status::ExecutionFailed => Classification::DatabaseError,
            Status::TransactionTerminated
            | Status::TransactionTimedOut
            | Status::DeadlockDetected
            | Status::DatabaseUnavailable => Classification::TransientError,
            _ => Classification::ClientError,
        }
    }

    /// Look up a status by its full code.
    pub fn from_code(code: &str) -> Option<Self> {
        const ALL: [Status; 15] = [
            Status::RequestInvalid,
            Status::RequestInvalidFormat,
            Status::AuthenticationFailed,
            Status::Unauthorized,
            Status::SyntaxError,
            Status::SemanticError,
            Status::ParameterMissing,
            Status::TransactionNotFound,
            Status::DatabaseNotFound,
            Status::GeneralError,
            Status::ExecutionFailed,
            Status::TransactionTerminated,
            Status::TransactionTimedOut,
            Status::DeadlockDetected,
            Status::DatabaseUnavailable,
        ];
        ALL.into_iter().find(|status| status.code() == code)
    }

    /// Check if a client may retry the failed request as-is.
    pub fn is_transient(&self) -> bool {
        self.classification() == Classification::TransientError
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
