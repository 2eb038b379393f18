//! Responses sent back to a client.
//!
//! Every request is answered by zero or more RECORDs followed by exactly
//! one summary: SUCCESS, FAILURE or IGNORED.

use std::collections::HashMap;
use std::fmt;

use crate::bolt::error::Status;
use crate::bolt::packstream::PackStreamValue;

/// A response message.
#[derive(Debug, Clone, PartialEq)]
pub enum BoltResponse {
    /// Request succeeded, with summary metadata
    Success(SuccessMessage),
    /// One result record
    Record(RecordMessage),
    /// Request failed
    Failure(FailureMessage),
    /// Request was skipped
    Ignored,
}

impl BoltResponse {
    /// Message name, as used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            BoltResponse::Success(_) => "SUCCESS",
            BoltResponse::Record(_) => "RECORD",
            BoltResponse::Failure(_) => "FAILURE",
            BoltResponse::Ignored => "IGNORED",
        }
    }

    /// Check if this is a SUCCESS.
    pub fn is_success(&self) -> bool {
        matches!(self, BoltResponse::Success(_))
    }

    /// Check if this is a FAILURE.
    pub fn is_failure(&self) -> bool {
        matches!(self, BoltResponse::Failure(_))
    }

    /// Check if this is a RECORD.
    pub fn is_record(&self) -> bool {
        matches!(self, BoltResponse::Record(_))
    }

    /// Check if this is IGNORED.
    pub fn is_ignored(&self) -> bool {
        matches!(self, BoltResponse::Ignored)
    }
}

/// SUCCESS summary.
///
/// Metadata keys written by the runtime: `server`, `connection_id` (HELLO),
/// `fields`, `t_first`, `qid` (RUN), `has_more`, `bookmark`, `db`
/// (PULL/DISCARD/COMMIT).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SuccessMessage {
    /// Summary metadata
    pub metadata: HashMap<String, PackStreamValue>,
}

impl SuccessMessage {
    /// Create a SUCCESS without metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one metadata entry, replacing an earlier value.
    pub fn add(&mut self, key: &str, value: PackStreamValue) {
        self.metadata.insert(key.to_string(), value);
    }

    /// Metadata entry `key`.
    pub fn get(&self, key: &str) -> Option<&PackStreamValue> {
        self.metadata.get(key)
    }

    fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(PackStreamValue::as_str)
    }

    /// `server`
    pub fn server(&self) -> Option<&str> {
        self.text("server")
    }

    /// `connection_id`
    pub fn connection_id(&self) -> Option<&str> {
        self.text("connection_id")
    }

    /// `fields`
    pub fn fields(&self) -> Option<Vec<String>> {
        self.get("fields").and_then(PackStreamValue::as_string_list)
    }

    /// `qid`
    pub fn qid(&self) -> Option<i64> {
        self.get("qid").and_then(PackStreamValue::as_int)
    }

    /// `has_more`, false when absent.
    pub fn has_more(&self) -> bool {
        self.get("has_more")
            .and_then(PackStreamValue::as_bool)
            .unwrap_or(false)
    }

    /// `bookmark`
    pub fn bookmark(&self) -> Option<&str> {
        self.text("bookmark")
    }

    /// `db`
    pub fn db(&self) -> Option<&str> {
        self.text("db")
    }
}

/// RECORD
#[derive(Debug, Clone, PartialEq)]
pub struct RecordMessage {
    /// Values in `fields` order
    pub fields: Vec<PackStreamValue>,
}

impl RecordMessage {
    /// Create a record.
    pub fn new(fields: Vec<PackStreamValue>) -> Self {
        Self { fields }
    }
}

/// FAILURE
#[derive(Debug, Clone, PartialEq)]
pub struct FailureMessage {
    /// Status code, e.g. `Neo.ClientError.Statement.SyntaxError`
    pub code: String,
    /// Human readable message
    pub message: String,
}

impl FailureMessage {
    /// Create a FAILURE for `status`.
    pub fn from_status(status: Status, message: &str) -> Self {
        Self {
            code: status.code().to_string(),
            message: message.to_string(),
        }
    }

    /// Status matching `code`, if it is one the runtime knows.
    pub fn status(&self) -> Option<Status> {
        Status::from_code(&self.code)
    }
}

impl fmt::Display for FailureMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}
