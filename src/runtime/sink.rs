//! Result delivery interfaces.
//!
//! A statement processor never writes to the network. It hands its open
//! result to a [`ResultSink`], which decides what to do with the records
//! (send them, drop them) and collects the completion metadata.

use std::collections::VecDeque;

use super::error::{BoltFailure, RuntimeResult};
use crate::bolt::PackStreamValue;

/// Pull/discard size meaning "every remaining record".
pub const ALL_RECORDS: i64 = -1;

/// Translate a PULL/DISCARD `n` into a record limit.
///
/// Any negative value means unbounded.
pub fn batch_limit(size: i64) -> Option<usize> {
    usize::try_from(size).ok()
}

/// An open, forward-only query result.
pub trait BoltResult: Send {
    /// Column names, in record order.
    fn field_names(&self) -> &[String];

    /// Produce the next record, or `None` once exhausted.
    fn next_record(&mut self) -> RuntimeResult<Option<Vec<PackStreamValue>>>;

    /// Check if at least one more record can be produced.
    fn has_more(&self) -> bool;
}

/// Receiver of query results and completion/failure notifications.
///
/// One sink serves one request. Summary callbacks (`mark_ignored`,
/// `mark_failed`) may arrive in any order before `on_finish`, which is
/// called exactly once at the end.
pub trait ResultSink: Send {
    /// Stream up to `size` records of `result` to the client.
    ///
    /// Returns whether records remain after this batch.
    fn on_pull_records(&mut self, result: &mut dyn BoltResult, size: i64) -> RuntimeResult<bool>;

    /// Consume up to `size` records of `result` without sending them.
    ///
    /// Returns whether records remain after this batch.
    fn on_discard_records(&mut self, result: &mut dyn BoltResult, size: i64)
        -> RuntimeResult<bool>;

    /// Attach one entry to the summary of the current request.
    fn on_metadata(&mut self, key: &str, value: PackStreamValue);

    /// The request was skipped.
    fn mark_ignored(&mut self);

    /// The request failed.
    fn mark_failed(&mut self, error: BoltFailure);

    /// No more callbacks for the current request.
    fn on_finish(&mut self);
}

/// An in-memory [`BoltResult`].
#[derive(Debug, Clone, Default)]
pub struct RecordBuffer {
    field_names: Vec<String>,
    records: VecDeque<Vec<PackStreamValue>>,
}

impl RecordBuffer {
    /// Create a result over the given rows.
    pub fn new<I, S>(field_names: I, records: Vec<Vec<PackStreamValue>>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            field_names: field_names.into_iter().map(Into::into).collect(),
            records: records.into(),
        }
    }

    /// Create a result without rows, e.g. for a write statement.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Rows not yet consumed.
    pub fn remaining(&self) -> usize {
        self.records.len()
    }
}

impl BoltResult for RecordBuffer {
    fn field_names(&self) -> &[String] {
        &self.field_names
    }

    fn next_record(&mut self) -> RuntimeResult<Option<Vec<PackStreamValue>>> {
        Ok(self.records.pop_front())
    }

    fn has_more(&self) -> bool {
        !self.records.is_empty()
    }
}
