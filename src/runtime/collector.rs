//! Per-request response handler.
//!
//! [`ResponseCollector`] turns sink callbacks into Bolt response messages:
//! a RECORD per pulled record, then exactly one summary on `on_finish`.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::error::{BoltFailure, RuntimeError, RuntimeResult};
use super::sink::{batch_limit, BoltResult, ResultSink};
use crate::bolt::{BoltResponse, PackStreamValue, RecordMessage, SuccessMessage};

/// Where a collector writes its responses.
pub trait ResponseOutput: Send {
    /// Write one response. Fails once the receiving side is gone.
    fn emit(&mut self, response: BoltResponse) -> RuntimeResult<()>;
}

impl ResponseOutput for mpsc::Sender<BoltResponse> {
    /// Must not be called from inside an async context.
    fn emit(&mut self, response: BoltResponse) -> RuntimeResult<()> {
        self.blocking_send(response)
            .map_err(|_| RuntimeError::ConnectionClosed)
    }
}

impl ResponseOutput for Arc<Mutex<Vec<BoltResponse>>> {
    fn emit(&mut self, response: BoltResponse) -> RuntimeResult<()> {
        self.lock().push(response);
        Ok(())
    }
}

/// Collects the outcome of one request.
#[derive(Debug)]
pub struct ResponseCollector<O> {
    output: O,
    metadata: SuccessMessage,
    failure: Option<BoltFailure>,
    ignored: bool,
}

impl<O: ResponseOutput> ResponseCollector<O> {
    /// Create a collector writing to `output`.
    pub fn new(output: O) -> Self {
        Self {
            output,
            metadata: SuccessMessage::new(),
            failure: None,
            ignored: false,
        }
    }

    /// Failure that will be reported, if any.
    pub fn failure(&self) -> Option<&BoltFailure> {
        self.failure.as_ref()
    }

    /// Check if the request was ignored.
    pub fn is_ignored(&self) -> bool {
        self.ignored
    }

    fn summary(&mut self) -> BoltResponse {
        if let Some(failure) = self.failure.take() {
            BoltResponse::Failure(failure.to_message())
        } else if self.ignored {
            BoltResponse::Ignored
        } else {
            BoltResponse::Success(std::mem::take(&mut self.metadata))
        }
    }
}

impl<O: ResponseOutput> ResultSink for ResponseCollector<O> {
    fn on_pull_records(&mut self, result: &mut dyn BoltResult, size: i64) -> RuntimeResult<bool> {
        let limit = batch_limit(size);
        let mut sent = 0usize;
        while limit.map_or(true, |limit| sent < limit) {
            match result.next_record()? {
                Some(fields) => {
                    self.output
                        .emit(BoltResponse::Record(RecordMessage::new(fields)))?;
                    sent += 1;
                }
                None => break,
            }
        }
        Ok(result.has_more())
    }

    fn on_discard_records(
        &mut self,
        result: &mut dyn BoltResult,
        size: i64,
    ) -> RuntimeResult<bool> {
        let limit = batch_limit(size);
        let mut dropped = 0usize;
        while limit.map_or(true, |limit| dropped < limit) {
            if result.next_record()?.is_none() {
                break;
            }
            dropped += 1;
        }
        Ok(result.has_more())
    }

    fn on_metadata(&mut self, key: &str, value: PackStreamValue) {
        self.metadata.add(key, value);
    }

    fn mark_ignored(&mut self) {
        self.ignored = true;
    }

    fn mark_failed(&mut self, error: BoltFailure) {
        if self.failure.is_none() {
            self.failure = Some(error);
        }
    }

    fn on_finish(&mut self) {
        let summary = self.summary();
        self.ignored = false;
        if let Err(e) = self.output.emit(summary) {
            tracing::warn!("Failed to send summary: {}", e);
        }
    }
}
