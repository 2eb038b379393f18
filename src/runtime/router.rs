//! Forwarding sink with a fallback buffer.
//!
//! Result-producing code always talks to the router. When a handler is
//! attached every callback goes straight through to it; when none is
//! attached, failures and ignores are buffered so they can be reported
//! with the next request, and everything else is dropped.

use std::fmt;

use super::error::{BoltFailure, RuntimeResult};
use super::sink::{BoltResult, ResultSink};
use crate::bolt::PackStreamValue;

/// Routes sink callbacks to the currently attached handler.
#[derive(Default)]
pub struct ResponseRouter {
    /// Callback poised to receive the next response.
    handler: Option<Box<dyn ResultSink>>,
    pending_error: Option<BoltFailure>,
    pending_ignore: bool,
}

impl ResponseRouter {
    /// Create a router with no handler and nothing buffered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a handler is attached.
    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    /// Attached handler, if any.
    pub fn handler_mut(&mut self) -> Option<&mut (dyn ResultSink + 'static)> {
        self.handler.as_deref_mut()
    }

    /// Replace the attached handler, returning the previous one.
    ///
    /// Buffered failure/ignore state is left untouched: it is not replayed
    /// into the new handler.
    pub fn set_handler(
        &mut self,
        handler: Option<Box<dyn ResultSink>>,
    ) -> Option<Box<dyn ResultSink>> {
        std::mem::replace(&mut self.handler, handler)
    }

    /// Detach and return the handler.
    pub fn take_handler(&mut self) -> Option<Box<dyn ResultSink>> {
        self.handler.take()
    }

    /// Failure recorded while no handler was attached.
    pub fn pending_error(&self) -> Option<&BoltFailure> {
        self.pending_error.as_ref()
    }

    /// Check if a message was ignored while no handler was attached.
    pub fn has_pending_ignore(&self) -> bool {
        self.pending_ignore
    }

    /// Forget the buffered failure and ignore flag.
    pub fn reset_pending_failed_and_ignored(&mut self) {
        self.pending_error = None;
        self.pending_ignore = false;
    }
}

impl ResultSink for ResponseRouter {
    fn on_pull_records(&mut self, result: &mut dyn BoltResult, size: i64) -> RuntimeResult<bool> {
        match self.handler.as_deref_mut() {
            Some(handler) => handler.on_pull_records(result, size),
            None => Ok(false),
        }
    }

    fn on_discard_records(
        &mut self,
        result: &mut dyn BoltResult,
        size: i64,
    ) -> RuntimeResult<bool> {
        match self.handler.as_deref_mut() {
            Some(handler) => handler.on_discard_records(result, size),
            None => Ok(false),
        }
    }

    fn on_metadata(&mut self, key: &str, value: PackStreamValue) {
        if let Some(handler) = self.handler.as_deref_mut() {
            handler.on_metadata(key, value);
        }
    }

    fn mark_ignored(&mut self) {
        match self.handler.as_deref_mut() {
            Some(handler) => handler.mark_ignored(),
            None => self.pending_ignore = true,
        }
    }

    fn mark_failed(&mut self, error: BoltFailure) {
        match self.handler.as_deref_mut() {
            Some(handler) => handler.mark_failed(error),
            None if self.pending_error.is_none() => self.pending_error = Some(error),
            // First recorded failure wins until reset.
            None => tracing::debug!(dropped = %error, "pending error already buffered"),
        }
    }

    fn on_finish(&mut self) {
        if let Some(handler) = self.handler.as_deref_mut() {
            handler.on_finish();
        }
    }
}

impl fmt::Debug for ResponseRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseRouter")
            .field("has_handler", &self.handler.is_some())
            .field("pending_error", &self.pending_error)
            .field("pending_ignore", &self.pending_ignore)
            .finish()
    }
}
