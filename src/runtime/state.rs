//! Per-connection session state.
//!
//! [`ConnectionState`] owns everything the protocol driver needs to decide
//! whether and where a message goes: the response router with its pending
//! error/ignore buffer, the bound statement processor, the termination
//! notice left behind by an asynchronously torn down transaction, and the
//! shared cross-thread signals.
//!
//! Only the connection worker mutates a `ConnectionState`. Other threads
//! reach the connection through [`ConnectionSignals`].

use std::fmt;
use std::sync::Arc;

use super::error::{BoltFailure, RuntimeError, RuntimeResult};
use super::processor::{EmptyStatementProcessor, StatementProcessor};
use super::router::ResponseRouter;
use super::signals::ConnectionSignals;
use super::sink::{BoltResult, ResultSink};
use crate::bolt::{PackStreamValue, Status};

/// Mutable state of one Bolt connection.
pub struct ConnectionState {
    router: ResponseRouter,
    statement_processor: Box<dyn StatementProcessor>,
    /// Raised by the next processor access, then cleared.
    pending_termination_notice: Option<Status>,
    signals: Arc<ConnectionSignals>,
}

impl ConnectionState {
    /// Create the state of a freshly accepted connection.
    pub fn new() -> Self {
        Self::with_signals(Arc::new(ConnectionSignals::new()))
    }

    /// Create a state driven by existing signals.
    pub fn with_signals(signals: Arc<ConnectionSignals>) -> Self {
        Self {
            router: ResponseRouter::new(),
            statement_processor: Box::new(EmptyStatementProcessor),
            pending_termination_notice: None,
            signals,
        }
    }

    // ========================================================================
    // Message gating
    // ========================================================================

    /// Check if the next message may be dispatched.
    ///
    /// False once closed, and while a buffered error or ignore has not been
    /// reported yet.
    pub fn can_process_message(&self) -> bool {
        !self.is_closed()
            && self.router.pending_error().is_none()
            && !self.router.has_pending_ignore()
    }

    /// Check if non-RESET messages must be ignored.
    pub fn is_interrupted(&self) -> bool {
        self.signals.is_interrupted()
    }

    /// Register one interrupt. Returns the new count.
    pub fn increment_interrupt_counter(&self) -> usize {
        self.signals.increment_interrupt_counter()
    }

    /// Acknowledge one interrupt. Returns the remaining count.
    pub fn decrement_interrupt_counter(&self) -> RuntimeResult<usize> {
        self.signals.decrement_interrupt_counter()
    }

    // ========================================================================
    // Pending failure / ignore
    // ========================================================================

    /// Failure buffered while no handler was attached.
    pub fn pending_error(&self) -> Option<&BoltFailure> {
        self.router.pending_error()
    }

    /// Check if an ignore was buffered while no handler was attached.
    pub fn has_pending_ignore(&self) -> bool {
        self.router.has_pending_ignore()
    }

    /// Clear the buffered failure and ignore flag.
    pub fn reset_pending_failed_and_ignored(&mut self) {
        self.router.reset_pending_failed_and_ignored();
    }

    // ========================================================================
    // Response handler
    // ========================================================================

    /// Currently attached handler.
    pub fn response_handler(&mut self) -> Option<&mut (dyn ResultSink + 'static)> {
        self.router.handler_mut()
    }

    /// Check if a handler is attached.
    pub fn has_response_handler(&self) -> bool {
        self.router.has_handler()
    }

    /// Attach (or with `None`, detach) the handler of the current request.
    ///
    /// Returns the previously attached handler. Buffered failure/ignore
    /// state is not replayed into the new handler.
    pub fn set_response_handler(
        &mut self,
        handler: Option<Box<dyn ResultSink>>,
    ) -> Option<Box<dyn ResultSink>> {
        self.router.set_handler(handler)
    }

    /// Detach the handler.
    pub fn take_response_handler(&mut self) -> Option<Box<dyn ResultSink>> {
        self.router.take_handler()
    }

    // ========================================================================
    // Statement processor binding
    // ========================================================================

    /// The bound processor.
    ///
    /// Fails once with [`RuntimeError::TransactionTerminated`] if a
    /// termination notice is pending; the notice is consumed by that
    /// failure.
    pub fn statement_processor(&mut self) -> RuntimeResult<&mut (dyn StatementProcessor + 'static)> {
        self.raise_pending_termination_notice()?;
        Ok(self.statement_processor.as_mut())
    }

    /// Bind `processor`.
    ///
    /// Fails the same way as [`statement_processor`](Self::statement_processor),
    /// in which case nothing is bound.
    pub fn set_statement_processor(
        &mut self,
        processor: Box<dyn StatementProcessor>,
    ) -> RuntimeResult<()> {
        self.raise_pending_termination_notice()?;
        self.statement_processor = processor;
        Ok(())
    }

    /// Bind the empty processor. The termination notice is left untouched.
    pub fn clear_statement_processor(&mut self) {
        self.statement_processor = Box::new(EmptyStatementProcessor);
    }

    /// Bound processor together with the router, so the processor can
    /// stream straight into the attached handler.
    pub fn processor_and_sink(
        &mut self,
    ) -> RuntimeResult<(&mut dyn StatementProcessor, &mut dyn ResultSink)> {
        self.raise_pending_termination_notice()?;
        Ok((self.statement_processor.as_mut(), &mut self.router))
    }

    /// Record why the previous transaction was torn down.
    pub fn set_pending_termination_notice(&mut self, status: Status) {
        self.pending_termination_notice = Some(status);
    }

    /// Check if a termination notice awaits the next processor access.
    pub fn has_pending_termination_notice(&self) -> bool {
        self.pending_termination_notice.is_some()
    }

    /// Ask the bound processor whether its transaction is still alive.
    ///
    /// A terminated transaction unbinds the processor and leaves a
    /// termination notice behind. While a notice is already pending the
    /// binding is not consulted.
    pub fn validate_transaction(&mut self) {
        if self.pending_termination_notice.is_some() {
            return;
        }
        if let Some(status) = self.statement_processor.validate_transaction() {
            tracing::debug!(%status, "transaction terminated, unbinding statement processor");
            self.clear_statement_processor();
            self.pending_termination_notice = Some(status);
        }
    }

    /// Flag the running transaction of the bound processor for termination.
    pub fn mark_current_transaction_for_termination(&mut self) {
        if self.pending_termination_notice.is_none() {
            self.statement_processor.mark_current_transaction_for_termination();
        }
    }

    fn raise_pending_termination_notice(&mut self) -> RuntimeResult<()> {
        match self.pending_termination_notice.take() {
            Some(status) => Err(RuntimeError::TransactionTerminated(status)),
            None => Ok(()),
        }
    }

    // ========================================================================
    // Terminal flags
    // ========================================================================

    /// Check if the running operation should abort.
    pub fn is_terminated(&self) -> bool {
        self.signals.is_terminated()
    }

    /// Ask the running operation to abort.
    pub fn mark_terminated(&self) {
        self.signals.mark_terminated();
    }

    /// Check if the connection is torn down.
    pub fn is_closed(&self) -> bool {
        self.signals.is_closed()
    }

    /// Mark the connection torn down. Permanent.
    pub fn mark_closed(&self) {
        self.signals.mark_closed();
    }

    /// Signals shared with other threads.
    pub fn signals(&self) -> Arc<ConnectionSignals> {
        Arc::clone(&self.signals)
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultSink for ConnectionState {
    fn on_pull_records(&mut self, result: &mut dyn BoltResult, size: i64) -> RuntimeResult<bool> {
        self.router.on_pull_records(result, size)
    }

    fn on_discard_records(
        &mut self,
        result: &mut dyn BoltResult,
        size: i64,
    ) -> RuntimeResult<bool> {
        self.router.on_discard_records(result, size)
    }

    fn on_metadata(&mut self, key: &str, value: PackStreamValue) {
        self.router.on_metadata(key, value);
    }

    fn mark_ignored(&mut self) {
        self.router.mark_ignored();
    }

    fn mark_failed(&mut self, error: BoltFailure) {
        self.router.mark_failed(error);
    }

    fn on_finish(&mut self) {
        self.router.on_finish();
    }
}

impl fmt::Debug for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionState")
            .field("router", &self.router)
            .field("database", &self.statement_processor.database_name())
            .field("pending_termination_notice", &self.pending_termination_notice)
            .field("signals", &self.signals)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::sink::RecordBuffer;
    use crate::runtime::testing::{RecordingSink, ScriptedProcessor, SinkEvent};

    fn failure(message: &str) -> BoltFailure {
        BoltFailure::new(Status::ExecutionFailed, message)
    }

    #[test]
    fn test_new_state_accepts_messages() {
        let state = ConnectionState::new();
        assert!(state.can_process_message());
        assert!(!state.is_interrupted());
        assert!(!state.is_terminated());
        assert!(!state.is_closed());
        assert!(!state.has_response_handler());
        assert!(!state.has_pending_termination_notice());
    }

    #[test]
    fn test_pending_error_without_handler() {
        let mut state = ConnectionState::new();
        let error = failure("boom");

        state.mark_failed(error.clone());
        assert_eq!(state.pending_error(), Some(&error));
        assert!(!state.can_process_message());

        state.reset_pending_failed_and_ignored();
        assert_eq!(state.pending_error(), None);
        assert!(state.can_process_message());
    }

    #[test]
    fn test_pending_ignore_without_handler() {
        let mut state = ConnectionState::new();

        state.mark_ignored();
        assert!(state.has_pending_ignore());
        assert!(!state.can_process_message());

        // only a reset clears it
        state.on_finish();
        state.on_metadata("k", 1i64.into());
        assert!(state.has_pending_ignore());

        state.reset_pending_failed_and_ignored();
        assert!(!state.has_pending_ignore());
        assert!(state.can_process_message());
    }

    #[test]
    fn test_second_pending_error_is_dropped() {
        let mut state = ConnectionState::new();
        state.mark_failed(failure("first"));
        state.mark_failed(failure("second"));

        assert_eq!(state.pending_error().map(BoltFailure::message), Some("first"));
    }

    #[test]
    fn test_attached_handler_receives_everything_verbatim() {
        let mut state = ConnectionState::new();
        let sink = RecordingSink::with_more(true);
        state.set_response_handler(Some(Box::new(sink.clone())));

        let mut result = RecordBuffer::new(["n"], vec![vec![1i64.into()]]);
        assert!(state.on_pull_records(&mut result, 7).unwrap());
        assert!(state.on_discard_records(&mut result, -1).unwrap());
        state.on_metadata("fields", PackStreamValue::string_list(["n"]));
        state.mark_ignored();
        state.mark_failed(failure("boom"));
        state.on_finish();

        assert_eq!(
            sink.events(),
            vec![
                SinkEvent::Pull(7),
                SinkEvent::Discard(-1),
                SinkEvent::Metadata("fields".into(), PackStreamValue::string_list(["n"])),
                SinkEvent::Ignored,
                SinkEvent::Failed(failure("boom")),
                SinkEvent::Finish,
            ]
        );
        assert_eq!(state.pending_error(), None);
        assert!(!state.has_pending_ignore());
    }

    #[test]
    fn test_handler_fault_propagates_unchanged() {
        let mut state = ConnectionState::new();
        let sink = RecordingSink::failing(RuntimeError::ConnectionClosed);
        state.set_response_handler(Some(Box::new(sink)));

        let mut result = RecordBuffer::empty();
        assert_eq!(
            state.on_pull_records(&mut result, -1),
            Err(RuntimeError::ConnectionClosed)
        );
        assert_eq!(
            state.on_discard_records(&mut result, -1),
            Err(RuntimeError::ConnectionClosed)
        );
    }

    #[test]
    fn test_attaching_handler_keeps_buffered_error() {
        let mut state = ConnectionState::new();
        let e1 = failure("E1");
        let e2 = failure("E2");

        state.mark_failed(e1.clone());
        let sink = RecordingSink::new();
        state.set_response_handler(Some(Box::new(sink.clone())));
        state.mark_failed(e2.clone());

        assert_eq!(sink.events(), vec![SinkEvent::Failed(e2)]);
        assert_eq!(state.pending_error(), Some(&e1));
    }

    #[test]
    fn test_detached_handler_no_longer_receives() {
        let mut state = ConnectionState::new();
        let sink = RecordingSink::new();
        state.set_response_handler(Some(Box::new(sink.clone())));
        assert!(state.take_response_handler().is_some());

        state.mark_ignored();
        assert!(sink.events().is_empty());
        assert!(state.has_pending_ignore());
    }

    #[test]
    fn test_nested_interrupt_scenario() {
        let state = ConnectionState::new();
        state.increment_interrupt_counter();
        state.increment_interrupt_counter();

        assert_eq!(state.decrement_interrupt_counter(), Ok(1));
        assert!(state.is_interrupted());
        assert_eq!(state.decrement_interrupt_counter(), Ok(0));
        assert!(!state.is_interrupted());
        assert_eq!(
            state.decrement_interrupt_counter(),
            Err(RuntimeError::InterruptCounterUnderflow)
        );
    }

    #[test]
    fn test_interrupt_does_not_block_processing_gate() {
        let state = ConnectionState::new();
        state.increment_interrupt_counter();
        assert!(state.is_interrupted());
        assert!(state.can_process_message());
    }

    #[test]
    fn test_closed_dominates_gate() {
        let mut state = ConnectionState::new();
        state.mark_failed(failure("boom"));
        state.mark_ignored();
        state.mark_closed();
        assert!(!state.can_process_message());

        state.reset_pending_failed_and_ignored();
        assert!(!state.can_process_message());

        state.mark_closed();
        assert!(state.is_closed());
        assert!(!state.can_process_message());
    }

    #[test]
    fn test_signals_are_shared() {
        let state = ConnectionState::new();
        let signals = state.signals();

        signals.increment_interrupt_counter();
        signals.mark_terminated();

        assert!(state.is_interrupted());
        assert!(state.is_terminated());
    }

    #[test]
    fn test_default_processor_is_empty() {
        let mut state = ConnectionState::new();
        let processor = state.statement_processor().unwrap();
        assert_eq!(processor.database_name(), None);
        assert_eq!(
            processor.commit_transaction(),
            Err(RuntimeError::NoStatementProcessor)
        );
    }

    #[test]
    fn test_termination_notice_raised_once_on_get() {
        let mut state = ConnectionState::new();
        state
            .set_statement_processor(Box::new(ScriptedProcessor::new("movies")))
            .unwrap();
        state.set_pending_termination_notice(Status::TransactionTimedOut);

        assert_eq!(
            state.statement_processor().err(),
            Some(RuntimeError::TransactionTerminated(Status::TransactionTimedOut))
        );
        assert!(!state.has_pending_termination_notice());

        let processor = state.statement_processor().unwrap();
        assert_eq!(processor.database_name(), Some("movies"));
    }

    #[test]
    fn test_termination_notice_raised_once_on_set() {
        let mut state = ConnectionState::new();
        state.set_pending_termination_notice(Status::TransactionTerminated);

        assert_eq!(
            state.set_statement_processor(Box::new(ScriptedProcessor::new("movies"))),
            Err(RuntimeError::TransactionTerminated(Status::TransactionTerminated))
        );
        // the rejected processor was not bound
        assert_eq!(state.statement_processor().unwrap().database_name(), None);

        state
            .set_statement_processor(Box::new(ScriptedProcessor::new("movies")))
            .unwrap();
        assert_eq!(
            state.statement_processor().unwrap().database_name(),
            Some("movies")
        );
    }

    #[test]
    fn test_clear_keeps_termination_notice() {
        let mut state = ConnectionState::new();
        state
            .set_statement_processor(Box::new(ScriptedProcessor::new("movies")))
            .unwrap();
        state.set_pending_termination_notice(Status::TransactionTerminated);

        state.clear_statement_processor();
        assert!(state.has_pending_termination_notice());
        assert!(state.processor_and_sink().is_err());
        assert_eq!(state.statement_processor().unwrap().database_name(), None);
    }

    #[test]
    fn test_validate_transaction_unbinds_terminated_processor() {
        let mut state = ConnectionState::new();
        let processor = ScriptedProcessor::new("movies");
        processor.script().lock().terminated = Some(Status::TransactionTimedOut);
        state.set_statement_processor(Box::new(processor)).unwrap();

        state.validate_transaction();
        assert!(state.has_pending_termination_notice());
        assert_eq!(
            state.statement_processor().err(),
            Some(RuntimeError::TransactionTerminated(Status::TransactionTimedOut))
        );
        assert_eq!(state.statement_processor().unwrap().database_name(), None);
    }

    #[test]
    fn test_validate_transaction_keeps_live_processor() {
        let mut state = ConnectionState::new();
        state
            .set_statement_processor(Box::new(ScriptedProcessor::new("movies")))
            .unwrap();

        state.validate_transaction();
        assert!(!state.has_pending_termination_notice());
        assert_eq!(
            state.statement_processor().unwrap().database_name(),
            Some("movies")
        );
    }

    #[test]
    fn test_processor_streams_through_router() {
        let mut state = ConnectionState::new();
        let processor = ScriptedProcessor::new("movies");
        processor
            .script()
            .lock()
            .add_result("RETURN 1", &["1"], vec![vec![1i64.into()]]);
        state.set_statement_processor(Box::new(processor)).unwrap();
        let sink = RecordingSink::new();
        state.set_response_handler(Some(Box::new(sink.clone())));

        let (processor, sink_ref) = state.processor_and_sink().unwrap();
        processor
            .run("RETURN 1", &Default::default(), None)
            .unwrap();
        processor
            .stream_result(-1, crate::runtime::StreamMode::Pull, sink_ref, -1)
            .unwrap();

        assert_eq!(sink.events(), vec![SinkEvent::Pull(-1)]);
    }
}
