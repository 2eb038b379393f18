//! # Bolt State Machine
//!
//! Drives one [`ConnectionState`] through the Bolt v4 server states.
//!
//! ```text
//!            HELLO                RUN                 PULL/DISCARD (done)
//! CONNECTED ───────▶ READY ─────────────▶ STREAMING ─────────────────┐
//!                     │  ▲                                           │
//!                     │  └───────────────────────────────────────────┘
//!               BEGIN │  ▲ COMMIT / ROLLBACK
//!                     ▼  │
//!                   TX_READY ◀──────────── TX_STREAMING
//!                     │      PULL/DISCARD        ▲
//!                     └──────────────────────────┘
//!                               RUN
//!
//! any failure ─▶ FAILED       interrupt ─▶ INTERRUPTED ── RESET ─▶ READY
//! fatal error ─▶ DEFUNCT
//! ```
//!
//! Every request goes through the same three steps: `before` (pick up
//! termination/interrupt signals, attach the handler), the gated dispatch,
//! and `after` (report buffered failure/ignore, finish, detach).

use std::fmt;
use std::sync::Arc;

use super::config::ConnectionConfig;
use super::error::{BoltFailure, RuntimeError, RuntimeResult};
use super::processor::{
    StatementMetadata, StatementProcessorProvider, StreamMode, StreamOutcome, TransactionConfig,
};
use super::signals::ConnectionSignals;
use super::sink::ResultSink;
use super::state::ConnectionState;
use crate::bolt::{BoltRequest, PackStreamValue, RunMessage, TransactionExtra};

/// Server-side state of a Bolt connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineState {
    /// Waiting for HELLO
    Connected,
    /// Idle, no statement open
    Ready,
    /// Auto-commit statement has records left
    Streaming,
    /// Explicit transaction open, no records left
    TxReady,
    /// Explicit transaction open with records left
    TxStreaming,
    /// A request failed, waiting for RESET
    Failed,
    /// Interrupt received, waiting for RESET
    Interrupted,
    /// Connection unusable
    Defunct,
}

impl MachineState {
    /// State name as reported in errors.
    pub fn as_str(&self) -> &'static str {
        match self {
            MachineState::Connected => "CONNECTED",
            MachineState::Ready => "READY",
            MachineState::Streaming => "STREAMING",
            MachineState::TxReady => "TX_READY",
            MachineState::TxStreaming => "TX_STREAMING",
            MachineState::Failed => "FAILED",
            MachineState::Interrupted => "INTERRUPTED",
            MachineState::Defunct => "DEFUNCT",
        }
    }
}

impl fmt::Display for MachineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bolt state machine of one connection.
pub struct BoltStateMachine {
    state: ConnectionState,
    current: MachineState,
    provider: Box<dyn StatementProcessorProvider>,
    connection_id: String,
    server_agent: String,
    default_database: String,
}

impl BoltStateMachine {
    /// Create a machine in the CONNECTED state.
    pub fn new(provider: Box<dyn StatementProcessorProvider>, config: &ConnectionConfig) -> Self {
        Self {
            state: ConnectionState::new(),
            current: MachineState::Connected,
            provider,
            connection_id: config.connection_id.clone(),
            server_agent: config.server_agent.clone(),
            default_database: config.default_database.clone(),
        }
    }

    /// Current state.
    pub fn current_state(&self) -> MachineState {
        self.current
    }

    /// Connection id reported in HELLO.
    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    /// Underlying connection state.
    pub fn connection_state(&self) -> &ConnectionState {
        &self.state
    }

    /// Underlying connection state, mutably.
    pub fn connection_state_mut(&mut self) -> &mut ConnectionState {
        &mut self.state
    }

    /// Signals shared with other threads.
    pub fn signals(&self) -> Arc<ConnectionSignals> {
        self.state.signals()
    }

    /// Register an interrupt. Returns the number of RESETs now expected.
    pub fn interrupt(&self) -> usize {
        let count = self.state.increment_interrupt_counter();
        tracing::debug!(connection_id = %self.connection_id, count, "connection interrupted");
        count
    }

    /// Check if the connection is torn down.
    pub fn is_closed(&self) -> bool {
        self.state.is_closed()
    }

    /// Tear the connection down, dropping any open transaction.
    pub fn close(&mut self) {
        self.release_processor();
        self.state.mark_closed();
        self.transition(MachineState::Defunct);
    }

    /// Handle one request, reporting its outcome to `handler`.
    ///
    /// Recoverable failures are reported to the handler and move the
    /// machine to FAILED; only fatal errors are returned, after which the
    /// connection is closed.
    pub fn process(&mut self, request: BoltRequest, handler: Box<dyn ResultSink>) -> RuntimeResult<()> {
        let message = request.name();
        self.before(handler);

        let outcome = if self.state.is_closed() {
            tracing::debug!(
                connection_id = %self.connection_id,
                request = message,
                "connection closed, message dropped"
            );
            Ok(())
        } else if request.is_reset()
            || request.safe_to_process_in_any_state()
            || self.state.can_process_message()
        {
            self.dispatch(request)
        } else {
            tracing::debug!(
                connection_id = %self.connection_id,
                request = message,
                "earlier failure pending, message not processed"
            );
            Ok(())
        };

        // a closed connection only answers the request that killed it
        let reply = outcome.is_err() || !self.state.is_closed();
        self.after(reply);
        outcome
    }

    fn before(&mut self, handler: Box<dyn ResultSink>) {
        if self.state.is_terminated() {
            if !self.state.is_closed() {
                tracing::debug!(connection_id = %self.connection_id, "connection terminated");
                self.close();
            }
        } else if self.state.is_interrupted()
            && !matches!(
                self.current,
                MachineState::Connected | MachineState::Interrupted | MachineState::Defunct
            )
        {
            self.transition(MachineState::Interrupted);
            self.state.mark_current_transaction_for_termination();
        }

        if !self.state.is_closed() {
            self.state.validate_transaction();
        }
        self.state.set_response_handler(Some(handler));
    }

    fn after(&mut self, reply: bool) {
        if let Some(error) = self.state.pending_error().cloned() {
            self.state.mark_failed(error);
            // stays failed until RESET; an interrupt still takes precedence
            if !matches!(self.current, MachineState::Interrupted | MachineState::Defunct) {
                self.transition(MachineState::Failed);
            }
        }
        if self.state.has_pending_ignore() {
            self.state.mark_ignored();
        }
        self.state.reset_pending_failed_and_ignored();
        if reply {
            self.state.on_finish();
        }
        self.state.take_response_handler();
    }

    fn dispatch(&mut self, request: BoltRequest) -> RuntimeResult<()> {
        let message = request.name();
        let result = match (self.current, request) {
            (_, BoltRequest::Goodbye) => {
                tracing::debug!(connection_id = %self.connection_id, "GOODBYE received");
                self.close();
                return Ok(());
            }
            (MachineState::Connected, request) => self.on_connected(request),
            (MachineState::Defunct, _) => Err(RuntimeError::ConnectionClosed),
            (_, BoltRequest::Reset) => self.on_reset(),
            (state @ (MachineState::Failed | MachineState::Interrupted), _) => {
                tracing::debug!(
                    connection_id = %self.connection_id,
                    request = message,
                    state = %state,
                    "message ignored"
                );
                self.state.mark_ignored();
                Ok(state)
            }
            (MachineState::Ready, request) => self.on_ready(request),
            (MachineState::Streaming, request) => self.on_streaming(request),
            (MachineState::TxReady, request) => self.on_tx_ready(request),
            (MachineState::TxStreaming, request) => self.on_tx_streaming(request),
        };

        match result {
            Ok(next) => {
                self.transition(next);
                Ok(())
            }
            Err(err) if err.is_fatal() => {
                self.fail_fatal(message, &err);
                Err(err)
            }
            Err(err) => {
                self.fail(message, &err);
                Ok(())
            }
        }
    }

    // ========================================================================
    // States
    // ========================================================================

    fn on_connected(&mut self, request: BoltRequest) -> RuntimeResult<MachineState> {
        match request {
            BoltRequest::Hello(hello) => {
                tracing::debug!(
                    connection_id = %self.connection_id,
                    user_agent = hello.user_agent(),
                    "HELLO received"
                );
                self.state
                    .on_metadata("server", self.server_agent.as_str().into());
                self.state
                    .on_metadata("connection_id", self.connection_id.as_str().into());
                Ok(MachineState::Ready)
            }
            other => Err(RuntimeError::fatal(format!(
                "Message {} cannot be handled before HELLO",
                other.name()
            ))),
        }
    }

    fn on_ready(&mut self, request: BoltRequest) -> RuntimeResult<MachineState> {
        match request {
            BoltRequest::Run(run) => {
                self.bind_processor(run.database())?;
                let config = TransactionConfig::from_request(&run);
                let metadata = self.state.statement_processor()?.run(
                    &run.query,
                    &run.parameters,
                    Some(config),
                )?;
                self.emit_statement_metadata(&metadata, false);
                Ok(MachineState::Streaming)
            }
            BoltRequest::Begin(begin) => {
                self.bind_processor(begin.database())?;
                self.state
                    .statement_processor()?
                    .begin_transaction(TransactionConfig::from_request(&begin))?;
                Ok(MachineState::TxReady)
            }
            other => Err(RuntimeError::invalid_request(other.name(), MachineState::Ready.as_str())),
        }
    }

    fn on_streaming(&mut self, request: BoltRequest) -> RuntimeResult<MachineState> {
        let outcome = match request {
            BoltRequest::Pull(pull) => self.stream(-1, StreamMode::Pull, pull.n)?,
            BoltRequest::Discard(discard) => self.stream(-1, StreamMode::Discard, discard.n)?,
            other => {
                return Err(RuntimeError::invalid_request(
                    other.name(),
                    MachineState::Streaming.as_str(),
                ))
            }
        };

        if outcome.has_more {
            self.state.on_metadata("has_more", true.into());
            return Ok(MachineState::Streaming);
        }
        if let Some(bookmark) = outcome.bookmark {
            self.state.on_metadata("bookmark", bookmark.into());
        }
        let database = self
            .state
            .statement_processor()?
            .database_name()
            .map(str::to_string);
        if let Some(database) = database {
            self.state.on_metadata("db", database.into());
        }
        self.state.clear_statement_processor();
        Ok(MachineState::Ready)
    }

    fn on_tx_ready(&mut self, request: BoltRequest) -> RuntimeResult<MachineState> {
        match request {
            BoltRequest::Run(run) => self.run_in_transaction(&run),
            BoltRequest::Commit => {
                let bookmark = self.state.statement_processor()?.commit_transaction()?;
                self.state.on_metadata("bookmark", bookmark.into());
                self.state.clear_statement_processor();
                Ok(MachineState::Ready)
            }
            BoltRequest::Rollback => {
                self.state.statement_processor()?.rollback_transaction()?;
                self.state.clear_statement_processor();
                Ok(MachineState::Ready)
            }
            other => Err(RuntimeError::invalid_request(
                other.name(),
                MachineState::TxReady.as_str(),
            )),
        }
    }

    fn on_tx_streaming(&mut self, request: BoltRequest) -> RuntimeResult<MachineState> {
        let outcome = match request {
            BoltRequest::Run(run) => return self.run_in_transaction(&run),
            BoltRequest::Pull(pull) => self.stream(pull.qid, StreamMode::Pull, pull.n)?,
            BoltRequest::Discard(discard) => {
                self.stream(discard.qid, StreamMode::Discard, discard.n)?
            }
            other => {
                return Err(RuntimeError::invalid_request(
                    other.name(),
                    MachineState::TxStreaming.as_str(),
                ))
            }
        };

        if outcome.has_more {
            self.state.on_metadata("has_more", true.into());
            return Ok(MachineState::TxStreaming);
        }
        if self.state.statement_processor()?.has_open_statement() {
            Ok(MachineState::TxStreaming)
        } else {
            Ok(MachineState::TxReady)
        }
    }

    /// RESET acknowledges one interrupt; the last one brings the
    /// connection back to READY.
    fn on_reset(&mut self) -> RuntimeResult<MachineState> {
        let remaining = self.state.decrement_interrupt_counter()?;
        if remaining > 0 {
            self.state.mark_ignored();
            return Ok(MachineState::Interrupted);
        }

        self.state.reset_pending_failed_and_ignored();
        let reset = self.state.statement_processor().and_then(|p| p.reset());
        self.state.clear_statement_processor();
        reset?;
        Ok(MachineState::Ready)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Reset the bound processor, dropping its open work, and unbind it.
    fn release_processor(&mut self) {
        if let Ok(processor) = self.state.statement_processor() {
            if let Err(e) = processor.reset() {
                tracing::warn!(
                    connection_id = %self.connection_id,
                    "Failed to reset statement processor: {}",
                    e
                );
            }
        }
        self.state.clear_statement_processor();
    }

    fn bind_processor(&mut self, database: Option<&str>) -> RuntimeResult<()> {
        let database = database.unwrap_or(self.default_database.as_str());
        let processor = self.provider.processor_for(database)?;
        self.state.set_statement_processor(processor)
    }

    fn run_in_transaction(&mut self, run: &RunMessage) -> RuntimeResult<MachineState> {
        let metadata = self
            .state
            .statement_processor()?
            .run(&run.query, &run.parameters, None)?;
        self.emit_statement_metadata(&metadata, true);
        Ok(MachineState::TxStreaming)
    }

    fn stream(&mut self, qid: i64, mode: StreamMode, size: i64) -> RuntimeResult<StreamOutcome> {
        let (processor, sink) = self.state.processor_and_sink()?;
        processor.stream_result(qid, mode, sink, size)
    }

    fn emit_statement_metadata(&mut self, metadata: &StatementMetadata, with_qid: bool) {
        self.state.on_metadata(
            "fields",
            PackStreamValue::string_list(metadata.field_names.iter().cloned()),
        );
        let t_first = i64::try_from(metadata.time_to_first_record.as_millis()).unwrap_or(i64::MAX);
        self.state.on_metadata("t_first", t_first.into());
        if with_qid {
            self.state.on_metadata("qid", metadata.query_id.into());
        }
    }

    fn fail(&mut self, message: &'static str, err: &RuntimeError) {
        tracing::warn!(
            connection_id = %self.connection_id,
            request = message,
            state = %self.current,
            "request failed: {}",
            err
        );
        self.state.mark_failed(BoltFailure::from(err));
        self.transition(MachineState::Failed);
    }

    fn fail_fatal(&mut self, message: &'static str, err: &RuntimeError) {
        tracing::error!(
            connection_id = %self.connection_id,
            request = message,
            state = %self.current,
            "fatal error, closing connection: {}",
            err
        );
        self.state.mark_failed(BoltFailure::from(err));
        self.release_processor();
        self.state.mark_closed();
        self.transition(MachineState::Defunct);
    }

    fn transition(&mut self, next: MachineState) {
        if next != self.current {
            tracing::debug!(
                connection_id = %self.connection_id,
                from = %self.current,
                to = %next,
                "state transition"
            );
            self.current = next;
        }
    }
}

impl fmt::Debug for BoltStateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoltStateMachine")
            .field("connection_id", &self.connection_id)
            .field("current", &self.current)
            .field("state", &self.state)
            .finish()
    }
}
