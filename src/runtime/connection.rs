//! # Connection Worker
//!
//! Runs one [`BoltStateMachine`] on a blocking worker thread, fed by a
//! request queue and answering into a response stream.
//!
//! The network side only ever holds a [`ConnectionHandle`]. A RESET pushed
//! through the handle bumps the interrupt counter *before* it is queued,
//! so every message already waiting ahead of it is answered with IGNORED
//! instead of being executed.
//!
//! ```text
//! ConnectionHandle ──requests──▶ ConnectionWorker ──responses──▶ ReceiverStream
//!        │                       (spawn_blocking)
//!        └──── interrupt / terminate ─────▶ ConnectionSignals
//! ```

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;

use super::collector::ResponseCollector;
use super::config::ConnectionConfig;
use super::error::{RuntimeError, RuntimeResult};
use super::machine::BoltStateMachine;
use super::signals::ConnectionSignals;
use crate::bolt::{BoltRequest, BoltResponse};

// ============================================================================
// ConnectionHandle
// ============================================================================

/// Network-side handle of a running connection.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    connection_id: String,
    requests: mpsc::Sender<BoltRequest>,
    signals: Arc<ConnectionSignals>,
}

impl ConnectionHandle {
    /// Connection id reported in HELLO.
    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    /// Queue a request for the worker.
    ///
    /// A RESET interrupts the connection first.
    pub async fn enqueue(&self, request: BoltRequest) -> RuntimeResult<()> {
        if self.requests.is_closed() {
            return Err(RuntimeError::ConnectionClosed);
        }
        if request.is_reset() {
            self.interrupt();
        }
        self.requests
            .send(request)
            .await
            .map_err(|_| RuntimeError::ConnectionClosed)
    }

    /// Register an interrupt without queueing anything.
    pub fn interrupt(&self) -> usize {
        let count = self.signals.increment_interrupt_counter();
        tracing::debug!(connection_id = %self.connection_id, count, "interrupt requested");
        count
    }

    /// Ask the connection to shut down at its next message.
    pub fn terminate(&self) {
        tracing::debug!(connection_id = %self.connection_id, "termination requested");
        self.signals.mark_terminated();
    }

    /// Check if the connection is torn down.
    pub fn is_closed(&self) -> bool {
        self.signals.is_closed()
    }

    /// Signals shared with the worker.
    pub fn signals(&self) -> Arc<ConnectionSignals> {
        Arc::clone(&self.signals)
    }
}

// ============================================================================
// ConnectionWorker
// ============================================================================

/// Owns the state machine of one connection and drains its request queue.
pub struct ConnectionWorker {
    machine: BoltStateMachine,
    requests: mpsc::Receiver<BoltRequest>,
    responses: mpsc::Sender<BoltResponse>,
}

impl ConnectionWorker {
    /// Wire `machine` to a fresh request queue and response stream.
    pub fn new(
        machine: BoltStateMachine,
        config: &ConnectionConfig,
    ) -> (Self, ConnectionHandle, ReceiverStream<BoltResponse>) {
        let (request_tx, request_rx) = mpsc::channel(config.request_queue_size.max(1));
        let (response_tx, response_rx) = mpsc::channel(config.response_queue_size.max(1));

        let handle = ConnectionHandle {
            connection_id: machine.connection_id().to_string(),
            requests: request_tx,
            signals: machine.signals(),
        };
        let worker = Self {
            machine,
            requests: request_rx,
            responses: response_tx,
        };
        (worker, handle, ReceiverStream::new(response_rx))
    }

    /// Run the worker on the blocking pool of the current runtime.
    ///
    /// The task ends when the connection closes, on a fatal error, or once
    /// every handle is dropped, and yields the closed machine.
    pub fn spawn(self) -> JoinHandle<BoltStateMachine> {
        tokio::task::spawn_blocking(move || self.run())
    }

    /// Drain the request queue on the calling thread.
    ///
    /// Blocks; must not be called from an async context.
    pub fn run(mut self) -> BoltStateMachine {
        tracing::debug!(connection_id = %self.machine.connection_id(), "connection worker started");

        while let Some(request) = self.requests.blocking_recv() {
            let handler = ResponseCollector::new(self.responses.clone());
            if let Err(e) = self.machine.process(request, Box::new(handler)) {
                tracing::error!(
                    connection_id = %self.machine.connection_id(),
                    "connection worker stopping: {}",
                    e
                );
                break;
            }
            if self.machine.is_closed() {
                break;
            }
        }

        self.machine.close();
        tracing::debug!(connection_id = %self.machine.connection_id(), "connection worker stopped");
        self.machine
    }
}
