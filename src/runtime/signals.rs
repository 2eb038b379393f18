//! Cross-thread connection signals.
//!
//! The interrupt counter and the terminated/closed flags are the only parts
//! of a connection touched from outside its worker: the network side bumps
//! the counter when a RESET arrives, a watchdog marks the connection
//! terminated, shutdown marks it closed. Everything here is lock-free.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::error::{RuntimeError, RuntimeResult};

/// Shared, atomically updated control signals of one connection.
///
/// Held behind an `Arc` by [`ConnectionState`](super::ConnectionState) and
/// by any handle that needs to signal the connection from another thread.
#[derive(Debug, Default)]
pub struct ConnectionSignals {
    /// Incremented per interrupt request, decremented per RESET consumed.
    /// While above zero every message except RESET is ignored, so a RESET
    /// can purge the messages queued ahead of it.
    interrupt_counter: AtomicUsize,
    terminated: AtomicBool,
    closed: AtomicBool,
}

impl ConnectionSignals {
    /// Create signals in the normal (not interrupted, open) state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if at least one interrupt is still unacknowledged.
    pub fn is_interrupted(&self) -> bool {
        self.interrupt_counter.load(Ordering::Acquire) > 0
    }

    /// Current number of unacknowledged interrupts.
    pub fn interrupt_count(&self) -> usize {
        self.interrupt_counter.load(Ordering::Acquire)
    }

    /// Register one interrupt and return the new count.
    pub fn increment_interrupt_counter(&self) -> usize {
        self.interrupt_counter.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Acknowledge one interrupt and return the new count.
    ///
    /// Fails with [`RuntimeError::InterruptCounterUnderflow`] instead of
    /// wrapping when there is nothing to acknowledge; the counter is left
    /// at zero in that case.
    pub fn decrement_interrupt_counter(&self) -> RuntimeResult<usize> {
        self.interrupt_counter
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                count.checked_sub(1)
            })
            .map(|previous| previous - 1)
            .map_err(|_| RuntimeError::InterruptCounterUnderflow)
    }

    /// Check if the running operation should abort.
    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    /// Ask the running operation to abort. Idempotent.
    pub fn mark_terminated(&self) {
        self.terminated.store(true, Ordering::Release);
    }

    /// Check if the connection is torn down.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Mark the connection torn down. Idempotent and permanent.
    pub fn mark_closed(&self) {
        self.closed.store(true, Ordering::Release);
    }
}
