//! # Connection Runtime
//!
//! Per-connection session state of a Bolt server.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      ConnectionWorker                        │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │                   BoltStateMachine                     │  │
//! │  │  ┌──────────────────────────────────────────────────┐  │  │
//! │  │  │                ConnectionState                   │  │  │
//! │  │  │  ResponseRouter ──▶ handler (ResponseCollector)  │  │  │
//! │  │  │  StatementProcessor (or EmptyStatementProcessor) │  │  │
//! │  │  │  pending termination notice                      │  │  │
//! │  │  │  Arc<ConnectionSignals> ◀──── ConnectionHandle   │  │  │
//! │  │  └──────────────────────────────────────────────────┘  │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! - [`ConnectionState`] gates every message: `can_process_message()` is
//!   false once closed or while a failure/ignore is buffered, and
//!   `is_interrupted()` routes non-RESET messages to IGNORED until every
//!   interrupt has been acknowledged by a RESET.
//! - [`ResponseRouter`] forwards sink callbacks to the attached handler,
//!   or buffers failure/ignore when none is attached.
//! - [`ConnectionSignals`] holds the interrupt counter and the
//!   terminated/closed flags, the only state shared across threads.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use parking_lot::Mutex;
//! use zeta4g_bolt_runtime::bolt::{BoltRequest, BoltResponse, HelloMessage};
//! use zeta4g_bolt_runtime::runtime::{
//!     BoltStateMachine, ConnectionConfig, MachineState, ResponseCollector, RuntimeResult,
//!     StatementProcessor, StatementProcessorProvider, EmptyStatementProcessor,
//! };
//!
//! struct NoDatabases;
//!
//! impl StatementProcessorProvider for NoDatabases {
//!     fn processor_for(&mut self, _db: &str) -> RuntimeResult<Box<dyn StatementProcessor>> {
//!         Ok(Box::new(EmptyStatementProcessor))
//!     }
//! }
//!
//! let mut machine = BoltStateMachine::new(Box::new(NoDatabases), &ConnectionConfig::default());
//! let out = Arc::new(Mutex::new(Vec::<BoltResponse>::new()));
//! machine
//!     .process(
//!         BoltRequest::Hello(HelloMessage::new("example/1.0")),
//!         Box::new(ResponseCollector::new(Arc::clone(&out))),
//!     )
//!     .unwrap();
//!
//! assert_eq!(machine.current_state(), MachineState::Ready);
//! assert!(out.lock()[0].is_success());
//! ```

pub mod collector;
pub mod config;
pub mod connection;
pub mod error;
pub mod machine;
pub mod processor;
pub mod router;
pub mod signals;
pub mod sink;
pub mod state;

#[cfg(test)]
mod testing;

pub use collector::{ResponseCollector, ResponseOutput};
pub use config::{ConnectionConfig, ConnectionConfigBuilder};
pub use connection::{ConnectionHandle, ConnectionWorker};
pub use error::{BoltFailure, RuntimeError, RuntimeResult};
pub use machine::{BoltStateMachine, MachineState};
pub use processor::{
    EmptyStatementProcessor, StatementMetadata, StatementProcessor, StatementProcessorProvider,
    StreamMode, StreamOutcome, TransactionConfig,
};
pub use router::ResponseRouter;
pub use signals::ConnectionSignals;
pub use sink::{batch_limit, BoltResult, RecordBuffer, ResultSink, ALL_RECORDS};
pub use state::ConnectionState;
