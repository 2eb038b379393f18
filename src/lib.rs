//! # Zeta4G Bolt Runtime
//!
//! Server-side connection runtime of the Bolt protocol for
//! [Zeta4G](https://github.com/zeta9044/zeta4g).
//!
//! One runtime instance serves one client connection: it tracks the bound
//! statement processor, the handler of the request being answered, and
//! the interrupt/terminate/close signals that implement RESET and
//! failure suppression.
//!
//! ## Features
//!
//! - **Session state** - Pending failure/ignore buffering with first-failure-wins semantics
//! - **RESET handling** - Atomic interrupt counter so a RESET skips every queued message
//! - **State machine** - CONNECTED, READY, STREAMING, TX_READY, TX_STREAMING, FAILED, INTERRUPTED, DEFUNCT
//! - **Worker** - Tokio based request queue and response stream per connection
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use zeta4g_bolt_runtime::bolt::{BoltRequest, HelloMessage};
//! use zeta4g_bolt_runtime::runtime::{
//!     BoltStateMachine, ConnectionConfig, ConnectionWorker, StatementProcessorProvider,
//! };
//! use tokio_stream::StreamExt;
//!
//! # async fn example(provider: Box<dyn StatementProcessorProvider>) -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConnectionConfig::builder()
//!     .connection_id("bolt-1")
//!     .default_database("zeta4g")
//!     .build();
//!
//! let machine = BoltStateMachine::new(provider, &config);
//! let (worker, handle, mut responses) = ConnectionWorker::new(machine, &config);
//! worker.spawn();
//!
//! handle.enqueue(BoltRequest::Hello(HelloMessage::new("app/1.0"))).await?;
//! while let Some(response) = responses.next().await {
//!     println!("{}", response.name());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`runtime`] - Connection state, state machine and worker
//! - [`bolt`] - Bolt message, value and status types
//!

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod bolt;
pub mod runtime;

// Re-exports for convenience
pub use bolt::{BoltRequest, BoltResponse, PackStreamValue, Status};
pub use runtime::{
    BoltFailure, BoltStateMachine, ConnectionConfig, ConnectionHandle, ConnectionSignals,
    ConnectionState, ConnectionWorker, ResultSink, RuntimeError, RuntimeResult,
    StatementProcessor,
};
