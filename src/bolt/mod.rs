//! # Bolt Protocol Vocabulary
//!
//! The message and value types shared by the connection runtime.
//!
//! ## Overview
//!
//! - **PackStream values** - The value model carried by parameters,
//!   metadata and records
//! - **Message Types** - Decoded requests (HELLO, RUN, PULL, RESET, ...)
//!   and the responses produced for them (SUCCESS, RECORD, FAILURE, IGNORED)
//! - **Status codes** - The `Neo.*` codes reported with every FAILURE
//!
//! ## Submodules
//!
//! - [`packstream`] - Value model
//! - [`message`] - Bolt message types
//! - [`error`] - Status codes

pub mod error;
pub mod message;
pub mod packstream;

pub use error::{Classification, Status};
pub use message::{
    AccessMode, BeginMessage, BoltRequest, BoltResponse, Extra, FailureMessage, HelloMessage,
    RecordMessage, RunMessage, StreamRequest, SuccessMessage, TransactionExtra,
};
pub use packstream::PackStreamValue;
