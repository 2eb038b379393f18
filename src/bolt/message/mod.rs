//! Bolt message types.
//!
//! Requests are what the runtime consumes, responses are what it emits.
//! Both are plain values; framing them onto the wire happens elsewhere.

pub mod request;
pub mod response;

pub use request::{
    AccessMode, BeginMessage, BoltRequest, Extra, HelloMessage, RunMessage, StreamRequest,
    TransactionExtra,
};
pub use response::{BoltResponse, FailureMessage, RecordMessage, SuccessMessage};
