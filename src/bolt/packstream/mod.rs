//! PackStream value model.
//!
//! Bolt messages carry values from the PackStream type system. The runtime
//! works with already-decoded values only; turning bytes into these types
//! (and back) is the job of the transport layer in front of it.
//!
//! # Supported Types
//!
//! - **Null**, **Boolean**, **Integer** (i64), **Float** (f64)
//! - **String**: UTF-8
//! - **Bytes**: raw byte arrays
//! - **List** / **Map**: nested collections, map keys are strings
//! - **Structure**: tagged structures for graph entities

pub mod types;

pub use types::PackStreamValue;
