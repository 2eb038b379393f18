//! Requests received from a client.
//!
//! Messages reach the runtime already decoded. Optional entries stay in the
//! `extra` map the client sent and are read through typed accessors, so
//! entries the runtime does not know about are kept as they are.

use std::collections::HashMap;
use std::time::Duration;

use crate::bolt::packstream::PackStreamValue;

/// Optional entries of a request.
pub type Extra = HashMap<String, PackStreamValue>;

/// Read or write access requested for a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessMode {
    /// `"w"`, also used for anything unrecognised
    #[default]
    Write,
    /// `"r"`
    Read,
}

impl AccessMode {
    /// Parse the `mode` entry.
    pub fn parse(mode: &str) -> Self {
        if mode.eq_ignore_ascii_case("r") || mode.eq_ignore_ascii_case("read") {
            AccessMode::Read
        } else {
            AccessMode::Write
        }
    }

    /// Value of the `mode` entry.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessMode::Write => "w",
            AccessMode::Read => "r",
        }
    }
}

/// Transaction options shared by RUN and BEGIN.
pub trait TransactionExtra {
    /// The raw `extra` map.
    fn extra(&self) -> &Extra;

    /// Target database, if the client named one.
    fn database(&self) -> Option<&str> {
        self.extra().get("db").and_then(PackStreamValue::as_str)
    }

    /// Bookmarks the transaction must wait for.
    fn bookmarks(&self) -> Vec<String> {
        self.extra()
            .get("bookmarks")
            .and_then(PackStreamValue::as_string_list)
            .unwrap_or_default()
    }

    /// Requested timeout. Negative values mean none.
    fn tx_timeout(&self) -> Option<Duration> {
        let millis = self.extra().get("tx_timeout")?.as_int()?;
        u64::try_from(millis).ok().map(Duration::from_millis)
    }

    /// Requested access mode.
    fn mode(&self) -> AccessMode {
        self.extra()
            .get("mode")
            .and_then(PackStreamValue::as_str)
            .map(AccessMode::parse)
            .unwrap_or_default()
    }

    /// Client metadata attached to the transaction.
    fn tx_metadata(&self) -> Extra {
        self.extra()
            .get("tx_metadata")
            .and_then(PackStreamValue::as_map)
            .cloned()
            .unwrap_or_default()
    }
}

/// A decoded client request.
#[derive(Debug, Clone)]
pub enum BoltRequest {
    /// Open the session
    Hello(HelloMessage),
    /// Close the connection
    Goodbye,
    /// Acknowledge an interrupt and return to READY
    Reset,
    /// Start a statement
    Run(RunMessage),
    /// Stream records of an open statement
    Pull(StreamRequest),
    /// Drop records of an open statement
    Discard(StreamRequest),
    /// Open an explicit transaction
    Begin(BeginMessage),
    /// Commit the explicit transaction
    Commit,
    /// Roll back the explicit transaction
    Rollback,
}

impl BoltRequest {
    /// Message name, as used in logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            BoltRequest::Hello(_) => "HELLO",
            BoltRequest::Goodbye => "GOODBYE",
            BoltRequest::Reset => "RESET",
            BoltRequest::Run(_) => "RUN",
            BoltRequest::Pull(_) => "PULL",
            BoltRequest::Discard(_) => "DISCARD",
            BoltRequest::Begin(_) => "BEGIN",
            BoltRequest::Commit => "COMMIT",
            BoltRequest::Rollback => "ROLLBACK",
        }
    }

    /// Check if this is a RESET.
    pub fn is_reset(&self) -> bool {
        matches!(self, BoltRequest::Reset)
    }

    /// Messages that bypass the pending error/ignore gate.
    ///
    /// Only GOODBYE qualifies: a client asking to leave is honoured even
    /// while an earlier failure is still unacknowledged.
    pub fn safe_to_process_in_any_state(&self) -> bool {
        matches!(self, BoltRequest::Goodbye)
    }
}

/// HELLO
#[derive(Debug, Clone, Default)]
pub struct HelloMessage {
    /// `user_agent`, `scheme`, `principal`, `credentials`, `routing`, ...
    pub extra: Extra,
}

impl HelloMessage {
    /// Create a HELLO from `user_agent` without credentials.
    pub fn new(user_agent: &str) -> Self {
        let mut extra = Extra::new();
        extra.insert("user_agent".to_string(), user_agent.into());
        Self { extra }
    }

    /// Client identification.
    pub fn user_agent(&self) -> &str {
        self.extra
            .get("user_agent")
            .and_then(PackStreamValue::as_str)
            .unwrap_or("")
    }

    /// Authentication scheme, `"none"` when absent.
    pub fn scheme(&self) -> &str {
        self.extra
            .get("scheme")
            .and_then(PackStreamValue::as_str)
            .unwrap_or("none")
    }

    /// Routing context, present for cluster-aware clients.
    pub fn routing(&self) -> Option<&Extra> {
        self.extra.get("routing").and_then(PackStreamValue::as_map)
    }
}

/// RUN
#[derive(Debug, Clone)]
pub struct RunMessage {
    /// Query text
    pub query: String,
    /// Query parameters
    pub parameters: Extra,
    /// Transaction options (auto-commit only)
    pub extra: Extra,
}

impl RunMessage {
    /// Create a RUN without parameters.
    pub fn new(query: &str) -> Self {
        Self {
            query: query.to_string(),
            parameters: Extra::new(),
            extra: Extra::new(),
        }
    }

    /// Add one parameter.
    pub fn with_parameter(mut self, key: &str, value: impl Into<PackStreamValue>) -> Self {
        self.parameters.insert(key.to_string(), value.into());
        self
    }

    /// Add one `extra` entry.
    pub fn with_extra(mut self, key: &str, value: impl Into<PackStreamValue>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }

    /// Target `db`.
    pub fn with_database(self, database: &str) -> Self {
        self.with_extra("db", database)
    }
}

impl TransactionExtra for RunMessage {
    fn extra(&self) -> &Extra {
        &self.extra
    }
}

/// BEGIN
#[derive(Debug, Clone, Default)]
pub struct BeginMessage {
    /// Transaction options
    pub extra: Extra,
}

impl BeginMessage {
    /// Create a BEGIN with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one `extra` entry.
    pub fn with_extra(mut self, key: &str, value: impl Into<PackStreamValue>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }

    /// Target `db`.
    pub fn with_database(self, database: &str) -> Self {
        self.with_extra("db", database)
    }
}

impl TransactionExtra for BeginMessage {
    fn extra(&self) -> &Extra {
        &self.extra
    }
}

/// Body of PULL and DISCARD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamRequest {
    /// Number of records, `-1` for all
    pub n: i64,
    /// Statement id, `-1` for the most recent one
    pub qid: i64,
}

impl StreamRequest {
    /// Every remaining record of the last statement.
    pub fn all() -> Self {
        Self { n: -1, qid: -1 }
    }

    /// At most `n` records of the last statement.
    pub fn batch(n: i64) -> Self {
        Self { n, qid: -1 }
    }

    /// Address statement `qid` instead of the last one.
    pub fn for_query(self, qid: i64) -> Self {
        Self { qid, ..self }
    }
}

impl Default for StreamRequest {
    fn default() -> Self {
        Self::all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_mode_parse() {
        assert_eq!(AccessMode::parse("r"), AccessMode::Read);
        assert_eq!(AccessMode::parse("READ"), AccessMode::Read);
        assert_eq!(AccessMode::parse("w"), AccessMode::Write);
        assert_eq!(AccessMode::parse("bogus"), AccessMode::Write);
        assert_eq!(AccessMode::Read.as_str(), "r");
    }

    #[test]
    fn test_run_transaction_options() {
        let metadata: Extra = [("app".to_string(), "billing".into())].into_iter().collect();
        let msg = RunMessage::new("MATCH (n) RETURN n")
            .with_parameter("limit", 10i64)
            .with_database("movies")
            .with_extra("bookmarks", PackStreamValue::string_list(["bm:1"]))
            .with_extra("tx_timeout", 1500i64)
            .with_extra("mode", "r")
            .with_extra("tx_metadata", metadata.clone());

        assert_eq!(msg.parameters.get("limit"), Some(&PackStreamValue::Integer(10)));
        assert_eq!(msg.database(), Some("movies"));
        assert_eq!(msg.bookmarks(), vec!["bm:1".to_string()]);
        assert_eq!(msg.tx_timeout(), Some(Duration::from_millis(1500)));
        assert_eq!(msg.mode(), AccessMode::Read);
        assert_eq!(msg.tx_metadata(), metadata);
    }

    #[test]
    fn test_missing_options_use_defaults() {
        let msg = BeginMessage::new().with_extra("tx_timeout", -5i64);

        assert_eq!(msg.database(), None);
        assert!(msg.bookmarks().is_empty());
        assert_eq!(msg.tx_timeout(), None);
        assert_eq!(msg.mode(), AccessMode::Write);
        assert!(msg.tx_metadata().is_empty());
    }

    #[test]
    fn test_hello_entries() {
        let hello = HelloMessage::new("app/2.1");
        assert_eq!(hello.user_agent(), "app/2.1");
        assert_eq!(hello.scheme(), "none");
        assert!(hello.routing().is_none());

        let mut hello = hello;
        hello.extra.insert("scheme".into(), "basic".into());
        hello
            .extra
            .insert("routing".into(), PackStreamValue::Map(Extra::new()));
        assert_eq!(hello.scheme(), "basic");
        assert!(hello.routing().is_some());
    }

    #[test]
    fn test_stream_request() {
        assert_eq!(StreamRequest::all(), StreamRequest { n: -1, qid: -1 });
        assert_eq!(
            StreamRequest::batch(100).for_query(2),
            StreamRequest { n: 100, qid: 2 }
        );
    }

    #[test]
    fn test_only_goodbye_bypasses_gate() {
        assert!(BoltRequest::Goodbye.safe_to_process_in_any_state());
        assert!(!BoltRequest::Reset.safe_to_process_in_any_state());
        assert!(!BoltRequest::Commit.safe_to_process_in_any_state());
        assert!(BoltRequest::Reset.is_reset());
        assert_eq!(BoltRequest::Pull(StreamRequest::all()).name(), "PULL");
    }
}
