//! Statement processor capability.
//!
//! The runtime never executes queries itself. It binds a
//! [`StatementProcessor`] for the target database and forwards RUN, PULL,
//! BEGIN, ... to it. When nothing is bound, [`EmptyStatementProcessor`]
//! stands in and rejects every execution request.

use std::collections::HashMap;
use std::time::Duration;

use super::error::{RuntimeError, RuntimeResult};
use super::sink::ResultSink;
use crate::bolt::{AccessMode, PackStreamValue, Status, TransactionExtra};

// ============================================================================
// Transaction / statement descriptors
// ============================================================================

/// Options of an explicit or auto-commit transaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionConfig {
    /// Bookmarks the transaction must wait for
    pub bookmarks: Vec<String>,
    /// Transaction timeout
    pub timeout: Option<Duration>,
    /// Access mode
    pub mode: AccessMode,
    /// Client supplied transaction metadata
    pub metadata: HashMap<String, PackStreamValue>,
}

impl TransactionConfig {
    /// Options requested by a RUN (auto-commit) or BEGIN.
    pub fn from_request(msg: &impl TransactionExtra) -> Self {
        Self {
            bookmarks: msg.bookmarks(),
            timeout: msg.tx_timeout(),
            mode: msg.mode(),
            metadata: msg.tx_metadata(),
        }
    }
}

/// What a processor reports after starting a statement.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementMetadata {
    /// Column names of the result
    pub field_names: Vec<String>,
    /// Query id within the enclosing transaction
    pub query_id: i64,
    /// Time until the first record was available
    pub time_to_first_record: Duration,
}

impl StatementMetadata {
    /// Create metadata for a statement.
    pub fn new(field_names: Vec<String>, query_id: i64) -> Self {
        Self {
            field_names,
            query_id,
            time_to_first_record: Duration::ZERO,
        }
    }
}

/// How the records of a result are consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMode {
    /// Records are sent to the client (PULL).
    Pull,
    /// Records are dropped (DISCARD).
    Discard,
}

/// Outcome of one PULL/DISCARD batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamOutcome {
    /// Records remain in the result
    pub has_more: bool,
    /// Bookmark of the auto-commit transaction, once it committed
    pub bookmark: Option<String>,
}

// ============================================================================
// StatementProcessor
// ============================================================================

/// Executes statements and transactions for one connection.
///
/// Calls come from the connection worker only, one at a time. A processor
/// may block.
pub trait StatementProcessor: Send {
    /// Database this processor is bound to.
    fn database_name(&self) -> Option<&str>;

    /// Open an explicit transaction.
    fn begin_transaction(&mut self, config: TransactionConfig) -> RuntimeResult<()>;

    /// Start a statement.
    ///
    /// Without an explicit transaction `config` describes the auto-commit
    /// transaction wrapping it.
    fn run(
        &mut self,
        statement: &str,
        parameters: &HashMap<String, PackStreamValue>,
        config: Option<TransactionConfig>,
    ) -> RuntimeResult<StatementMetadata>;

    /// Stream one batch of the result of statement `qid` into `sink`.
    ///
    /// A negative `qid` addresses the most recent statement.
    fn stream_result(
        &mut self,
        qid: i64,
        mode: StreamMode,
        sink: &mut dyn ResultSink,
        size: i64,
    ) -> RuntimeResult<StreamOutcome>;

    /// Commit the explicit transaction and return its bookmark.
    fn commit_transaction(&mut self) -> RuntimeResult<String>;

    /// Roll back the explicit transaction.
    fn rollback_transaction(&mut self) -> RuntimeResult<()>;

    /// Drop every open statement and transaction.
    fn reset(&mut self) -> RuntimeResult<()>;

    /// Ask the running transaction to abort at its next check.
    fn mark_current_transaction_for_termination(&mut self);

    /// Check if an explicit transaction is open.
    fn has_transaction(&self) -> bool;

    /// Check if a statement still has unconsumed records.
    fn has_open_statement(&self) -> bool;

    /// Report why the current transaction was torn down, if it was.
    fn validate_transaction(&mut self) -> Option<Status>;
}

/// The processor bound when no statement is in flight.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyStatementProcessor;

impl StatementProcessor for EmptyStatementProcessor {
    fn database_name(&self) -> Option<&str> {
        None
    }

    fn begin_transaction(&mut self, _config: TransactionConfig) -> RuntimeResult<()> {
        Err(RuntimeError::NoStatementProcessor)
    }

    fn run(
        &mut self,
        _statement: &str,
        _parameters: &HashMap<String, PackStreamValue>,
        _config: Option<TransactionConfig>,
    ) -> RuntimeResult<StatementMetadata> {
        Err(RuntimeError::NoStatementProcessor)
    }

    fn stream_result(
        &mut self,
        _qid: i64,
        _mode: StreamMode,
        _sink: &mut dyn ResultSink,
        _size: i64,
    ) -> RuntimeResult<StreamOutcome> {
        Err(RuntimeError::NoStatementProcessor)
    }

    fn commit_transaction(&mut self) -> RuntimeResult<String> {
        Err(RuntimeError::NoStatementProcessor)
    }

    fn rollback_transaction(&mut self) -> RuntimeResult<()> {
        Err(RuntimeError::NoStatementProcessor)
    }

    fn reset(&mut self) -> RuntimeResult<()> {
        Ok(())
    }

    fn mark_current_transaction_for_termination(&mut self) {}

    fn has_transaction(&self) -> bool {
        false
    }

    fn has_open_statement(&self) -> bool {
        false
    }

    fn validate_transaction(&mut self) -> Option<Status> {
        None
    }
}

/// Creates processors for a database.
pub trait StatementProcessorProvider: Send {
    /// Create a processor bound to `database`.
    fn processor_for(&mut self, database: &str) -> RuntimeResult<Box<dyn StatementProcessor>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bolt::{BeginMessage, RunMessage};
    use crate::runtime::router::ResponseRouter;

    #[test]
    fn test_empty_processor_rejects_execution() {
        let mut processor = EmptyStatementProcessor;
        let mut sink = ResponseRouter::new();

        assert_eq!(processor.database_name(), None);
        assert_eq!(
            processor.begin_transaction(TransactionConfig::default()),
            Err(RuntimeError::NoStatementProcessor)
        );
        assert_eq!(
            processor.run("RETURN 1", &HashMap::new(), None),
            Err(RuntimeError::NoStatementProcessor)
        );
        assert_eq!(
            processor.stream_result(-1, StreamMode::Pull, &mut sink, -1),
            Err(RuntimeError::NoStatementProcessor)
        );
        assert_eq!(
            processor.commit_transaction(),
            Err(RuntimeError::NoStatementProcessor)
        );
        assert_eq!(
            processor.rollback_transaction(),
            Err(RuntimeError::NoStatementProcessor)
        );
    }

    #[test]
    fn test_empty_processor_lifecycle_is_noop() {
        let mut processor = EmptyStatementProcessor;
        processor.mark_current_transaction_for_termination();

        assert_eq!(processor.reset(), Ok(()));
        assert!(!processor.has_transaction());
        assert!(!processor.has_open_statement());
        assert_eq!(processor.validate_transaction(), None);
    }

    #[test]
    fn test_transaction_config_from_run() {
        let msg = RunMessage::new("RETURN 1")
            .with_extra("bookmarks", PackStreamValue::string_list(["bm:1"]))
            .with_extra("tx_timeout", 1500i64)
            .with_extra("mode", "r");

        let config = TransactionConfig::from_request(&msg);
        assert_eq!(config.bookmarks, vec!["bm:1".to_string()]);
        assert_eq!(config.timeout, Some(Duration::from_millis(1500)));
        assert_eq!(config.mode, AccessMode::Read);
        assert!(config.metadata.is_empty());
    }

    #[test]
    fn test_transaction_config_from_begin() {
        let msg = BeginMessage::new()
            .with_extra("tx_timeout", 3000i64)
            .with_extra("mode", "r");

        let config = TransactionConfig::from_request(&msg);
        assert_eq!(config.timeout, Some(Duration::from_secs(3)));
        assert_eq!(config.mode, AccessMode::Read);
        assert!(config.bookmarks.is_empty());
    }
}
