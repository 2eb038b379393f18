//! Test doubles shared by the runtime tests.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::error::{BoltFailure, RuntimeError, RuntimeResult};
use super::processor::{
    StatementMetadata, StatementProcessor, StatementProcessorProvider, StreamMode, StreamOutcome,
    TransactionConfig,
};
use super::sink::{BoltResult, RecordBuffer, ResultSink};
use crate::bolt::{PackStreamValue, Status};

/// One callback observed by a [`RecordingSink`].
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Pull(i64),
    Discard(i64),
    Metadata(String, PackStreamValue),
    Ignored,
    Failed(BoltFailure),
    Finish,
}

/// Sink that records every callback and consumes nothing.
#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<SinkEvent>>>,
    more: bool,
    fault: Option<RuntimeError>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_more(more: bool) -> Self {
        Self {
            more,
            ..Self::default()
        }
    }

    pub fn failing(fault: RuntimeError) -> Self {
        Self {
            fault: Some(fault),
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().clone()
    }

    fn stream(&mut self, event: SinkEvent) -> RuntimeResult<bool> {
        self.events.lock().push(event);
        match &self.fault {
            Some(fault) => Err(fault.clone()),
            None => Ok(self.more),
        }
    }
}

impl ResultSink for RecordingSink {
    fn on_pull_records(&mut self, _result: &mut dyn BoltResult, size: i64) -> RuntimeResult<bool> {
        self.stream(SinkEvent::Pull(size))
    }

    fn on_discard_records(
        &mut self,
        _result: &mut dyn BoltResult,
        size: i64,
    ) -> RuntimeResult<bool> {
        self.stream(SinkEvent::Discard(size))
    }

    fn on_metadata(&mut self, key: &str, value: PackStreamValue) {
        self.events
            .lock()
            .push(SinkEvent::Metadata(key.to_string(), value));
    }

    fn mark_ignored(&mut self) {
        self.events.lock().push(SinkEvent::Ignored);
    }

    fn mark_failed(&mut self, error: BoltFailure) {
        self.events.lock().push(SinkEvent::Failed(error));
    }

    fn on_finish(&mut self) {
        self.events.lock().push(SinkEvent::Finish);
    }
}

/// Canned behaviour of [`ScriptedProcessor`]s.
#[derive(Debug, Default)]
pub struct Script {
    /// query -> (fields, rows)
    pub results: HashMap<String, (Vec<String>, Vec<Vec<PackStreamValue>>)>,
    /// query -> error raised by `run`
    pub failures: HashMap<String, RuntimeError>,
    /// Reported once by `validate_transaction`
    pub terminated: Option<Status>,
    /// Databases the provider refuses
    pub unavailable: Vec<String>,
    /// Calls in order, e.g. `run:RETURN 1`, `commit`, `reset`
    pub calls: Vec<String>,
    commits: usize,
}

impl Script {
    pub fn shared() -> Arc<Mutex<Script>> {
        Arc::new(Mutex::new(Script::default()))
    }

    pub fn add_result(&mut self, query: &str, fields: &[&str], rows: Vec<Vec<PackStreamValue>>) {
        self.results.insert(
            query.to_string(),
            (fields.iter().map(|f| f.to_string()).collect(), rows),
        );
    }
}

/// In-memory processor answering from a [`Script`].
pub struct ScriptedProcessor {
    database: String,
    script: Arc<Mutex<Script>>,
    statements: Vec<(i64, RecordBuffer)>,
    in_transaction: bool,
    next_qid: i64,
}

impl ScriptedProcessor {
    pub fn new(database: &str) -> Self {
        Self::with_script(database, Script::shared())
    }

    pub fn with_script(database: &str, script: Arc<Mutex<Script>>) -> Self {
        Self {
            database: database.to_string(),
            script,
            statements: Vec::new(),
            in_transaction: false,
            next_qid: 0,
        }
    }

    pub fn script(&self) -> &Arc<Mutex<Script>> {
        &self.script
    }

    fn log(&self, call: impl Into<String>) {
        self.script.lock().calls.push(call.into());
    }

    fn next_bookmark(&self) -> String {
        let mut script = self.script.lock();
        script.commits += 1;
        format!("{}:{}", self.database, script.commits)
    }
}

impl StatementProcessor for ScriptedProcessor {
    fn database_name(&self) -> Option<&str> {
        Some(&self.database)
    }

    fn begin_transaction(&mut self, _config: TransactionConfig) -> RuntimeResult<()> {
        self.log("begin");
        self.in_transaction = true;
        self.next_qid = 0;
        Ok(())
    }

    fn run(
        &mut self,
        statement: &str,
        _parameters: &HashMap<String, PackStreamValue>,
        _config: Option<TransactionConfig>,
    ) -> RuntimeResult<StatementMetadata> {
        self.log(format!("run:{}", statement));
        let (fields, rows) = {
            let script = self.script.lock();
            if let Some(err) = script.failures.get(statement) {
                return Err(err.clone());
            }
            script.results.get(statement).cloned().unwrap_or_default()
        };

        let qid = if self.in_transaction {
            let qid = self.next_qid;
            self.next_qid += 1;
            qid
        } else {
            self.statements.clear();
            -1
        };
        self.statements
            .push((qid, RecordBuffer::new(fields.clone(), rows)));
        Ok(StatementMetadata::new(fields, qid))
    }

    fn stream_result(
        &mut self,
        qid: i64,
        mode: StreamMode,
        sink: &mut dyn ResultSink,
        size: i64,
    ) -> RuntimeResult<StreamOutcome> {
        let position = if qid < 0 {
            self.statements.len().checked_sub(1)
        } else {
            self.statements.iter().position(|(id, _)| *id == qid)
        };
        let Some(position) = position else {
            return Err(RuntimeError::statement(
                Status::RequestInvalid,
                format!("No open statement with id {}", qid),
            ));
        };

        let result = &mut self.statements[position].1;
        let has_more = match mode {
            StreamMode::Pull => sink.on_pull_records(result, size)?,
            StreamMode::Discard => sink.on_discard_records(result, size)?,
        };
        self.log(match mode {
            StreamMode::Pull => "pull",
            StreamMode::Discard => "discard",
        });

        let mut outcome = StreamOutcome {
            has_more,
            bookmark: None,
        };
        if !has_more {
            self.statements.remove(position);
            if !self.in_transaction {
                outcome.bookmark = Some(self.next_bookmark());
            }
        }
        Ok(outcome)
    }

    fn commit_transaction(&mut self) -> RuntimeResult<String> {
        self.log("commit");
        if !self.in_transaction {
            return Err(RuntimeError::statement(
                Status::TransactionNotFound,
                "No transaction to commit",
            ));
        }
        self.in_transaction = false;
        self.statements.clear();
        Ok(self.next_bookmark())
    }

    fn rollback_transaction(&mut self) -> RuntimeResult<()> {
        self.log("rollback");
        self.in_transaction = false;
        self.statements.clear();
        Ok(())
    }

    fn reset(&mut self) -> RuntimeResult<()> {
        self.log("reset");
        self.in_transaction = false;
        self.statements.clear();
        Ok(())
    }

    fn mark_current_transaction_for_termination(&mut self) {
        self.log("terminate");
    }

    fn has_transaction(&self) -> bool {
        self.in_transaction
    }

    fn has_open_statement(&self) -> bool {
        !self.statements.is_empty()
    }

    fn validate_transaction(&mut self) -> Option<Status> {
        self.script.lock().terminated.take()
    }
}

/// Provider handing out [`ScriptedProcessor`]s over one shared script.
pub struct ScriptedProvider {
    script: Arc<Mutex<Script>>,
}

impl ScriptedProvider {
    pub fn new(script: Arc<Mutex<Script>>) -> Self {
        Self { script }
    }
}

impl StatementProcessorProvider for ScriptedProvider {
    fn processor_for(&mut self, database: &str) -> RuntimeResult<Box<dyn StatementProcessor>> {
        if self.script.lock().unavailable.iter().any(|db| db == database) {
            return Err(RuntimeError::statement(
                Status::DatabaseUnavailable,
                format!("Database '{}' is unavailable", database),
            ));
        }
        Ok(Box::new(ScriptedProcessor::with_script(
            database,
            Arc::clone(&self.script),
        )))
    }
}
