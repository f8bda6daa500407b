//! JSONL session tracer
//!
//! Appends one structured entry per turn to a per-session file. Entries are
//! written, never read back; downstream tooling consumes the files. The
//! tracer is handed to the agent at construction so tests can run sessions
//! against distinct sinks or none at all.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use chrono::Local;
use serde::Serialize;

use crate::agent::CostSummary;
use crate::core::config::TraceConfig;
use crate::core::{Message, Result, RlmError};
use crate::repl::ExecutionResult;

/// One executed snippet's effects, flattened for the trace file
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionTrace {
    pub stdout: String,
    pub stderr: String,
    /// Names bound in the environment after the call
    pub variables: Vec<String>,
    pub duration_ms: u64,
}

impl From<&ExecutionResult> for ExecutionTrace {
    fn from(result: &ExecutionResult) -> Self {
        Self {
            stdout: result.stdout.clone(),
            stderr: result.stderr.clone(),
            variables: result.variables.keys().cloned().collect(),
            duration_ms: result.duration.as_millis() as u64,
        }
    }
}

/// One turn of a session
#[derive(Debug, Clone, Serialize)]
pub struct TraceEntry {
    pub timestamp: String,
    pub session_id: String,
    pub turn: usize,
    /// Conversation log as of the end of the turn
    pub messages: Vec<Message>,
    /// Raw root-model response
    pub response: String,
    pub code_blocks: Vec<String>,
    pub execution_results: Vec<ExecutionTrace>,
    /// Ledger totals as of the end of the turn
    pub cost: CostSummary,
    pub final_answer: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorEntry<'a> {
    timestamp: String,
    session_id: &'a str,
    turn: usize,
    error: &'a str,
}

/// Append-only JSONL sink for one session
#[derive(Debug, Clone)]
pub struct Tracer {
    path: PathBuf,
    session_id: String,
}

impl Tracer {
    /// Create a tracer writing under the given directory
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|e| RlmError::Trace(format!("failed to create trace dir: {}", e)))?;

        let session_id = Local::now().format("%Y%m%d_%H%M%S_%6f").to_string();
        let path = dir.join(format!("rlm_trace_{}.jsonl", session_id));

        Ok(Self { path, session_id })
    }

    /// Build a tracer per config, `None` when tracing is disabled
    pub fn from_config(config: &TraceConfig) -> Result<Option<Self>> {
        if !config.enabled {
            return Ok(None);
        }
        Self::new(config.dir.clone()).map(Some)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Append one turn entry
    pub fn log_turn(&self, entry: &TraceEntry) -> Result<()> {
        self.append(entry)
    }

    /// Append an error record for a turn that failed fatally
    pub fn log_error(&self, turn: usize, error: &str) -> Result<()> {
        self.append(&ErrorEntry {
            timestamp: Local::now().to_rfc3339(),
            session_id: &self.session_id,
            turn,
            error,
        })
    }

    fn append<T: Serialize>(&self, record: &T) -> Result<()> {
        let line = serde_json::to_string(record)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| RlmError::Trace(format!("failed to open trace file: {}", e)))?;
        writeln!(file, "{}", line)
            .map_err(|e| RlmError::Trace(format!("failed to write trace entry: {}", e)))?;
        Ok(())
    }
}
