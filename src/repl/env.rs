//! REPL environment with support for recursive LLM calls
//!
//! Owns one persistent interpreter child process per session. Context is
//! stored as an in-memory variable inside the environment, not passed to the
//! model directly. Snippet failures degrade to diagnostic text in the
//! result; they never abort the session.

use std::collections::BTreeMap;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;

use crate::core::config::ReplConfig;
use crate::core::{ContextPayload, Result, RlmError};
use crate::repl::runner::PYTHON_RUNNER;

/// Handler for `llm_query` calls issued from inside a snippet
#[async_trait]
pub trait SubModelHandler: Send + Sync {
    /// Answer one sub-model prompt
    async fn query(&self, prompt: &str) -> Result<String>;
}

/// Summary of one variable in the environment's store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableInfo {
    /// Python type name
    #[serde(rename = "type")]
    pub type_name: String,
    /// Length of the value where it has one
    #[serde(default)]
    pub length: Option<u64>,
    /// Truncated repr of the value
    pub preview: String,
}

/// Result from one snippet execution
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// Captured standard output
    pub stdout: String,
    /// Captured error/diagnostic text
    pub stderr: String,
    /// Snapshot of the variable store after the call
    pub variables: BTreeMap<String, VariableInfo>,
    /// Elapsed wall time
    pub duration: Duration,
}

impl ExecutionResult {
    /// A result carrying only a diagnostic, used when the environment itself
    /// failed rather than the snippet
    fn diagnostic(message: String) -> Self {
        Self {
            stdout: String::new(),
            stderr: message,
            variables: BTreeMap::new(),
            duration: Duration::ZERO,
        }
    }
}

/// Events emitted by the runner process
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RunnerEvent {
    LlmQuery {
        prompt: String,
    },
    ExecResult {
        #[serde(default)]
        stdout: String,
        #[serde(default)]
        stderr: String,
        #[serde(default)]
        variables: BTreeMap<String, VariableInfo>,
        #[serde(default)]
        duration_ms: f64,
    },
    LookupResult {
        found: bool,
        #[serde(default)]
        value: Option<String>,
    },
    ScanResult {
        #[serde(default)]
        answer: Option<String>,
    },
    Error {
        error: String,
    },
}

/// Pipe handles for the runner child process
struct ReplSession {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl ReplSession {
    async fn send_json<T: Serialize>(&mut self, value: &T) -> Result<()> {
        let mut line = serde_json::to_vec(value)?;
        line.push(b'\n');
        self.stdin.write_all(&line).await?;
        self.stdin.flush().await?;
        Ok(())
    }

    async fn read_event(&mut self) -> Result<RunnerEvent> {
        let mut line = String::new();
        let read = self.stdout.read_line(&mut line).await?;
        if read == 0 {
            return Err(RlmError::repl("interpreter exited unexpectedly"));
        }
        serde_json::from_str(line.trim()).map_err(|e| {
            RlmError::repl(format!(
                "invalid message from interpreter: {}; raw={}",
                e,
                line.trim()
            ))
        })
    }
}

impl Drop for ReplSession {
    fn drop(&mut self) {
        self.child.start_kill().ok();
    }
}

/// Persistent execution environment for one session
pub struct ReplEnv {
    /// Calls serialize behind this lock; one snippet executes at a time
    session: Mutex<ReplSession>,
    /// Handler for sub-model calls issued from snippets
    handler: Arc<dyn SubModelHandler>,
    /// Private scratch directory, the child's working directory; released
    /// when the environment is dropped
    scratch: TempDir,
}

impl ReplEnv {
    /// Spawn the runner process and wire up the snippet primitives
    pub async fn new(config: &ReplConfig, handler: Arc<dyn SubModelHandler>) -> Result<Self> {
        let scratch = tempfile::Builder::new()
            .prefix("rlm_repl_")
            .tempdir()
            .map_err(|e| RlmError::repl(format!("failed to create scratch dir: {}", e)))?;

        let mut parts = config.python_command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| RlmError::repl("empty python command"))?;

        let mut command = Command::new(program);
        command.args(parts);
        command
            .arg("-u")
            .arg("-c")
            .arg(PYTHON_RUNNER)
            .current_dir(scratch.path())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        let mut child = command.spawn().map_err(|e| {
            RlmError::repl(format!(
                "failed to spawn interpreter `{}`: {}",
                config.python_command, e
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| RlmError::repl("failed to capture interpreter stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RlmError::repl("failed to capture interpreter stdout"))?;

        let mut session = ReplSession {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        };
        session.send_json(&json!({"type": "init"})).await?;

        Ok(Self {
            session: Mutex::new(session),
            handler,
            scratch,
        })
    }

    /// Seed the `context` variable by materializing the payload into the
    /// scratch directory and loading it through a snippet
    pub async fn initialize(&self, context: &ContextPayload) -> Result<()> {
        let load_code = match context {
            ContextPayload::Text(text) => {
                let path = self.scratch.path().join("context.txt");
                tokio::fs::write(&path, text).await?;
                format!(
                    "with open(r'{}', 'r') as f:\n    context = f.read()\n",
                    path.display()
                )
            }
            ContextPayload::Chunks(_) | ContextPayload::Structured(_) => {
                let rendered = match context {
                    ContextPayload::Chunks(chunks) => serde_json::to_string_pretty(chunks)?,
                    ContextPayload::Structured(value) => serde_json::to_string_pretty(value)?,
                    ContextPayload::Text(_) => unreachable!(),
                };
                let path = self.scratch.path().join("context.json");
                tokio::fs::write(&path, rendered).await?;
                format!(
                    "import json\nwith open(r'{}', 'r') as f:\n    context = json.load(f)\n",
                    path.display()
                )
            }
        };

        let result = self.execute(&load_code).await;
        if !result.stderr.is_empty() {
            return Err(RlmError::repl(format!(
                "failed to load context: {}",
                result.stderr
            )));
        }
        if !result.variables.contains_key("context") {
            return Err(RlmError::repl("context variable missing after load"));
        }
        Ok(())
    }

    /// Execute one snippet
    ///
    /// Never fails the session: environment-level failures degrade to a
    /// diagnostic result just like snippet errors do.
    pub async fn execute(&self, code: &str) -> ExecutionResult {
        match self.try_execute(code).await {
            Ok(result) => result,
            Err(e) => ExecutionResult::diagnostic(format!("REPL environment failure: {}", e)),
        }
    }

    async fn try_execute(&self, code: &str) -> Result<ExecutionResult> {
        let mut session = self.session.lock().await;
        session
            .send_json(&json!({"type": "exec", "code": code}))
            .await?;

        loop {
            match session.read_event().await? {
                RunnerEvent::LlmQuery { prompt } => {
                    let reply = match self.handler.query(&prompt).await {
                        Ok(value) => json!({"type": "llm_result", "ok": true, "value": value}),
                        Err(e) => {
                            json!({"type": "llm_result", "ok": false, "error": e.to_string()})
                        }
                    };
                    session.send_json(&reply).await?;
                }
                RunnerEvent::ExecResult {
                    stdout,
                    stderr,
                    variables,
                    duration_ms,
                } => {
                    return Ok(ExecutionResult {
                        stdout,
                        stderr,
                        variables,
                        duration: Duration::from_secs_f64(duration_ms / 1000.0),
                    });
                }
                RunnerEvent::Error { error } => return Err(RlmError::repl(error)),
                other => {
                    return Err(RlmError::repl(format!(
                        "unexpected interpreter event: {:?}",
                        other
                    )));
                }
            }
        }
    }

    /// Look up a variable by name, returning its string form
    pub async fn lookup(&self, name: &str) -> Result<Option<String>> {
        let mut session = self.session.lock().await;
        session
            .send_json(&json!({"type": "lookup", "name": name}))
            .await?;

        match session.read_event().await? {
            RunnerEvent::LookupResult { found: true, value } => Ok(value),
            RunnerEvent::LookupResult { found: false, .. } => Ok(None),
            other => Err(RlmError::repl(format!(
                "unexpected interpreter event: {:?}",
                other
            ))),
        }
    }

    /// Scan the variable store for a string shaped like `FINAL(...)`
    ///
    /// Heuristic fallback for models that write the termination marker into
    /// a variable instead of emitting it; can collide with data that merely
    /// matches the shape.
    pub async fn scan_final(&self) -> Result<Option<String>> {
        let mut session = self.session.lock().await;
        session.send_json(&json!({"type": "scan_final"})).await?;

        match session.read_event().await? {
            RunnerEvent::ScanResult { answer } => Ok(answer),
            other => Err(RlmError::repl(format!(
                "unexpected interpreter event: {:?}",
                other
            ))),
        }
    }
}
