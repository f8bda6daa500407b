//! Iteration controller
//!
//! Drives the root model through the turn loop: instruct, parse, execute
//! snippets, feed results back, and stop on a final-answer marker. The
//! context itself never enters the conversation log; the model reaches it
//! through the execution environment.

use std::sync::Arc;

use chrono::Local;
use tokio::sync::Mutex;

use crate::agent::ledger::{CostLedger, CostSummary};
use crate::agent::parser::{self, FinalMarker};
use crate::agent::prompts;
use crate::agent::session::{Session, SessionState};
use crate::agent::sub_model::SubModelInvoker;
use crate::core::{CallClass, Config, ContextPayload, Message, Result};
use crate::llm::{pricing, GenerateOptions, LlmProvider};
use crate::repl::{ExecutionResult, ReplEnv};
use crate::trace::{TraceEntry, Tracer};

/// The agent: one controller instance runs one session at a time and can be
/// reset for reuse
pub struct RlmAgent {
    config: Config,
    provider: Arc<dyn LlmProvider>,
    ledger: Arc<Mutex<CostLedger>>,
    tracer: Option<Tracer>,
    /// Log of the most recent session, kept for inspection even after a
    /// fatal model-call failure
    session: Option<Session>,
}

impl RlmAgent {
    /// Create an agent, wiring the tracer from config
    pub fn new(config: Config, provider: Arc<dyn LlmProvider>) -> Result<Self> {
        let tracer = Tracer::from_config(&config.trace)?;
        Ok(Self::with_tracer(config, provider, tracer))
    }

    /// Create an agent with an explicit tracer sink
    pub fn with_tracer(
        config: Config,
        provider: Arc<dyn LlmProvider>,
        tracer: Option<Tracer>,
    ) -> Self {
        Self {
            config,
            provider,
            ledger: Arc::new(Mutex::new(CostLedger::new())),
            tracer,
            session: None,
        }
    }

    /// Run one full session: load the context, iterate until a final answer
    /// or the iteration budget runs out, and return the answer
    pub async fn run_session(
        &mut self,
        context: ContextPayload,
        query: &str,
    ) -> Result<String> {
        let mut session = Session::new(query);
        let result = self.drive(&mut session, &context).await;

        match &result {
            Ok(answer) => session.finish(answer.clone()),
            Err(e) => {
                if let Some(tracer) = &self.tracer {
                    if let Err(trace_err) = tracer.log_error(session.turn, &e.to_string()) {
                        self.debug_print(&format!("trace write failed: {}", trace_err));
                    }
                }
            }
        }
        self.session = Some(session);

        result
    }

    async fn drive(&self, session: &mut Session, context: &ContextPayload) -> Result<String> {
        let root_model = self.config.models.root.clone();

        let handler = Arc::new(SubModelInvoker::new(
            self.provider.clone(),
            self.config.models.sub.clone(),
            self.ledger.clone(),
            self.generate_options(),
        ));
        let env = ReplEnv::new(&self.config.repl, handler).await?;
        env.initialize(context).await?;

        session
            .messages
            .push(prompts::system_message(&root_model, &context.metadata()));
        session.state = SessionState::Iterating;

        for iteration in 0..self.config.agent.max_iterations {
            session.turn = iteration;

            // The per-turn instruction rides along with the call but is not
            // persisted into the log
            let mut call_messages = session.messages.clone();
            call_messages.push(prompts::next_action_prompt(&session.query, iteration));

            let response = self.call_root(&root_model, &call_messages).await?;
            self.debug_print(&format!("turn {} response: {}", iteration, response));

            let parsed = parser::parse(&response);

            let mut exec_results = Vec::new();
            if parsed.code_blocks.is_empty() {
                session
                    .messages
                    .push(Message::assistant(format!("You responded with:\n{}", response)));
            } else {
                for code in &parsed.code_blocks {
                    let result = env.execute(code).await;
                    let formatted =
                        format_result(&result, self.config.agent.max_output_chars);
                    session.messages.push(Message::user(format!(
                        "Code executed:\n```python\n{}\n```\n\nREPL output:\n{}",
                        code, formatted
                    )));
                    exec_results.push(result);
                }
            }

            let mut final_answer = match &parsed.final_marker {
                Some(FinalMarker::Literal(text)) => Some(text.clone()),
                // A dangling variable reference means no answer this turn
                Some(FinalMarker::Variable(name)) => env.lookup(name).await.ok().flatten(),
                None => None,
            };
            if final_answer.is_none() {
                final_answer = env.scan_final().await.ok().flatten();
            }

            self.trace_turn(
                session,
                iteration,
                &response,
                &parsed.code_blocks,
                &exec_results,
                final_answer.as_deref(),
            )
            .await;

            if let Some(answer) = final_answer {
                return Ok(answer);
            }
        }

        // Budget exhausted: one forced final turn, returned raw
        session.turn = self.config.agent.max_iterations;
        session.messages.push(prompts::forced_final_prompt());

        let response = self.call_root(&root_model, &session.messages).await?;
        session.messages.push(Message::assistant(response.clone()));

        self.trace_turn(
            session,
            self.config.agent.max_iterations,
            &response,
            &[],
            &[],
            Some(&response),
        )
        .await;

        Ok(response)
    }

    async fn call_root(&self, model: &str, messages: &[Message]) -> Result<String> {
        let response = self
            .provider
            .chat(model, messages, Some(self.generate_options()))
            .await?;

        let record = pricing::cost_of_call(model, messages, &response);
        self.ledger.lock().await.record(CallClass::Root, &record);

        Ok(response.content)
    }

    fn generate_options(&self) -> GenerateOptions {
        GenerateOptions {
            temperature: Some(self.config.agent.temperature),
            max_tokens: Some(self.config.agent.max_tokens),
            stop: None,
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn trace_turn(
        &self,
        session: &Session,
        turn: usize,
        response: &str,
        code_blocks: &[String],
        exec_results: &[ExecutionResult],
        final_answer: Option<&str>,
    ) {
        let Some(tracer) = &self.tracer else {
            return;
        };

        let entry = TraceEntry {
            timestamp: Local::now().to_rfc3339(),
            session_id: tracer.session_id().to_string(),
            turn,
            messages: session.messages.clone(),
            response: response.to_string(),
            code_blocks: code_blocks.to_vec(),
            execution_results: exec_results.iter().map(Into::into).collect(),
            cost: self.ledger.lock().await.summary(),
            final_answer: final_answer.map(str::to_string),
        };

        if let Err(e) = tracer.log_turn(&entry) {
            self.debug_print(&format!("trace write failed: {}", e));
        }
    }

    /// Ledger totals so far
    pub async fn cost_summary(&self) -> CostSummary {
        self.ledger.lock().await.summary()
    }

    /// The most recent session's log, if any
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Clear all mutable state so the same agent can run a new session
    pub async fn reset(&mut self) {
        self.ledger.lock().await.reset();
        self.session = None;
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn set_root_model(&mut self, model: impl Into<String>) {
        self.config.models.root = model.into();
    }

    pub fn set_sub_model(&mut self, model: impl Into<String>) {
        self.config.models.sub = model.into();
    }

    pub fn set_debug(&mut self, enabled: bool) {
        self.config.agent.debug = enabled;
    }

    /// List models known to the endpoint
    pub async fn list_models(&self) -> Result<Vec<String>> {
        self.provider.list_models().await
    }

    fn debug_print(&self, content: &str) {
        if self.config.agent.debug {
            eprintln!("DEBUG agent: {}", content);
        }
    }
}

/// Render one execution result the way it is shown to the root model
fn format_result(result: &ExecutionResult, max_chars: usize) -> String {
    let mut sections = Vec::new();

    if !result.stdout.trim().is_empty() {
        sections.push(result.stdout.trim_end().to_string());
    }
    if !result.stderr.trim().is_empty() {
        sections.push(format!("Error: {}", result.stderr.trim_end()));
    }
    if !result.variables.is_empty() {
        let names: Vec<&str> = result.variables.keys().map(String::as_str).collect();
        sections.push(format!("REPL variables: [{}]", names.join(", ")));
    }

    let mut text = if sections.is_empty() {
        "No output".to_string()
    } else {
        sections.join("\n")
    };

    if text.chars().count() > max_chars {
        let kept: String = text.chars().take(max_chars).collect();
        text = format!(
            "{}\n... [output truncated at {} characters]",
            kept, max_chars
        );
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repl::VariableInfo;
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn result(stdout: &str, stderr: &str, names: &[&str]) -> ExecutionResult {
        let mut variables = BTreeMap::new();
        for name in names {
            variables.insert(
                name.to_string(),
                VariableInfo {
                    type_name: "str".to_string(),
                    length: Some(1),
                    preview: "'x'".to_string(),
                },
            );
        }
        ExecutionResult {
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            variables,
            duration: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_format_stdout_and_variables() {
        let text = format_result(&result("hello\n", "", &["a", "b"]), 1000);
        assert!(text.starts_with("hello"));
        assert!(text.contains("REPL variables: [a, b]"));
    }

    #[test]
    fn test_format_error_section() {
        let text = format_result(&result("", "ValueError: boom", &[]), 1000);
        assert_eq!(text, "Error: ValueError: boom");
    }

    #[test]
    fn test_format_no_output() {
        let text = format_result(&result("", "", &[]), 1000);
        assert_eq!(text, "No output");
    }

    #[test]
    fn test_format_truncates_long_output() {
        let long = "x".repeat(500);
        let text = format_result(&result(&long, "", &[]), 100);
        assert!(text.contains("... [output truncated at 100 characters]"));
        assert!(text.len() < 200);
    }
}
