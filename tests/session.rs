//! End-to-end session tests against a scripted model provider
//!
//! The provider replays canned root-model responses, so these exercise the
//! full loop (parse, execute, feed back, terminate) without a live endpoint.
//! The execution environment still needs a python3 on PATH; tests skip
//! gracefully when it is absent.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::Arc;

use async_trait::async_trait;
use rlm::core::{Config, ContextPayload, Message, Result, RlmError};
use rlm::llm::{GenerateOptions, LlmProvider, LlmResponse};
use rlm::{RlmAgent, Tracer};

const ROOT_MODEL: &str = "mock-root";
const SUB_MODEL: &str = "mock-sub";

/// Replays scripted root responses; sub calls always get the same reply
struct MockProvider {
    root: Mutex<VecDeque<String>>,
    sub_reply: String,
}

impl MockProvider {
    fn new(root_responses: &[&str]) -> Self {
        Self {
            root: Mutex::new(root_responses.iter().map(|s| s.to_string()).collect()),
            sub_reply: "scripted sub answer".to_string(),
        }
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    async fn chat(
        &self,
        model: &str,
        _messages: &[Message],
        _options: Option<GenerateOptions>,
    ) -> Result<LlmResponse> {
        let content = if model == SUB_MODEL {
            self.sub_reply.clone()
        } else {
            self.root
                .lock()
                .expect("mock lock")
                .pop_front()
                .ok_or_else(|| RlmError::endpoint("mock script exhausted"))?
        };
        Ok(LlmResponse {
            content,
            usage: None,
            model: model.to_string(),
        })
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        Ok(vec![ROOT_MODEL.to_string(), SUB_MODEL.to_string()])
    }

    fn name(&self) -> &str {
        "mock"
    }
}

fn python_available() -> bool {
    std::process::Command::new("python3")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.models.root = ROOT_MODEL.to_string();
    config.models.sub = SUB_MODEL.to_string();
    config.trace.enabled = false;
    config
}

fn agent_with(responses: &[&str]) -> RlmAgent {
    RlmAgent::with_tracer(test_config(), Arc::new(MockProvider::new(responses)), None)
}

#[tokio::test]
async fn test_literal_final_answer_ends_session() {
    if !python_available() {
        eprintln!("skipping: python3 not available");
        return;
    }
    let mut agent = agent_with(&["I know this one.\nFINAL(the answer is 7)"]);

    let answer = agent
        .run_session(ContextPayload::from("irrelevant"), "what is it?")
        .await
        .unwrap();

    assert_eq!(answer, "the answer is 7");
    let summary = agent.cost_summary().await;
    assert_eq!(summary.root_calls, 1);
    assert_eq!(summary.sub_calls, 0);
}

#[tokio::test]
async fn test_final_var_returns_environment_variable() {
    if !python_available() {
        eprintln!("skipping: python3 not available");
        return;
    }
    let mut agent = agent_with(&[
        "Let me extract it.\n```repl\nanswer = context.split()[-1]\n```",
        "FINAL_VAR(answer)",
    ]);

    let answer = agent
        .run_session(
            ContextPayload::from("the magic number is 42"),
            "what is the magic number?",
        )
        .await
        .unwrap();

    assert_eq!(answer, "42");

    // The executed snippet was fed back as a synthesized user message
    let session = agent.session().expect("session kept");
    assert!(session
        .messages
        .iter()
        .any(|m| m.role == "user" && m.content.starts_with("Code executed:")));
    assert!(session.is_done());
}

#[tokio::test]
async fn test_dangling_final_var_continues_iterating() {
    if !python_available() {
        eprintln!("skipping: python3 not available");
        return;
    }
    let mut agent = agent_with(&["FINAL_VAR(never_defined)", "FINAL(recovered)"]);

    let answer = agent
        .run_session(ContextPayload::from("ctx"), "q")
        .await
        .unwrap();

    assert_eq!(answer, "recovered");
    assert_eq!(agent.cost_summary().await.root_calls, 2);
}

#[tokio::test]
async fn test_budget_exhaustion_forces_final_turn() {
    if !python_available() {
        eprintln!("skipping: python3 not available");
        return;
    }
    // One loop turn plus the forced turn
    let mut config = test_config();
    config.agent.max_iterations = 1;
    let mut agent = RlmAgent::with_tracer(
        config,
        Arc::new(MockProvider::new(&[
            "still thinking, no marker",
            "here is my best answer",
        ])),
        None,
    );

    let answer = agent
        .run_session(ContextPayload::from("ctx"), "q")
        .await
        .unwrap();

    // Forced turn is returned raw, even though it carries no marker
    assert_eq!(answer, "here is my best answer");
    assert_eq!(agent.cost_summary().await.root_calls, 2);
}

#[tokio::test]
async fn test_marker_shaped_variable_is_picked_up() {
    if !python_available() {
        eprintln!("skipping: python3 not available");
        return;
    }
    let mut agent = agent_with(&["```repl\nwrapped = 'FINAL(from variable)'\n```"]);

    let answer = agent
        .run_session(ContextPayload::from("ctx"), "q")
        .await
        .unwrap();

    assert_eq!(answer, "from variable");
    assert_eq!(agent.cost_summary().await.root_calls, 1);
}

#[tokio::test]
async fn test_llm_query_charges_sub_class() {
    if !python_available() {
        eprintln!("skipping: python3 not available");
        return;
    }
    let mut agent = agent_with(&[
        "```repl\nres = llm_query('summarize the context')\n```\nFINAL_VAR(res)",
    ]);

    let answer = agent
        .run_session(ContextPayload::from("a long document"), "summarize")
        .await
        .unwrap();

    assert_eq!(answer, "scripted sub answer");

    let summary = agent.cost_summary().await;
    assert_eq!(summary.root_calls, 1);
    assert_eq!(summary.sub_calls, 1);
    assert!((summary.total_cost - (summary.root_cost + summary.sub_cost)).abs() < 1e-12);
}

#[tokio::test]
async fn test_chunked_context_round() {
    if !python_available() {
        eprintln!("skipping: python3 not available");
        return;
    }
    let mut agent = agent_with(&[
        "```repl\njoined = ' '.join(context)\nprint(len(context))\n```",
        "FINAL_VAR(joined)",
    ]);

    let chunks = vec!["alpha".to_string(), "beta".to_string()];
    let answer = agent
        .run_session(ContextPayload::from(chunks), "join the chunks")
        .await
        .unwrap();

    assert_eq!(answer, "alpha beta");
}

#[tokio::test]
async fn test_trace_file_gets_one_entry_per_turn() {
    if !python_available() {
        eprintln!("skipping: python3 not available");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let tracer = Tracer::new(dir.path()).unwrap();
    let trace_path = tracer.path().clone();

    let mut agent = RlmAgent::with_tracer(
        test_config(),
        Arc::new(MockProvider::new(&[
            "no marker this turn",
            "FINAL(done)",
        ])),
        Some(tracer),
    );

    agent
        .run_session(ContextPayload::from("ctx"), "q")
        .await
        .unwrap();

    let content = std::fs::read_to_string(trace_path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    let last: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
    assert_eq!(last["final_answer"], "done");
    assert_eq!(last["turn"], 1);
}

#[tokio::test]
async fn test_model_failure_keeps_session_inspectable() {
    if !python_available() {
        eprintln!("skipping: python3 not available");
        return;
    }
    // Empty script: the very first root call fails
    let mut agent = agent_with(&[]);

    let result = agent.run_session(ContextPayload::from("ctx"), "q").await;
    assert!(result.is_err());

    let session = agent.session().expect("partial session kept");
    assert!(!session.is_done());
    // System message was already in place before the failing call
    assert!(session.messages.iter().any(|m| m.role == "system"));
}

#[tokio::test]
async fn test_reset_clears_ledger_and_session() {
    if !python_available() {
        eprintln!("skipping: python3 not available");
        return;
    }
    let mut agent = agent_with(&["FINAL(first)"]);
    agent
        .run_session(ContextPayload::from("ctx"), "q")
        .await
        .unwrap();
    assert!(agent.session().is_some());

    agent.reset().await;
    assert!(agent.session().is_none());
    assert_eq!(agent.cost_summary().await.root_calls, 0);
}
