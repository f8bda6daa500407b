//! rlm - Recursive Language Model agent
//!
//! Answers queries over long contexts by driving a root model through a
//! persistent Python REPL. The context lives inside the REPL as a variable;
//! the model only sees its metadata and works on it in chunks, recursively
//! querying a sub model from within its own code.
//!
//! # Architecture
//!
//! - **Core**: Shared types, configuration, and error handling
//! - **LLM**: Provider abstraction, OpenAI-compatible client, price table
//! - **REPL**: Persistent execution environment with the llm_query primitive
//! - **Agent**: Iteration controller, protocol parser, cost ledger
//! - **Trace**: Per-session JSONL turn log
//! - **CLI**: Command-line interface and interactive shell
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use rlm::llm::OpenAiClient;
//! use rlm::{Config, ContextPayload, RlmAgent};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::load();
//!     let provider = Arc::new(OpenAiClient::from_config(&config));
//!     let mut agent = RlmAgent::new(config, provider).unwrap();
//!
//!     let context = ContextPayload::from("the magic number is 42");
//!     let answer = agent.run_session(context, "What is the magic number?").await.unwrap();
//!     println!("{}", answer);
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod core;
pub mod llm;
pub mod repl;
pub mod trace;

// Re-export commonly used items
pub use agent::{CostSummary, RlmAgent};
pub use cli::Shell;
pub use core::{Config, ContextPayload, Result, RlmError};
pub use trace::Tracer;
