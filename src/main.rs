//! rlm - recursive language model agent
//!
//! Main entry point for the CLI application.

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use rlm::cli::load_context_file;
use rlm::core::ContextPayload;
use rlm::llm::OpenAiClient;
use rlm::{Config, RlmAgent, Shell};

/// rlm - answer queries over long contexts through a recursive REPL agent
#[derive(Parser, Debug)]
#[command(name = "rlm")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Context file (.txt or .json); use '-' to read from stdin
    #[arg(long, short = 'c')]
    context: Option<String>,

    /// Query to answer (non-interactive mode)
    #[arg(long, short = 'q')]
    query: Option<String>,

    /// Root model driving the iteration loop
    #[arg(long)]
    root_model: Option<String>,

    /// Sub model used for recursive llm_query calls
    #[arg(long)]
    sub_model: Option<String>,

    /// Maximum iterations before the forced final turn
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Enable debug output
    #[arg(long, short = 'd')]
    debug: bool,

    /// Disable JSONL trace logging
    #[arg(long)]
    no_trace: bool,
}

fn read_context(arg: &str) -> anyhow::Result<ContextPayload> {
    if arg == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        // Stdin may carry JSON too
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(&buffer) {
            if !matches!(value, serde_json::Value::Number(_) | serde_json::Value::Bool(_)) {
                return Ok(ContextPayload::from_json(value));
            }
        }
        Ok(ContextPayload::Text(buffer))
    } else {
        Ok(load_context_file(PathBuf::from(arg))?)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Build configuration
    let mut config = Config::load();

    // Apply CLI overrides
    if let Some(ref root) = args.root_model {
        config.models.root = root.clone();
    }

    if let Some(ref sub) = args.sub_model {
        config.models.sub = sub.clone();
    }

    if let Some(max_iterations) = args.max_iterations {
        config.agent.max_iterations = max_iterations;
    }

    if args.debug {
        config.agent.debug = true;
    }

    if args.no_trace {
        config.trace.enabled = false;
    }

    // Single query mode
    if let Some(query) = args.query {
        let context_arg = args
            .context
            .ok_or_else(|| anyhow::anyhow!("--query requires --context"))?;
        let context = read_context(&context_arg)?;

        let provider = Arc::new(OpenAiClient::from_config(&config));
        let mut agent = RlmAgent::new(config, provider)?;

        let answer = agent.run_session(context, &query).await?;
        println!("{}", answer);

        let summary = agent.cost_summary().await;
        eprintln!(
            "cost: ${:.4} ({} root calls, {} sub calls)",
            summary.total_cost, summary.root_calls, summary.sub_calls
        );
        return Ok(());
    }

    // Interactive shell mode
    let mut shell = Shell::with_config(config)?;
    if let Some(context_arg) = args.context {
        let context = read_context(&context_arg)?;
        shell.set_context(context, Some(context_arg));
    }
    shell.run().await?;

    Ok(())
}
