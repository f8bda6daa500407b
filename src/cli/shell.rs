//! Interactive shell
//!
//! Load a context file, then ask queries against it. Each query runs one
//! full agent session; the cost ledger accumulates across queries until
//! reset.

use std::io::{self, BufRead, Write};
use std::path::Path;

use crate::agent::RlmAgent;
use crate::cli::commands::{handle_command, CommandResult};
use crate::core::{Config, ContextPayload, Result, RlmError};
use crate::llm::OpenAiClient;

/// Read a context payload from a file
///
/// `.json` files are decoded (strings, string arrays, and message lists get
/// their natural shapes); everything else is loaded as raw text.
pub fn load_context_file(path: impl AsRef<Path>) -> Result<ContextPayload> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .map_err(|e| RlmError::config(format!("failed to read {}: {}", path.display(), e)))?;

    if path.extension().map(|ext| ext == "json").unwrap_or(false) {
        let value: serde_json::Value = serde_json::from_str(&content)
            .map_err(|e| RlmError::config(format!("invalid JSON in {}: {}", path.display(), e)))?;
        Ok(ContextPayload::from_json(value))
    } else {
        Ok(ContextPayload::Text(content))
    }
}

/// Interactive shell around one agent
pub struct Shell {
    agent: RlmAgent,
    context: Option<ContextPayload>,
    context_path: Option<String>,
}

impl Shell {
    /// Create a shell with custom configuration
    pub fn with_config(config: Config) -> Result<Self> {
        let provider = std::sync::Arc::new(OpenAiClient::from_config(&config));
        let agent = RlmAgent::new(config, provider)?;
        Ok(Self {
            agent,
            context: None,
            context_path: None,
        })
    }

    /// Preload a context before entering the loop
    pub fn set_context(&mut self, context: ContextPayload, path: Option<String>) {
        self.context = Some(context);
        self.context_path = path;
    }

    /// Run the shell until exit
    pub async fn run(&mut self) -> Result<()> {
        self.print_banner();

        let stdin = io::stdin();
        let mut stdout = io::stdout();

        loop {
            print!("query> ");
            stdout.flush()?;

            let mut input = String::new();
            match stdin.lock().read_line(&mut input) {
                Ok(0) => {
                    // EOF (Ctrl+D)
                    println!("\nGoodbye!");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    eprintln!("Error reading input: {}", e);
                    continue;
                }
            }

            let input = input.trim();
            if input.is_empty() {
                continue;
            }

            match handle_command(input, &mut self.agent).await {
                Ok(CommandResult::Exit) => {
                    println!("\nGoodbye!");
                    break;
                }
                Ok(CommandResult::Reset) => {
                    self.agent.reset().await;
                    println!("Session and cost ledger cleared.\n");
                }
                Ok(CommandResult::Handled(output)) => {
                    println!("{}\n", output);
                }
                Ok(CommandResult::LoadContext(path)) => match load_context_file(&path) {
                    Ok(context) => {
                        let meta = context.metadata();
                        println!(
                            "Loaded {} ({}, {} chars, {} chunks)\n",
                            path,
                            meta.type_name,
                            meta.total_length,
                            meta.chunk_lengths.len()
                        );
                        self.set_context(context, Some(path));
                    }
                    Err(e) => eprintln!("Failed to load context: {}\n", e),
                },
                Ok(CommandResult::Continue(query)) => {
                    let Some(context) = self.context.clone() else {
                        println!("No context loaded. Use: context <path>\n");
                        continue;
                    };
                    match self.agent.run_session(context, &query).await {
                        Ok(answer) => {
                            let summary = self.agent.cost_summary().await;
                            println!("\nAnswer:\n{}\n", answer);
                            println!("(session total so far: ${:.4})\n", summary.total_cost);
                        }
                        Err(e) => {
                            eprintln!("\nError: {}\n", e);
                        }
                    }
                }
                Err(e) => {
                    eprintln!("Command error: {}\n", e);
                }
            }
        }

        Ok(())
    }

    /// Print the startup banner
    fn print_banner(&self) {
        let config = self.agent.config();

        println!("rlm - recursive language model agent");
        println!("─────────────────────────────────────────────");
        println!("Endpoint:   {}", config.endpoint.base_url);
        println!("Models:");
        println!("  Root: {}", config.models.root);
        println!("  Sub:  {}", config.models.sub);
        if let Some(path) = &self.context_path {
            println!("Context:    {}", path);
        } else {
            println!("Context:    none loaded (use: context <path>)");
        }
        println!();
        println!("Commands: help, context, cost, status, models, reset, exit");
        println!("─────────────────────────────────────────────");
    }
}
