//! CLI commands
//!
//! Special commands that can be executed in the interactive shell.

use crate::agent::RlmAgent;
use crate::core::Result;

/// Result of parsing a command
pub enum CommandResult {
    /// Continue processing as a normal query
    Continue(String),
    /// Command was handled, show output
    Handled(String),
    /// Exit the shell
    Exit,
    /// Reset session state and cost ledger
    Reset,
    /// A new context file should be loaded
    LoadContext(String),
}

/// Parse and handle special commands
pub async fn handle_command(input: &str, agent: &mut RlmAgent) -> Result<CommandResult> {
    let input = input.trim();
    let parts: Vec<&str> = input.splitn(2, ' ').collect();
    let cmd = parts[0].to_lowercase();
    let args = parts.get(1).map(|s| s.trim()).unwrap_or("");

    match cmd.as_str() {
        "exit" | "quit" | "q" => Ok(CommandResult::Exit),

        "reset" | "clear" => Ok(CommandResult::Reset),

        "help" | "?" => Ok(CommandResult::Handled(help_text())),

        "cost" => {
            let summary = agent.cost_summary().await;
            Ok(CommandResult::Handled(format!(
                "Session cost:\n\
                 ─────────────────────────────\n\
                 Total:  ${:.4}\n\
                 Root:   ${:.4}  ({} calls, {} tokens)\n\
                 Sub:    ${:.4}  ({} calls, {} tokens)",
                summary.total_cost,
                summary.root_cost,
                summary.root_calls,
                summary.root_tokens,
                summary.sub_cost,
                summary.sub_calls,
                summary.sub_tokens,
            )))
        }

        "models" => {
            let models = agent.list_models().await?;
            let output = format!(
                "Available models:\n{}\n\nCurrent:\n  Root: {}\n  Sub:  {}",
                models
                    .iter()
                    .map(|m| format!("  - {}", m))
                    .collect::<Vec<_>>()
                    .join("\n"),
                agent.config().models.root,
                agent.config().models.sub
            );
            Ok(CommandResult::Handled(output))
        }

        "context" => {
            if args.is_empty() {
                Ok(CommandResult::Handled(
                    "Usage: context <path>  (loads a .txt or .json context file)".to_string(),
                ))
            } else {
                Ok(CommandResult::LoadContext(args.to_string()))
            }
        }

        "set" => handle_set_command(args, agent),

        "status" => {
            let config = agent.config();
            let status = format!(
                "RLM Status:\n\
                 ─────────────────────────────\n\
                 Root model:     {}\n\
                 Sub model:      {}\n\
                 Max iterations: {}\n\
                 Endpoint:       {}\n\
                 Debug:          {}",
                config.models.root,
                config.models.sub,
                config.agent.max_iterations,
                config.endpoint.base_url,
                if config.agent.debug { "on" } else { "off" }
            );
            Ok(CommandResult::Handled(status))
        }

        "debug" => {
            let new_state = !agent.config().agent.debug;
            agent.set_debug(new_state);
            Ok(CommandResult::Handled(format!(
                "Debug mode: {}",
                if new_state { "ON" } else { "OFF" }
            )))
        }

        _ => {
            if input.starts_with('/') {
                Ok(CommandResult::Handled(format!(
                    "Unknown command: {}. Type 'help' for available commands.",
                    cmd
                )))
            } else {
                Ok(CommandResult::Continue(input.to_string()))
            }
        }
    }
}

/// Handle 'set' subcommands
fn handle_set_command(args: &str, agent: &mut RlmAgent) -> Result<CommandResult> {
    let parts: Vec<&str> = args.splitn(2, ' ').collect();

    if parts.is_empty() || parts[0].is_empty() {
        return Ok(CommandResult::Handled(
            "Usage: set <root|sub|debug> <value>\n\
             Examples:\n\
               set root gpt-5\n\
               set sub gpt-5-mini\n\
               set debug on"
                .to_string(),
        ));
    }

    let key = parts[0].to_lowercase();
    let value = parts.get(1).map(|s| s.trim()).unwrap_or("");

    match key.as_str() {
        "root" => {
            if value.is_empty() {
                return Ok(CommandResult::Handled(format!(
                    "Current root model: {}",
                    agent.config().models.root
                )));
            }
            agent.set_root_model(value);
            Ok(CommandResult::Handled(format!("Root model set to: {}", value)))
        }

        "sub" => {
            if value.is_empty() {
                return Ok(CommandResult::Handled(format!(
                    "Current sub model: {}",
                    agent.config().models.sub
                )));
            }
            agent.set_sub_model(value);
            Ok(CommandResult::Handled(format!("Sub model set to: {}", value)))
        }

        "debug" => {
            let enabled = matches!(value.to_lowercase().as_str(), "on" | "true" | "1" | "yes");
            agent.set_debug(enabled);
            Ok(CommandResult::Handled(format!(
                "Debug mode: {}",
                if enabled { "ON" } else { "OFF" }
            )))
        }

        _ => Ok(CommandResult::Handled(format!(
            "Unknown setting: {}. Available: root, sub, debug",
            key
        ))),
    }
}

/// Generate help text
fn help_text() -> String {
    r#"RLM Commands:
─────────────────────────────────────────────
  help, ?          Show this help message
  exit, quit, q    Exit
  context <path>   Load a context file (.txt or .json)
  cost             Show accumulated session cost
  reset, clear     Reset session state and cost ledger
  status           Show current configuration
  models           List models on the endpoint
  debug            Toggle debug mode

  set root <model>     Set the root model
  set sub <model>      Set the sub model
  set debug <on|off>   Enable/disable debug output

Anything else is treated as a query against the loaded context.
─────────────────────────────────────────────"#
        .to_string()
}
