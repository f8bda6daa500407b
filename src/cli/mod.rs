//! CLI module - command-line interface
//!
//! Contains the interactive shell and command parsing.

pub mod commands;
pub mod shell;

pub use shell::{load_context_file, Shell};
