//! REPL module - the persistent execution environment
//!
//! Holds context and intermediate variables across turns, executes snippets,
//! and captures their effects without letting a crash end the session.

pub mod env;
pub mod runner;

pub use env::{ExecutionResult, ReplEnv, SubModelHandler, VariableInfo};
