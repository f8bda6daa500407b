//! Core module - shared infrastructure for the RLM agent
//!
//! This module contains foundational types, configuration, and error handling
//! used throughout the application.

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{Result, RlmError};
pub use types::*;
