//! LLM module - model endpoint integrations
//!
//! Provides the provider abstraction, the OpenAI-compatible client, and the
//! price table used for cost accounting.

pub mod openai;
pub mod pricing;
pub mod traits;

pub use openai::OpenAiClient;
pub use traits::{GenerateOptions, LlmProvider, LlmResponse, TokenUsage};
