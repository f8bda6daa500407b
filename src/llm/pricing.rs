//! Price table and cost estimation
//!
//! Prices are USD per 1M tokens (input, output). Token counts come from the
//! endpoint's usage report when available, otherwise a chars/4 estimate.

use crate::core::{CostRecord, Message};
use crate::llm::traits::{LlmResponse, TokenUsage};

/// Known model prices per 1M tokens: (model, input, output)
const PRICING: &[(&str, f64, f64)] = &[
    ("gpt-5", 2.50, 10.00),
    ("gpt-5-mini", 0.15, 0.60),
    ("gpt-5-nano", 0.10, 0.40),
];

/// Fallback pricing for unknown (typically local) models
const DEFAULT_PRICING: (f64, f64) = (0.05, 0.20);

/// Per-1M-token prices for a model
pub fn prices_for(model: &str) -> (f64, f64) {
    PRICING
        .iter()
        .find(|(name, _, _)| *name == model)
        .map(|(_, input, output)| (*input, *output))
        .unwrap_or(DEFAULT_PRICING)
}

/// Rough token estimate used when the endpoint reports no usage
fn estimate_tokens(chars: usize) -> u64 {
    (chars / 4) as u64
}

/// Build the cost record for one completed call
pub fn cost_of_call(model: &str, messages: &[Message], response: &LlmResponse) -> CostRecord {
    let usage = response.usage.clone().unwrap_or_else(|| {
        let prompt_chars: usize = messages.iter().map(|m| m.content.len()).sum();
        let prompt_tokens = estimate_tokens(prompt_chars);
        let completion_tokens = estimate_tokens(response.content.len());
        TokenUsage {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    });

    let (input_price, output_price) = prices_for(model);
    let cost = usage.prompt_tokens as f64 / 1_000_000.0 * input_price
        + usage.completion_tokens as f64 / 1_000_000.0 * output_price;

    CostRecord {
        cost,
        tokens: usage.total_tokens,
        input_tokens: usage.prompt_tokens,
        output_tokens: usage.completion_tokens,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_model_pricing() {
        assert_eq!(prices_for("gpt-5"), (2.50, 10.00));
        assert_eq!(prices_for("gpt-5-mini"), (0.15, 0.60));
    }

    #[test]
    fn test_unknown_model_uses_default() {
        assert_eq!(prices_for("some-local-model"), DEFAULT_PRICING);
    }

    #[test]
    fn test_cost_from_reported_usage() {
        let response = LlmResponse {
            content: "hi".to_string(),
            usage: Some(TokenUsage {
                prompt_tokens: 1_000_000,
                completion_tokens: 1_000_000,
                total_tokens: 2_000_000,
            }),
            model: "gpt-5".to_string(),
        };
        let record = cost_of_call("gpt-5", &[], &response);
        assert!((record.cost - 12.50).abs() < 1e-9);
        assert_eq!(record.tokens, 2_000_000);
    }

    #[test]
    fn test_cost_estimated_from_chars() {
        let messages = vec![Message::user("a".repeat(400))];
        let response = LlmResponse {
            content: "b".repeat(40),
            usage: None,
            model: "local".to_string(),
        };
        let record = cost_of_call("local", &messages, &response);
        assert_eq!(record.input_tokens, 100);
        assert_eq!(record.output_tokens, 10);
        assert_eq!(record.tokens, 110);
    }
}
