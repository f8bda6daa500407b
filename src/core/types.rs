//! Shared types used across RLM modules
//!
//! Contains message structures, context payloads, and common data types.

use serde::{Deserialize, Serialize};

/// A message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender (user, assistant, system)
    pub role: String,
    /// Content of the message
    pub content: String,
}

impl Message {
    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }
}

/// Context payload handed to a session
///
/// The raw payload is loaded into the REPL environment and never sent to the
/// model directly; only [`ContextMetadata`] is surfaced in the instructions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextPayload {
    /// A single string of context
    Text(String),
    /// An ordered sequence of chunks (documents, sections, messages)
    Chunks(Vec<String>),
    /// Arbitrary structured context (mapping or mixed list)
    Structured(serde_json::Value),
}

/// Metadata about a context payload, surfaced to the model instead of the
/// payload itself
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextMetadata {
    /// Payload shape: "str", "list", or "dict"
    pub type_name: String,
    /// Character length per chunk
    pub chunk_lengths: Vec<usize>,
    /// Total character length
    pub total_length: usize,
}

impl ContextPayload {
    /// Build a payload from an arbitrary JSON value
    ///
    /// A string becomes [`ContextPayload::Text`], an array of strings becomes
    /// [`ContextPayload::Chunks`]; message lists with `content` fields are
    /// flattened to their contents. Everything else stays structured.
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(s) => Self::Text(s),
            serde_json::Value::Array(items) => {
                if items
                    .iter()
                    .all(|item| matches!(item, serde_json::Value::String(_)))
                {
                    let chunks = items
                        .into_iter()
                        .filter_map(|item| match item {
                            serde_json::Value::String(s) => Some(s),
                            _ => None,
                        })
                        .collect();
                    Self::Chunks(chunks)
                } else if items.iter().all(|item| {
                    item.as_object()
                        .map(|obj| obj.contains_key("content"))
                        .unwrap_or(false)
                }) {
                    let chunks = items
                        .into_iter()
                        .map(|item| {
                            item.get("content")
                                .and_then(|c| c.as_str())
                                .unwrap_or_default()
                                .to_string()
                        })
                        .collect();
                    Self::Chunks(chunks)
                } else {
                    Self::Structured(serde_json::Value::Array(items))
                }
            }
            other => Self::Structured(other),
        }
    }

    /// Compute the metadata summary surfaced in the system instructions
    pub fn metadata(&self) -> ContextMetadata {
        match self {
            Self::Text(s) => ContextMetadata {
                type_name: "str".to_string(),
                chunk_lengths: vec![s.len()],
                total_length: s.len(),
            },
            Self::Chunks(chunks) => {
                let chunk_lengths: Vec<usize> = chunks.iter().map(|c| c.len()).collect();
                let total_length = chunk_lengths.iter().sum();
                ContextMetadata {
                    type_name: "list".to_string(),
                    chunk_lengths,
                    total_length,
                }
            }
            Self::Structured(value) => {
                let rendered = value.to_string();
                let type_name = match value {
                    serde_json::Value::Array(_) => "list",
                    serde_json::Value::Object(_) => "dict",
                    _ => "str",
                };
                ContextMetadata {
                    type_name: type_name.to_string(),
                    chunk_lengths: vec![rendered.len()],
                    total_length: rendered.len(),
                }
            }
        }
    }
}

impl From<&str> for ContextPayload {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for ContextPayload {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Vec<String>> for ContextPayload {
    fn from(chunks: Vec<String>) -> Self {
        Self::Chunks(chunks)
    }
}

/// Which class of model call is being charged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallClass {
    /// The root model driving the iteration loop
    Root,
    /// A sub-model invoked from within a snippet
    Sub,
}

impl std::fmt::Display for CallClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallClass::Root => write!(f, "root"),
            CallClass::Sub => write!(f, "sub"),
        }
    }
}

/// Cost of one model call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostRecord {
    /// Estimated monetary cost in USD
    pub cost: f64,
    /// Total token count (input + output)
    pub tokens: u64,
    /// Input token count
    pub input_tokens: u64,
    /// Output token count
    pub output_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_metadata() {
        let payload = ContextPayload::from("magic number is 42");
        let meta = payload.metadata();
        assert_eq!(meta.type_name, "str");
        assert_eq!(meta.chunk_lengths, vec![18]);
        assert_eq!(meta.total_length, 18);
    }

    #[test]
    fn test_chunks_metadata() {
        let payload = ContextPayload::from(vec!["abc".to_string(), "defgh".to_string()]);
        let meta = payload.metadata();
        assert_eq!(meta.type_name, "list");
        assert_eq!(meta.chunk_lengths, vec![3, 5]);
        assert_eq!(meta.total_length, 8);
    }

    #[test]
    fn test_structured_metadata() {
        let payload = ContextPayload::Structured(json!({"a": 1}));
        let meta = payload.metadata();
        assert_eq!(meta.type_name, "dict");
        assert_eq!(meta.chunk_lengths.len(), 1);
    }

    #[test]
    fn test_from_json_message_list() {
        let value = json!([
            {"role": "user", "content": "hello"},
            {"role": "assistant", "content": "world"},
        ]);
        let payload = ContextPayload::from_json(value);
        match payload {
            ContextPayload::Chunks(chunks) => assert_eq!(chunks, vec!["hello", "world"]),
            other => panic!("expected chunks, got {:?}", other),
        }
    }

    #[test]
    fn test_from_json_string_array() {
        let payload = ContextPayload::from_json(json!(["a", "b"]));
        assert!(matches!(payload, ContextPayload::Chunks(_)));
    }
}
