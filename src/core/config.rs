//! Configuration management for the RLM agent
//!
//! Supports environment variables, config files, and runtime overrides.
//! Models are interchangeable via settings.
//!
//! Config file location: ~/.config/rlm/config.toml

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::core::error::{Result, RlmError};

/// Main configuration for the RLM agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Model endpoint configuration
    pub endpoint: EndpointConfig,
    /// Model configuration
    pub models: ModelConfig,
    /// Agent loop configuration
    pub agent: AgentConfig,
    /// REPL environment configuration
    #[serde(default)]
    pub repl: ReplConfig,
    /// Tracing configuration
    #[serde(default)]
    pub trace: TraceConfig,
}

/// OpenAI-compatible endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Base URL of the endpoint, e.g. http://localhost:8080/v1
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Model configuration - root and sub models are interchangeable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Root model driving the iteration loop
    pub root: String,
    /// Sub-model used for recursive llm_query calls from snippets
    pub sub: String,
}

/// Agent loop behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum root-model iterations before the forced final turn
    /// Default: 20
    pub max_iterations: usize,
    /// Ceiling on formatted REPL output per turn message
    /// Default: 100000
    pub max_output_chars: usize,
    /// Max tokens per generation
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Recursion depth of this agent; sub-calls are flat regardless
    pub depth: usize,
    /// Whether to show debug output
    pub debug: bool,
}

/// REPL environment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplConfig {
    /// Interpreter command used to host the execution environment
    pub python_command: String,
}

/// Tracing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceConfig {
    /// Whether JSONL tracing is enabled
    pub enabled: bool,
    /// Directory trace files are appended under
    pub dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: EndpointConfig::default(),
            models: ModelConfig::default(),
            agent: AgentConfig::default(),
            repl: ReplConfig::default(),
            trace: TraceConfig::default(),
        }
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: env::var("RLM_API_URL")
                .unwrap_or_else(|_| "http://localhost:8080/v1".to_string()),
            timeout_secs: 600,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            root: env::var("RLM_ROOT_MODEL").unwrap_or_else(|_| "gpt-5".to_string()),
            sub: env::var("RLM_SUB_MODEL").unwrap_or_else(|_| "gpt-5-mini".to_string()),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            max_output_chars: 100_000,
            max_tokens: 1000,
            temperature: 0.7,
            depth: 0,
            debug: env::var("RLM_DEBUG")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        }
    }
}

impl Default for ReplConfig {
    fn default() -> Self {
        Self {
            python_command: env::var("RLM_PYTHON").unwrap_or_else(|_| "python3".to_string()),
        }
    }
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: "logs".to_string(),
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("rlm")
    }

    /// Get the config file path
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from file, environment, and defaults
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load() -> Self {
        // Try to load .env file if it exists
        let _ = dotenvy::dotenv();

        // Try to load from config file
        if let Ok(config) = Self::load_from_file() {
            return config;
        }

        // Fall back to defaults (which respect env vars)
        Self::default()
    }

    /// Load configuration from file only
    pub fn load_from_file() -> Result<Self> {
        let config_path = Self::config_file();

        if !config_path.exists() {
            return Err(RlmError::config("Config file not found"));
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|e| RlmError::config(format!("Failed to read config: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| RlmError::config(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_dir = Self::config_dir();
        let config_path = Self::config_file();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .map_err(|e| RlmError::config(format!("Failed to create config dir: {}", e)))?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| RlmError::config(format!("Failed to serialize config: {}", e)))?;

        fs::write(&config_path, content)
            .map_err(|e| RlmError::config(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// API key for the endpoint, if configured in the environment
    pub fn api_key() -> Option<String> {
        env::var("OPENAI_API_KEY").ok()
    }

    /// Update the root model
    pub fn set_root_model(&mut self, model: impl Into<String>) {
        self.models.root = model.into();
    }

    /// Update the sub model
    pub fn set_sub_model(&mut self, model: impl Into<String>) {
        self.models.sub = model.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.agent.max_iterations, 20);
        assert_eq!(config.agent.max_output_chars, 100_000);
        assert_eq!(config.repl.python_command, "python3");
        assert!(config.trace.enabled);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("max_iterations"));
        assert!(toml_str.contains("base_url"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.agent.max_iterations, config.agent.max_iterations);
    }

    #[test]
    fn test_config_dir() {
        let dir = Config::config_dir();
        assert!(dir.to_string_lossy().contains("rlm"));
    }
}
