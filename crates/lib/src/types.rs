//! # Provider Configuration Types
//!
//! Plain configuration structs shared between the library's provider factory
//! and the server's `config.yml` loader.

use serde::{Deserialize, Serialize};
use std::fmt;

fn default_model_name() -> String {
    crate::providers::ai::local::GROQ_DEFAULT_MODEL.to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_timeout_secs() -> u64 {
    60
}

/// A reusable configuration for a completion service.
#[derive(Deserialize, Serialize, Clone)]
pub struct ProviderConfig {
    /// The type of provider ("local" for any OpenAI-compatible API, or "gemini").
    pub provider: String,
    /// The API URL. Optional for Gemini, where it is derived from the model name.
    #[serde(default)]
    pub api_url: Option<String>,
    /// The API key. An empty or missing key means the service is not configured.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model_name")]
    pub model_name: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Upper bound for a single completion call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Configuration for the embedding function used by the knowledge index.
#[derive(Deserialize, Serialize, Clone)]
pub struct EmbeddingConfig {
    /// "http" for an OpenAI-compatible or Gemini embeddings endpoint, "hashing" for
    /// the built-in deterministic embedder.
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
}

fn default_embedding_provider() -> String {
    "hashing".to_string()
}

fn default_dimensions() -> usize {
    crate::constants::DEFAULT_EMBEDDING_DIMENSIONS
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            api_url: None,
            model_name: None,
            api_key: None,
            dimensions: default_dimensions(),
        }
    }
}

/// Masks a secret for Debug output.
fn redact(secret: &Option<String>) -> &'static str {
    match secret {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("api_url", &self.api_url)
            .field("api_key", &redact(&self.api_key))
            .field("model_name", &self.model_name)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl fmt::Debug for EmbeddingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddingConfig")
            .field("provider", &self.provider)
            .field("api_url", &self.api_url)
            .field("model_name", &self.model_name)
            .field("api_key", &redact(&self.api_key))
            .field("dimensions", &self.dimensions)
            .finish()
    }
}
