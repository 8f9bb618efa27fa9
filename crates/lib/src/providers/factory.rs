//! # Provider Factory
//!
//! Builds the completion and embedding clients from their configuration structs,
//! so that the server (and tests) construct providers the same way.

use crate::{
    errors::PromptError,
    providers::ai::{
        gemini::{gemini_generate_url, GeminiProvider},
        local::{LocalAiProvider, GROQ_CHAT_COMPLETIONS_URL},
        AiProvider, Embedder, HashingEmbedder, HttpEmbedder,
    },
    types::{EmbeddingConfig, ProviderConfig},
};
use std::time::Duration;
use tracing::{info, warn};

const EMBEDDING_TIMEOUT_SECS: u64 = 30;

/// Creates the completion provider described by `config`.
///
/// Returns `Ok(None)` when no API key is configured; the pipeline then answers
/// every request with the "not configured" sentinel.
pub fn create_ai_provider(
    config: &ProviderConfig,
) -> Result<Option<Box<dyn AiProvider>>, PromptError> {
    let api_key = match config.api_key.as_deref().map(str::trim) {
        Some(key) if !key.is_empty() => key.to_string(),
        _ => {
            warn!(
                provider = %config.provider,
                "No API key configured for the completion service."
            );
            return Ok(None);
        }
    };
    let timeout = Duration::from_secs(config.timeout_secs);

    let provider: Box<dyn AiProvider> = match config.provider.as_str() {
        "local" => {
            let api_url = config
                .api_url
                .clone()
                .unwrap_or_else(|| GROQ_CHAT_COMPLETIONS_URL.to_string());
            info!(%api_url, model = %config.model_name, "Configuring OpenAI-compatible provider.");
            Box::new(LocalAiProvider::new(
                api_url,
                Some(api_key),
                Some(config.model_name.clone()),
                config.temperature,
                timeout,
            )?)
        }
        "gemini" => {
            let api_url = config
                .api_url
                .clone()
                .unwrap_or_else(|| gemini_generate_url(&config.model_name));
            info!(%api_url, "Configuring Gemini provider.");
            Box::new(GeminiProvider::new(
                api_url,
                api_key,
                config.temperature,
                timeout,
            )?)
        }
        other => return Err(PromptError::UnsupportedProvider(other.to_string())),
    };

    Ok(Some(provider))
}

/// Creates the embedder described by `config`.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>, PromptError> {
    match config.provider.as_str() {
        "hashing" => Ok(Box::new(HashingEmbedder::new(config.dimensions))),
        "http" => {
            let api_url = config.api_url.clone().ok_or_else(|| {
                PromptError::MissingAiProvider(
                    "embedding.api_url must be set for the 'http' embedder".to_string(),
                )
            })?;
            let model = config.model_name.clone().ok_or_else(|| {
                PromptError::MissingAiProvider(
                    "embedding.model_name must be set for the 'http' embedder".to_string(),
                )
            })?;
            let api_key = config
                .api_key
                .clone()
                .filter(|key| !key.trim().is_empty());
            info!(%api_url, %model, "Configuring HTTP embedder.");
            Ok(Box::new(HttpEmbedder::new(
                api_url,
                model,
                api_key,
                Duration::from_secs(EMBEDDING_TIMEOUT_SECS),
            )?))
        }
        other => Err(PromptError::UnsupportedProvider(other.to_string())),
    }
}
