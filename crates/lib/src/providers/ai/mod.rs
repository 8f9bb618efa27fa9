pub mod embedding;
pub mod gemini;
pub mod local;

use crate::errors::PromptError;
use async_trait::async_trait;
use dyn_clone::DynClone;
pub use embedding::{Embedder, HashingEmbedder, HttpEmbedder};
use std::fmt::Debug;

/// A trait for interacting with a chat-completion service.
///
/// The pipeline's generation stage sends the rendered support-agent template as
/// the system prompt and the anonymized customer query as the user prompt.
#[async_trait]
pub trait AiProvider: Send + Sync + Debug + DynClone {
    /// Generates a response from a given system and user prompt.
    async fn generate(&self, system_prompt: &str, user_prompt: &str)
        -> Result<String, PromptError>;
}

dyn_clone::clone_trait_object!(AiProvider);
