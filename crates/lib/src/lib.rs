//! # Store Concierge
//!
//! Answers customer questions for a chain of tea and coffee stores. A query is
//! redacted of personal data, enriched with the customer's profile and nearest
//! store, grounded in passages retrieved from the store policy document, and
//! finally answered by a chat-completion service.
//!
//! The entry point is [`SupportAgent`], built once and shared across requests.

pub mod constants;
pub mod context;
pub mod errors;
pub mod knowledge;
pub mod pipeline;
pub mod privacy;
pub mod profile;
pub mod prompts;
pub mod providers;
pub mod types;

pub use context::{ContextAssembler, LocationPolicy};
pub use errors::PromptError;
pub use knowledge::{KnowledgeError, KnowledgeIndex};
pub use pipeline::{PipelineError, PipelineState, SupportAgent, SupportAgentBuilder};
pub use privacy::Anonymizer;
pub use profile::{ProfileError, ProfileStore};
pub use types::{EmbeddingConfig, ProviderConfig};
