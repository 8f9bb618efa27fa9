//! The four pipeline stages.

use super::{PipelineError, PipelineState, StateUpdate};
use crate::{
    constants::LLM_NOT_CONFIGURED_RESPONSE,
    context::ContextAssembler,
    knowledge::KnowledgeIndex,
    privacy::Anonymizer,
    prompts::{format_passages, render_template, DEFAULT_FALLBACK_TEMPLATE},
    providers::ai::AiProvider,
};
use async_trait::async_trait;
use std::{fmt::Debug, path::PathBuf, sync::Arc};
use tracing::{debug, warn};

/// One step of the pipeline: reads earlier fields, produces exactly one new one.
#[async_trait]
pub trait Stage: Send + Sync + Debug {
    fn name(&self) -> &'static str;

    async fn run(&self, state: &PipelineState) -> Result<StateUpdate, PipelineError>;
}

/// Redacts the raw query.
#[derive(Debug)]
pub struct AnonymizeStage {
    pub anonymizer: Arc<Anonymizer>,
}

#[async_trait]
impl Stage for AnonymizeStage {
    fn name(&self) -> &'static str {
        "anonymize"
    }

    async fn run(&self, state: &PipelineState) -> Result<StateUpdate, PipelineError> {
        let masked = self
            .anonymizer
            .anonymize(&state.query)
            .await
            .map_err(PipelineError::Privacy)?;
        Ok(StateUpdate::MaskedQuery(masked))
    }
}

/// Builds the profile and store context block.
///
/// The raw query feeds the by-name store fallback: redaction would have replaced
/// the very place names that fallback looks for, and the lookup never leaves
/// the process.
#[derive(Debug)]
pub struct ContextStage {
    pub assembler: Arc<ContextAssembler>,
}

#[async_trait]
impl Stage for ContextStage {
    fn name(&self) -> &'static str {
        "assemble_context"
    }

    async fn run(&self, state: &PipelineState) -> Result<StateUpdate, PipelineError> {
        let context =
            self.assembler
                .format_context(&state.user_id, state.lat, state.lon, &state.query, true);
        Ok(StateUpdate::Context(context))
    }
}

/// Retrieves policy passages for the masked query.
#[derive(Debug)]
pub struct RetrieveStage {
    pub index: Arc<KnowledgeIndex>,
    pub limit: usize,
}

#[async_trait]
impl Stage for RetrieveStage {
    fn name(&self) -> &'static str {
        "retrieve"
    }

    async fn run(&self, state: &PipelineState) -> Result<StateUpdate, PipelineError> {
        let passages = self
            .index
            .search(state.masked_query()?, self.limit)
            .await
            .map_err(PipelineError::Knowledge)?;
        debug!(passages = passages.len(), "Retrieved policy passages.");
        Ok(StateUpdate::Rag(format_passages(&passages)))
    }
}

/// Renders the prompt and calls the completion service.
#[derive(Debug)]
pub struct GenerateStage {
    pub ai_provider: Option<Arc<dyn AiProvider>>,
    pub template_path: Option<PathBuf>,
}

impl GenerateStage {
    /// Reads the template for this request, falling back to the built-in one
    /// when the file is unset or unreadable.
    async fn load_template(&self) -> String {
        let Some(path) = &self.template_path else {
            return DEFAULT_FALLBACK_TEMPLATE.to_string();
        };
        match tokio::fs::read_to_string(path).await {
            Ok(template) => template,
            Err(e) => {
                warn!(path = %path.display(), "Prompt template unavailable, using fallback: {e}");
                DEFAULT_FALLBACK_TEMPLATE.to_string()
            }
        }
    }
}

#[async_trait]
impl Stage for GenerateStage {
    fn name(&self) -> &'static str {
        "generate"
    }

    async fn run(&self, state: &PipelineState) -> Result<StateUpdate, PipelineError> {
        let Some(provider) = &self.ai_provider else {
            warn!("No completion service configured; returning the sentinel response.");
            return Ok(StateUpdate::Response(
                LLM_NOT_CONFIGURED_RESPONSE.to_string(),
            ));
        };

        let template = self.load_template().await;
        let system_prompt = render_template(&template, state.context_str()?, state.rag_str()?);
        let user_prompt = state.masked_query()?;

        debug!(system_prompt = %system_prompt, user_prompt = %user_prompt, "--> Sending prompts to AI Provider");
        let response = provider
            .generate(&system_prompt, user_prompt)
            .await
            .map_err(PipelineError::Generation)?;
        debug!("<-- Response from AI: {}", &response);

        Ok(StateUpdate::Response(response))
    }
}
