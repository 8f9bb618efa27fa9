//! # Pipeline Orchestrator
//!
//! `SupportAgent` runs every customer query through a fixed chain of stages:
//! anonymize, assemble context, retrieve policy passages, generate. Each stage
//! reads the fields produced before it from a per-request [`PipelineState`] and
//! contributes exactly one field of its own.
//!
//! One agent is built at startup and shared behind an `Arc`; all of its parts
//! are read-only after construction, so concurrent requests only share
//! immutable data (plus the knowledge index's internal ingest lock).

pub mod stages;
pub mod state;

pub use stages::{AnonymizeStage, ContextStage, GenerateStage, RetrieveStage, Stage};
pub use state::{PipelineState, StateUpdate};

use crate::{
    constants::DEFAULT_SEARCH_LIMIT,
    context::ContextAssembler,
    errors::PromptError,
    knowledge::{KnowledgeError, KnowledgeIndex},
    privacy::Anonymizer,
    providers::ai::AiProvider,
};
use std::{path::PathBuf, sync::Arc};
use thiserror::Error;
use tracing::{debug, info, instrument};

/// Errors raised while answering a query.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Anonymization failed: {0}")]
    Privacy(PromptError),
    #[error("Knowledge retrieval failed: {0}")]
    Knowledge(KnowledgeError),
    #[error("Generation failed: {0}")]
    Generation(PromptError),
    #[error("Pipeline state field '{0}' was already set")]
    FieldAlreadySet(&'static str),
    #[error("Pipeline state field '{0}' has not been produced yet")]
    MissingField(&'static str),
    #[error("Support agent is missing its {0}")]
    Incomplete(&'static str),
}

impl PipelineError {
    /// Returns `true` when the failure was a completion or embedding timeout.
    pub fn is_retryable(&self) -> bool {
        match self {
            PipelineError::Privacy(e) | PipelineError::Generation(e) => e.is_retryable(),
            PipelineError::Knowledge(KnowledgeError::Embedding(e)) => e.is_retryable(),
            _ => false,
        }
    }
}

/// The query-answering pipeline.
#[derive(Debug)]
pub struct SupportAgent {
    stages: Vec<Box<dyn Stage>>,
    assembler: Arc<ContextAssembler>,
    index: Arc<KnowledgeIndex>,
}

impl SupportAgent {
    pub fn builder() -> SupportAgentBuilder {
        SupportAgentBuilder::new()
    }

    /// Answers one customer query.
    #[instrument(skip(self, query))]
    pub async fn process_query(
        &self,
        user_id: &str,
        query: &str,
        lat: f64,
        lon: f64,
    ) -> Result<String, PipelineError> {
        let state = self.run(PipelineState::new(user_id, query, lat, lon)).await?;
        state.response.ok_or(PipelineError::MissingField("response"))
    }

    /// Runs every stage over `state` and returns the completed accumulator.
    pub async fn run(&self, mut state: PipelineState) -> Result<PipelineState, PipelineError> {
        for stage in &self.stages {
            debug!(stage = stage.name(), "Running pipeline stage.");
            let update = stage.run(&state).await?;
            state.apply(update)?;
        }
        info!("Pipeline completed.");
        Ok(state)
    }

    pub fn context_assembler(&self) -> &ContextAssembler {
        &self.assembler
    }

    pub fn knowledge_index(&self) -> &KnowledgeIndex {
        &self.index
    }
}

/// Assembles a [`SupportAgent`] from its collaborators.
#[derive(Debug, Default)]
pub struct SupportAgentBuilder {
    anonymizer: Option<Anonymizer>,
    assembler: Option<ContextAssembler>,
    index: Option<Arc<KnowledgeIndex>>,
    ai_provider: Option<Arc<dyn AiProvider>>,
    template_path: Option<PathBuf>,
    search_limit: Option<usize>,
}

impl SupportAgentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn anonymizer(mut self, anonymizer: Anonymizer) -> Self {
        self.anonymizer = Some(anonymizer);
        self
    }

    pub fn context_assembler(mut self, assembler: ContextAssembler) -> Self {
        self.assembler = Some(assembler);
        self
    }

    pub fn knowledge_index(mut self, index: Arc<KnowledgeIndex>) -> Self {
        self.index = Some(index);
        self
    }

    /// Sets the completion service. Leaving it unset makes every answer the
    /// "not configured" sentinel.
    pub fn ai_provider(mut self, provider: Option<Box<dyn AiProvider>>) -> Self {
        self.ai_provider = provider.map(Arc::from);
        self
    }

    pub fn template_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.template_path = Some(path.into());
        self
    }

    pub fn search_limit(mut self, limit: usize) -> Self {
        self.search_limit = Some(limit);
        self
    }

    /// Builds the agent. The anonymizer defaults to the built-in pattern rules;
    /// the context assembler and knowledge index are required.
    pub fn build(self) -> Result<SupportAgent, PipelineError> {
        let anonymizer = match self.anonymizer {
            Some(anonymizer) => anonymizer,
            None => Anonymizer::with_default_recognizers().map_err(PipelineError::Privacy)?,
        };
        let assembler = Arc::new(
            self.assembler
                .ok_or(PipelineError::Incomplete("context assembler"))?,
        );
        let index = self
            .index
            .ok_or(PipelineError::Incomplete("knowledge index"))?;

        let stages: Vec<Box<dyn Stage>> = vec![
            Box::new(AnonymizeStage {
                anonymizer: Arc::new(anonymizer),
            }),
            Box::new(ContextStage {
                assembler: assembler.clone(),
            }),
            Box::new(RetrieveStage {
                index: index.clone(),
                limit: self.search_limit.unwrap_or(DEFAULT_SEARCH_LIMIT),
            }),
            Box::new(GenerateStage {
                ai_provider: self.ai_provider,
                template_path: self.template_path,
            }),
        ];

        Ok(SupportAgent {
            stages,
            assembler,
            index,
        })
    }
}
