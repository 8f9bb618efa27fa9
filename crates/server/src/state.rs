//! # Application State
//!
//! This module defines the shared application state (`AppState`) and the logic
//! for building it at startup: profile data is loaded, the policy document is
//! indexed, and the support agent is assembled around them.

use crate::config::AppConfig;
use concierge::{
    privacy::RemoteAnalyzer,
    providers::factory::{create_ai_provider, create_embedder},
    Anonymizer, ContextAssembler, KnowledgeIndex, ProfileStore, SupportAgent,
};
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};

/// The shared application state, accessible from all request handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Customer and store records, read-only after startup.
    pub profiles: Arc<ProfileStore>,
    /// The query pipeline.
    pub agent: Arc<SupportAgent>,
}

/// Builds the shared application state from the configuration.
///
/// A failed document ingestion is logged and the server starts with whatever
/// the index already holds; every other failure aborts startup.
pub async fn build_app_state(config: AppConfig) -> anyhow::Result<AppState> {
    let profiles = Arc::new(ProfileStore::load(
        &config.data.users_path,
        &config.data.stores_path,
    )?);

    let embedder = create_embedder(&config.embedding)?;
    let index = KnowledgeIndex::open(
        &config.knowledge.db_path,
        &config.knowledge.collection,
        embedder,
        config.embedding.dimensions,
    )
    .await?
    .with_chunking(config.knowledge.window_size, config.knowledge.overlap);

    match &config.knowledge.document_path {
        Some(document_path) => match index.ingest(document_path).await {
            Ok(chunks) => info!(chunks, "Knowledge index ready."),
            Err(e) => warn!("Policy document ingestion failed, continuing without it: {e}"),
        },
        None => warn!("No policy document configured. Retrieval will use the existing index."),
    }

    let mut anonymizer = Anonymizer::with_default_recognizers()?
        .with_profile_terms(&profiles)?
        .with_language(&config.privacy.language);
    if let Some(analyzer_url) = &config.privacy.analyzer_url {
        info!(%analyzer_url, "Using remote entity analyzer.");
        anonymizer = anonymizer.with_recognizer(Box::new(RemoteAnalyzer::new(
            analyzer_url.clone(),
            Duration::from_secs(config.privacy.analyzer_timeout_secs),
        )?));
    }

    let mut builder = SupportAgent::builder()
        .anonymizer(anonymizer)
        .context_assembler(ContextAssembler::with_policy(
            profiles.clone(),
            config.location,
        ))
        .knowledge_index(Arc::new(index))
        .ai_provider(create_ai_provider(&config.llm)?)
        .search_limit(config.knowledge.search_limit);
    if let Some(template_path) = &config.prompt_template_path {
        builder = builder.template_path(template_path);
    }
    let agent = builder.build()?;

    Ok(AppState {
        profiles,
        agent: Arc::new(agent),
    })
}
