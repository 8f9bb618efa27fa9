#![allow(dead_code)]
//! # Common Test Utilities
//!
//! Shared setup for the integration tests: tracing, throwaway knowledge indexes
//! and a fully wired `SupportAgent` over the sample profile data.

use anyhow::Result;
use concierge::{
    providers::ai::{AiProvider, Embedder, HashingEmbedder},
    Anonymizer, ContextAssembler, KnowledgeIndex, SupportAgent,
};
use concierge_test_utils::fixtures::sample_profile_store;
use dotenvy::dotenv;
use std::{
    path::PathBuf,
    sync::{Arc, Once},
};
use tempfile::TempDir;

pub const TEST_DIMENSIONS: usize = 256;

static INIT: Once = Once::new();

/// Initializes the tracing subscriber and loads .env for tests.
pub fn setup_tracing() {
    INIT.call_once(|| {
        dotenv().ok();
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

/// A knowledge index in a fresh temporary directory. Keep the `TempDir` alive
/// for as long as the index is used.
pub async fn temp_index(embedder: Box<dyn Embedder>) -> Result<(TempDir, KnowledgeIndex)> {
    let dir = TempDir::new()?;
    let db_path = dir.path().join("db").join("knowledge.db");
    let index = KnowledgeIndex::open(
        db_path.to_str().expect("temp path is valid UTF-8"),
        "store_policies",
        embedder,
        TEST_DIMENSIONS,
    )
    .await?;
    Ok((dir, index))
}

/// Writes `content` to a file named `name` inside `dir`.
pub fn write_document(dir: &TempDir, name: &str, content: &str) -> Result<PathBuf> {
    let path = dir.path().join(name);
    std::fs::write(&path, content)?;
    Ok(path)
}

/// A `SupportAgent` over the sample profiles with an empty index, the default
/// recognizers plus profile terms, and the given completion service.
pub async fn build_agent(
    ai_provider: Option<Box<dyn AiProvider>>,
) -> Result<(TempDir, Arc<SupportAgent>)> {
    build_agent_with_template(ai_provider, None).await
}

/// Like [`build_agent`], reading the prompt template from `template_path`.
pub async fn build_agent_with_template(
    ai_provider: Option<Box<dyn AiProvider>>,
    template_path: Option<PathBuf>,
) -> Result<(TempDir, Arc<SupportAgent>)> {
    let (dir, index) = temp_index(Box::new(HashingEmbedder::new(TEST_DIMENSIONS))).await?;
    let profiles = Arc::new(sample_profile_store());
    let anonymizer = Anonymizer::with_default_recognizers()?.with_profile_terms(&profiles)?;

    let mut builder = SupportAgent::builder()
        .anonymizer(anonymizer)
        .context_assembler(ContextAssembler::new(profiles))
        .knowledge_index(Arc::new(index.with_chunking(3, 0)))
        .ai_provider(ai_provider);
    if let Some(path) = template_path {
        builder = builder.template_path(path);
    }
    Ok((dir, Arc::new(builder.build()?)))
}
