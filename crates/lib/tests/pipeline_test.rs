//! # Pipeline Tests
//!
//! End-to-end runs of `SupportAgent` with a mock completion service.

mod common;

use anyhow::Result;
use common::{build_agent, build_agent_with_template, setup_tracing, write_document};
use concierge::{
    constants::LLM_NOT_CONFIGURED_RESPONSE, pipeline::PipelineState, ContextAssembler,
    PipelineError, SupportAgent,
};
use concierge_test_utils::{
    fixtures::{sample_profile_store, SAMPLE_POLICY, STORE_1_LAT, STORE_1_LON},
    MockAiProvider,
};
use std::sync::Arc;

#[tokio::test]
async fn unconfigured_completion_service_returns_the_sentinel() -> Result<()> {
    setup_tracing();
    let (_dir, agent) = build_agent(None).await?;

    let response = agent
        .process_query("USR-001", "Where is my order?", STORE_1_LAT, STORE_1_LON)
        .await?;
    assert_eq!(response, LLM_NOT_CONFIGURED_RESPONSE);
    Ok(())
}

#[tokio::test]
async fn generation_sees_context_and_the_masked_query() -> Result<()> {
    setup_tracing();
    let mock = MockAiProvider::new();
    mock.set_default_response("Your Masala Chai is on its way!");
    let (_dir, agent) = build_agent(Some(Box::new(mock.clone()))).await?;

    let response = agent
        .process_query(
            "USR-001",
            "This is Priya, call me on +91-98765-43210 about my chai",
            STORE_1_LAT,
            STORE_1_LON,
        )
        .await?;
    assert_eq!(response, "Your Masala Chai is on its way!");

    let calls = mock.get_calls();
    assert_eq!(calls.len(), 1);
    let (system_prompt, user_prompt) = &calls[0];
    assert!(system_prompt.starts_with("Context: Current Location: Lat: 19.0760, Lon: 72.8777"));
    assert!(system_prompt.contains("Loyalty Points: 120"));
    assert!(system_prompt.contains("(0m away)"));
    assert!(system_prompt.ends_with(". Info: "));
    assert_eq!(
        user_prompt,
        "This is <PERSON>, call me on <PHONE_NUMBER> about my chai"
    );
    Ok(())
}

#[tokio::test]
async fn retrieved_passages_are_rendered_as_bullets() -> Result<()> {
    let mock = MockAiProvider::new();
    mock.set_default_response("ok");
    let (dir, agent) = build_agent(Some(Box::new(mock))).await?;
    agent
        .knowledge_index()
        .ingest(write_document(&dir, "policy.txt", SAMPLE_POLICY)?)
        .await?;

    let state = agent
        .run(PipelineState::new(
            "USR-002",
            "how do refunds work for drinks returned",
            0.0,
            0.0,
        ))
        .await?;

    let rag = state.rag_str.as_deref().unwrap();
    assert!(rag.starts_with("- Refund Policy\n"), "{rag}");
    assert_eq!(rag.matches("\n- ").count(), 2);
    assert_eq!(state.masked_query.as_deref(), Some(state.query.as_str()));
    assert!(state
        .context_str
        .as_deref()
        .unwrap()
        .ends_with("Nearest Store: None nearby (closest is >50km away and no city mentioned)"));
    assert_eq!(state.response.as_deref(), Some("ok"));
    Ok(())
}

#[tokio::test]
async fn prompt_template_is_read_from_disk_with_a_fallback() -> Result<()> {
    let template_dir = tempfile::TempDir::new()?;
    let template_path = template_dir.path().join("prompt.txt");
    std::fs::write(&template_path, "SUPPORT AGENT\n{context_str}\n---\n{rag_str}")?;

    let mock = MockAiProvider::new();
    mock.add_response("SUPPORT AGENT", "from template");
    mock.add_response("Context: ", "from fallback");

    let (_dir, agent) =
        build_agent_with_template(Some(Box::new(mock.clone())), Some(template_path.clone()))
            .await?;
    let response = agent.process_query("USR-404", "hi", 0.0, 0.0).await?;
    assert_eq!(response, "from template");
    let system_prompt = &mock.get_calls()[0].0;
    assert!(system_prompt.starts_with("SUPPORT AGENT\nCurrent Location"));
    assert!(system_prompt.ends_with("no city mentioned)\n---\n"));

    // The template is read per request, so removing it switches to the fallback.
    std::fs::remove_file(&template_path)?;
    let response = agent.process_query("USR-404", "hi", 0.0, 0.0).await?;
    assert_eq!(response, "from fallback");
    Ok(())
}

#[tokio::test]
async fn completion_failures_surface_as_generation_errors() -> Result<()> {
    // No programmed responses: the mock fails every call.
    let (_dir, agent) = build_agent(Some(Box::new(MockAiProvider::new()))).await?;

    let err = agent
        .process_query("USR-001", "hello", STORE_1_LAT, STORE_1_LON)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Generation(_)), "{err:?}");
    assert!(!err.is_retryable());
    Ok(())
}

#[tokio::test]
async fn concurrent_requests_share_one_agent() -> Result<()> {
    let mock = MockAiProvider::new();
    mock.set_default_response("ok");
    let (_dir, agent) = build_agent(Some(Box::new(mock.clone()))).await?;

    let handles: Vec<_> = ["USR-001", "USR-002", "USR-404"]
        .into_iter()
        .map(|user_id| {
            let agent = Arc::clone(&agent);
            tokio::spawn(async move {
                agent
                    .process_query(user_id, "what's on offer?", STORE_1_LAT, STORE_1_LON)
                    .await
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await??, "ok");
    }
    assert_eq!(mock.get_calls().len(), 3);
    Ok(())
}

#[test]
fn builder_requires_context_and_index() {
    let err = SupportAgent::builder()
        .context_assembler(ContextAssembler::new(Arc::new(sample_profile_store())))
        .build()
        .unwrap_err();
    assert!(matches!(err, PipelineError::Incomplete("knowledge index")));
}
