//! # Configuration Tests
//!
//! Loading `config.yml` files with `${VAR}` substitution, defaults and
//! environment overrides. Tests touching the environment run serially.

use anyhow::Result;
use concierge_server::config::{get_config, ConfigError};
use serial_test::serial;
use std::{env, fs};
use tempfile::tempdir;

const MINIMAL_CONFIG: &str = r#"
data:
  users_path: "data/users.json"
  stores_path: "data/stores.json"
llm:
  provider: "local"
  api_key: "${CONCIERGE_TEST_LLM_KEY}"
"#;

fn write_config(content: &str) -> Result<(tempfile::TempDir, String)> {
    let dir = tempdir()?;
    let path = dir.path().join("config.yml");
    fs::write(&path, content)?;
    Ok((dir, path.display().to_string()))
}

fn clear_env_vars() {
    env::remove_var("PORT");
    env::remove_var("CONCIERGE_TEST_LLM_KEY");
    env::remove_var("CONCIERGE_LLM__MODEL_NAME");
    env::remove_var("CONCIERGE_KNOWLEDGE__SEARCH_LIMIT");
}

#[test]
#[serial]
fn test_defaults_fill_optional_sections() -> Result<()> {
    clear_env_vars();
    let (_dir, path) = write_config(MINIMAL_CONFIG)?;

    let config = get_config(Some(&path))?;

    assert_eq!(config.port, 8000);
    assert_eq!(config.knowledge.db_path, "db/knowledge.db");
    assert_eq!(config.knowledge.collection, "store_policies");
    assert_eq!(config.knowledge.window_size, 20);
    assert_eq!(config.knowledge.overlap, 5);
    assert_eq!(config.knowledge.search_limit, 5);
    assert!(config.knowledge.document_path.is_none());
    assert_eq!(config.embedding.provider, "hashing");
    assert_eq!(config.embedding.dimensions, 384);
    assert_eq!(config.privacy.language, "en");
    assert!(config.privacy.analyzer_url.is_none());
    assert_eq!(config.location.meters_per_degree, 111_000.0);
    assert_eq!(config.location.max_store_distance_meters, 50_000);
    assert_eq!(config.llm.model_name, "llama-3.3-70b-versatile");
    assert_eq!(config.llm.timeout_secs, 60);
    assert!(config.prompt_template_path.is_none());
    Ok(())
}

#[test]
#[serial]
fn test_placeholder_substitution() -> Result<()> {
    clear_env_vars();
    env::set_var("CONCIERGE_TEST_LLM_KEY", "gsk-secret");
    let (_dir, path) = write_config(MINIMAL_CONFIG)?;

    let config = get_config(Some(&path))?;
    assert_eq!(config.llm.api_key.as_deref(), Some("gsk-secret"));

    clear_env_vars();
    Ok(())
}

#[test]
#[serial]
fn test_unset_placeholder_becomes_empty_key() -> Result<()> {
    clear_env_vars();
    let (_dir, path) = write_config(MINIMAL_CONFIG)?;

    let config = get_config(Some(&path))?;
    assert_eq!(config.llm.api_key.as_deref(), Some(""));
    Ok(())
}

#[test]
#[serial]
fn test_environment_overrides() -> Result<()> {
    clear_env_vars();
    env::set_var("PORT", "9999");
    env::set_var("CONCIERGE_LLM__MODEL_NAME", "llama-3.1-8b-instant");
    env::set_var("CONCIERGE_KNOWLEDGE__SEARCH_LIMIT", "3");
    let (_dir, path) = write_config(MINIMAL_CONFIG)?;

    let config = get_config(Some(&path))?;

    assert_eq!(config.port, 9999);
    assert_eq!(config.llm.model_name, "llama-3.1-8b-instant");
    assert_eq!(config.knowledge.search_limit, 3);

    clear_env_vars();
    Ok(())
}

#[test]
#[serial]
fn test_missing_config_file() {
    clear_env_vars();
    let result = get_config(Some("/nonexistent/config.yml"));
    assert!(matches!(result, Err(ConfigError::NotFound(_))));
}

#[test]
#[serial]
fn test_missing_required_section() -> Result<()> {
    clear_env_vars();
    let (_dir, path) = write_config("port: 8080\n")?;

    let result = get_config(Some(&path));
    assert!(matches!(result, Err(ConfigError::General(_))));
    Ok(())
}

#[test]
#[serial]
fn test_shipped_config_loads() -> Result<()> {
    clear_env_vars();
    let config = get_config(None)?;

    assert_eq!(config.data.users_path, "data/users.json");
    assert_eq!(config.llm.provider, "local");
    assert_eq!(
        config.knowledge.document_path.as_deref(),
        Some("data/store_policies.txt")
    );
    assert_eq!(config.prompt_template_path.as_deref(), Some("prompt.txt"));
    Ok(())
}
