//! # Application Configuration
//!
//! This module defines the configuration structure for the `concierge-server` and
//! provides the logic for loading it from a `config.yml` file and environment
//! variables.

use concierge::{
    constants::{
        DEFAULT_COLLECTION, DEFAULT_KNOWLEDGE_DB_FILE, DEFAULT_LANGUAGE, DEFAULT_SEARCH_LIMIT,
        DEFAULT_WINDOW_OVERLAP, DEFAULT_WINDOW_SIZE,
    },
    EmbeddingConfig, LocationPolicy, ProviderConfig,
};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use regex::Regex;
use serde::Deserialize;
use std::{env, fs, sync::LazyLock};
use tracing::info;

static ENV_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{(?P<var>[A-Z0-9_]+)\}").expect("valid env placeholder regex")
});

/// A custom error type for configuration issues.
#[derive(Debug)]
pub enum ConfigError {
    /// Indicates an error from the underlying `config` crate.
    General(String),
    /// Indicates a required configuration file was not found.
    NotFound(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::General(msg) => write!(f, "Configuration error: {msg}"),
            ConfigError::NotFound(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::General(err.to_string())
    }
}

/// The root configuration structure, mapping directly to `config.yml`.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// The port for the server to listen on. Overridden by the `PORT` env var.
    #[serde(default = "default_port")]
    pub port: u16,
    pub data: DataConfig,
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub privacy: PrivacyConfig,
    /// The completion service. An empty `api_key` leaves it unconfigured.
    pub llm: ProviderConfig,
    #[serde(default)]
    pub location: LocationPolicy,
    /// A system prompt template read on every request. The built-in template is
    /// used when unset or unreadable.
    #[serde(default)]
    pub prompt_template_path: Option<String>,
}

fn default_port() -> u16 {
    8000
}

/// Locations of the customer and store data files.
#[derive(Debug, Deserialize, Clone)]
pub struct DataConfig {
    pub users_path: String,
    pub stores_path: String,
}

/// Settings for the policy document index.
#[derive(Debug, Deserialize, Clone)]
pub struct KnowledgeConfig {
    #[serde(default = "default_knowledge_db")]
    pub db_path: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    /// The document ingested at startup.
    #[serde(default)]
    pub document_path: Option<String>,
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            db_path: default_knowledge_db(),
            collection: default_collection(),
            document_path: None,
            window_size: default_window_size(),
            overlap: default_overlap(),
            search_limit: default_search_limit(),
        }
    }
}

fn default_knowledge_db() -> String {
    DEFAULT_KNOWLEDGE_DB_FILE.to_string()
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

fn default_window_size() -> usize {
    DEFAULT_WINDOW_SIZE
}

fn default_overlap() -> usize {
    DEFAULT_WINDOW_OVERLAP
}

fn default_search_limit() -> usize {
    DEFAULT_SEARCH_LIMIT
}

/// Entity detection settings.
#[derive(Debug, Deserialize, Clone)]
pub struct PrivacyConfig {
    #[serde(default = "default_language")]
    pub language: String,
    /// A Presidio-compatible `/analyze` endpoint used alongside the local rules.
    #[serde(default)]
    pub analyzer_url: Option<String>,
    #[serde(default = "default_analyzer_timeout")]
    pub analyzer_timeout_secs: u64,
}

impl Default for PrivacyConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            analyzer_url: None,
            analyzer_timeout_secs: default_analyzer_timeout(),
        }
    }
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

fn default_analyzer_timeout() -> u64 {
    10
}

// Helper to read a file, substitute env vars, and return its content.
// Returns Ok(None) if the file does not exist, or an error if it fails to read.
fn read_and_substitute(path: &str) -> Result<Option<String>, ConfigError> {
    if !std::path::Path::new(path).exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .map_err(|e| ConfigError::General(format!("Failed to read config file '{path}': {e}")))?;

    let expanded_content = ENV_PLACEHOLDER.replace_all(&content, |caps: &regex::Captures| {
        let var_name = &caps["var"];
        env::var(var_name).unwrap_or_default()
    });

    Ok(Some(expanded_content.to_string()))
}

/// Loads the application configuration from a file and environment variables.
///
/// - `${VAR}` placeholders in the YAML are replaced with environment values
///   (empty when unset).
/// - Top-level keys like `port` are overridden by `PORT`.
/// - Nested keys are overridden by `CONCIERGE_...` variables (e.g.
///   `CONCIERGE_LLM__MODEL_NAME`).
pub fn get_config(config_path_override: Option<&str>) -> Result<AppConfig, ConfigError> {
    let base_path = env!("CARGO_MANIFEST_DIR");
    let config_path = match config_path_override {
        Some(path) => path.to_string(),
        None => format!("{base_path}/config.yml"),
    };

    let content = read_and_substitute(&config_path)?.ok_or_else(|| {
        ConfigError::NotFound(format!("Config file not found at '{config_path}'."))
    })?;
    info!("Loading configuration from '{config_path}'.");

    let settings = ConfigBuilder::builder()
        .add_source(File::from_str(&content, FileFormat::Yaml))
        // Top-level keys like PORT.
        .add_source(Environment::default())
        // Prefixed variables for nested overrides.
        .add_source(
            Environment::with_prefix("CONCIERGE")
                .prefix_separator("_")
                .try_parsing(true)
                .separator("__"),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}
