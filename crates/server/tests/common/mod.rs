//! # Common Test Utilities
//!
//! `TestApp` spawns the real server on a random port against a temporary
//! config: fixture profile data, a plain-text policy document, an on-disk
//! knowledge index, and an `httpmock::MockServer` standing in for the
//! completion service.

// Not every test file uses every helper.
#![allow(unused)]

use anyhow::Result;
use axum::serve;
use concierge_server::{
    config, router,
    state::{build_app_state, AppState},
};
use concierge_test_utils::fixtures::{write_profile_files, SAMPLE_POLICY};
use httpmock::MockServer;
use reqwest::Client;
use std::{fs, net::SocketAddr, path::Path};
use tempfile::{tempdir, TempDir};
use tokio::{net::TcpListener, task::JoinHandle};

pub const MOCK_COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// Options that vary between test servers.
pub struct TestAppOptions {
    /// `None` leaves the completion service unconfigured.
    pub api_key: Option<&'static str>,
    /// Contents of the prompt template file, if one should be written.
    pub prompt_template: Option<&'static str>,
    /// Overrides the configured policy document path.
    pub document_path: Option<String>,
}

impl Default for TestAppOptions {
    fn default() -> Self {
        Self {
            api_key: Some("test-key"),
            prompt_template: None,
            document_path: None,
        }
    }
}

/// A harness for end-to-end testing of the Axum server.
pub struct TestApp {
    pub address: String,
    pub client: Client,
    pub mock_server: MockServer,
    pub app_state: AppState,
    _data_dir: TempDir,
    _server_handle: JoinHandle<()>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestApp {
    /// Spawns the application server with a configured completion service.
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with(TestAppOptions::default()).await
    }

    pub async fn spawn_with(options: TestAppOptions) -> Result<Self> {
        let mock_server = MockServer::start();
        let data_dir = tempdir()?;
        let config_path = write_test_config(data_dir.path(), &mock_server, &options)?;

        let config = config::get_config(Some(config_path.as_str()))?;
        let app_state = build_app_state(config).await?;
        Self::spawn_with_state(app_state, mock_server, data_dir).await
    }

    async fn spawn_with_state(
        app_state: AppState,
        mock_server: MockServer,
        data_dir: TempDir,
    ) -> Result<Self> {
        dotenvy::dotenv().ok();
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .compact()
            .try_init();

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr: SocketAddr = listener.local_addr()?;
        let address = format!("http://{addr}");

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let router_state = app_state.clone();
        let server_handle = tokio::spawn(async move {
            let app = router::create_router(router_state);
            let server = serve(listener, app).with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            });
            if let Err(e) = server.await {
                tracing::error!("[TestApp] Server error: {}", e);
            }
        });

        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Ok(Self {
            address,
            client: Client::new(),
            mock_server,
            app_state,
            _data_dir: data_dir,
            _server_handle: server_handle,
            shutdown_tx: Some(shutdown_tx),
        })
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Writes fixture data and a `config.yml` into `dir` and returns the config path.
pub fn write_test_config(
    dir: &Path,
    mock_server: &MockServer,
    options: &TestAppOptions,
) -> Result<String> {
    let (users_path, stores_path) = write_profile_files(dir)?;

    let document_path = match &options.document_path {
        Some(path) => path.clone(),
        None => {
            let path = dir.join("store_policies.txt");
            fs::write(&path, SAMPLE_POLICY)?;
            path.display().to_string()
        }
    };

    let prompt_line = match options.prompt_template {
        Some(template) => {
            let path = dir.join("prompt.txt");
            fs::write(&path, template)?;
            format!("prompt_template_path: \"{}\"", path.display())
        }
        None => String::new(),
    };

    let api_key = options.api_key.unwrap_or("");

    let config_content = format!(
        r#"
port: 0
data:
  users_path: "{users}"
  stores_path: "{stores}"
knowledge:
  db_path: "{db}"
  collection: "store_policies"
  document_path: "{document}"
  window_size: 3
  overlap: 0
  search_limit: 2
embedding:
  provider: "hashing"
  dimensions: 256
llm:
  provider: "local"
  api_url: "{llm_url}"
  api_key: "{api_key}"
  model_name: "mock-chat-model"
  timeout_secs: 5
{prompt_line}
"#,
        users = users_path.display(),
        stores = stores_path.display(),
        db = dir.join("db").join("knowledge.db").display(),
        document = document_path,
        llm_url = mock_server.url(MOCK_COMPLETIONS_PATH),
    );

    let config_path = dir.join("config.yml");
    fs::write(&config_path, config_content)?;
    Ok(config_path.display().to_string())
}

/// An OpenAI-style chat completion body carrying `content`.
pub fn completion_body(content: &str) -> serde_json::Value {
    serde_json::json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    })
}
