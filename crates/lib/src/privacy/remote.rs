use super::{Recognizer, RecognizerResult};
use crate::errors::PromptError;
use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

// --- Presidio-compatible request and response structures ---

#[derive(Serialize, Debug)]
struct AnalyzeRequest<'a> {
    text: &'a str,
    language: &'a str,
    entities: &'a [String],
}

#[derive(Deserialize, Debug)]
struct AnalyzeResult {
    entity_type: String,
    start: usize,
    end: usize,
    score: f64,
}

/// An entity detector backed by a Presidio-compatible `/analyze` endpoint.
///
/// The service reports character offsets; they are converted to byte offsets
/// before being handed to the anonymizer.
#[derive(Clone, Debug)]
pub struct RemoteAnalyzer {
    client: ReqwestClient,
    api_url: String,
}

impl RemoteAnalyzer {
    pub fn new(api_url: String, timeout: Duration) -> Result<Self, PromptError> {
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(PromptError::ReqwestClientBuild)?;
        Ok(Self { client, api_url })
    }
}

#[async_trait]
impl Recognizer for RemoteAnalyzer {
    fn name(&self) -> &str {
        "remote_analyzer"
    }

    async fn analyze(
        &self,
        text: &str,
        entities: &[String],
        language: &str,
    ) -> Result<Vec<RecognizerResult>, PromptError> {
        let request_body = AnalyzeRequest {
            text,
            language,
            entities,
        };
        debug!(url = %self.api_url, "--> Sending text to entity analyzer");

        let response = self
            .client
            .post(&self.api_url)
            .json(&request_body)
            .send()
            .await
            .map_err(PromptError::from_request)?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(PromptError::AiApi(error_text));
        }

        let results: Vec<AnalyzeResult> = response
            .json()
            .await
            .map_err(PromptError::AiDeserialization)?;

        Ok(results
            .into_iter()
            .filter_map(|r| {
                let start = char_to_byte(text, r.start)?;
                let end = char_to_byte(text, r.end)?;
                (start < end).then(|| RecognizerResult {
                    entity_type: r.entity_type,
                    start,
                    end,
                    score: r.score,
                })
            })
            .collect())
    }
}

/// Converts a character offset into a byte offset; `None` if out of range.
fn char_to_byte(text: &str, char_offset: usize) -> Option<usize> {
    if char_offset == text.chars().count() {
        return Some(text.len());
    }
    text.char_indices().nth(char_offset).map(|(idx, _)| idx)
}
