use thiserror::Error;

/// Errors raised while talking to the external AI services (completion,
/// embedding and entity-detection endpoints).
#[derive(Error, Debug)]
pub enum PromptError {
    #[error("Failed to build Reqwest client: {0}")]
    ReqwestClientBuild(reqwest::Error),
    #[error("Failed to send request to AI provider: {0}")]
    AiRequest(reqwest::Error),
    #[error("Request to AI provider timed out: {0}")]
    AiTimeout(reqwest::Error),
    #[error("Failed to deserialize AI provider response: {0}")]
    AiDeserialization(reqwest::Error),
    #[error("AI provider returned an error: {0}")]
    AiApi(String),
    #[error("AI provider is not configured: {0}")]
    MissingAiProvider(String),
    #[error("Unsupported provider type: {0}")]
    UnsupportedProvider(String),
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl PromptError {
    /// Maps a transport error, keeping timeouts distinguishable so callers can retry them.
    pub fn from_request(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PromptError::AiTimeout(err)
        } else {
            PromptError::AiRequest(err)
        }
    }

    /// Returns `true` for failures that may succeed if the request is repeated.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PromptError::AiTimeout(_))
    }
}
