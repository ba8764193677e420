use reqwest::Client;
use std::time::Duration;

use crate::domain::PipelineError;
use crate::infrastructure::config::Config;

/// HTTP client for the Cohere API, implementing the embedding, rerank and
/// chat ports. One instance serves all three concerns and is cheap to
/// clone.
#[derive(Clone)]
pub struct CohereClient {
    pub(super) http: Client,
    pub(super) base_url: String,
    pub(super) api_key: String,
    pub(super) timeout: Duration,
    pub(super) config: Config,
}

impl CohereClient {
    pub fn new(api_key: impl Into<String>, config: &Config) -> Self {
        Self {
            http: Client::new(),
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(config.chat.request_timeout_seconds),
            config: config.clone(),
        }
    }

    /// Reads `COHERE_API_KEY` from the environment.
    pub fn from_env(config: &Config) -> Result<Self, PipelineError> {
        let api_key = std::env::var("COHERE_API_KEY")
            .map_err(|_| PipelineError::config("COHERE_API_KEY is not set"))?;
        Ok(Self::new(api_key, config))
    }

    pub(super) fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.http
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
    }
}
