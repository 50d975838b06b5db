use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api/grammar";

/// Everything that can go wrong talking to the grammar service.
///
/// The variants only matter for diagnostics; the conversation shows the same
/// fallback reply for all of them.
#[derive(Debug, Error)]
pub enum RequestFailure {
    #[error("could not reach grammar service: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("grammar service answered with status {0}")]
    Status(StatusCode),
    #[error("malformed grammar service response: {0}")]
    Malformed(String),
}

/// Source of corrections for the conversation controller.
#[async_trait]
pub trait GrammarService: Send + Sync {
    async fn correct(&self, text: &str) -> Result<String, RequestFailure>;
}

#[derive(Serialize)]
struct GrammarRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GrammarResponse {
    result: Option<String>,
}

#[derive(Clone)]
pub struct GrammarClient {
    client: Client,
    api_url: String,
}

impl GrammarClient {
    pub fn new(api_url: &str) -> Self {
        Self {
            client: Client::new(),
            api_url: api_url.to_string(),
        }
    }

    /// Client whose requests give up after `timeout`.
    pub fn with_timeout(api_url: &str, timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_url: api_url.to_string(),
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub async fn check(&self, text: &str) -> Result<String, RequestFailure> {
        let response = self
            .client
            .post(&self.api_url)
            .header(CONTENT_TYPE, "application/json")
            .json(&GrammarRequest { text })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RequestFailure::Status(status));
        }

        let body = response.text().await?;
        trace!(bytes = body.len(), "grammar service body received");

        let parsed: GrammarResponse = serde_json::from_str(&body)
            .map_err(|e| RequestFailure::Malformed(e.to_string()))?;

        parsed
            .result
            .ok_or_else(|| RequestFailure::Malformed("missing `result` field".to_string()))
    }
}

#[async_trait]
impl GrammarService for GrammarClient {
    async fn correct(&self, text: &str) -> Result<String, RequestFailure> {
        debug!(url = %self.api_url, chars = text.chars().count(), "posting to grammar service");
        self.check(text).await
    }
}
