use async_trait::async_trait;
use log::{debug, error, warn};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::app_config::TranslationConfig;
use crate::errors::ProviderError;
use crate::providers::Translator;

/// Client for a LibreTranslate-compatible `/translate` API
#[derive(Debug)]
pub struct LibreTranslate {
    /// Base URL of the service
    base_url: String,
    /// Optional API key (required by the public instance)
    api_key: Option<String>,
    /// HTTP client for making requests
    client: Client,
    /// Maximum number of retry attempts
    max_retries: u32,
    /// Base backoff time in milliseconds for exponential backoff
    backoff_base_ms: u64,
}

/// Translate request body
#[derive(Debug, Serialize)]
pub struct TranslateRequest {
    /// Lines to translate
    q: Vec<String>,
    /// Source language code
    source: String,
    /// Target language code
    target: String,
    /// Either "text" or "html"
    format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<String>,
}

impl TranslateRequest {
    /// Create a plain-text translation request
    pub fn new(texts: Vec<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            q: texts,
            source: source.into(),
            target: target.into(),
            format: "text".to_string(),
            api_key: None,
        }
    }

    /// Set the API key
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

/// Translate response body
#[derive(Debug, Deserialize)]
pub struct TranslateResponse {
    #[serde(rename = "translatedText")]
    pub translated_text: TranslatedText,
}

/// The service echoes the shape of `q`: a list for a list, a string for a string
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TranslatedText {
    Batch(Vec<String>),
    Single(String),
}

impl TranslatedText {
    pub fn into_lines(self) -> Vec<String> {
        match self {
            Self::Batch(lines) => lines,
            Self::Single(line) => vec![line],
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

impl LibreTranslate {
    /// Create a client with default retry settings
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            base_url: endpoint.into().trim_end_matches('/').to_string(),
            api_key: None,
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            max_retries: 3,
            backoff_base_ms: 1000,
        }
    }

    /// Create a client from the translation section of the config
    pub fn from_config(config: &TranslationConfig) -> Self {
        Self {
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            api_key: (!config.api_key.is_empty()).then(|| config.api_key.clone()),
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()
                .unwrap_or_default(),
            max_retries: config.retry_count,
            backoff_base_ms: config.retry_backoff_ms,
        }
    }

    /// Full URL of the translate endpoint
    pub fn translate_url(&self) -> String {
        format!("{}/translate", self.base_url)
    }

    /// Send a translate request, retrying transient failures with exponential backoff
    pub async fn translate(&self, request: &TranslateRequest) -> Result<TranslateResponse, ProviderError> {
        let url = self.translate_url();
        let mut attempt = 0;

        loop {
            match self.send_once(&url, request).await {
                Ok(response) => return Ok(response),
                Err(e) if attempt < self.max_retries && is_retryable(&e) => {
                    let delay = self.backoff_base_ms.saturating_mul(1 << attempt.min(16));
                    warn!("Translation request failed (attempt {}): {}. Retrying in {}ms", attempt + 1, e, delay);
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!("Translation request failed: {}", e);
                    return Err(e);
                }
            }
        }
    }

    async fn send_once(&self, url: &str, request: &TranslateRequest) -> Result<TranslateResponse, ProviderError> {
        let response = self.client.post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    ProviderError::ConnectionError(e.to_string())
                } else {
                    ProviderError::RequestFailed(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response.text().await
            .map_err(|e| ProviderError::RequestFailed(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            return Err(status_error(status, &body));
        }

        serde_json::from_str::<TranslateResponse>(&body)
            .map_err(|e| ProviderError::ParseError(format!("{} (body: {})", e, truncate(&body, 200))))
    }
}

/// Map a non-success HTTP status to a provider error
fn status_error(status: StatusCode, body: &str) -> ProviderError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.error)
        .unwrap_or_else(|_| truncate(body, 200));

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::AuthenticationError(message),
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimitExceeded(message),
        _ => ProviderError::ApiError {
            status_code: status.as_u16(),
            message,
        },
    }
}

fn is_retryable(error: &ProviderError) -> bool {
    match error {
        ProviderError::ConnectionError(_) | ProviderError::RateLimitExceeded(_) => true,
        ProviderError::ApiError { status_code, .. } => *status_code >= 500,
        _ => false,
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        text.chars().take(max_chars).collect()
    } else {
        text.to_string()
    }
}

#[async_trait]
impl Translator for LibreTranslate {
    async fn translate_batch(
        &self,
        texts: &[String],
        source_language: &str,
        target_language: &str,
    ) -> Result<Vec<String>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut request = TranslateRequest::new(texts.to_vec(), source_language, target_language);
        if let Some(api_key) = &self.api_key {
            request = request.api_key(api_key.clone());
        }

        debug!("Sending {} lines to {}", texts.len(), self.translate_url());
        let response = self.translate(&request).await?;

        Ok(response.translated_text.into_lines())
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let url = format!("{}/languages", self.base_url);
        let response = self.client.get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::ConnectionError(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(status_error(status, &body))
        }
    }
}
