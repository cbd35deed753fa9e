//! Adapter for the generative text service.
//!
//! The rest of the pipeline only sees the [`CompletionService`] trait and a
//! typed [`ServiceError`]. Turning HTTP statuses and transport failures into
//! an [`ErrorKind`] happens in exactly one place, [`classify_status`] and
//! [`classify_transport`].

use crate::config::TranslationConfig;
use crate::error::{Result, SozlukError};
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::trace;

/// How a failed completion call should be treated by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The call exceeded its wait ceiling.
    Timeout,
    /// Rate limit or quota exhausted for the credential used.
    RateLimited,
    /// The credential itself was refused.
    Rejected,
    /// The service answered, but not in a shape we can read.
    MalformedResponse,
    /// Anything else: connectivity, server errors.
    Other,
}

/// A failed completion call.
#[derive(Error, Debug, Clone)]
#[error("{kind:?}: {message}")]
pub struct ServiceError {
    /// Classification of the failure.
    pub kind: ErrorKind,
    /// Human-readable detail for logs.
    pub message: String,
}

impl ServiceError {
    /// Create a new service error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// A text-completion backend.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Send one completion request and return the raw response text.
    async fn complete(
        &self,
        credential: &str,
        instructions: &str,
        payload: &str,
    ) -> std::result::Result<String, ServiceError>;
}

/// Map a non-success HTTP status and its body to an [`ErrorKind`].
pub fn classify_status(status: u16, body: &str) -> ErrorKind {
    let lowered = body.to_lowercase();
    if status == 429 || lowered.contains("resource_exhausted") || lowered.contains("quota") {
        return ErrorKind::RateLimited;
    }

    match status {
        401 | 403 => ErrorKind::Rejected,
        400 if lowered.contains("api_key_invalid") || lowered.contains("api key not valid") => {
            ErrorKind::Rejected
        }
        _ => ErrorKind::Other,
    }
}

/// Map a transport-level `reqwest` failure to an [`ErrorKind`].
pub fn classify_transport(error: &reqwest::Error) -> ErrorKind {
    if error.is_timeout() {
        ErrorKind::Timeout
    } else if error.is_decode() {
        ErrorKind::MalformedResponse
    } else if let Some(status) = error.status() {
        classify_status(status.as_u16(), "")
    } else {
        ErrorKind::Other
    }
}

/// Google Gemini `generateContent` client.
#[derive(Debug, Clone)]
pub struct GeminiService {
    client: Client,
    base_url: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

impl GeminiService {
    /// Create a client from the translation settings.
    pub fn new(config: &TranslationConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .timeout(config.timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .default_headers(headers)
            .gzip(true)
            .build()
            .map_err(SozlukError::HttpRequest)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

#[async_trait]
impl CompletionService for GeminiService {
    async fn complete(
        &self,
        credential: &str,
        instructions: &str,
        payload: &str,
    ) -> std::result::Result<String, ServiceError> {
        let body = json!({
            "systemInstruction": { "parts": [{ "text": instructions }] },
            "contents": [{ "role": "user", "parts": [{ "text": payload }] }],
            "generationConfig": { "responseMimeType": "application/json" },
        });

        trace!(model = %self.model, "Sending completion request");

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", credential)
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceError::new(classify_transport(&e), format!("request failed: {e}")))?;

        let status = response.status();
        if status != StatusCode::OK {
            let error_body = response.text().await.unwrap_or_default();
            let truncated: String = error_body.chars().take(500).collect();
            return Err(ServiceError::new(
                classify_status(status.as_u16(), &error_body),
                format!("HTTP {}: {}", status.as_u16(), truncated),
            ));
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            let kind = match classify_transport(&e) {
                ErrorKind::Timeout => ErrorKind::Timeout,
                _ => ErrorKind::MalformedResponse,
            };
            ServiceError::new(kind, format!("failed to read response: {e}"))
        })?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .ok_or_else(|| {
                ServiceError::new(ErrorKind::MalformedResponse, "response has no candidates")
            })?;

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_rate_limit_markers() {
        assert_eq!(classify_status(429, ""), ErrorKind::RateLimited);
        assert_eq!(
            classify_status(400, r#"{"error":{"status":"RESOURCE_EXHAUSTED"}}"#),
            ErrorKind::RateLimited
        );
        assert_eq!(
            classify_status(500, "You exceeded your current Quota"),
            ErrorKind::RateLimited
        );
    }

    #[test]
    fn test_classify_rejected_credentials() {
        assert_eq!(classify_status(403, "forbidden"), ErrorKind::Rejected);
        assert_eq!(
            classify_status(400, "API key not valid. Please pass a valid API key."),
            ErrorKind::Rejected
        );
    }

    #[test]
    fn test_classify_other() {
        assert_eq!(classify_status(500, "internal"), ErrorKind::Other);
        assert_eq!(classify_status(503, "overloaded"), ErrorKind::Other);
        assert_eq!(classify_status(400, "bad request"), ErrorKind::Other);
    }

    #[test]
    fn test_service_error_display() {
        let err = ServiceError::new(ErrorKind::Timeout, "after 120s");
        assert_eq!(err.to_string(), "Timeout: after 120s");
    }
}
