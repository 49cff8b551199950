//! HTTP completion client for chat-completions style backends.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use super::{CompletionService, ServiceError};

/// Completion client speaking the OpenAI-compatible chat-completions wire
/// shape, the common denominator across hosted generation backends.
///
/// The request timeout here is a transport-level bound; stages apply their
/// own per-turn timeout on top and treat both identically.
pub struct HttpCompletionService {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpCompletionService {
    /// Creates a client against `base_url` (e.g. `https://api.deepseek.com`).
    ///
    /// # Errors
    ///
    /// Propagates client construction failures from the underlying HTTP
    /// stack (TLS backend initialization, invalid configuration).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
        })
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }
}

#[async_trait]
impl CompletionService for HttpCompletionService {
    async fn complete(&self, model: &str, prompt: &str) -> Result<String, ServiceError> {
        let body = json!({
            "model": model,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let mut request = self.client.post(self.endpoint()).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Http {
                status: status.as_u16(),
            });
        }

        let value: Value = response.json().await?;
        value["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ServiceError::MalformedReply {
                detail: "missing choices[0].message.content".to_string(),
            })
    }
}
