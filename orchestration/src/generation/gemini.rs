//! Gemini-backed [`GenerationClient`].

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{GenerationClient, API_KEY_ENV};
use crate::errors::{OrchestrationError, OrchestrationResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Client for the Gemini `generateContent` endpoint.
pub struct GeminiClient {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("failed to build HTTP client"),
        }
    }

    /// Build a client from [`API_KEY_ENV`]. An absent credential still
    /// yields a client; `is_available` reports `false` and the run stays
    /// on its simulated branch.
    pub fn from_env(model: String) -> Self {
        let api_key = std::env::var(API_KEY_ENV).unwrap_or_default();
        Self::new(api_key, model)
    }
}

#[async_trait]
impl GenerationClient for GeminiClient {
    fn name(&self) -> &str {
        &self.model
    }

    fn is_available(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    async fn generate(
        &self,
        prompt: &str,
        system_instruction: Option<&str>,
    ) -> OrchestrationResult<String> {
        if !self.is_available() {
            return Err(OrchestrationError::Connectivity(format!(
                "{API_KEY_ENV} not configured"
            )));
        }

        let mut request_body = serde_json::json!({
            "contents": [{
                "parts": [{ "text": prompt }]
            }],
            "generationConfig": {
                "temperature": 0.7,
                "maxOutputTokens": 2048
            }
        });
        if let Some(instruction) = system_instruction {
            request_body["systemInstruction"] = serde_json::json!({
                "parts": [{ "text": instruction }]
            });
        }

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model, self.api_key
        );

        debug!(model = %self.model, prompt_chars = prompt.len(), "dispatching generation request");

        let response = self
            .client
            .post(&url)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| OrchestrationError::Generation(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OrchestrationError::Generation(format!(
                "backend error ({status}): {body}"
            )));
        }

        let resp_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| OrchestrationError::Generation(e.to_string()))?;

        let text = resp_json["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .unwrap_or("")
            .to_string();

        if text.is_empty() {
            return Err(OrchestrationError::Generation(
                "backend returned an empty candidate".to_string(),
            ));
        }

        Ok(text)
    }
}
