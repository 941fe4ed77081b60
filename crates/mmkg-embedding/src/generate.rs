//! Text generation through Ollama's /api/generate endpoint.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::debug;

use crate::ollama::http_client;

/// Non-streaming completion client.
#[derive(Clone)]
pub struct OllamaGenerator {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl OllamaGenerator {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client: http_client(Duration::from_secs(120)),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generate text from a prompt.
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let request_body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false
        });

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request_body)
            .send()
            .await
            .with_context(|| format!("Failed to connect to Ollama at {}", self.base_url))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            if body.contains("model") && body.contains("not found") {
                bail!("Model '{}' not found. Pull it with: ollama pull {}", self.model, self.model);
            }
            bail!("Ollama API error ({}): {}", status, body);
        }

        let result: serde_json::Value = response.json().await.context("Failed to parse Ollama response")?;
        let text = result["response"].as_str().unwrap_or("").trim().to_string();

        debug!(model = %self.model, chars = text.len(), "Generated completion");
        Ok(text)
    }
}
