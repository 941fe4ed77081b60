//! Ollama embeddings for document chunks and questions.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default Ollama API URL.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Default embedding model.
pub const DEFAULT_MODEL: &str = "nomic-embed-text";

/// Default text generation model.
pub const DEFAULT_GEN_MODEL: &str = "llama3.2:3b";

/// Expected embedding dimension for nomic-embed-text.
pub const EMBEDDING_DIM: usize = 768;

/// Shared HTTP client with a request timeout.
pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_default()
}

/// Ollama embedding client.
#[derive(Clone)]
pub struct OllamaClient {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client: http_client(Duration::from_secs(30)),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Embed one text.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Failed to connect to Ollama at {}", self.base_url))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Ollama embeddings failed ({}): {}", status, body);
        }

        let result: EmbeddingResponse = response.json().await.context("Failed to parse Ollama response")?;
        if result.embedding.is_empty() {
            bail!("Ollama returned an empty embedding for model '{}'", self.model);
        }

        debug!(dim = result.embedding.len(), "Generated embedding");
        Ok(result.embedding)
    }

    /// Whether Ollama answers and lists the configured model.
    pub async fn health_check(&self) -> bool {
        let tags = match self.client.get(format!("{}/api/tags", self.base_url)).send().await {
            Ok(resp) if resp.status().is_success() => resp.json::<TagsResponse>().await,
            Ok(resp) => {
                debug!(status = %resp.status(), "Ollama tags request rejected");
                return false;
            }
            Err(e) => {
                debug!(error = %e, "Ollama unreachable");
                return false;
            }
        };

        match tags {
            Ok(tags) => tags.models.iter().any(|m| same_model(&m.name, &self.model)),
            Err(_) => false,
        }
    }
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Deserialize)]
struct TagEntry {
    name: String,
}

/// Model names match with or without the implicit `:latest` tag.
fn same_model(listed: &str, wanted: &str) -> bool {
    let strip = |name: &str| name.strip_suffix(":latest").unwrap_or(name).to_string();
    strip(listed) == strip(wanted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_model_ignores_latest_tag() {
        assert!(same_model("nomic-embed-text:latest", "nomic-embed-text"));
        assert!(same_model("llama3.2:3b", "llama3.2:3b"));
        assert!(!same_model("llama3.2:1b", "llama3.2:3b"));
    }

    #[test]
    fn test_tags_response_parses() {
        let tags: TagsResponse =
            serde_json::from_str(r#"{"models":[{"name":"nomic-embed-text:latest","size":274302450}]}"#).unwrap();
        assert_eq!(tags.models.len(), 1);
        assert!(serde_json::from_str::<TagsResponse>("{}").unwrap().models.is_empty());
    }
}
