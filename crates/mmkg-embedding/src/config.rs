//! Embedding, vector store and generation settings.

use serde::{Deserialize, Serialize};

use crate::ollama::{DEFAULT_GEN_MODEL, DEFAULT_MODEL, DEFAULT_OLLAMA_URL, EMBEDDING_DIM};
use crate::qdrant::{DEFAULT_QDRANT_URL, DOCUMENTS_COLLECTION};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub ollama_url: String,
    pub embed_model: String,
    pub gen_model: String,
    pub embedding_dim: usize,
    pub qdrant_url: String,
    pub collection: String,
    /// Upper bound on chunk length in characters.
    pub chunk_size: usize,
    pub top_k: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            embed_model: DEFAULT_MODEL.to_string(),
            gen_model: DEFAULT_GEN_MODEL.to_string(),
            embedding_dim: EMBEDDING_DIM,
            qdrant_url: DEFAULT_QDRANT_URL.to_string(),
            collection: DOCUMENTS_COLLECTION.to_string(),
            chunk_size: 1000,
            top_k: 5,
        }
    }
}
