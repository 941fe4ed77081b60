//! Document indexing and retrieval over Ollama embeddings and Qdrant.

use anyhow::Result;
use serde::Serialize;
use tracing::{info, warn};

use mmkg_core::document::Document;

use crate::config::EmbeddingConfig;
use crate::ollama::OllamaClient;
use crate::qdrant::{QdrantStore, VectorPoint};

/// Points sent to Qdrant per upsert call.
const UPSERT_BATCH: usize = 32;

/// Indexed and failed document counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexResult {
    pub indexed: usize,
    pub failed: usize,
}

/// A retrieved chunk with its similarity score.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedChunk {
    pub source: String,
    pub content: String,
    pub score: f32,
}

/// Embeds documents into a Qdrant collection and searches it.
#[derive(Clone)]
pub struct DocumentIndex {
    embedder: OllamaClient,
    store: QdrantStore,
    collection: String,
    dim: usize,
}

impl DocumentIndex {
    pub fn new(embedder: OllamaClient, store: QdrantStore, collection: &str, dim: usize) -> Self {
        Self {
            embedder,
            store,
            collection: collection.to_string(),
            dim,
        }
    }

    /// Build an index from configuration.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        Ok(Self::new(
            OllamaClient::new(&config.ollama_url, &config.embed_model),
            QdrantStore::new(&config.qdrant_url)?,
            &config.collection,
            config.embedding_dim,
        ))
    }

    pub fn embedder(&self) -> &OllamaClient {
        &self.embedder
    }

    pub async fn count(&self) -> Result<u64> {
        self.store.count(&self.collection).await
    }

    /// Embed and upsert documents.
    ///
    /// A document whose embedding fails is logged and counted; a failed
    /// batch upsert counts every document in it. `on_progress` is called
    /// once per document.
    pub async fn index<F>(&self, documents: &[Document], recreate: bool, on_progress: F) -> Result<IndexResult>
    where
        F: Fn(usize),
    {
        if recreate {
            self.store.drop_collection(&self.collection).await?;
        }
        self.store.ensure_collection(&self.collection, self.dim).await?;

        let mut result = IndexResult::default();
        let mut batch: Vec<VectorPoint> = Vec::with_capacity(UPSERT_BATCH);

        for (i, doc) in documents.iter().enumerate() {
            match self.embedder.embed(&doc.content).await {
                Ok(vector) if vector.len() == self.dim => batch.push(VectorPoint {
                    id: doc.id.clone(),
                    vector,
                    payload: payload(doc),
                }),
                Ok(vector) => {
                    result.failed += 1;
                    warn!(id = %doc.id, got = vector.len(), expected = self.dim, "Embedding dimension mismatch");
                }
                Err(e) => {
                    result.failed += 1;
                    warn!(id = %doc.id, error = %format!("{:#}", e), "Embedding failed");
                }
            }

            if batch.len() >= UPSERT_BATCH {
                self.flush(&mut batch, &mut result).await;
            }
            on_progress(i + 1);
        }
        self.flush(&mut batch, &mut result).await;

        info!(
            collection = %self.collection,
            indexed = result.indexed,
            failed = result.failed,
            "Document indexing complete"
        );
        Ok(result)
    }

    async fn flush(&self, batch: &mut Vec<VectorPoint>, result: &mut IndexResult) {
        if batch.is_empty() {
            return;
        }
        let points = std::mem::take(batch);
        let count = points.len();
        match self.store.upsert(&self.collection, points).await {
            Ok(()) => result.indexed += count,
            Err(e) => {
                result.failed += count;
                warn!(count, error = %format!("{:#}", e), "Vector upsert failed");
            }
        }
    }

    /// Top-k chunks most similar to the query.
    pub async fn search(&self, query: &str, top_k: u64) -> Result<Vec<RetrievedChunk>> {
        let vector = self.embedder.embed(query).await?;
        let hits = self.store.search(&self.collection, vector, top_k).await?;

        Ok(hits
            .into_iter()
            .map(|hit| RetrievedChunk {
                source: hit.payload["source"].as_str().unwrap_or_default().to_string(),
                content: hit.payload["content"].as_str().unwrap_or_default().to_string(),
                score: hit.score,
            })
            .collect())
    }
}

/// Document metadata plus its content and id, as a flat JSON object.
fn payload(doc: &Document) -> serde_json::Value {
    let mut map: serde_json::Map<String, serde_json::Value> =
        doc.metadata.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    map.insert("doc_id".to_string(), doc.id.clone().into());
    map.insert("content".to_string(), doc.content.clone().into());
    map.entry("source".to_string()).or_insert_with(|| doc.id.clone().into());
    serde_json::Value::Object(map)
}
