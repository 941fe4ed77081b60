//! # MMKG Embedding
//!
//! Vector embeddings via Ollama, similarity search via Qdrant and text
//! generation for the MMKG retrieval chain.

pub mod chunker;
pub mod config;
pub mod generate;
pub mod index;
pub mod ollama;
pub mod qdrant;

pub use config::EmbeddingConfig;
pub use generate::OllamaGenerator;
pub use index::{DocumentIndex, IndexResult, RetrievedChunk};
pub use ollama::OllamaClient;
pub use qdrant::QdrantStore;
