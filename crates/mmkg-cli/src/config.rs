//! Application configuration.
//!
//! Read from `mmkg.toml` (or `--config`), then overridden by environment
//! variables. Every section falls back to its defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use mmkg_core::DataConfig;
use mmkg_embedding::EmbeddingConfig;
use mmkg_graph::GraphConfig;

/// Config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "mmkg.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data: DataConfig,
    pub graph: GraphConfig,
    pub embedding: EmbeddingConfig,
}

impl AppConfig {
    /// Load from an explicit path, which must exist.
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: AppConfig =
            toml::from_str(&content).with_context(|| format!("Failed to parse config {}", path.display()))?;
        info!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Load `--config` if given, else `mmkg.toml` when present, else defaults;
    /// then apply environment overrides.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load(path)?,
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if path.is_file() {
                    Self::load(&path)?
                } else {
                    debug!("No config file, using defaults");
                    Self::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Override fields from environment-style lookups.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = var("NEO4J_URI") {
            self.graph.uri = v;
        }
        if let Some(v) = var("NEO4J_USERNAME") {
            self.graph.user = v;
        }
        if let Some(v) = var("NEO4J_PASSWORD") {
            self.graph.password = v;
        }
        if let Some(v) = var("OLLAMA_URL") {
            self.embedding.ollama_url = v;
        }
        if let Some(v) = var("OLLAMA_EMBED_MODEL") {
            self.embedding.embed_model = v;
        }
        if let Some(v) = var("OLLAMA_GEN_MODEL") {
            self.embedding.gen_model = v;
        }
        if let Some(v) = var("QDRANT_URL") {
            self.embedding.qdrant_url = v;
        }
        if let Some(v) = var("MMKG_DATA_ROOT") {
            self.data.root = PathBuf::from(v);
        }
    }
}
