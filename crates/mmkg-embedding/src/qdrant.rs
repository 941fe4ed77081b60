//! Qdrant vector store client.
//!
//! Manages the document collection, upserts vectors and performs similarity
//! search against the Qdrant service via the qdrant-client gRPC library.

use std::collections::HashMap;

use anyhow::{Context, Result};
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::{
    value::Kind, CreateCollectionBuilder, Distance, PointId, PointStruct, SearchPointsBuilder, UpsertPointsBuilder,
    Value, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

/// Default Qdrant gRPC URL.
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";

/// Collection holding document chunks.
pub const DOCUMENTS_COLLECTION: &str = "mmkg_documents";

/// A search result from Qdrant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorSearchResult {
    pub id: String,
    pub score: f32,
    pub payload: serde_json::Value,
}

/// A vector ready for upsert.
#[derive(Debug, Clone)]
pub struct VectorPoint {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: serde_json::Value,
}

/// Qdrant vector store client.
#[derive(Clone)]
pub struct QdrantStore {
    client: Qdrant,
}

impl QdrantStore {
    /// Create a new QdrantStore client.
    pub fn new(url: &str) -> Result<Self> {
        let client = Qdrant::from_url(url)
            .build()
            .with_context(|| format!("Failed to create Qdrant client for {}", url))?;

        Ok(Self { client })
    }

    /// Ensure a cosine collection of the given dimension exists.
    pub async fn ensure_collection(&self, collection_name: &str, dim: usize) -> Result<()> {
        let exists = self
            .client
            .collection_exists(collection_name)
            .await
            .context("Failed to check collection")?;

        if exists {
            debug!(collection = collection_name, "Collection already exists");
            return Ok(());
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(collection_name)
                    .vectors_config(VectorParamsBuilder::new(dim as u64, Distance::Cosine)),
            )
            .await
            .context("Failed to create collection")?;

        info!(collection = collection_name, dim, "Created Qdrant collection");
        Ok(())
    }

    /// Drop a collection if it exists.
    pub async fn drop_collection(&self, collection_name: &str) -> Result<()> {
        let exists = self
            .client
            .collection_exists(collection_name)
            .await
            .context("Failed to check collection")?;
        if exists {
            self.client
                .delete_collection(collection_name)
                .await
                .context("Failed to delete collection")?;
            info!(collection = collection_name, "Dropped Qdrant collection");
        }
        Ok(())
    }

    /// Upsert a batch of vectors with payloads.
    pub async fn upsert(&self, collection: &str, points: Vec<VectorPoint>) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }
        let count = points.len();
        let points: Vec<PointStruct> = points
            .into_iter()
            .map(|p| PointStruct::new(point_id(&p.id), p.vector, json_to_payload(&p.payload)))
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, points).wait(true))
            .await
            .context("Failed to upsert points")?;

        debug!(collection, count, "Upserted vectors");
        Ok(())
    }

    /// Search for similar vectors in a collection.
    pub async fn search(&self, collection: &str, query_vector: Vec<f32>, top_k: u64) -> Result<Vec<VectorSearchResult>> {
        let response = self
            .client
            .search_points(SearchPointsBuilder::new(collection, query_vector, top_k).with_payload(true))
            .await
            .context("Failed to search points")?;

        let results = response
            .result
            .into_iter()
            .map(|point| VectorSearchResult {
                id: point.id.map(point_id_string).unwrap_or_default(),
                score: point.score,
                payload: payload_to_json(&point.payload),
            })
            .collect();

        Ok(results)
    }

    /// Get the number of points in a collection.
    pub async fn count(&self, collection: &str) -> Result<u64> {
        let info = self
            .client
            .collection_info(collection)
            .await
            .context("Failed to get collection info")?;

        Ok(info.result.and_then(|r| r.points_count).unwrap_or(0))
    }
}

/// Deterministic UUID for a document id, so re-indexing overwrites points.
pub fn point_id(id: &str) -> String {
    match Uuid::parse_str(id) {
        Ok(uuid) => uuid.to_string(),
        Err(_) => Uuid::new_v5(&Uuid::NAMESPACE_OID, id.as_bytes()).to_string(),
    }
}

fn point_id_string(id: PointId) -> String {
    match id.point_id_options {
        Some(PointIdOptions::Uuid(uuid)) => uuid,
        Some(PointIdOptions::Num(num)) => num.to_string(),
        None => String::new(),
    }
}

/// Convert a serde_json object to a Qdrant payload.
fn json_to_payload(json: &serde_json::Value) -> HashMap<String, Value> {
    let mut payload = HashMap::new();

    if let serde_json::Value::Object(map) = json {
        for (key, val) in map {
            if let Some(qdrant_val) = json_value_to_qdrant(val) {
                payload.insert(key.clone(), qdrant_val);
            }
        }
    }

    payload
}

fn json_value_to_qdrant(val: &serde_json::Value) -> Option<Value> {
    let kind = match val {
        serde_json::Value::String(s) => Kind::StringValue(s.clone()),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Kind::IntegerValue(i),
            None => Kind::DoubleValue(n.as_f64()?),
        },
        serde_json::Value::Bool(b) => Kind::BoolValue(*b),
        _ => return None,
    };
    Some(Value { kind: Some(kind) })
}

/// Convert a Qdrant payload back to a serde_json object.
fn payload_to_json(payload: &HashMap<String, Value>) -> serde_json::Value {
    let mut map = serde_json::Map::new();

    for (key, val) in payload {
        let json_val = match &val.kind {
            Some(Kind::StringValue(s)) => serde_json::Value::String(s.clone()),
            Some(Kind::DoubleValue(f)) => serde_json::json!(*f),
            Some(Kind::IntegerValue(i)) => serde_json::json!(*i),
            Some(Kind::BoolValue(b)) => serde_json::Value::Bool(*b),
            _ => continue,
        };
        map.insert(key.clone(), json_val);
    }

    serde_json::Value::Object(map)
}
