//! # MMKG Graph
//!
//! Knowledge graph population and reporting for MMKG.
//!
//! Population and reports go through the [`GraphRepository`] trait, with a
//! Neo4j adapter for real runs and an in-memory one for tests and offline use.

pub mod client;
pub mod error;
pub mod memory;
pub mod neo4j;
pub mod populate;
pub mod queries;
pub mod repository;
pub mod schema;

pub use client::{GraphClient, GraphConfig};
pub use error::{GraphError, GraphResult};
pub use memory::InMemoryRepository;
pub use neo4j::Neo4jRepository;
pub use populate::{GraphPopulator, PopulateOptions, PopulateResult, StageTally};
pub use repository::{AggregateQuery, AggregateRow, EdgeUpsert, GraphRepository, NodeRef, NodeUpsert, PropValue};
