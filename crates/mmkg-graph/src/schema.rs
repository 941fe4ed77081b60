//! Neo4j schema initialization (constraints and indexes).

use neo4rs::Query;
use tracing::{debug, info, warn};

use crate::GraphClient;

/// Cypher statements for schema initialization.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    // Uniqueness constraints
    "CREATE CONSTRAINT disease_id IF NOT EXISTS FOR (d:Disease) REQUIRE d.id IS UNIQUE",
    "CREATE CONSTRAINT system_name IF NOT EXISTS FOR (s:BodySystem) REQUIRE s.name IS UNIQUE",
    "CREATE CONSTRAINT patient_id IF NOT EXISTS FOR (p:Patient) REQUIRE p.id IS UNIQUE",
    // Lookup indexes
    "CREATE INDEX disease_name IF NOT EXISTS FOR (d:Disease) ON (d.name)",
    "CREATE INDEX system_num IF NOT EXISTS FOR (s:BodySystem) ON (s.system_num)",
];

/// Initialize Neo4j schema with constraints and indexes.
///
/// "already exists" failures are expected on older servers and ignored;
/// anything else is logged and the remaining statements still run.
pub async fn initialize_schema(client: &GraphClient) -> usize {
    info!("Initializing Neo4j schema...");

    let mut applied = 0;
    for statement in SCHEMA_STATEMENTS {
        match client.execute(Query::new(statement.to_string())).await {
            Ok(()) => applied += 1,
            Err(e) if is_already_exists(&e) => {
                debug!(statement, "Schema element already exists");
                applied += 1;
            }
            Err(e) => warn!(statement, error = %format!("{:#}", e), "Schema statement failed"),
        }
    }

    info!("Neo4j schema initialized ({}/{} statements)", applied, SCHEMA_STATEMENTS.len());
    applied
}

fn is_already_exists(err: &anyhow::Error) -> bool {
    format!("{:#}", err).to_lowercase().contains("already exists")
}
