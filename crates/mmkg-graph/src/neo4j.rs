//! Cypher translation of the repository interface.

use async_trait::async_trait;
use neo4rs::{Query, Row};
use tracing::debug;

use mmkg_core::relationship::model::{Association, RelationshipKind};

use crate::client::GraphClient;
use crate::error::{GraphError, GraphResult};
use crate::repository::{
    edges, labels, AggregateQuery, AggregateRow, EdgeUpsert, GraphRepository, NodeUpsert, PropValue, Props,
};
use crate::schema::initialize_schema;

/// Graph repository backed by a Neo4j server.
#[derive(Clone)]
pub struct Neo4jRepository {
    client: GraphClient,
}

impl Neo4jRepository {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &GraphClient {
        &self.client
    }
}

fn bind(query: Query, name: &str, value: &PropValue) -> Query {
    match value {
        PropValue::Int(v) => query.param(name, *v),
        PropValue::Float(v) => query.param(name, *v),
        PropValue::Bool(v) => query.param(name, *v),
        PropValue::Text(v) => query.param(name, v.as_str()),
        PropValue::TextList(v) => query.param(name, v.clone()),
    }
}

/// `SET alias.k = $prefix_k, ...` for every property, or an empty string.
fn set_clause(alias: &str, prefix: &str, props: &Props) -> String {
    if props.is_empty() {
        return String::new();
    }
    let assignments: Vec<String> = props
        .keys()
        .map(|k| format!("{alias}.{k} = ${prefix}_{k}"))
        .collect();
    format!(" SET {}", assignments.join(", "))
}

fn bind_props(mut query: Query, prefix: &str, props: &Props) -> Query {
    for (key, value) in props {
        query = bind(query, &format!("{prefix}_{key}"), value);
    }
    query
}

pub(crate) fn node_cypher(node: &NodeUpsert) -> String {
    let n = &node.node;
    let mut cypher = format!("MERGE (n:{} {{{}: $key}})", n.label, n.key);
    cypher.push_str(&set_clause("n", "p", &node.props));
    for label in &node.extra_labels {
        cypher.push_str(&format!(" SET n:{label}"));
    }
    for label in &node.removed_labels {
        cypher.push_str(&format!(" REMOVE n:{label}"));
    }
    cypher
}

pub(crate) fn edge_cypher(edge: &EdgeUpsert) -> String {
    let merge = match edge.qualifier {
        Some(_) => format!("MERGE (a)-[r:{} {{type: $qualifier}}]->(b)", edge.kind),
        None => format!("MERGE (a)-[r:{}]->(b)", edge.kind),
    };
    format!(
        "MATCH (a:{} {{{}: $source}}) MATCH (b:{} {{{}: $target}}) {}{} RETURN count(r) AS merged",
        edge.source.label,
        edge.source.key,
        edge.target.label,
        edge.target.key,
        merge,
        set_clause("r", "p", &edge.props),
    )
}

/// Cypher for an aggregate; labels and types are validated before splicing.
fn aggregate_cypher(query: &AggregateQuery) -> GraphResult<Query> {
    let pattern = RelationshipKind::MultimorbidityPattern.as_str();
    let same_system = RelationshipKind::SameSystem.as_str();

    let q = match query {
        AggregateQuery::NodeCount { label } => Query::new(format!(
            "MATCH (n:{}) RETURN count(n) AS count",
            crate::error::check_identifier(label)?
        )),
        AggregateQuery::EdgeCount { kind } => Query::new(format!(
            "MATCH ()-[r:{}]->() RETURN count(r) AS count",
            crate::error::check_identifier(kind)?
        )),
        AggregateQuery::HubDiseases { limit } => Query::new(format!(
            "MATCH (d:{hub})
             RETURN d.name AS disease, d.relationship_count AS connections
             ORDER BY connections DESC, disease
             LIMIT $limit",
            hub = labels::HUB_DISEASE
        ))
        .param("limit", *limit as i64),
        AggregateQuery::StrongPatterns { min_strength, limit } => Query::new(format!(
            "MATCH (d1:{d})-[r:{pattern}]->(d2:{d})
             WHERE r.strength > $min_strength
             RETURN d1.name AS source, r.type AS relationship, d2.name AS target, r.strength AS strength
             ORDER BY strength DESC
             LIMIT $limit",
            d = labels::DISEASE
        ))
        .param("min_strength", *min_strength)
        .param("limit", *limit as i64),
        AggregateQuery::CrossSystemPatterns { limit } => Query::new(format!(
            "MATCH (d1:{d})-[:{affects}]->(s1:{s})
             MATCH (d2:{d})-[:{affects}]->(s2:{s})
             MATCH (d1)-[r:{pattern}]->(d2)
             WHERE s1 <> s2
             RETURN s1.name AS system1, s2.name AS system2, count(r) AS interactions
             ORDER BY interactions DESC, system1, system2
             LIMIT $limit",
            d = labels::DISEASE,
            s = labels::BODY_SYSTEM,
            affects = edges::AFFECTS_SYSTEM
        ))
        .param("limit", *limit as i64),
        AggregateQuery::PatientBurden => Query::new(format!(
            "MATCH (p:{p})-[:{has}]->(d:{d})
             WITH p, count(d) AS condition_count, collect(d.name) AS conditions
             RETURN p.id AS patient, condition_count, conditions
             ORDER BY condition_count DESC, patient",
            p = labels::PATIENT,
            d = labels::DISEASE,
            has = edges::HAS_CONDITION
        )),
        AggregateQuery::Progressions { limit } => Query::new(format!(
            "MATCH (d1:{d})-[r:{pattern} {{type: $leads_to}}]->(d2:{d})
             RETURN d1.name AS primary_condition, d2.name AS likely_progression, r.strength AS probability
             ORDER BY probability DESC
             LIMIT $limit",
            d = labels::DISEASE
        ))
        .param("leads_to", Association::LeadsTo.as_str())
        .param("limit", *limit as i64),
        AggregateQuery::Neighbourhood { name_fragment, limit } => Query::new(format!(
            "MATCH (d:{d})-[r:{pattern}|{same_system}]-(other:{d})
             WHERE toLower(d.name) CONTAINS toLower($fragment)
             RETURN d.name AS disease, type(r) AS relationship, coalesce(r.type, '') AS qualifier,
                    other.name AS neighbour, r.strength AS strength
             ORDER BY coalesce(r.strength, -1.0) DESC
             LIMIT $limit",
            d = labels::DISEASE
        ))
        .param("fragment", name_fragment.as_str())
        .param("limit", *limit as i64),
    };
    Ok(q)
}

#[derive(Clone, Copy)]
enum Col {
    Int,
    Float,
    OptFloat,
    Text,
    Texts,
}

fn columns(query: &AggregateQuery) -> &'static [(&'static str, Col)] {
    match query {
        AggregateQuery::NodeCount { .. } | AggregateQuery::EdgeCount { .. } => &[("count", Col::Int)],
        AggregateQuery::HubDiseases { .. } => &[("disease", Col::Text), ("connections", Col::Int)],
        AggregateQuery::StrongPatterns { .. } => &[
            ("source", Col::Text),
            ("relationship", Col::Text),
            ("target", Col::Text),
            ("strength", Col::Float),
        ],
        AggregateQuery::CrossSystemPatterns { .. } => &[
            ("system1", Col::Text),
            ("system2", Col::Text),
            ("interactions", Col::Int),
        ],
        AggregateQuery::PatientBurden => &[
            ("patient", Col::Text),
            ("condition_count", Col::Int),
            ("conditions", Col::Texts),
        ],
        AggregateQuery::Progressions { .. } => &[
            ("primary_condition", Col::Text),
            ("likely_progression", Col::Text),
            ("probability", Col::Float),
        ],
        AggregateQuery::Neighbourhood { .. } => &[
            ("disease", Col::Text),
            ("relationship", Col::Text),
            ("qualifier", Col::Text),
            ("neighbour", Col::Text),
            ("strength", Col::OptFloat),
        ],
    }
}

fn read_row(row: &Row, cols: &[(&str, Col)]) -> GraphResult<AggregateRow> {
    let mut out = AggregateRow::default();
    for (name, col) in cols {
        let value = match col {
            Col::Int => row.get::<i64>(name).map(|v| Some(PropValue::Int(v))),
            Col::Float => row.get::<f64>(name).map(|v| Some(PropValue::Float(v))),
            Col::OptFloat => Ok(row.get::<Option<f64>>(name).ok().flatten().map(PropValue::Float)),
            Col::Text => Ok(Some(PropValue::Text(row.get::<String>(name).unwrap_or_default()))),
            Col::Texts => row.get::<Vec<String>>(name).map(|v| Some(PropValue::TextList(v))),
        }
        .map_err(|e| GraphError::column(*name, format!("{:?}", e)))?;

        if let Some(value) = value {
            out.0.insert(name.to_string(), value);
        }
    }
    Ok(out)
}

#[async_trait]
impl GraphRepository for Neo4jRepository {
    async fn ensure_schema(&self) -> GraphResult<()> {
        initialize_schema(&self.client).await;
        Ok(())
    }

    async fn reset(&self) -> GraphResult<()> {
        self.client
            .execute(Query::new("MATCH (n) DETACH DELETE n".to_string()))
            .await?;
        Ok(())
    }

    async fn upsert_node(&self, node: NodeUpsert) -> GraphResult<()> {
        node.validate()?;
        let query = bind(Query::new(node_cypher(&node)), "key", &node.node.value);
        let query = bind_props(query, "p", &node.props);
        self.client.execute(query).await?;
        debug!(node = %node.node, "Node upserted");
        Ok(())
    }

    async fn upsert_edge(&self, edge: EdgeUpsert) -> GraphResult<()> {
        edge.validate()?;
        let mut query = Query::new(edge_cypher(&edge));
        query = bind(query, "source", &edge.source.value);
        query = bind(query, "target", &edge.target.value);
        if let Some(qualifier) = &edge.qualifier {
            query = query.param("qualifier", qualifier.as_str());
        }
        query = bind_props(query, "p", &edge.props);

        let merged: i64 = self.client.query_scalar(query, "merged").await?.unwrap_or(0);
        if merged == 0 {
            return Err(edge.missing_endpoint());
        }
        Ok(())
    }

    async fn aggregate(&self, query: AggregateQuery) -> GraphResult<Vec<AggregateRow>> {
        let cols = columns(&query);
        let rows = self.client.query(aggregate_cypher(&query)?).await?;
        rows.iter().map(|row| read_row(row, cols)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::NodeRef;

    #[test]
    fn test_node_cypher() {
        let node = NodeUpsert::new(NodeRef::disease(3))
            .prop("name", "Asthma")
            .prop("system_num", 4i64)
            .label(labels::HUB_DISEASE);
        assert_eq!(
            node_cypher(&node),
            "MERGE (n:Disease {id: $key}) SET n.name = $p_name, n.system_num = $p_system_num SET n:HubDisease"
        );

        let demoted = NodeUpsert::new(NodeRef::disease(3))
            .prop("relationship_count", 2i64)
            .toggle_label(labels::HUB_DISEASE, false);
        assert_eq!(
            node_cypher(&demoted),
            "MERGE (n:Disease {id: $key}) SET n.relationship_count = $p_relationship_count REMOVE n:HubDisease"
        );
    }

    #[test]
    fn test_edge_cypher_with_and_without_qualifier() {
        let qualified = EdgeUpsert::new(NodeRef::disease(1), NodeRef::disease(2), "MULTIMORBIDITY_PATTERN")
            .qualifier(Some("LEADS_TO"))
            .prop("strength", 0.6);
        let cypher = edge_cypher(&qualified);
        assert!(cypher.starts_with("MATCH (a:Disease {id: $source}) MATCH (b:Disease {id: $target})"));
        assert!(cypher.contains("MERGE (a)-[r:MULTIMORBIDITY_PATTERN {type: $qualifier}]->(b) SET r.strength = $p_strength"));

        let plain = EdgeUpsert::new(NodeRef::disease(1), NodeRef::body_system("Respiratory"), edges::AFFECTS_SYSTEM);
        let cypher = edge_cypher(&plain);
        assert!(cypher.contains("MATCH (b:BodySystem {name: $target})"));
        assert!(cypher.contains("MERGE (a)-[r:AFFECTS_SYSTEM]->(b) RETURN"));
    }

    #[test]
    fn test_aggregate_rejects_bad_label() {
        let query = AggregateQuery::NodeCount {
            label: "Disease) DETACH DELETE (n".to_string(),
        };
        assert!(aggregate_cypher(&query).is_err());
    }
}
