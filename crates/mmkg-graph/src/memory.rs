//! In-process graph repository.
//!
//! Keeps nodes and edges in ordered maps with the same merge keys as the
//! Neo4j adapter. Used for offline runs and tests.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use mmkg_core::relationship::model::{Association, RelationshipKind};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::GraphResult;
use crate::repository::{
    edges, labels, AggregateQuery, AggregateRow, EdgeUpsert, GraphRepository, NodeRef, NodeUpsert, PropValue, Props,
};

type NodeId = (String, String);
type EdgeId = (NodeId, NodeId, String, Option<String>);

#[derive(Debug, Clone, Default)]
struct NodeEntry {
    labels: BTreeSet<String>,
    props: Props,
}

#[derive(Debug, Default)]
struct Store {
    nodes: BTreeMap<NodeId, NodeEntry>,
    edges: BTreeMap<EdgeId, Props>,
    schema_ready: bool,
}

fn node_id(node: &NodeRef) -> NodeId {
    (node.label.clone(), format!("{}={}", node.key, node.value))
}

impl Store {
    fn name_of(&self, id: &NodeId) -> String {
        self.nodes
            .get(id)
            .and_then(|n| n.props.get("name"))
            .map(|v| v.to_string())
            .unwrap_or_else(|| id.1.clone())
    }

    fn edges_of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = (&'a EdgeId, &'a Props)> + 'a {
        self.edges.iter().filter(move |((_, _, k, _), _)| k == kind)
    }

    fn has_label(&self, label: &str) -> impl Iterator<Item = (&NodeId, &NodeEntry)> + '_ {
        let label = label.to_string();
        self.nodes.iter().filter(move |(_, n)| n.labels.contains(&label))
    }

    fn system_of(&self) -> BTreeMap<&NodeId, String> {
        self.edges_of_kind(edges::AFFECTS_SYSTEM)
            .map(|((disease, system, _, _), _)| (disease, self.name_of(system)))
            .collect()
    }

    fn aggregate(&self, query: &AggregateQuery) -> Vec<AggregateRow> {
        let pattern = RelationshipKind::MultimorbidityPattern.as_str();

        match query {
            AggregateQuery::NodeCount { label } => {
                vec![AggregateRow::default().with("count", self.has_label(label).count())]
            }
            AggregateQuery::EdgeCount { kind } => {
                vec![AggregateRow::default().with("count", self.edges_of_kind(kind).count())]
            }
            AggregateQuery::HubDiseases { limit } => {
                let mut hubs: Vec<(String, i64)> = self
                    .has_label(labels::HUB_DISEASE)
                    .map(|(id, n)| {
                        let degree = n.props.get("relationship_count").and_then(PropValue::as_i64).unwrap_or(0);
                        (self.name_of(id), degree)
                    })
                    .collect();
                hubs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
                hubs.into_iter()
                    .take(*limit)
                    .map(|(name, degree)| AggregateRow::default().with("disease", name).with("connections", degree))
                    .collect()
            }
            AggregateQuery::StrongPatterns { min_strength, limit } => {
                let mut rows: Vec<(f64, AggregateRow)> = self
                    .edges_of_kind(pattern)
                    .filter_map(|((s, t, _, q), props)| {
                        let strength = props.get("strength").and_then(PropValue::as_f64)?;
                        (strength > *min_strength).then(|| {
                            let row = AggregateRow::default()
                                .with("source", self.name_of(s))
                                .with("relationship", q.clone().unwrap_or_default())
                                .with("target", self.name_of(t))
                                .with("strength", strength);
                            (strength, row)
                        })
                    })
                    .collect();
                rows.sort_by(|a, b| by_strength_desc(a.0, b.0));
                rows.into_iter().take(*limit).map(|(_, r)| r).collect()
            }
            AggregateQuery::CrossSystemPatterns { limit } => {
                let systems = self.system_of();
                let mut tally: BTreeMap<(String, String), usize> = BTreeMap::new();
                for ((s, t, _, _), _) in self.edges_of_kind(pattern) {
                    if let (Some(s1), Some(s2)) = (systems.get(s), systems.get(t)) {
                        if s1 != s2 {
                            *tally.entry((s1.clone(), s2.clone())).or_insert(0) += 1;
                        }
                    }
                }
                let mut pairs: Vec<_> = tally.into_iter().collect();
                pairs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
                pairs
                    .into_iter()
                    .take(*limit)
                    .map(|((s1, s2), n)| {
                        AggregateRow::default()
                            .with("system1", s1)
                            .with("system2", s2)
                            .with("interactions", n)
                    })
                    .collect()
            }
            AggregateQuery::PatientBurden => {
                let mut by_patient: BTreeMap<String, Vec<String>> = BTreeMap::new();
                for ((p, d, _, _), _) in self.edges_of_kind(edges::HAS_CONDITION) {
                    let patient = self
                        .nodes
                        .get(p)
                        .and_then(|n| n.props.get("id"))
                        .map(|v| v.to_string())
                        .unwrap_or_else(|| p.1.clone());
                    by_patient.entry(patient).or_default().push(self.name_of(d));
                }
                let mut rows: Vec<_> = by_patient.into_iter().collect();
                rows.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then_with(|| a.0.cmp(&b.0)));
                rows.into_iter()
                    .map(|(patient, mut conditions)| {
                        conditions.sort();
                        AggregateRow::default()
                            .with("patient", patient)
                            .with("condition_count", conditions.len())
                            .with("conditions", conditions)
                    })
                    .collect()
            }
            AggregateQuery::Progressions { limit } => {
                let leads_to = Association::LeadsTo.as_str();
                let mut rows: Vec<(f64, AggregateRow)> = self
                    .edges_of_kind(pattern)
                    .filter(|((_, _, _, q), _)| q.as_deref() == Some(leads_to))
                    .map(|((s, t, _, _), props)| {
                        let strength = props.get("strength").and_then(PropValue::as_f64).unwrap_or(0.0);
                        let row = AggregateRow::default()
                            .with("primary_condition", self.name_of(s))
                            .with("likely_progression", self.name_of(t))
                            .with("probability", strength);
                        (strength, row)
                    })
                    .collect();
                rows.sort_by(|a, b| by_strength_desc(a.0, b.0));
                rows.into_iter().take(*limit).map(|(_, r)| r).collect()
            }
            AggregateQuery::Neighbourhood { name_fragment, limit } => {
                let fragment = name_fragment.to_lowercase();
                let centres: BTreeSet<&NodeId> = self
                    .has_label(labels::DISEASE)
                    .filter(|(id, _)| self.name_of(id).to_lowercase().contains(&fragment))
                    .map(|(id, _)| id)
                    .collect();
                let same_system = RelationshipKind::SameSystem.as_str();

                let mut rows: Vec<(f64, AggregateRow)> = Vec::new();
                for ((s, t, kind, q), props) in &self.edges {
                    if kind != pattern && kind != same_system {
                        continue;
                    }
                    let (centre, other) = if centres.contains(s) {
                        (s, t)
                    } else if centres.contains(t) {
                        (t, s)
                    } else {
                        continue;
                    };
                    let strength = props.get("strength").and_then(PropValue::as_f64);
                    let mut row = AggregateRow::default()
                        .with("disease", self.name_of(centre))
                        .with("relationship", kind.clone())
                        .with("qualifier", q.clone().unwrap_or_default())
                        .with("neighbour", self.name_of(other));
                    if let Some(strength) = strength {
                        row = row.with("strength", strength);
                    }
                    rows.push((strength.unwrap_or(-1.0), row));
                }
                rows.sort_by(|a, b| by_strength_desc(a.0, b.0));
                rows.into_iter().take(*limit).map(|(_, r)| r).collect()
            }
        }
    }
}

fn by_strength_desc(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Graph repository held in memory.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    store: RwLock<Store>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn node_count(&self) -> usize {
        self.store.read().await.nodes.len()
    }

    pub async fn edge_count(&self) -> usize {
        self.store.read().await.edges.len()
    }

    pub async fn schema_ready(&self) -> bool {
        self.store.read().await.schema_ready
    }

    /// Properties of a node, if present.
    pub async fn node_props(&self, node: &NodeRef) -> Option<Props> {
        self.store.read().await.nodes.get(&node_id(node)).map(|n| n.props.clone())
    }

    pub async fn node_labels(&self, node: &NodeRef) -> BTreeSet<String> {
        self.store
            .read()
            .await
            .nodes
            .get(&node_id(node))
            .map(|n| n.labels.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl GraphRepository for InMemoryRepository {
    async fn ensure_schema(&self) -> GraphResult<()> {
        self.store.write().await.schema_ready = true;
        Ok(())
    }

    async fn reset(&self) -> GraphResult<()> {
        let mut store = self.store.write().await;
        store.nodes.clear();
        store.edges.clear();
        Ok(())
    }

    async fn upsert_node(&self, node: NodeUpsert) -> GraphResult<()> {
        node.validate()?;
        let id = node_id(&node.node);
        let mut store = self.store.write().await;
        let entry = store.nodes.entry(id).or_default();
        entry.labels.insert(node.node.label.clone());
        entry.labels.extend(node.extra_labels);
        for label in &node.removed_labels {
            if *label != node.node.label {
                entry.labels.remove(label);
            }
        }
        entry.props.insert(node.node.key.clone(), node.node.value.clone());
        entry.props.extend(node.props);
        Ok(())
    }

    async fn upsert_edge(&self, edge: EdgeUpsert) -> GraphResult<()> {
        edge.validate()?;
        let source = node_id(&edge.source);
        let target = node_id(&edge.target);
        let mut store = self.store.write().await;
        if !store.nodes.contains_key(&source) || !store.nodes.contains_key(&target) {
            return Err(edge.missing_endpoint());
        }

        let key = (source, target, edge.kind.clone(), edge.qualifier.clone());
        let props = store.edges.entry(key).or_default();
        if let Some(qualifier) = &edge.qualifier {
            props.insert("type".to_string(), PropValue::Text(qualifier.clone()));
        }
        props.extend(edge.props);
        debug!(kind = %edge.kind, "Edge upserted");
        Ok(())
    }

    async fn aggregate(&self, query: AggregateQuery) -> GraphResult<Vec<AggregateRow>> {
        Ok(self.store.read().await.aggregate(&query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraphError;

    async fn seeded() -> InMemoryRepository {
        let repo = InMemoryRepository::new();
        for (id, name) in [(1, "Type 2 Diabetes Mellitus"), (2, "Hypertension"), (3, "Heart failure")] {
            repo.upsert_node(NodeUpsert::new(NodeRef::disease(id)).prop("name", name))
                .await
                .unwrap();
        }
        repo
    }

    #[tokio::test]
    async fn test_node_merge_is_last_write_wins() {
        let repo = seeded().await;
        repo.upsert_node(NodeUpsert::new(NodeRef::disease(1)).prop("name", "T2DM").label(labels::HUB_DISEASE))
            .await
            .unwrap();

        assert_eq!(repo.node_count().await, 3);
        let props = repo.node_props(&NodeRef::disease(1)).await.unwrap();
        assert_eq!(props["name"], PropValue::Text("T2DM".to_string()));
        assert!(repo.node_labels(&NodeRef::disease(1)).await.contains(labels::HUB_DISEASE));

        repo.upsert_node(NodeUpsert::new(NodeRef::disease(1)).toggle_label(labels::HUB_DISEASE, false))
            .await
            .unwrap();
        let remaining = repo.node_labels(&NodeRef::disease(1)).await;
        assert!(!remaining.contains(labels::HUB_DISEASE));
        assert!(remaining.contains(labels::DISEASE));
    }

    #[tokio::test]
    async fn test_edge_merge_key_includes_qualifier() {
        let repo = seeded().await;
        let kind = RelationshipKind::MultimorbidityPattern.as_str();
        let edge = |q: &str, s: f64| {
            EdgeUpsert::new(NodeRef::disease(1), NodeRef::disease(2), kind)
                .qualifier(Some(q))
                .prop("strength", s)
        };

        repo.upsert_edge(edge("COMMONLY_OCCURS_WITH", 0.5)).await.unwrap();
        repo.upsert_edge(edge("COMMONLY_OCCURS_WITH", 0.85)).await.unwrap();
        repo.upsert_edge(edge("CARDIOVASCULAR_METABOLIC", 0.1)).await.unwrap();
        assert_eq!(repo.edge_count().await, 2);

        let strong = repo
            .aggregate(AggregateQuery::StrongPatterns { min_strength: 0.7, limit: 5 })
            .await
            .unwrap();
        assert_eq!(strong.len(), 1);
        assert_eq!(strong[0].float("strength"), Some(0.85));
        assert_eq!(strong[0].text("relationship"), "COMMONLY_OCCURS_WITH");
    }

    #[tokio::test]
    async fn test_edge_requires_both_endpoints() {
        let repo = seeded().await;
        let edge = EdgeUpsert::new(NodeRef::disease(1), NodeRef::disease(99), edges::AFFECTS_SYSTEM);
        assert!(matches!(repo.upsert_edge(edge).await, Err(GraphError::MissingEndpoint { .. })));
        assert_eq!(repo.edge_count().await, 0);
    }

    #[tokio::test]
    async fn test_progressions_and_neighbourhood() {
        let repo = seeded().await;
        let kind = RelationshipKind::MultimorbidityPattern.as_str();
        repo.upsert_edge(
            EdgeUpsert::new(NodeRef::disease(2), NodeRef::disease(3), kind)
                .qualifier(Some("LEADS_TO"))
                .prop("strength", 0.6),
        )
        .await
        .unwrap();
        repo.upsert_edge(
            EdgeUpsert::new(NodeRef::disease(1), NodeRef::disease(2), kind)
                .qualifier(Some("COMMONLY_OCCURS_WITH"))
                .prop("strength", 0.85),
        )
        .await
        .unwrap();

        let progressions = repo.aggregate(AggregateQuery::Progressions { limit: 3 }).await.unwrap();
        assert_eq!(progressions.len(), 1);
        assert_eq!(progressions[0].text("likely_progression"), "Heart failure");

        let around = repo
            .aggregate(AggregateQuery::Neighbourhood {
                name_fragment: "hypertension".to_string(),
                limit: 10,
            })
            .await
            .unwrap();
        assert_eq!(around.len(), 2);
        assert_eq!(around[0].text("neighbour"), "Type 2 Diabetes Mellitus");
    }

    #[tokio::test]
    async fn test_reset_clears_everything() {
        let repo = seeded().await;
        repo.reset().await.unwrap();
        assert_eq!(repo.node_count().await, 0);
        let counts = repo
            .aggregate(AggregateQuery::NodeCount {
                label: labels::DISEASE.to_string(),
            })
            .await
            .unwrap();
        assert_eq!(counts[0].int("count"), 0);
    }
}
