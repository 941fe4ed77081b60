//! Node and relationship counts.

use serde::Serialize;

use mmkg_core::relationship::model::RelationshipKind;

use crate::error::GraphResult;
use crate::repository::{edges, labels, AggregateQuery, GraphRepository};

/// Counts by label and relationship type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphStatistics {
    pub diseases: usize,
    pub body_systems: usize,
    pub patients: usize,
    pub hub_diseases: usize,
    pub multimorbidity_relationships: usize,
    pub same_system_relationships: usize,
    pub system_interactions: usize,
    pub affects_system: usize,
    pub has_condition: usize,
}

impl GraphStatistics {
    pub fn total_relationships(&self) -> usize {
        self.multimorbidity_relationships
            + self.same_system_relationships
            + self.system_interactions
            + self.affects_system
            + self.has_condition
    }
}

async fn count<R: GraphRepository + ?Sized>(repo: &R, query: AggregateQuery) -> GraphResult<usize> {
    let rows = repo.aggregate(query).await?;
    Ok(rows.first().map(|r| r.int("count").max(0) as usize).unwrap_or(0))
}

async fn nodes<R: GraphRepository + ?Sized>(repo: &R, label: &str) -> GraphResult<usize> {
    count(repo, AggregateQuery::NodeCount { label: label.to_string() }).await
}

async fn rels<R: GraphRepository + ?Sized>(repo: &R, kind: &str) -> GraphResult<usize> {
    count(repo, AggregateQuery::EdgeCount { kind: kind.to_string() }).await
}

/// Collect every count.
pub async fn graph_statistics<R: GraphRepository + ?Sized>(repo: &R) -> GraphResult<GraphStatistics> {
    Ok(GraphStatistics {
        diseases: nodes(repo, labels::DISEASE).await?,
        body_systems: nodes(repo, labels::BODY_SYSTEM).await?,
        patients: nodes(repo, labels::PATIENT).await?,
        hub_diseases: nodes(repo, labels::HUB_DISEASE).await?,
        multimorbidity_relationships: rels(repo, RelationshipKind::MultimorbidityPattern.as_str()).await?,
        same_system_relationships: rels(repo, RelationshipKind::SameSystem.as_str()).await?,
        system_interactions: rels(repo, RelationshipKind::SystemInteraction.as_str()).await?,
        affects_system: rels(repo, edges::AFFECTS_SYSTEM).await?,
        has_condition: rels(repo, edges::HAS_CONDITION).await?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryRepository;
    use crate::repository::{EdgeUpsert, NodeRef, NodeUpsert};

    #[tokio::test]
    async fn test_statistics_on_small_graph() {
        let repo = InMemoryRepository::new();
        repo.upsert_node(NodeUpsert::new(NodeRef::body_system("Respiratory"))).await.unwrap();
        for id in 1..=2 {
            repo.upsert_node(NodeUpsert::new(NodeRef::disease(id)).prop("name", format!("D{}", id)))
                .await
                .unwrap();
            repo.upsert_edge(EdgeUpsert::new(
                NodeRef::disease(id),
                NodeRef::body_system("Respiratory"),
                edges::AFFECTS_SYSTEM,
            ))
            .await
            .unwrap();
        }
        repo.upsert_edge(
            EdgeUpsert::new(NodeRef::disease(1), NodeRef::disease(2), RelationshipKind::SameSystem.as_str())
                .qualifier(Some("Respiratory")),
        )
        .await
        .unwrap();

        let stats = graph_statistics(&repo).await.unwrap();
        assert_eq!(stats.diseases, 2);
        assert_eq!(stats.body_systems, 1);
        assert_eq!(stats.patients, 0);
        assert_eq!(stats.affects_system, 2);
        assert_eq!(stats.same_system_relationships, 1);
        assert_eq!(stats.total_relationships(), 3);
    }
}
