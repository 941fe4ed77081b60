//! Knowledge graph population pipeline.
//!
//! Writes body systems, diseases, synthesized relationships, complexity
//! scores and sample patients through a [`GraphRepository`]. Schema setup
//! and reset failures abort the run; a failed item is logged, counted and
//! skipped. Every write is a merge, so the pipeline can be re-run.

use std::collections::HashSet;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use mmkg_core::relationship::model::{Endpoint, Relationship};
use mmkg_core::relationship::ConditionIndex;
use mmkg_core::Dataset;

use crate::error::GraphResult;
use crate::repository::{edges, labels, EdgeUpsert, GraphRepository, NodeRef, NodeUpsert};

/// Options for a population run.
#[derive(Debug, Clone, Copy)]
pub struct PopulateOptions {
    /// Delete every node and edge before writing.
    pub reset: bool,
    pub include_patients: bool,
}

impl Default for PopulateOptions {
    fn default() -> Self {
        Self {
            reset: true,
            include_patients: true,
        }
    }
}

/// Written and failed counts for one stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageTally {
    pub written: usize,
    pub failed: usize,
}

impl StageTally {
    fn record<T>(&mut self, what: &str, result: GraphResult<T>) {
        match result {
            Ok(_) => self.written += 1,
            Err(e) => {
                self.failed += 1;
                warn!(item = what, error = %e, "Graph write failed");
            }
        }
    }
}

/// Result of a population run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PopulateResult {
    pub systems: StageTally,
    pub diseases: StageTally,
    pub relationships: StageTally,
    pub complexity: StageTally,
    pub patients: StageTally,
}

impl PopulateResult {
    fn stages(&self) -> [&StageTally; 5] {
        [
            &self.systems,
            &self.diseases,
            &self.relationships,
            &self.complexity,
            &self.patients,
        ]
    }

    pub fn written(&self) -> usize {
        self.stages().iter().map(|s| s.written).sum()
    }

    pub fn failed(&self) -> usize {
        self.stages().iter().map(|s| s.failed).sum()
    }
}

/// Drives a full graph build from a loaded dataset.
pub struct GraphPopulator<'a, R: GraphRepository + ?Sized> {
    repo: &'a R,
    options: PopulateOptions,
}

impl<'a, R: GraphRepository + ?Sized> GraphPopulator<'a, R> {
    pub fn new(repo: &'a R, options: PopulateOptions) -> Self {
        Self { repo, options }
    }

    /// Run every stage in order.
    pub async fn run(&self, dataset: &Dataset) -> GraphResult<PopulateResult> {
        info!(reset = self.options.reset, "Starting knowledge graph build");

        self.repo.ensure_schema().await?;
        if self.options.reset {
            self.repo.reset().await?;
            info!("Cleared existing graph");
        }

        let systems = self.write_systems(dataset).await;
        let (diseases, written_ids) = self.write_diseases(dataset).await;
        let mut result = PopulateResult {
            systems,
            diseases,
            relationships: self.write_relationships(&dataset.relationships).await,
            complexity: self.write_complexity(dataset, &written_ids).await,
            ..PopulateResult::default()
        };
        if self.options.include_patients {
            result.patients = self.write_patients(dataset).await;
        }

        info!(written = result.written(), failed = result.failed(), "Knowledge graph build complete");
        Ok(result)
    }

    async fn write_systems(&self, dataset: &Dataset) -> StageTally {
        let mut tally = StageTally::default();
        for system in &dataset.systems {
            let node = NodeUpsert::new(NodeRef::body_system(&system.name)).prop("system_num", system.system_num);
            tally.record(&system.name, self.repo.upsert_node(node).await);
        }
        info!(written = tally.written, failed = tally.failed, "Body systems written");
        tally
    }

    /// Returns the tally and the ids whose Disease node was written.
    async fn write_diseases(&self, dataset: &Dataset) -> (StageTally, HashSet<i64>) {
        let mut tally = StageTally::default();
        let mut written_ids = HashSet::new();
        for record in &dataset.records {
            let node = NodeUpsert::new(NodeRef::disease(record.id))
                .prop("name", record.name.as_str())
                .prop("original_name", record.original_name.as_str())
                .prop("system", record.system.as_str())
                .prop("system_num", record.system_num)
                .prop("type", record.diagnosis_type.as_str())
                .prop("has_test_results", record.has_test_results);
            let written = self.repo.upsert_node(node).await;
            let failed = written.is_err();
            tally.record(&record.name, written);
            if failed {
                continue;
            }
            written_ids.insert(record.id);

            let edge = EdgeUpsert::new(
                NodeRef::disease(record.id),
                NodeRef::body_system(&record.system),
                edges::AFFECTS_SYSTEM,
            );
            if let Err(e) = self.repo.upsert_edge(edge).await {
                tally.failed += 1;
                warn!(disease = %record.name, error = %e, "AFFECTS_SYSTEM write failed");
            }
        }
        info!(written = tally.written, failed = tally.failed, "Diseases written");
        (tally, written_ids)
    }

    async fn write_relationships(&self, relationships: &[Relationship]) -> StageTally {
        let mut tally = StageTally::default();
        for rel in relationships {
            let mut edge = EdgeUpsert::new(endpoint_ref(&rel.source), endpoint_ref(&rel.target), rel.kind.as_str())
                .qualifier(rel.qualifier.as_deref())
                .prop("evidence", rel.evidence.as_str())
                .prop("created_at", rel.created_at.to_rfc3339());
            if let Some(strength) = rel.strength {
                edge = edge.prop("strength", strength);
            }
            let what = format!("{} {} -> {}", rel.kind, rel.source, rel.target);
            tally.record(&what, self.repo.upsert_edge(edge).await);
        }
        info!(written = tally.written, failed = tally.failed, "Relationships written");
        tally
    }

    /// Scores only nodes in `written_ids`, so a failed disease is not recreated bare.
    async fn write_complexity(&self, dataset: &Dataset, written_ids: &HashSet<i64>) -> StageTally {
        let mut tally = StageTally::default();
        for score in dataset.complexity() {
            if !written_ids.contains(&score.condition_id) {
                tally.failed += 1;
                warn!(disease = %score.name, "Skipping complexity for unwritten disease");
                continue;
            }
            let node = NodeUpsert::new(NodeRef::disease(score.condition_id))
                .prop("complexity_score", score.level.as_str())
                .prop("relationship_count", score.degree)
                .toggle_label(labels::HUB_DISEASE, score.is_hub);
            tally.record(&score.name, self.repo.upsert_node(node).await);
        }
        info!(written = tally.written, failed = tally.failed, "Complexity scores written");
        tally
    }

    async fn write_patients(&self, dataset: &Dataset) -> StageTally {
        let mut tally = StageTally::default();
        let index = ConditionIndex::new(&dataset.records);
        let diagnosed_at = Utc::now().to_rfc3339();

        for patient in &dataset.tables.patients {
            let node = NodeUpsert::new(NodeRef::patient(&patient.id))
                .prop("age_group", patient.age_group.as_str())
                .prop("complexity", patient.complexity.as_str())
                .prop("condition_count", patient.conditions.len());
            let written = self.repo.upsert_node(node).await;
            let failed = written.is_err();
            tally.record(&patient.id, written);
            if failed {
                continue;
            }

            for condition in &patient.conditions {
                for record in index.resolve(condition) {
                    let edge = EdgeUpsert::new(
                        NodeRef::patient(&patient.id),
                        NodeRef::disease(record.id),
                        edges::HAS_CONDITION,
                    )
                    .prop("diagnosed_at", diagnosed_at.as_str());
                    if let Err(e) = self.repo.upsert_edge(edge).await {
                        tally.failed += 1;
                        warn!(patient = %patient.id, condition = %record.name, error = %e, "HAS_CONDITION write failed");
                    }
                }
            }
        }
        info!(written = tally.written, failed = tally.failed, "Sample patients written");
        tally
    }
}

fn endpoint_ref(endpoint: &Endpoint) -> NodeRef {
    match endpoint {
        Endpoint::Condition { id, .. } => NodeRef::disease(*id),
        Endpoint::System { name } => NodeRef::body_system(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryRepository;
    use crate::repository::{AggregateQuery, AggregateRow};
    use mmkg_core::condition::body_systems;
    use mmkg_core::condition::model::{ConditionRecord, LoadTally};
    use mmkg_core::relationship::curated::CuratedTables;
    use mmkg_core::relationship::model::RelationshipKind;
    use mmkg_core::relationship::synthesize;

    fn record(id: i64, name: &str, system: &str, system_num: i64) -> ConditionRecord {
        ConditionRecord {
            id,
            name: name.to_string(),
            original_name: name.to_string(),
            system: system.to_string(),
            system_num,
            diagnosis_type: "chronic".to_string(),
            has_test_results: false,
        }
    }

    fn dataset() -> Dataset {
        let records = vec![
            record(1, "Type 2 Diabetes Mellitus", "Endocrine Diseases", 3),
            record(2, "Type 1 Diabetes Mellitus", "Endocrine Diseases", 3),
            record(3, "Hypertension", "Diseases of the Circulatory System", 1),
            record(4, "Heart failure", "Diseases of the Circulatory System", 1),
            record(5, "Coronary Heart Disease", "Diseases of the Circulatory System", 1),
            record(6, "Chronic Kidney Disease", "Diseases of the Genitourinary System", 9),
            record(7, "Obesity", "Endocrine Diseases", 3),
        ];
        let tables = CuratedTables::cprd();
        Dataset {
            systems: body_systems(&records),
            relationships: synthesize(&records, &tables),
            records,
            codelists: Vec::new(),
            codelist_tally: LoadTally::default(),
            tests: Vec::new(),
            test_tally: LoadTally::default(),
            tables,
            expected_system_count: 15,
        }
    }

    async fn count(repo: &InMemoryRepository, query: AggregateQuery) -> i64 {
        repo.aggregate(query).await.unwrap()[0].int("count")
    }

    #[tokio::test]
    async fn test_build_writes_every_stage() {
        let repo = InMemoryRepository::new();
        let data = dataset();
        let result = GraphPopulator::new(&repo, PopulateOptions::default()).run(&data).await.unwrap();

        assert!(repo.schema_ready().await);
        assert_eq!(result.systems.written, 3);
        assert_eq!(result.diseases.written, 7);
        assert_eq!(result.complexity.written, 7);
        assert_eq!(result.patients.written, 3);
        assert_eq!(result.failed(), 0);

        let same_system = count(&repo, AggregateQuery::EdgeCount {
            kind: RelationshipKind::SameSystem.as_str().to_string(),
        })
        .await;
        // Endocrine has 3 conditions, circulatory 3, genitourinary 1.
        assert_eq!(same_system, 3 + 3);

        let affects = count(&repo, AggregateQuery::EdgeCount {
            kind: edges::AFFECTS_SYSTEM.to_string(),
        })
        .await;
        assert_eq!(affects, 7);

        let diabetes = repo.node_props(&NodeRef::disease(1)).await.unwrap();
        assert!(diabetes.contains_key("complexity_score"));
        assert!(diabetes["relationship_count"].as_i64().unwrap() >= 4);
        assert!(repo.node_labels(&NodeRef::disease(1)).await.contains(labels::HUB_DISEASE));
    }

    /// Complexity properties and hub label of every disease node.
    async fn scores(repo: &InMemoryRepository, data: &Dataset) -> Vec<(i64, String, i64, bool)> {
        let mut out = Vec::new();
        for record in &data.records {
            let node = NodeRef::disease(record.id);
            let props = repo.node_props(&node).await.unwrap();
            out.push((
                record.id,
                props["complexity_score"].to_string(),
                props["relationship_count"].as_i64().unwrap(),
                repo.node_labels(&node).await.contains(labels::HUB_DISEASE),
            ));
        }
        out
    }

    #[tokio::test]
    async fn test_rebuild_is_idempotent() {
        let repo = InMemoryRepository::new();
        let data = dataset();
        let options = PopulateOptions {
            reset: false,
            include_patients: true,
        };

        GraphPopulator::new(&repo, options).run(&data).await.unwrap();
        let nodes = repo.node_count().await;
        let edges = repo.edge_count().await;
        let first = scores(&repo, &data).await;

        GraphPopulator::new(&repo, options).run(&data).await.unwrap();
        assert_eq!(repo.node_count().await, nodes);
        assert_eq!(repo.edge_count().await, edges);
        assert_eq!(scores(&repo, &data).await, first);
        assert!(first.iter().any(|(_, _, _, hub)| *hub));
    }

    #[tokio::test]
    async fn test_rebuild_drops_stale_hub_label() {
        let repo = InMemoryRepository::new();
        let options = PopulateOptions {
            reset: false,
            include_patients: false,
        };
        let data = dataset();
        GraphPopulator::new(&repo, options).run(&data).await.unwrap();
        assert!(repo.node_labels(&NodeRef::disease(1)).await.contains(labels::HUB_DISEASE));

        // Without relationships every degree drops to zero.
        let mut sparse = dataset();
        sparse.relationships.clear();
        GraphPopulator::new(&repo, options).run(&sparse).await.unwrap();

        for (id, _, _, hub) in scores(&repo, &sparse).await {
            assert!(!hub, "disease {} kept the hub label", id);
        }
        let props = repo.node_props(&NodeRef::disease(1)).await.unwrap();
        assert_eq!(props["relationship_count"].as_i64(), Some(0));
    }

    #[tokio::test]
    async fn test_patients_can_be_skipped() {
        let repo = InMemoryRepository::new();
        let options = PopulateOptions {
            reset: true,
            include_patients: false,
        };
        let result = GraphPopulator::new(&repo, options).run(&dataset()).await.unwrap();

        assert_eq!(result.patients, StageTally::default());
        let patients = count(&repo, AggregateQuery::NodeCount {
            label: labels::PATIENT.to_string(),
        })
        .await;
        assert_eq!(patients, 0);
    }

    #[tokio::test]
    async fn test_missing_system_is_counted_not_fatal() {
        let repo = InMemoryRepository::new();
        let mut data = dataset();
        data.systems.retain(|s| s.name != "Diseases of the Genitourinary System");

        let result = GraphPopulator::new(&repo, PopulateOptions::default()).run(&data).await.unwrap();
        assert_eq!(result.diseases.written, 7);
        assert_eq!(result.diseases.failed, 1);
    }

    /// Delegates to memory but rejects the full write of one disease.
    struct RejectDisease {
        inner: InMemoryRepository,
        id: i64,
    }

    #[async_trait::async_trait]
    impl GraphRepository for RejectDisease {
        async fn ensure_schema(&self) -> GraphResult<()> {
            self.inner.ensure_schema().await
        }

        async fn reset(&self) -> GraphResult<()> {
            self.inner.reset().await
        }

        async fn upsert_node(&self, node: NodeUpsert) -> GraphResult<()> {
            if node.node == NodeRef::disease(self.id) && node.props.contains_key("name") {
                return Err(anyhow::anyhow!("write rejected").into());
            }
            self.inner.upsert_node(node).await
        }

        async fn upsert_edge(&self, edge: EdgeUpsert) -> GraphResult<()> {
            self.inner.upsert_edge(edge).await
        }

        async fn aggregate(&self, query: AggregateQuery) -> GraphResult<Vec<AggregateRow>> {
            self.inner.aggregate(query).await
        }
    }

    #[tokio::test]
    async fn test_failed_disease_gets_no_complexity_node() {
        let repo = RejectDisease {
            inner: InMemoryRepository::new(),
            id: 1,
        };
        let result = GraphPopulator::new(&repo, PopulateOptions::default()).run(&dataset()).await.unwrap();

        assert_eq!(result.diseases.failed, 1);
        assert_eq!(result.complexity.written, 6);
        assert_eq!(result.complexity.failed, 1);
        assert!(repo.inner.node_props(&NodeRef::disease(1)).await.is_none());
        assert!(repo.inner.node_props(&NodeRef::disease(2)).await.is_some());
    }
}
