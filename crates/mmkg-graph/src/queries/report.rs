//! Demonstration queries over a built graph.

use serde::Serialize;

use crate::error::GraphResult;
use crate::repository::{AggregateQuery, AggregateRow, GraphRepository};

const HUB_LIMIT: usize = 5;
const STRONG_PATTERN_FLOOR: f64 = 0.7;
const STRONG_PATTERN_LIMIT: usize = 5;
const CROSS_SYSTEM_LIMIT: usize = 5;
const PROGRESSION_LIMIT: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HubDisease {
    pub disease: String,
    pub connections: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrongPattern {
    pub source: String,
    pub relationship: String,
    pub target: String,
    pub strength: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossSystemTally {
    pub system1: String,
    pub system2: String,
    pub interactions: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientBurden {
    pub patient: String,
    pub condition_count: i64,
    pub conditions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Progression {
    pub primary_condition: String,
    pub likely_progression: String,
    pub probability: f64,
}

/// One edge next to a disease, used as retrieval context.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Neighbour {
    pub disease: String,
    pub relationship: String,
    pub qualifier: String,
    pub neighbour: String,
    pub strength: Option<f64>,
}

impl Neighbour {
    /// One-line fact for prompts.
    pub fn as_fact(&self) -> String {
        let qualifier = if self.qualifier.is_empty() {
            String::new()
        } else {
            format!(" ({})", self.qualifier)
        };
        match self.strength {
            Some(s) => format!(
                "{} -[{}{}]- {} strength {:.2}",
                self.disease, self.relationship, qualifier, self.neighbour, s
            ),
            None => format!("{} -[{}{}]- {}", self.disease, self.relationship, qualifier, self.neighbour),
        }
    }
}

/// Results of all demonstration queries.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DemoReport {
    pub hub_diseases: Vec<HubDisease>,
    pub strong_patterns: Vec<StrongPattern>,
    pub cross_system: Vec<CrossSystemTally>,
    pub patient_burden: Vec<PatientBurden>,
    pub progressions: Vec<Progression>,
}

async fn rows<R, T>(repo: &R, query: AggregateQuery, map: fn(&AggregateRow) -> T) -> GraphResult<Vec<T>>
where
    R: GraphRepository + ?Sized,
{
    Ok(repo.aggregate(query).await?.iter().map(map).collect())
}

/// Run every demonstration query.
pub async fn demo_report<R: GraphRepository + ?Sized>(repo: &R) -> GraphResult<DemoReport> {
    Ok(DemoReport {
        hub_diseases: rows(repo, AggregateQuery::HubDiseases { limit: HUB_LIMIT }, |r| HubDisease {
            disease: r.text("disease"),
            connections: r.int("connections"),
        })
        .await?,
        strong_patterns: rows(
            repo,
            AggregateQuery::StrongPatterns {
                min_strength: STRONG_PATTERN_FLOOR,
                limit: STRONG_PATTERN_LIMIT,
            },
            |r| StrongPattern {
                source: r.text("source"),
                relationship: r.text("relationship"),
                target: r.text("target"),
                strength: r.float("strength").unwrap_or(0.0),
            },
        )
        .await?,
        cross_system: rows(
            repo,
            AggregateQuery::CrossSystemPatterns {
                limit: CROSS_SYSTEM_LIMIT,
            },
            |r| CrossSystemTally {
                system1: r.text("system1"),
                system2: r.text("system2"),
                interactions: r.int("interactions"),
            },
        )
        .await?,
        patient_burden: rows(repo, AggregateQuery::PatientBurden, |r| PatientBurden {
            patient: r.text("patient"),
            condition_count: r.int("condition_count"),
            conditions: r.texts("conditions"),
        })
        .await?,
        progressions: rows(
            repo,
            AggregateQuery::Progressions {
                limit: PROGRESSION_LIMIT,
            },
            |r| Progression {
                primary_condition: r.text("primary_condition"),
                likely_progression: r.text("likely_progression"),
                probability: r.float("probability").unwrap_or(0.0),
            },
        )
        .await?,
    })
}

/// Pattern and same-system edges around diseases whose name contains `name`.
pub async fn condition_neighbourhood<R: GraphRepository + ?Sized>(
    repo: &R,
    name: &str,
    limit: usize,
) -> GraphResult<Vec<Neighbour>> {
    rows(
        repo,
        AggregateQuery::Neighbourhood {
            name_fragment: name.to_string(),
            limit,
        },
        |r| Neighbour {
            disease: r.text("disease"),
            relationship: r.text("relationship"),
            qualifier: r.text("qualifier"),
            neighbour: r.text("neighbour"),
            strength: r.float("strength"),
        },
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryRepository;
    use crate::repository::{edges, labels, EdgeUpsert, NodeRef, NodeUpsert};

    async fn graph() -> InMemoryRepository {
        let repo = InMemoryRepository::new();
        for system in ["Endocrine Diseases", "Diseases of the Circulatory System"] {
            repo.upsert_node(NodeUpsert::new(NodeRef::body_system(system))).await.unwrap();
        }
        let diseases = [
            (1, "Type 2 Diabetes Mellitus", "Endocrine Diseases"),
            (2, "Hypertension", "Diseases of the Circulatory System"),
            (3, "Heart failure", "Diseases of the Circulatory System"),
        ];
        for (id, name, system) in diseases {
            let mut node = NodeUpsert::new(NodeRef::disease(id))
                .prop("name", name)
                .prop("relationship_count", 5i64);
            if id == 1 {
                node = node.label(labels::HUB_DISEASE);
            }
            repo.upsert_node(node).await.unwrap();
            repo.upsert_edge(EdgeUpsert::new(
                NodeRef::disease(id),
                NodeRef::body_system(system),
                edges::AFFECTS_SYSTEM,
            ))
            .await
            .unwrap();
        }
        let pattern = |s, t, q: &str, strength: f64| {
            EdgeUpsert::new(NodeRef::disease(s), NodeRef::disease(t), "MULTIMORBIDITY_PATTERN")
                .qualifier(Some(q))
                .prop("strength", strength)
        };
        repo.upsert_edge(pattern(1, 2, "COMMONLY_OCCURS_WITH", 0.85)).await.unwrap();
        repo.upsert_edge(pattern(1, 3, "COMMONLY_OCCURS_WITH", 0.65)).await.unwrap();
        repo.upsert_edge(pattern(2, 3, "LEADS_TO", 0.8)).await.unwrap();

        repo.upsert_node(NodeUpsert::new(NodeRef::patient("PATIENT_001"))).await.unwrap();
        for id in [1, 2] {
            repo.upsert_edge(EdgeUpsert::new(
                NodeRef::patient("PATIENT_001"),
                NodeRef::disease(id),
                edges::HAS_CONDITION,
            ))
            .await
            .unwrap();
        }
        repo
    }

    #[tokio::test]
    async fn test_demo_report() {
        let repo = graph().await;
        let report = demo_report(&repo).await.unwrap();

        assert_eq!(report.hub_diseases.len(), 1);
        assert_eq!(report.hub_diseases[0].disease, "Type 2 Diabetes Mellitus");

        assert_eq!(report.strong_patterns.len(), 2);
        assert_eq!(report.strong_patterns[0].strength, 0.85);

        assert_eq!(report.cross_system.len(), 1);
        assert_eq!(report.cross_system[0].interactions, 2);

        assert_eq!(report.patient_burden[0].condition_count, 2);
        assert_eq!(
            report.patient_burden[0].conditions,
            vec!["Hypertension".to_string(), "Type 2 Diabetes Mellitus".to_string()]
        );

        assert_eq!(report.progressions.len(), 1);
        assert_eq!(report.progressions[0].likely_progression, "Heart failure");
    }

    #[tokio::test]
    async fn test_neighbourhood_facts() {
        let repo = graph().await;
        let around = condition_neighbourhood(&repo, "Heart failure", 10).await.unwrap();

        assert_eq!(around.len(), 2);
        assert_eq!(
            around[0].as_fact(),
            "Heart failure -[MULTIMORBIDITY_PATTERN (LEADS_TO)]- Hypertension strength 0.80"
        );
    }
}
