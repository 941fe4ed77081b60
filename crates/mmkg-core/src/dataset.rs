//! Everything loaded from a data root in one place.

use tracing::info;

use crate::complexity::model::{ConditionComplexity, SystemDistribution};
use crate::complexity::{distribution_from_records, score_conditions};
use crate::condition::model::{BodySystem, Codelist, ConditionRecord, LoadTally, TestCodelist};
use crate::condition::{body_systems, load_codelists, load_summary, load_test_codelists};
use crate::config::DataConfig;
use crate::document::{render_all, Document};
use crate::error::MmkgResult;
use crate::relationship::curated::CuratedTables;
use crate::relationship::model::{Relationship, RelationshipKind};
use crate::relationship::synthesize;

/// Loaded records, codelists and the relationships synthesized from them.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub records: Vec<ConditionRecord>,
    pub systems: Vec<BodySystem>,
    pub codelists: Vec<Codelist>,
    pub codelist_tally: LoadTally,
    pub tests: Vec<TestCodelist>,
    pub test_tally: LoadTally,
    pub tables: CuratedTables,
    pub relationships: Vec<Relationship>,
    pub expected_system_count: usize,
}

impl Dataset {
    /// Load the summary (fatal on failure) and the codelists (best effort).
    pub fn load(config: &DataConfig) -> MmkgResult<Self> {
        let tables = config.load_curated_tables()?;
        let records = load_summary(&config.root)?;
        let (codelists, codelist_tally) = load_codelists(&config.root);
        let (tests, test_tally) = load_test_codelists(&config.root);

        let relationships = synthesize(&records, &tables);
        let systems = body_systems(&records);

        info!(
            root = %config.root.display(),
            conditions = records.len(),
            systems = systems.len(),
            codelists = codelists.len(),
            tests = tests.len(),
            "Dataset loaded"
        );

        Ok(Self {
            records,
            systems,
            codelists,
            codelist_tally,
            tests,
            test_tally,
            tables,
            relationships,
            expected_system_count: config.expected_system_count,
        })
    }

    pub fn complexity(&self) -> Vec<ConditionComplexity> {
        score_conditions(&self.records, &self.relationships)
    }

    pub fn distribution(&self) -> SystemDistribution {
        distribution_from_records(&self.records, self.expected_system_count)
    }

    pub fn documents(&self) -> Vec<Document> {
        render_all(&self.records, &self.codelists, &self.tests)
    }

    pub fn count_kind(&self, kind: RelationshipKind) -> usize {
        self.relationships.iter().filter(|r| r.kind == kind).count()
    }
}
