//! Text documents rendered from the codelist data for retrieval indexing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::condition::model::{Codelist, ConditionRecord, TestCodelist};
use crate::condition::{body_systems, conditions_by_system};

/// Sample descriptions shown per codelist.
const SAMPLE_DESCRIPTIONS: usize = 10;

/// Tables up to this many rows are rendered in full.
const FULL_TABLE_ROWS: usize = 20;

/// Rows shown for larger test tables.
const TABLE_PREVIEW_ROWS: usize = 10;

/// A document ready for embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub content: String,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Document {
    pub fn kind(&self) -> Option<&str> {
        self.metadata.get("type").and_then(|v| v.as_str())
    }
}

/// Render the summary, every codelist and every test table.
pub fn render_all(records: &[ConditionRecord], codelists: &[Codelist], tests: &[TestCodelist]) -> Vec<Document> {
    let mut docs = Vec::with_capacity(1 + codelists.len() + tests.len());
    docs.push(summary_document(records));
    docs.extend(codelists.iter().map(codelist_document));
    docs.extend(tests.iter().map(test_document));
    docs
}

/// Overview of all conditions grouped by system and diagnosis type.
pub fn summary_document(records: &[ConditionRecord]) -> Document {
    let systems = body_systems(records);
    let by_system = conditions_by_system(records);

    let mut types: BTreeMap<&str, usize> = BTreeMap::new();
    for record in records {
        *types.entry(record.diagnosis_type.as_str()).or_insert(0) += 1;
    }

    let mut content = String::from("CPRD Multimorbidity Disease Summary\n\n");
    content.push_str(&format!("Total Conditions: {}\n", records.len()));
    content.push_str(&format!("Body Systems: {}\n\n", systems.len()));
    content.push_str("Conditions by System:\n");
    for system in &systems {
        let names: Vec<&str> = by_system
            .get(system.name.as_str())
            .map(|rs| rs.iter().map(|r| r.name.as_str()).collect())
            .unwrap_or_default();
        content.push_str(&format!("  {} ({}): {}\n", system.name, names.len(), names.join(", ")));
    }
    content.push_str("\nCondition Types:\n");
    for (kind, count) in &types {
        content.push_str(&format!("  {}: {}\n", kind, count));
    }

    Document {
        id: "CPRD_DiseaseSummary".to_string(),
        content,
        metadata: BTreeMap::from([
            ("source".to_string(), "CPRD_DiseaseSummary".into()),
            ("type".to_string(), "summary".into()),
            ("conditions_count".to_string(), records.len().into()),
            ("systems_count".to_string(), systems.len().into()),
        ]),
    }
}

/// One condition codelist with its mappings and sample descriptions.
pub fn codelist_document(codelist: &Codelist) -> Document {
    let stats = &codelist.stats;

    let mut content = format!("Condition: {}\n\n", codelist.condition);
    content.push_str(&format!("Total Medical Codes: {}\n\n", stats.row_count));
    content.push_str("Code Mappings:\n");
    if stats.mapping_counts.is_empty() {
        content.push_str("  No mapping data\n");
    }
    for (mapping, count) in &stats.mapping_counts {
        content.push_str(&format!("  {}: {}\n", mapping, count));
    }
    content.push_str("\nSample Descriptions:\n");
    let descriptions: Vec<&str> = codelist
        .entries
        .iter()
        .filter_map(|e| e.description.as_deref())
        .take(SAMPLE_DESCRIPTIONS)
        .collect();
    if descriptions.is_empty() {
        content.push_str("  No descriptions\n");
    }
    for description in descriptions {
        content.push_str(&format!("  {}\n", description));
    }
    content.push_str(&format!("\nSNOMED CT Concepts: {} unique concepts\n", stats.distinct_concepts));

    let mut metadata = BTreeMap::from([
        ("source".to_string(), format!("CPRD_{}", codelist.condition).into()),
        ("type".to_string(), "condition_codelist".into()),
        ("condition".to_string(), codelist.condition.clone().into()),
        ("codes_count".to_string(), stats.row_count.into()),
        ("file_path".to_string(), codelist.file_path.clone().into()),
    ]);
    if let Some(num) = stats.disease_num {
        metadata.insert("disease_num".to_string(), num.into());
    }
    if let Some(system) = &stats.system {
        metadata.insert("system".to_string(), system.clone().into());
    }
    if let Some(num) = stats.system_num {
        metadata.insert("system_num".to_string(), num.into());
    }

    Document {
        id: format!("CPRD_{}", codelist.condition),
        content,
        metadata,
    }
}

/// A test value table, in full when small and as a preview otherwise.
pub fn test_document(test: &TestCodelist) -> Document {
    let mut content = format!("Test Type: {}\n\n", test.name);
    content.push_str(&format!("Total Test Codes: {}\n\n", test.rows.len()));
    content.push_str("Test Definitions:\n");
    content.push_str(&format!("  {}\n", test.headers.join(" | ")));

    let shown = if test.rows.len() <= FULL_TABLE_ROWS {
        test.rows.len()
    } else {
        TABLE_PREVIEW_ROWS
    };
    for row in test.rows.iter().take(shown) {
        content.push_str(&format!("  {}\n", row.join(" | ")));
    }
    if shown < test.rows.len() {
        content.push_str(&format!("  ... {} more rows\n", test.rows.len() - shown));
    }

    Document {
        id: format!("CPRD_test_{}", test.name),
        content,
        metadata: BTreeMap::from([
            ("source".to_string(), format!("CPRD_test_{}", test.name).into()),
            ("type".to_string(), "test_values".into()),
            ("test_name".to_string(), test.name.clone().into()),
            ("codes_count".to_string(), test.rows.len().into()),
            ("file_path".to_string(), test.file_path.clone().into()),
        ]),
    }
}
