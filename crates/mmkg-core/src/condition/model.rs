//! Condition and codelist models.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// A row of the disease summary table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionRecord {
    pub id: i64,
    pub name: String,
    pub original_name: String,
    pub system: String,
    pub system_num: i64,
    pub diagnosis_type: String,
    pub has_test_results: bool,
}

/// Raw summary row as it appears in `DiseaseSummary.csv`.
#[derive(Debug, Deserialize)]
pub(crate) struct SummaryRow {
    pub disease_num: i64,
    #[serde(rename = "Disease_mod")]
    pub disease_mod: String,
    #[serde(rename = "Disease")]
    pub disease: String,
    pub system: String,
    pub system_num: i64,
    #[serde(rename = "type", default)]
    pub diagnosis_type: Option<String>,
    #[serde(default)]
    pub testresults: Option<String>,
}

impl ConditionRecord {
    /// Build a record from a summary row.
    pub(crate) fn from_row(row: SummaryRow) -> Self {
        let diagnosis_type = row
            .diagnosis_type
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "unknown".to_string());

        let has_test_results = row
            .testresults
            .map(|t| t.trim().eq_ignore_ascii_case("yes"))
            .unwrap_or(false);

        Self {
            id: row.disease_num,
            name: row.disease_mod.trim().to_string(),
            original_name: row.disease.trim().to_string(),
            system: row.system.trim().to_string(),
            system_num: row.system_num,
            diagnosis_type,
            has_test_results,
        }
    }

    /// Whether `fragment` occurs in the canonical or original name.
    pub fn matches(&self, fragment: &str) -> bool {
        self.name.contains(fragment) || self.original_name.contains(fragment)
    }
}

/// A body system derived from the condition records.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodySystem {
    pub name: String,
    pub system_num: i64,
}

/// One medical code row of a condition codelist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodelistEntry {
    #[serde(default)]
    pub mapping: Option<String>,
    #[serde(rename = "descr", default)]
    pub description: Option<String>,
    #[serde(rename = "snomedctconceptid", default)]
    pub snomed_concept_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub disease_num: Option<i64>,
    #[serde(default)]
    pub system: Option<String>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub system_num: Option<i64>,
}

/// Integer enrichment column: accepts `12` and `12.0`, anything else is `None`.
fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_int))
}

fn parse_int(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(value) = raw.parse::<i64>() {
        return Some(value);
    }
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() && value.fract() == 0.0 => Some(value as i64),
        _ => None,
    }
}

/// Aggregate metadata for a single codelist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodelistStats {
    pub row_count: usize,
    pub snomed_rows: usize,
    pub distinct_concepts: usize,
    pub mapping_counts: BTreeMap<String, usize>,
    pub disease_num: Option<i64>,
    pub system: Option<String>,
    pub system_num: Option<i64>,
}

impl CodelistStats {
    /// Compute stats over a set of entries.
    pub fn from_entries(entries: &[CodelistEntry]) -> Self {
        let mut stats = Self {
            row_count: entries.len(),
            ..Self::default()
        };
        let mut concepts = std::collections::BTreeSet::new();

        for entry in entries {
            if let Some(mapping) = non_blank(entry.mapping.as_deref()) {
                *stats.mapping_counts.entry(mapping.to_string()).or_insert(0) += 1;
            }
            if let Some(concept) = non_blank(entry.snomed_concept_id.as_deref()) {
                stats.snomed_rows += 1;
                concepts.insert(concept.to_string());
            }
            if stats.disease_num.is_none() {
                stats.disease_num = entry.disease_num;
            }
            if stats.system.is_none() {
                stats.system = non_blank(entry.system.as_deref()).map(str::to_string);
            }
            if stats.system_num.is_none() {
                stats.system_num = entry.system_num;
            }
        }

        stats.distinct_concepts = concepts.len();
        stats
    }
}

/// A condition codelist file with its rows and metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Codelist {
    pub condition: String,
    pub file_path: String,
    pub entries: Vec<CodelistEntry>,
    pub stats: CodelistStats,
}

/// A test value codelist, kept as raw rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCodelist {
    pub name: String,
    pub file_path: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Counts of files loaded and skipped by a directory loader.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadTally {
    pub loaded: usize,
    pub skipped: usize,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(mapping: &str, snomed: Option<&str>) -> CodelistEntry {
        CodelistEntry {
            mapping: Some(mapping.to_string()),
            description: None,
            snomed_concept_id: snomed.map(str::to_string),
            disease_num: None,
            system: None,
            system_num: None,
        }
    }

    #[test]
    fn test_stats_counts_concepts_and_mappings() {
        let entries = vec![
            entry("snomed", Some("100")),
            entry("snomed", Some("100")),
            entry("read", Some("200")),
            entry("read", None),
        ];
        let stats = CodelistStats::from_entries(&entries);

        assert_eq!(stats.row_count, 4);
        assert_eq!(stats.snomed_rows, 3);
        assert_eq!(stats.distinct_concepts, 2);
        assert_eq!(stats.mapping_counts.get("snomed"), Some(&2));
        assert_eq!(stats.mapping_counts.get("read"), Some(&2));
    }

    #[test]
    fn test_stats_takes_first_enrichment_values() {
        let mut first = entry("snomed", None);
        first.system = Some("  ".to_string());
        let mut second = entry("snomed", None);
        second.system = Some("Endocrine Diseases".to_string());
        second.disease_num = Some(12);

        let stats = CodelistStats::from_entries(&[first, second]);
        assert_eq!(stats.system.as_deref(), Some("Endocrine Diseases"));
        assert_eq!(stats.disease_num, Some(12));
        assert_eq!(stats.system_num, None);
    }

    #[test]
    fn test_parse_int_is_lenient() {
        assert_eq!(parse_int("12"), Some(12));
        assert_eq!(parse_int(" 8.0 "), Some(8));
        assert_eq!(parse_int("8.5"), None);
        assert_eq!(parse_int("not-a-number"), None);
        assert_eq!(parse_int(""), None);
    }

    #[test]
    fn test_record_defaults() {
        let record = ConditionRecord::from_row(SummaryRow {
            disease_num: 1,
            disease_mod: "Type 2 Diabetes Mellitus".to_string(),
            disease: "Type 2 Diabetes".to_string(),
            system: "Endocrine Diseases".to_string(),
            system_num: 3,
            diagnosis_type: Some("".to_string()),
            testresults: Some("yes".to_string()),
        });
        assert_eq!(record.diagnosis_type, "unknown");
        assert!(record.has_test_results);
        assert!(record.matches("Diabetes"));
        assert!(!record.matches("diabetes"));
    }
}
