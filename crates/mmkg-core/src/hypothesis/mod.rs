//! Hypothesis checks over the loaded codelist data.
//!
//! Each check gathers evidence from the summary records, codelists and
//! synthesized relationships and reaches a SUPPORTED or INCONCLUSIVE
//! conclusion against a fixed threshold.

pub mod model;

use std::collections::{BTreeMap, BTreeSet};

use serde_json::json;
use tracing::info;

use crate::complexity::model::SystemDistribution;
use crate::condition::model::{Codelist, ConditionRecord};
use crate::relationship::model::{Relationship, RelationshipKind};
use model::{Conclusion, Hypothesis, HypothesisReport, HypothesisResult};

/// Combined circulatory + endocrine conditions needed for clustering support.
const CLUSTER_THRESHOLD: usize = 40;

/// Condition families needed for cross-system support.
const MIN_PATTERN_FAMILIES: usize = 3;

/// Body systems needed for cross-system support.
const MIN_SYSTEMS: usize = 10;

/// SNOMED coverage (percent) needed for mapping support.
const SNOMED_COVERAGE_THRESHOLD: f64 = 80.0;

/// Burden ratio above which the distribution counts as uneven.
const UNEVEN_BURDEN_RATIO: f64 = 2.0;

/// Key conditions per multimorbidity family.
const PATTERN_FAMILIES: &[(&str, &[&str])] = &[
    (
        "cardiovascular",
        &[
            "Type 2 Diabetes Mellitus",
            "Hypertension",
            "Heart failure",
            "Coronary Heart Disease",
            "Myocardial Infarction",
            "Atrial Fibrillation",
        ],
    ),
    (
        "metabolic",
        &[
            "Type 2 Diabetes Mellitus",
            "Type 1 Diabetes Mellitus",
            "Obesity",
            "Raised LDL-C",
            "Raised Total Cholesterol",
        ],
    ),
    ("respiratory", &["COPD", "Asthma", "Sleep apnoea", "Pulmonary Fibrosis"]),
    (
        "mental_health",
        &[
            "Depression",
            "Anxiety disorders",
            "Bipolar affective disorder and mania",
            "Schizophrenia",
        ],
    ),
    ("renal", &["Chronic Kidney Disease", "Glomerulonephritis", "Diabetic Neuropathy"]),
];

const HEART_TERMS: &[&str] = &["heart", "cardiac", "coronary", "myocardial"];

/// Inputs shared by every hypothesis check.
pub struct HypothesisInput<'a> {
    pub records: &'a [ConditionRecord],
    pub codelists: &'a [Codelist],
    pub relationships: &'a [Relationship],
    pub distribution: &'a SystemDistribution,
}

/// Evaluate every hypothesis.
pub fn evaluate_all(input: &HypothesisInput<'_>) -> HypothesisReport {
    let results: Vec<HypothesisResult> = Hypothesis::ALL.iter().map(|h| evaluate(*h, input)).collect();
    let supported = results.iter().filter(|r| r.is_supported()).count();
    info!(total = results.len(), supported, "Hypotheses evaluated");
    HypothesisReport { results }
}

/// Evaluate a single hypothesis.
pub fn evaluate(hypothesis: Hypothesis, input: &HypothesisInput<'_>) -> HypothesisResult {
    match hypothesis {
        Hypothesis::CardiovascularDiabetesClustering => cardiovascular_diabetes(input),
        Hypothesis::CrossSystemPatterns => cross_system_patterns(input),
        Hypothesis::SnomedCoverage => snomed_coverage(input.codelists),
        Hypothesis::SystemBurden => system_burden(input.distribution),
    }
}

fn cardiovascular_diabetes(input: &HypothesisInput<'_>) -> HypothesisResult {
    let circulatory = in_system(input.records, "circulatory");
    let endocrine = in_system(input.records, "endocrine");

    let diabetes_variants = endocrine
        .iter()
        .filter(|r| lower_names(r).iter().any(|n| n.contains("diabetes")))
        .count();
    let heart_conditions = circulatory
        .iter()
        .filter(|r| lower_names(r).iter().any(|n| HEART_TERMS.iter().any(|t| n.contains(t))))
        .count();

    let cardiovascular_relationships = input
        .relationships
        .iter()
        .filter(|r| {
            r.qualifier
                .as_deref()
                .map_or(false, |q| q.to_lowercase().contains("cardiovascular"))
        })
        .count();
    let diabetes_relationships = input
        .relationships
        .iter()
        .filter(|r| r.kind == RelationshipKind::MultimorbidityPattern)
        .filter(|r| {
            r.source.name().to_lowercase().contains("diabetes") || r.target.name().to_lowercase().contains("diabetes")
        })
        .count();

    let combined = circulatory.len() + endocrine.len();
    let share = percentage(combined, input.records.len());

    let evidence = BTreeMap::from([
        ("cardiovascular_count".to_string(), json!(circulatory.len())),
        ("endocrine_count".to_string(), json!(endocrine.len())),
        ("diabetes_variants".to_string(), json!(diabetes_variants)),
        ("heart_conditions".to_string(), json!(heart_conditions)),
        ("combined_burden".to_string(), json!(combined)),
        ("combined_share_pct".to_string(), json!(share)),
        ("cardiovascular_relationships".to_string(), json!(cardiovascular_relationships)),
        ("diabetes_relationships".to_string(), json!(diabetes_relationships)),
    ]);

    HypothesisResult {
        hypothesis: Hypothesis::CardiovascularDiabetesClustering,
        conclusion: Conclusion::from_bool(combined > CLUSTER_THRESHOLD),
        evidence,
    }
}

fn cross_system_patterns(input: &HypothesisInput<'_>) -> HypothesisResult {
    let names: BTreeSet<&str> = input
        .records
        .iter()
        .flat_map(|r| [r.name.as_str(), r.original_name.as_str()])
        .collect();

    let mut families = BTreeMap::new();
    for (family, conditions) in PATTERN_FAMILIES {
        let found: Vec<&str> = conditions.iter().copied().filter(|c| names.contains(c)).collect();
        if !found.is_empty() {
            families.insert(family.to_string(), json!(found));
        }
    }

    let categories: BTreeSet<&str> = input
        .relationships
        .iter()
        .filter(|r| r.kind == RelationshipKind::MultimorbidityPattern)
        .filter_map(|r| r.qualifier.as_deref())
        .collect();

    let systems = input.distribution.systems_count();
    let supported = families.len() >= MIN_PATTERN_FAMILIES && systems >= MIN_SYSTEMS;

    let evidence = BTreeMap::from([
        ("total_systems".to_string(), json!(systems)),
        ("pattern_families".to_string(), json!(families)),
        ("pattern_family_count".to_string(), json!(families.len())),
        ("pattern_categories".to_string(), json!(categories)),
        ("burden_ratio".to_string(), ratio_json(input.distribution.burden_ratio)),
    ]);

    HypothesisResult {
        hypothesis: Hypothesis::CrossSystemPatterns,
        conclusion: Conclusion::from_bool(supported),
        evidence,
    }
}

fn snomed_coverage(codelists: &[Codelist]) -> HypothesisResult {
    let total_codes: usize = codelists.iter().map(|c| c.stats.row_count).sum();
    let snomed_codes: usize = codelists.iter().map(|c| c.stats.snomed_rows).sum();
    let coverage = percentage(snomed_codes, total_codes);

    let best = codelists
        .iter()
        .max_by_key(|c| c.stats.distinct_concepts)
        .map(|c| c.condition.clone());

    let evidence = BTreeMap::from([
        ("codelists".to_string(), json!(codelists.len())),
        ("total_codes".to_string(), json!(total_codes)),
        ("snomed_codes".to_string(), json!(snomed_codes)),
        ("coverage_rate".to_string(), json!(coverage)),
        ("most_detailed_condition".to_string(), json!(best)),
    ]);

    HypothesisResult {
        hypothesis: Hypothesis::SnomedCoverage,
        conclusion: Conclusion::from_bool(coverage > SNOMED_COVERAGE_THRESHOLD),
        evidence,
    }
}

fn system_burden(distribution: &SystemDistribution) -> HypothesisResult {
    let counts: BTreeMap<&str, usize> = distribution
        .systems
        .iter()
        .map(|s| (s.system.as_str(), s.count))
        .collect();

    let evidence = BTreeMap::from([
        ("system_distribution".to_string(), json!(counts)),
        ("max_burden".to_string(), json!(distribution.max_count)),
        ("min_burden".to_string(), json!(distribution.min_count)),
        ("burden_ratio".to_string(), ratio_json(distribution.burden_ratio)),
    ]);

    HypothesisResult {
        hypothesis: Hypothesis::SystemBurden,
        conclusion: Conclusion::from_bool(distribution.burden_ratio > UNEVEN_BURDEN_RATIO),
        evidence,
    }
}

fn in_system<'a>(records: &'a [ConditionRecord], keyword: &str) -> Vec<&'a ConditionRecord> {
    records
        .iter()
        .filter(|r| r.system.to_lowercase().contains(keyword))
        .collect()
}

fn lower_names(record: &ConditionRecord) -> [String; 2] {
    [record.name.to_lowercase(), record.original_name.to_lowercase()]
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

/// JSON has no infinity; unbounded ratios are reported as the string "inf".
fn ratio_json(ratio: f64) -> serde_json::Value {
    if ratio.is_finite() {
        json!(ratio)
    } else {
        json!("inf")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::complexity::distribution_from_records;
    use crate::condition::model::CodelistStats;
    use crate::relationship::curated::CuratedTables;
    use crate::relationship::synthesize;

    fn record(id: i64, name: &str, system: &str) -> ConditionRecord {
        ConditionRecord {
            id,
            name: name.to_string(),
            original_name: name.to_string(),
            system: system.to_string(),
            system_num: 1,
            diagnosis_type: "unknown".to_string(),
            has_test_results: false,
        }
    }

    fn codelist(condition: &str, rows: usize, snomed: usize) -> Codelist {
        Codelist {
            condition: condition.to_string(),
            file_path: format!("{}.csv", condition),
            entries: Vec::new(),
            stats: CodelistStats {
                row_count: rows,
                snomed_rows: snomed,
                distinct_concepts: snomed,
                ..CodelistStats::default()
            },
        }
    }

    fn sample_records() -> Vec<ConditionRecord> {
        vec![
            record(1, "Type 2 Diabetes Mellitus", "Endocrine Diseases"),
            record(2, "Type 1 Diabetes Mellitus", "Endocrine Diseases"),
            record(3, "Hypertension", "Diseases of the Circulatory System"),
            record(4, "Heart failure", "Diseases of the Circulatory System"),
            record(5, "Coronary Heart Disease", "Diseases of the Circulatory System"),
            record(6, "Myocardial Infarction", "Diseases of the Circulatory System"),
            record(7, "COPD", "Diseases of the Respiratory System"),
        ]
    }

    #[test]
    fn test_evaluate_all_on_small_dataset() {
        let records = sample_records();
        let relationships = synthesize(&records, &CuratedTables::cprd());
        let distribution = distribution_from_records(&records, 15);
        let codelists = vec![codelist("Hypertension", 10, 9), codelist("COPD", 10, 10)];

        let report = evaluate_all(&HypothesisInput {
            records: &records,
            codelists: &codelists,
            relationships: &relationships,
            distribution: &distribution,
        });

        assert_eq!(report.results.len(), 4);

        let h1 = &report.results[0];
        assert_eq!(h1.evidence["cardiovascular_count"], json!(4));
        assert_eq!(h1.evidence["diabetes_variants"], json!(2));
        assert_eq!(h1.evidence["heart_conditions"], json!(3));
        assert_eq!(h1.conclusion, Conclusion::Inconclusive);
        assert!(h1.evidence["cardiovascular_relationships"].as_u64().unwrap() > 0);

        let h2 = &report.results[1];
        assert_eq!(h2.conclusion, Conclusion::Inconclusive);
        assert_eq!(h2.evidence["pattern_family_count"], json!(3));

        let h3 = &report.results[2];
        assert_eq!(h3.conclusion, Conclusion::Supported);
        assert_eq!(h3.evidence["coverage_rate"], json!(95.0));

        let h4 = &report.results[3];
        assert_eq!(h4.conclusion, Conclusion::Supported);
        assert_eq!(h4.evidence["burden_ratio"], json!(4.0));

        assert_eq!(report.supported(), 2);
        assert!((report.success_rate() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_codelists_is_inconclusive() {
        let result = snomed_coverage(&[]);
        assert_eq!(result.conclusion, Conclusion::Inconclusive);
        assert_eq!(result.evidence["coverage_rate"], json!(0.0));
    }

    #[test]
    fn test_unbounded_ratio_reported_as_inf() {
        let distribution = distribution_from_records(&[], 15);
        let result = system_burden(&distribution);
        assert_eq!(result.evidence["burden_ratio"], json!("inf"));
        assert_eq!(result.conclusion, Conclusion::Supported);
    }
}
