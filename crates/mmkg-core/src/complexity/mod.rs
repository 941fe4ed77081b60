//! Multimorbidity complexity analysis.
//!
//! Scores each condition by the number of MULTIMORBIDITY_PATTERN
//! relationships touching it and summarises how conditions spread over
//! body systems.

pub mod model;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::info;

use crate::condition::model::{Codelist, ConditionRecord};
use crate::relationship::model::{Relationship, RelationshipKind};
use model::{ComplexityLevel, ConditionComplexity, SystemDistribution, SystemShare, HUB_THRESHOLD};

/// Count distinct MULTIMORBIDITY_PATTERN relationships per condition id.
///
/// Direction is ignored and duplicates under the merge key count once.
pub fn relationship_degrees(records: &[ConditionRecord], relationships: &[Relationship]) -> HashMap<i64, usize> {
    let mut degrees: HashMap<i64, usize> = records.iter().map(|r| (r.id, 0)).collect();

    let distinct: BTreeSet<_> = relationships
        .iter()
        .filter(|r| r.kind == RelationshipKind::MultimorbidityPattern)
        .map(Relationship::key)
        .collect();

    for key in distinct {
        let ids = [key.source.condition_id(), key.target.condition_id()];
        for id in ids.into_iter().flatten() {
            if let Some(degree) = degrees.get_mut(&id) {
                *degree += 1;
            }
        }
    }

    degrees
}

/// Complexity score for every condition, in record order.
pub fn score_conditions(records: &[ConditionRecord], relationships: &[Relationship]) -> Vec<ConditionComplexity> {
    let degrees = relationship_degrees(records, relationships);

    let scores: Vec<ConditionComplexity> = records
        .iter()
        .map(|record| {
            let degree = degrees.get(&record.id).copied().unwrap_or(0);
            ConditionComplexity {
                condition_id: record.id,
                name: record.name.clone(),
                degree,
                level: ComplexityLevel::from_degree(degree),
                is_hub: degree >= HUB_THRESHOLD,
            }
        })
        .collect();

    let hubs = scores.iter().filter(|s| s.is_hub).count();
    info!(conditions = scores.len(), hubs, "Scored condition complexity");
    scores
}

/// Count of conditions per complexity level.
pub fn level_counts(scores: &[ConditionComplexity]) -> BTreeMap<ComplexityLevel, usize> {
    let mut counts = BTreeMap::new();
    for score in scores {
        *counts.entry(score.level).or_insert(0) += 1;
    }
    counts
}

/// Distribution of summary records over body systems.
pub fn distribution_from_records(records: &[ConditionRecord], expected_systems: usize) -> SystemDistribution {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for record in records {
        *counts.entry(record.system.clone()).or_insert(0) += 1;
    }
    distribution_from_counts(counts, expected_systems)
}

/// Distribution of codelists over the body systems named in their metadata.
///
/// Codelists without a system column are counted in the total but not in
/// any system.
pub fn distribution_from_codelists(codelists: &[Codelist], expected_systems: usize) -> SystemDistribution {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for codelist in codelists {
        if let Some(system) = &codelist.stats.system {
            *counts.entry(system.clone()).or_insert(0) += 1;
        }
    }
    let mut distribution = distribution_from_counts(counts, expected_systems);
    distribution.total_conditions = codelists.len();
    distribution.avg_conditions_per_system = average(codelists.len(), distribution.systems.len());
    distribution
}

/// Build a distribution from per-system counts.
///
/// Burden ratio is `max / min`, or infinite when the minimum is zero or
/// there are no systems. Average per system is zero when there are no
/// systems.
pub fn distribution_from_counts(counts: BTreeMap<String, usize>, expected_systems: usize) -> SystemDistribution {
    let total: usize = counts.values().sum();
    let max_count = counts.values().copied().max().unwrap_or(0);
    let min_count = counts.values().copied().min().unwrap_or(0);

    let burden_ratio = if min_count == 0 {
        f64::INFINITY
    } else {
        max_count as f64 / min_count as f64
    };

    let diversity = if expected_systems == 0 {
        0.0
    } else {
        counts.len() as f64 / expected_systems as f64
    };

    let mut systems: Vec<SystemShare> = counts
        .iter()
        .map(|(system, &count)| SystemShare {
            system: system.clone(),
            count,
            percentage: if total == 0 { 0.0 } else { count as f64 * 100.0 / total as f64 },
        })
        .collect();
    systems.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.system.cmp(&b.system)));

    SystemDistribution {
        avg_conditions_per_system: average(total, systems.len()),
        systems,
        total_conditions: total,
        max_count,
        min_count,
        burden_ratio,
        diversity,
    }
}

fn average(total: usize, systems: usize) -> f64 {
    if systems == 0 {
        0.0
    } else {
        total as f64 / systems as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relationship::curated::{CuratedTables, PatternGroup};
    use crate::relationship::model::Endpoint;
    use crate::relationship::synthesize;
    use chrono::Utc;

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

    fn pattern(source: &ConditionRecord, target: &ConditionRecord, qualifier: &str) -> Relationship {
        Relationship {
            source: Endpoint::condition(source),
            target: Endpoint::condition(target),
            kind: RelationshipKind::MultimorbidityPattern,
            qualifier: Some(qualifier.to_string()),
            strength: None,
            evidence: "test".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_levels_from_degree() {
        assert_eq!(ComplexityLevel::from_degree(0), ComplexityLevel::Isolated);
        assert_eq!(ComplexityLevel::from_degree(1), ComplexityLevel::Low);
        assert_eq!(ComplexityLevel::from_degree(2), ComplexityLevel::Low);
        assert_eq!(ComplexityLevel::from_degree(3), ComplexityLevel::Moderate);
        assert_eq!(ComplexityLevel::from_degree(4), ComplexityLevel::Moderate);
        assert_eq!(ComplexityLevel::from_degree(5), ComplexityLevel::High);
        assert_eq!(ComplexityLevel::from_degree(50), ComplexityLevel::High);
    }

    #[test]
    fn test_levels_are_monotonic() {
        for degree in 0..20 {
            assert!(ComplexityLevel::from_degree(degree) <= ComplexityLevel::from_degree(degree + 1));
        }
    }

    #[test]
    fn test_small_example_scores() {
        let records = vec![record(1, "A", "X"), record(2, "B", "X"), record(3, "C", "Y")];
        let tables = CuratedTables {
            pattern_groups: vec![PatternGroup {
                category: "TEST".to_string(),
                conditions: vec!["A".to_string(), "C".to_string()],
            }],
            ..CuratedTables::default()
        };
        let rels = synthesize(&records, &tables);
        let scores = score_conditions(&records, &rels);

        assert_eq!(scores[0].level, ComplexityLevel::Low);
        assert_eq!(scores[1].level, ComplexityLevel::Isolated);
        assert_eq!(scores[2].level, ComplexityLevel::Low);
        assert!(scores.iter().all(|s| !s.is_hub));
    }

    #[test]
    fn test_degree_ignores_direction_and_duplicates() {
        let records = vec![record(1, "A", "X"), record(2, "B", "Y"), record(3, "C", "Z")];
        let rels = vec![
            pattern(&records[0], &records[1], "LEADS_TO"),
            pattern(&records[0], &records[1], "LEADS_TO"),
            pattern(&records[1], &records[0], "LEADS_TO"),
            pattern(&records[2], &records[0], "COMMONLY_OCCURS_WITH"),
        ];
        let degrees = relationship_degrees(&records, &rels);

        assert_eq!(degrees[&1], 3);
        assert_eq!(degrees[&2], 2);
        assert_eq!(degrees[&3], 1);
    }

    #[test]
    fn test_same_system_edges_do_not_count() {
        let records = vec![record(1, "A", "X"), record(2, "B", "X")];
        let rels = synthesize(&records, &CuratedTables::default());
        let scores = score_conditions(&records, &rels);
        assert!(scores.iter().all(|s| s.degree == 0));
    }

    #[test]
    fn test_hub_threshold() {
        let hub = record(1, "Hub", "X");
        let others: Vec<_> = (2..6).map(|i| record(i, &format!("N{}", i), "Y")).collect();
        let mut records = vec![hub.clone()];
        records.extend(others.iter().cloned());
        let rels: Vec<_> = others.iter().map(|o| pattern(&hub, o, "TEST")).collect();

        let scores = score_conditions(&records, &rels);
        assert_eq!(scores[0].degree, 4);
        assert!(scores[0].is_hub);
        assert_eq!(scores[0].level, ComplexityLevel::Moderate);
        assert_eq!(level_counts(&scores)[&ComplexityLevel::Low], 4);
    }

    #[test]
    fn test_distribution_metrics() {
        let records = vec![
            record(1, "A", "X"),
            record(2, "B", "X"),
            record(3, "C", "X"),
            record(4, "D", "X"),
            record(5, "E", "Y"),
            record(6, "F", "Y"),
        ];
        let dist = distribution_from_records(&records, 15);

        assert_eq!(dist.systems_count(), 2);
        assert_eq!(dist.systems[0].system, "X");
        assert_eq!(dist.max_count, 4);
        assert_eq!(dist.min_count, 2);
        assert!((dist.burden_ratio - 2.0).abs() < 1e-9);
        assert!((dist.avg_conditions_per_system - 3.0).abs() < 1e-9);
        assert!((dist.diversity - 2.0 / 15.0).abs() < 1e-9);
        assert!((dist.systems[1].percentage - 100.0 / 3.0).abs() < 1e-9);
        assert!(dist.burden_ratio >= 1.0);
    }

    #[test]
    fn test_zero_minimum_is_unbounded() {
        let counts = BTreeMap::from([("X".to_string(), 4), ("Y".to_string(), 0)]);
        let dist = distribution_from_counts(counts, 15);
        assert!(dist.is_unbounded());
        assert!((dist.avg_conditions_per_system - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_distribution() {
        let dist = distribution_from_records(&[], 15);
        assert_eq!(dist.avg_conditions_per_system, 0.0);
        assert_eq!(dist.diversity, 0.0);
        assert!(dist.is_unbounded());
    }
}
