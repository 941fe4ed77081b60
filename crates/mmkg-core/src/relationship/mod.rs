//! Relationship synthesis.
//!
//! Derives condition-to-condition and system-to-system relationships from
//! the summary records and the curated tables:
//! - SAME_SYSTEM: every unordered pair of conditions inside a body system
//! - MULTIMORBIDITY_PATTERN: curated pattern groups and associations
//! - SYSTEM_INTERACTION: curated body-system pairs
//!
//! Curated endpoints are resolved by case-sensitive substring match on the
//! canonical or original condition name. One curated name may resolve to
//! several conditions; every combination is emitted.

pub mod curated;
pub mod model;

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::condition::conditions_by_system;
use crate::condition::model::ConditionRecord;
use curated::CuratedTables;
use model::{
    Endpoint, Relationship, RelationshipKey, RelationshipKind, EVIDENCE_CLINICAL_ASSOCIATION,
    EVIDENCE_CPRD_RESEARCH, EVIDENCE_SYSTEM_COOCCURRENCE,
};

/// Resolves curated condition names to summary records.
pub struct ConditionIndex<'a> {
    records: &'a [ConditionRecord],
}

impl<'a> ConditionIndex<'a> {
    pub fn new(records: &'a [ConditionRecord]) -> Self {
        Self { records }
    }

    /// Every record whose canonical or original name contains `fragment`.
    ///
    /// Logs when the fragment resolves to nothing or to several records.
    pub fn resolve(&self, fragment: &str) -> Vec<&'a ConditionRecord> {
        let matches: Vec<&ConditionRecord> = self.records.iter().filter(|r| r.matches(fragment)).collect();

        match matches.len() {
            0 => debug!(name = fragment, "Curated condition not found"),
            1 => {}
            n => warn!(
                name = fragment,
                matches = n,
                conditions = ?matches.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
                "Curated condition resolves to several conditions"
            ),
        }
        matches
    }
}

/// Run every synthesis pass and concatenate the results.
///
/// SAME_SYSTEM and MULTIMORBIDITY_PATTERN edges for the same pair are both kept.
pub fn synthesize(records: &[ConditionRecord], tables: &CuratedTables) -> Vec<Relationship> {
    let now = Utc::now();
    let index = ConditionIndex::new(records);

    let mut relationships = same_system_relationships(records, now);
    let same_system = relationships.len();

    relationships.extend(pattern_relationships(&index, tables, now));
    let patterns = relationships.len() - same_system;

    relationships.extend(system_interactions(records, tables, now));
    let interactions = relationships.len() - same_system - patterns;

    info!(same_system, patterns, interactions, "Synthesized relationships");
    relationships
}

/// Emit SAME_SYSTEM for every unordered pair of conditions in each system.
pub fn same_system_relationships(records: &[ConditionRecord], now: DateTime<Utc>) -> Vec<Relationship> {
    let mut relationships = Vec::new();

    for (system, conditions) in conditions_by_system(records) {
        for (i, first) in conditions.iter().enumerate() {
            for second in &conditions[i + 1..] {
                relationships.push(Relationship {
                    source: Endpoint::condition(first),
                    target: Endpoint::condition(second),
                    kind: RelationshipKind::SameSystem,
                    qualifier: Some(system.to_string()),
                    strength: None,
                    evidence: EVIDENCE_SYSTEM_COOCCURRENCE.to_string(),
                    created_at: now,
                });
            }
        }
    }

    relationships
}

/// Emit MULTIMORBIDITY_PATTERN edges from pattern groups and associations.
pub fn pattern_relationships(
    index: &ConditionIndex<'_>,
    tables: &CuratedTables,
    now: DateTime<Utc>,
) -> Vec<Relationship> {
    let mut relationships = Vec::new();

    for group in &tables.pattern_groups {
        for (i, first) in group.conditions.iter().enumerate() {
            for second in &group.conditions[i + 1..] {
                for (source, target) in resolve_pair(index, first, second) {
                    relationships.push(Relationship {
                        source: Endpoint::condition(source),
                        target: Endpoint::condition(target),
                        kind: RelationshipKind::MultimorbidityPattern,
                        qualifier: Some(group.category.clone()),
                        strength: None,
                        evidence: EVIDENCE_CLINICAL_ASSOCIATION.to_string(),
                        created_at: now,
                    });
                }
            }
        }
    }

    for assoc in &tables.associations {
        for (source, target) in resolve_pair(index, &assoc.source, &assoc.target) {
            relationships.push(Relationship {
                source: Endpoint::condition(source),
                target: Endpoint::condition(target),
                kind: RelationshipKind::MultimorbidityPattern,
                qualifier: Some(assoc.association.as_str().to_string()),
                strength: Some(assoc.strength),
                evidence: EVIDENCE_CPRD_RESEARCH.to_string(),
                created_at: now,
            });
        }
    }

    relationships
}

/// Emit SYSTEM_INTERACTION edges for curated system pairs present in the data.
pub fn system_interactions(
    records: &[ConditionRecord],
    tables: &CuratedTables,
    now: DateTime<Utc>,
) -> Vec<Relationship> {
    let systems: BTreeSet<&str> = records.iter().map(|r| r.system.as_str()).collect();

    tables
        .system_interactions
        .iter()
        .filter(|i| i.source != i.target)
        .filter(|i| {
            let present = systems.contains(i.source.as_str()) && systems.contains(i.target.as_str());
            if !present {
                debug!(source = %i.source, target = %i.target, "System interaction skipped, system absent");
            }
            present
        })
        .map(|i| Relationship {
            source: Endpoint::system(&i.source),
            target: Endpoint::system(&i.target),
            kind: RelationshipKind::SystemInteraction,
            qualifier: Some(i.level.as_str().to_string()),
            strength: Some(i.score),
            evidence: EVIDENCE_CPRD_RESEARCH.to_string(),
            created_at: now,
        })
        .collect()
}

/// Collapse duplicates by merge key, keeping the last write.
///
/// Output order follows the first occurrence of each key.
pub fn merge_relationships(relationships: Vec<Relationship>) -> Vec<Relationship> {
    let mut positions: BTreeMap<RelationshipKey, usize> = BTreeMap::new();
    let mut merged: Vec<Relationship> = Vec::with_capacity(relationships.len());

    for rel in relationships {
        match positions.get(&rel.key()) {
            Some(&pos) => {
                let existing = &mut merged[pos];
                existing.strength = rel.strength;
                existing.evidence = rel.evidence;
                existing.created_at = rel.created_at;
            }
            None => {
                positions.insert(rel.key(), merged.len());
                merged.push(rel);
            }
        }
    }

    merged
}

/// Cross product of the matches for both names, minus self pairs.
fn resolve_pair<'a>(
    index: &ConditionIndex<'a>,
    source: &str,
    target: &str,
) -> Vec<(&'a ConditionRecord, &'a ConditionRecord)> {
    let sources = index.resolve(source);
    let targets = index.resolve(target);

    let mut pairs = Vec::with_capacity(sources.len() * targets.len());
    for s in &sources {
        for t in &targets {
            if s.id != t.id {
                pairs.push((*s, *t));
            }
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use curated::{CuratedAssociation, PatternGroup, SystemInteraction};
    use model::{Association, InteractionLevel};

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

    fn pair_table(first: &str, second: &str) -> CuratedTables {
        CuratedTables {
            pattern_groups: vec![PatternGroup {
                category: "TEST".to_string(),
                conditions: vec![first.to_string(), second.to_string()],
            }],
            ..CuratedTables::default()
        }
    }

    #[test]
    fn test_same_system_pair_count() {
        let mut records = Vec::new();
        for i in 0..5 {
            records.push(record(i, &format!("X{}", i), "X"));
        }
        for i in 5..8 {
            records.push(record(i, &format!("Y{}", i), "Y"));
        }
        records.push(record(8, "Z8", "Z"));

        let rels = same_system_relationships(&records, Utc::now());
        let count = |system: &str| rels.iter().filter(|r| r.qualifier.as_deref() == Some(system)).count();

        assert_eq!(count("X"), 10);
        assert_eq!(count("Y"), 3);
        assert_eq!(count("Z"), 0);
        assert!(rels.iter().all(|r| r.source != r.target));
        assert!(rels.iter().all(|r| r.kind == RelationshipKind::SameSystem));
    }

    #[test]
    fn test_small_example() {
        let records = vec![record(1, "A", "X"), record(2, "B", "X"), record(3, "C", "Y")];
        let rels = synthesize(&records, &pair_table("A", "C"));

        assert_eq!(rels.len(), 2);
        let same: Vec<_> = rels.iter().filter(|r| r.kind == RelationshipKind::SameSystem).collect();
        assert_eq!(same.len(), 1);
        assert_eq!(same[0].source.name(), "A");
        assert_eq!(same[0].target.name(), "B");

        let pattern: Vec<_> = rels
            .iter()
            .filter(|r| r.kind == RelationshipKind::MultimorbidityPattern)
            .collect();
        assert_eq!(pattern.len(), 1);
        assert_eq!(pattern[0].source.condition_id(), Some(1));
        assert_eq!(pattern[0].target.condition_id(), Some(3));
        assert_eq!(pattern[0].qualifier.as_deref(), Some("TEST"));
    }

    #[test]
    fn test_substring_match_emits_cross_product() {
        let records = vec![
            record(1, "Type 1 Diabetes", "Endocrine"),
            record(2, "Type 2 Diabetes", "Endocrine"),
            record(3, "Hypertension", "Circulatory"),
        ];
        let index = ConditionIndex::new(&records);
        let rels = pattern_relationships(&index, &pair_table("Diabetes", "Hypertension"), Utc::now());

        assert_eq!(rels.len(), 2);
        assert!(rels.iter().all(|r| r.target.condition_id() == Some(3)));
        let sources: BTreeSet<_> = rels.iter().filter_map(|r| r.source.condition_id()).collect();
        assert_eq!(sources, BTreeSet::from([1, 2]));
    }

    #[test]
    fn test_self_pairs_excluded() {
        let records = vec![
            record(1, "Type 2 Diabetes Mellitus", "Endocrine"),
            record(2, "Diabetic Neuropathy", "Nervous"),
        ];
        let index = ConditionIndex::new(&records);
        // "Diabet" matches both records on both sides; only the two cross pairs remain
        let rels = pattern_relationships(&index, &pair_table("Diabet", "Diabet"), Utc::now());

        assert_eq!(rels.len(), 2);
        assert!(rels.iter().all(|r| r.source != r.target));
    }

    #[test]
    fn test_match_uses_original_name_and_is_case_sensitive() {
        let mut copd = record(1, "Chronic obstructive pulmonary disease", "Respiratory");
        copd.original_name = "COPD".to_string();
        let records = vec![copd, record(2, "Heart failure", "Circulatory")];
        let index = ConditionIndex::new(&records);

        assert_eq!(index.resolve("COPD").len(), 1);
        assert!(index.resolve("copd").is_empty());
        assert_eq!(index.resolve("Chronic obstructive")[0].id, 1);
    }

    #[test]
    fn test_unmatched_endpoint_emits_nothing() {
        let records = vec![record(1, "Asthma", "Respiratory")];
        let index = ConditionIndex::new(&records);
        let rels = pattern_relationships(&index, &pair_table("Asthma", "Gout"), Utc::now());
        assert!(rels.is_empty());
    }

    #[test]
    fn test_associations_carry_strength() {
        let records = vec![record(1, "Obesity", "Endocrine"), record(2, "Hypertension", "Circulatory")];
        let tables = CuratedTables {
            associations: vec![CuratedAssociation {
                source: "Obesity".to_string(),
                target: "Hypertension".to_string(),
                association: Association::IncreasesRiskOf,
                strength: 0.65,
            }],
            ..CuratedTables::default()
        };
        let index = ConditionIndex::new(&records);
        let rels = pattern_relationships(&index, &tables, Utc::now());

        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].qualifier.as_deref(), Some("INCREASES_RISK_OF"));
        assert_eq!(rels[0].strength, Some(0.65));
        assert_eq!(rels[0].evidence, EVIDENCE_CPRD_RESEARCH);
    }

    #[test]
    fn test_system_interactions_require_both_systems() {
        let records = vec![record(1, "Hypertension", "Circulatory"), record(2, "Obesity", "Endocrine")];
        let interaction = |source: &str, target: &str| SystemInteraction {
            source: source.to_string(),
            target: target.to_string(),
            level: InteractionLevel::HighInteraction,
            score: 8.5,
        };
        let tables = CuratedTables {
            system_interactions: vec![
                interaction("Circulatory", "Endocrine"),
                interaction("Circulatory", "Respiratory"),
            ],
            ..CuratedTables::default()
        };

        let rels = system_interactions(&records, &tables, Utc::now());
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].source, Endpoint::system("Circulatory"));
        assert_eq!(rels[0].strength, Some(8.5));
    }

    #[test]
    fn test_merge_keeps_last_write() {
        let records = vec![record(1, "A", "X"), record(2, "B", "Y")];
        let now = Utc::now();
        let make = |strength: f64| Relationship {
            source: Endpoint::condition(&records[0]),
            target: Endpoint::condition(&records[1]),
            kind: RelationshipKind::MultimorbidityPattern,
            qualifier: Some("LEADS_TO".to_string()),
            strength: Some(strength),
            evidence: EVIDENCE_CPRD_RESEARCH.to_string(),
            created_at: now,
        };

        let merged = merge_relationships(vec![make(0.2), make(0.9)]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].strength, Some(0.9));
    }

    #[test]
    fn test_same_and_pattern_coexist() {
        let records = vec![record(1, "A", "X"), record(2, "B", "X")];
        let rels = merge_relationships(synthesize(&records, &pair_table("A", "B")));
        assert_eq!(rels.len(), 2);
    }
}
