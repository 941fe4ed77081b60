//! Curated multimorbidity tables.
//!
//! Literature-derived condition pairs, pattern groups, body-system
//! interactions and illustrative patients. The built-in tables reflect
//! the CPRD multimorbidity research set; a TOML file with the same shape
//! can replace them.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::model::{Association, InteractionLevel};
use crate::error::{MmkgError, MmkgResult};

/// A group of conditions that form a named multimorbidity pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternGroup {
    pub category: String,
    pub conditions: Vec<String>,
}

/// A directed condition pair with an association and strength in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CuratedAssociation {
    pub source: String,
    pub target: String,
    pub association: Association,
    pub strength: f64,
}

/// A body-system pair with an interaction level and positive score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemInteraction {
    pub source: String,
    pub target: String,
    pub level: InteractionLevel,
    pub score: f64,
}

/// An illustrative patient profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplePatient {
    pub id: String,
    pub age_group: String,
    pub complexity: String,
    pub conditions: Vec<String>,
}

/// All curated tables consumed by the synthesizer and populator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CuratedTables {
    #[serde(default)]
    pub pattern_groups: Vec<PatternGroup>,
    #[serde(default)]
    pub associations: Vec<CuratedAssociation>,
    #[serde(default)]
    pub system_interactions: Vec<SystemInteraction>,
    #[serde(default)]
    pub patients: Vec<SamplePatient>,
}

impl CuratedTables {
    /// Built-in CPRD tables.
    pub fn cprd() -> Self {
        Self {
            pattern_groups: vec![
                group("CARDIOVASCULAR_METABOLIC", &["Type 2 Diabetes Mellitus", "Hypertension"]),
                group("CARDIOPULMONARY", &["COPD", "Heart failure"]),
                group("PSYCHONEPHRIC", &["Depression", "Chronic Kidney Disease"]),
                group("METABOLIC_SYNDROME", &["Obesity", "Type 2 Diabetes Mellitus"]),
            ],
            associations: cprd_associations(),
            system_interactions: cprd_system_interactions(),
            patients: cprd_patients(),
        }
    }

    /// Load tables from a TOML file and validate them.
    pub fn from_toml_file(path: &Path) -> MmkgResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let tables: Self = toml::from_str(&content)?;
        tables.validate()?;
        Ok(tables)
    }

    /// Check strength ranges and group sizes.
    pub fn validate(&self) -> MmkgResult<()> {
        for group in &self.pattern_groups {
            if group.conditions.len() < 2 {
                return Err(MmkgError::CuratedTables(format!(
                    "pattern group '{}' needs at least two conditions",
                    group.category
                )));
            }
        }
        for assoc in &self.associations {
            if !(0.0..=1.0).contains(&assoc.strength) {
                return Err(MmkgError::CuratedTables(format!(
                    "strength {} for '{}' -> '{}' is outside [0, 1]",
                    assoc.strength, assoc.source, assoc.target
                )));
            }
        }
        for interaction in &self.system_interactions {
            if !(interaction.score > 0.0) {
                return Err(MmkgError::CuratedTables(format!(
                    "interaction score for '{}' -> '{}' must be positive",
                    interaction.source, interaction.target
                )));
            }
        }
        Ok(())
    }
}

fn group(category: &str, conditions: &[&str]) -> PatternGroup {
    PatternGroup {
        category: category.to_string(),
        conditions: conditions.iter().map(|c| c.to_string()).collect(),
    }
}

fn assoc(source: &str, target: &str, association: Association, strength: f64) -> CuratedAssociation {
    CuratedAssociation {
        source: source.to_string(),
        target: target.to_string(),
        association,
        strength,
    }
}

fn cprd_associations() -> Vec<CuratedAssociation> {
    use Association::*;

    vec![
        // Cardiovascular-endocrine
        assoc("Type 2 Diabetes Mellitus", "Hypertension", CommonlyOccursWith, 0.85),
        assoc("Type 2 Diabetes Mellitus", "Heart failure", CommonlyOccursWith, 0.65),
        assoc("Type 2 Diabetes Mellitus", "Chronic Kidney Disease", CommonlyOccursWith, 0.75),
        assoc("Type 2 Diabetes Mellitus", "Obesity", CommonlyOccursWith, 0.70),
        assoc("Type 2 Diabetes Mellitus", "Diabetic Neuropathy", LeadsTo, 0.90),
        assoc("Type 1 Diabetes Mellitus", "Diabetic Neuropathy", LeadsTo, 0.75),
        // Cardiovascular
        assoc("Hypertension", "Heart failure", CommonlyOccursWith, 0.80),
        assoc("Hypertension", "Atrial Fibrillation", CommonlyOccursWith, 0.60),
        assoc("Myocardial Infarction", "Heart failure", LeadsTo, 0.70),
        assoc("Coronary Heart Disease (not otherwise specified)", "Myocardial Infarction", LeadsTo, 0.65),
        // Respiratory-cardiovascular
        assoc("COPD", "Heart failure", CommonlyOccursWith, 0.45),
        assoc("COPD", "Depression", CommonlyOccursWith, 0.55),
        // Mental health
        assoc("Depression", "Anxiety disorders", CommonlyOccursWith, 0.70),
        assoc("Depression", "Obesity", CommonlyOccursWith, 0.40),
        // Metabolic syndrome
        assoc("Obesity", "Type 2 Diabetes Mellitus", IncreasesRiskOf, 0.75),
        assoc("Obesity", "Hypertension", IncreasesRiskOf, 0.65),
        // Cancer
        assoc("Primary Malignancy_Lung", "COPD", AssociatedWith, 0.55),
        assoc("Primary Malignancy_Liver", "Alcoholic liver disease", AssociatedWith, 0.60),
        // Autoimmune
        assoc("Rheumatoid Arthritis", "Depression", CommonlyOccursWith, 0.50),
        assoc("Lupus Erythematosus", "Chronic Kidney Disease", LeadsTo, 0.40),
    ]
}

fn cprd_system_interactions() -> Vec<SystemInteraction> {
    use InteractionLevel::*;

    let interaction = |source: &str, target: &str, level, score| SystemInteraction {
        source: source.to_string(),
        target: target.to_string(),
        level,
        score,
    };

    vec![
        interaction("Diseases of the Circulatory System", "Endocrine Diseases", HighInteraction, 8.5),
        interaction("Diseases of the Circulatory System", "Diseases of the Respiratory System", ModerateInteraction, 6.8),
        interaction("Endocrine Diseases", "Diseases of the Genitourinary System", HighInteraction, 7.2),
        interaction("Mental Health Disorders", "Diseases of the Circulatory System", ModerateInteraction, 5.1),
        interaction("Mental Health Disorders", "Endocrine Diseases", ModerateInteraction, 6.2),
        interaction("Diseases of the Respiratory System", "Mental Health Disorders", ModerateInteraction, 4.1),
    ]
}

fn cprd_patients() -> Vec<SamplePatient> {
    let patient = |id: &str, age_group: &str, complexity: &str, conditions: &[&str]| SamplePatient {
        id: id.to_string(),
        age_group: age_group.to_string(),
        complexity: complexity.to_string(),
        conditions: conditions.iter().map(|c| c.to_string()).collect(),
    };

    vec![
        patient("PATIENT_001", "65-75", "HIGH", &["Type 2 Diabetes Mellitus", "Hypertension", "Heart failure"]),
        patient("PATIENT_002", "55-65", "MODERATE", &["COPD", "Depression", "Anxiety disorders"]),
        patient("PATIENT_003", "45-55", "HIGH", &["Obesity", "Type 2 Diabetes Mellitus", "Hypertension", "Depression"]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cprd_tables_are_valid() {
        let tables = CuratedTables::cprd();
        assert!(tables.validate().is_ok());
        assert_eq!(tables.pattern_groups.len(), 4);
        assert_eq!(tables.associations.len(), 20);
        assert_eq!(tables.system_interactions.len(), 6);
        assert_eq!(tables.patients.len(), 3);
    }

    #[test]
    fn test_strength_out_of_range_rejected() {
        let mut tables = CuratedTables::default();
        tables.associations.push(assoc("A", "B", Association::LeadsTo, 1.5));
        assert!(matches!(tables.validate(), Err(MmkgError::CuratedTables(_))));
    }

    #[test]
    fn test_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("curated.toml");
        std::fs::write(
            &path,
            r#"
[[pattern_groups]]
category = "TEST_PATTERN"
conditions = ["Asthma", "Eczema", "Hay fever"]

[[associations]]
source = "Asthma"
target = "COPD"
association = "LEADS_TO"
strength = 0.3
"#,
        )
        .unwrap();

        let tables = CuratedTables::from_toml_file(&path).unwrap();
        assert_eq!(tables.pattern_groups[0].conditions.len(), 3);
        assert_eq!(tables.associations[0].association, Association::LeadsTo);
        assert!(tables.system_interactions.is_empty());
    }
}
