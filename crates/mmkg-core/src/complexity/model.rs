//! Complexity and distribution models.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Relationship degree at which a condition counts as a hub.
pub const HUB_THRESHOLD: usize = 4;

/// Number of body systems in the CPRD classification.
pub const EXPECTED_SYSTEM_COUNT: usize = 15;

/// Multimorbidity complexity of a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplexityLevel {
    Isolated,
    Low,
    Moderate,
    High,
}

impl ComplexityLevel {
    /// Classify a relationship degree.
    pub fn from_degree(degree: usize) -> Self {
        match degree {
            d if d >= 5 => Self::High,
            d if d >= 3 => Self::Moderate,
            d if d >= 1 => Self::Low,
            _ => Self::Isolated,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Isolated => "ISOLATED",
            Self::Low => "LOW",
            Self::Moderate => "MODERATE",
            Self::High => "HIGH",
        }
    }
}

impl fmt::Display for ComplexityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Complexity score attached to one condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionComplexity {
    pub condition_id: i64,
    pub name: String,
    pub degree: usize,
    pub level: ComplexityLevel,
    pub is_hub: bool,
}

/// Condition count of one body system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemShare {
    pub system: String,
    pub count: usize,
    pub percentage: f64,
}

/// Distribution of conditions over body systems.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemDistribution {
    /// Shares ordered by count, largest first.
    pub systems: Vec<SystemShare>,
    pub total_conditions: usize,
    pub max_count: usize,
    pub min_count: usize,
    /// max / min; infinite when the minimum is zero.
    pub burden_ratio: f64,
    pub avg_conditions_per_system: f64,
    /// Distinct systems over the expected system count.
    pub diversity: f64,
}

impl SystemDistribution {
    pub fn systems_count(&self) -> usize {
        self.systems.len()
    }

    /// Whether the burden ratio is unbounded.
    pub fn is_unbounded(&self) -> bool {
        self.burden_ratio.is_infinite()
    }
}
