//! Hypothesis evaluation models.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outcome of a hypothesis check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Conclusion {
    Supported,
    Inconclusive,
}

impl Conclusion {
    pub fn from_bool(supported: bool) -> Self {
        if supported {
            Self::Supported
        } else {
            Self::Inconclusive
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Supported => "SUPPORTED",
            Self::Inconclusive => "INCONCLUSIVE",
        }
    }
}

/// The multimorbidity hypotheses checked against the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hypothesis {
    CardiovascularDiabetesClustering,
    CrossSystemPatterns,
    SnomedCoverage,
    SystemBurden,
}

impl Hypothesis {
    pub const ALL: [Hypothesis; 4] = [
        Self::CardiovascularDiabetesClustering,
        Self::CrossSystemPatterns,
        Self::SnomedCoverage,
        Self::SystemBurden,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Self::CardiovascularDiabetesClustering => "Cardiovascular-Diabetes Clustering",
            Self::CrossSystemPatterns => "Complex Multimorbidity Cross-System Patterns",
            Self::SnomedCoverage => "SNOMED CT Code Mapping Effectiveness",
            Self::SystemBurden => "System Burden Distribution",
        }
    }

    /// Questions put to the GraphRAG chain for this hypothesis.
    pub fn questions(&self) -> &'static [&'static str] {
        match self {
            Self::CardiovascularDiabetesClustering => &[
                "What cardiovascular conditions are most commonly associated with diabetes?",
                "What is the relationship between diabetes and heart failure in the dataset?",
                "Which conditions form the largest multimorbidity cluster?",
            ],
            Self::CrossSystemPatterns => &[
                "How do endocrine and cardiovascular systems interact in multimorbidity?",
                "What role do mental health conditions play in complex multimorbidity?",
                "Which body systems are most commonly involved in complex cases?",
            ],
            Self::SnomedCoverage => &[
                "How comprehensive is the SNOMED CT code coverage in the dataset?",
                "Which conditions have the most detailed SNOMED CT code mappings?",
            ],
            Self::SystemBurden => &[
                "Which body systems have the highest number of chronic conditions?",
                "What is the distribution of conditions across different body systems?",
            ],
        }
    }
}

/// Evidence and conclusion for one hypothesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HypothesisResult {
    pub hypothesis: Hypothesis,
    pub conclusion: Conclusion,
    pub evidence: BTreeMap<String, serde_json::Value>,
}

impl HypothesisResult {
    pub fn is_supported(&self) -> bool {
        self.conclusion == Conclusion::Supported
    }
}

/// All hypothesis results with a summary tally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HypothesisReport {
    pub results: Vec<HypothesisResult>,
}

impl HypothesisReport {
    pub fn supported(&self) -> usize {
        self.results.iter().filter(|r| r.is_supported()).count()
    }

    /// Percentage of supported hypotheses, zero when none were run.
    pub fn success_rate(&self) -> f64 {
        if self.results.is_empty() {
            0.0
        } else {
            self.supported() as f64 * 100.0 / self.results.len() as f64
        }
    }
}
