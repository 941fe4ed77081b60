//! Relationship domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::condition::model::ConditionRecord;

/// Evidence tag for same-system co-occurrence edges.
pub const EVIDENCE_SYSTEM_COOCCURRENCE: &str = "system_cooccurrence";

/// Evidence tag for curated pattern groups.
pub const EVIDENCE_CLINICAL_ASSOCIATION: &str = "clinical_association";

/// Evidence tag for literature-derived associations and system interactions.
pub const EVIDENCE_CPRD_RESEARCH: &str = "CPRD_research";

/// One end of a relationship.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Endpoint {
    Condition { id: i64, name: String },
    System { name: String },
}

impl Endpoint {
    /// Endpoint for a condition record.
    pub fn condition(record: &ConditionRecord) -> Self {
        Self::Condition {
            id: record.id,
            name: record.name.clone(),
        }
    }

    /// Endpoint for a body system.
    pub fn system(name: impl Into<String>) -> Self {
        Self::System { name: name.into() }
    }

    /// Display name of the endpoint.
    pub fn name(&self) -> &str {
        match self {
            Self::Condition { name, .. } | Self::System { name } => name,
        }
    }

    /// Condition id, if this endpoint is a condition.
    pub fn condition_id(&self) -> Option<i64> {
        match self {
            Self::Condition { id, .. } => Some(*id),
            Self::System { .. } => None,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Relationship type, used as the graph relationship type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipKind {
    SameSystem,
    MultimorbidityPattern,
    SystemInteraction,
}

impl RelationshipKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SameSystem => "SAME_SYSTEM",
            Self::MultimorbidityPattern => "MULTIMORBIDITY_PATTERN",
            Self::SystemInteraction => "SYSTEM_INTERACTION",
        }
    }
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Clinical association carried by a curated condition pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Association {
    CommonlyOccursWith,
    LeadsTo,
    IncreasesRiskOf,
    AssociatedWith,
}

impl Association {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CommonlyOccursWith => "COMMONLY_OCCURS_WITH",
            Self::LeadsTo => "LEADS_TO",
            Self::IncreasesRiskOf => "INCREASES_RISK_OF",
            Self::AssociatedWith => "ASSOCIATED_WITH",
        }
    }
}

/// Strength of interaction between two body systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InteractionLevel {
    HighInteraction,
    ModerateInteraction,
}

impl InteractionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HighInteraction => "HIGH_INTERACTION",
            Self::ModerateInteraction => "MODERATE_INTERACTION",
        }
    }
}

/// A typed edge between two conditions or two body systems.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub source: Endpoint,
    pub target: Endpoint,
    pub kind: RelationshipKind,
    /// System name, pattern category, association or interaction level.
    pub qualifier: Option<String>,
    pub strength: Option<f64>,
    pub evidence: String,
    pub created_at: DateTime<Utc>,
}

/// Identity of a relationship under upsert semantics.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RelationshipKey {
    pub source: Endpoint,
    pub target: Endpoint,
    pub kind: RelationshipKind,
    pub qualifier: Option<String>,
}

impl Relationship {
    /// Merge key: endpoints, kind and qualifier.
    pub fn key(&self) -> RelationshipKey {
        RelationshipKey {
            source: self.source.clone(),
            target: self.target.clone(),
            kind: self.kind,
            qualifier: self.qualifier.clone(),
        }
    }

    /// Whether this relationship touches the given condition.
    pub fn touches_condition(&self, id: i64) -> bool {
        self.source.condition_id() == Some(id) || self.target.condition_id() == Some(id)
    }
}
