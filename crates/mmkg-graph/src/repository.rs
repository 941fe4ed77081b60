//! Dialect-neutral graph repository interface.
//!
//! Population and reporting code talk to the graph only through
//! [`GraphRepository`]. Nodes are merged on a single key property, edges on
//! `(source, target, type, qualifier)`, and every other property is
//! overwritten on each upsert.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{GraphError, GraphResult};

/// Node labels written by the populator.
pub mod labels {
    pub const DISEASE: &str = "Disease";
    pub const BODY_SYSTEM: &str = "BodySystem";
    pub const PATIENT: &str = "Patient";
    pub const HUB_DISEASE: &str = "HubDisease";
}

/// Relationship types written by the populator besides the synthesized kinds.
pub mod edges {
    pub const AFFECTS_SYSTEM: &str = "AFFECTS_SYSTEM";
    pub const HAS_CONDITION: &str = "HAS_CONDITION";
}

/// A scalar or list property value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    TextList(Vec<String>),
}

impl PropValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Bool(v) => write!(f, "{}", v),
            Self::Text(v) => f.write_str(v),
            Self::TextList(v) => f.write_str(&v.join(", ")),
        }
    }
}

impl From<i64> for PropValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<usize> for PropValue {
    fn from(v: usize) -> Self {
        Self::Int(v as i64)
    }
}

impl From<f64> for PropValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for PropValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for PropValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for PropValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<String>> for PropValue {
    fn from(v: Vec<String>) -> Self {
        Self::TextList(v)
    }
}

/// Property map of a node or edge.
pub type Props = BTreeMap<String, PropValue>;

/// Identifies a node by label and key property.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRef {
    pub label: String,
    pub key: String,
    pub value: PropValue,
}

impl NodeRef {
    pub fn new(label: &str, key: &str, value: impl Into<PropValue>) -> Self {
        Self {
            label: label.to_string(),
            key: key.to_string(),
            value: value.into(),
        }
    }

    pub fn disease(id: i64) -> Self {
        Self::new(labels::DISEASE, "id", id)
    }

    pub fn body_system(name: &str) -> Self {
        Self::new(labels::BODY_SYSTEM, "name", name)
    }

    pub fn patient(id: &str) -> Self {
        Self::new(labels::PATIENT, "id", id)
    }

    pub(crate) fn validate(&self) -> GraphResult<()> {
        crate::error::check_identifier(&self.label)?;
        crate::error::check_identifier(&self.key)?;
        Ok(())
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}:{}={})", self.label, self.key, self.value)
    }
}

/// Create-or-update of one node.
#[derive(Debug, Clone)]
pub struct NodeUpsert {
    pub node: NodeRef,
    /// Labels added on top of the primary label.
    pub extra_labels: Vec<String>,
    /// Labels stripped from the node if present.
    pub removed_labels: Vec<String>,
    pub props: Props,
}

impl NodeUpsert {
    pub fn new(node: NodeRef) -> Self {
        Self {
            node,
            extra_labels: Vec::new(),
            removed_labels: Vec::new(),
            props: Props::new(),
        }
    }

    pub fn prop(mut self, key: &str, value: impl Into<PropValue>) -> Self {
        self.props.insert(key.to_string(), value.into());
        self
    }

    pub fn label(mut self, label: &str) -> Self {
        self.extra_labels.push(label.to_string());
        self
    }

    pub fn without_label(mut self, label: &str) -> Self {
        self.removed_labels.push(label.to_string());
        self
    }

    /// Add `label` when `on`, otherwise remove it.
    pub fn toggle_label(self, label: &str, on: bool) -> Self {
        if on {
            self.label(label)
        } else {
            self.without_label(label)
        }
    }

    pub(crate) fn validate(&self) -> GraphResult<()> {
        self.node.validate()?;
        for label in self.extra_labels.iter().chain(&self.removed_labels) {
            crate::error::check_identifier(label)?;
        }
        for key in self.props.keys() {
            crate::error::check_identifier(key)?;
        }
        Ok(())
    }
}

/// Create-or-update of one edge between existing nodes.
#[derive(Debug, Clone)]
pub struct EdgeUpsert {
    pub source: NodeRef,
    pub target: NodeRef,
    pub kind: String,
    /// Stored as the `type` property and part of the merge key.
    pub qualifier: Option<String>,
    pub props: Props,
}

impl EdgeUpsert {
    pub fn new(source: NodeRef, target: NodeRef, kind: &str) -> Self {
        Self {
            source,
            target,
            kind: kind.to_string(),
            qualifier: None,
            props: Props::new(),
        }
    }

    pub fn qualifier(mut self, qualifier: Option<&str>) -> Self {
        self.qualifier = qualifier.map(str::to_string);
        self
    }

    pub fn prop(mut self, key: &str, value: impl Into<PropValue>) -> Self {
        self.props.insert(key.to_string(), value.into());
        self
    }

    pub(crate) fn validate(&self) -> GraphResult<()> {
        self.source.validate()?;
        self.target.validate()?;
        crate::error::check_identifier(&self.kind)?;
        for key in self.props.keys() {
            crate::error::check_identifier(key)?;
        }
        Ok(())
    }

    pub(crate) fn missing_endpoint(&self) -> GraphError {
        GraphError::MissingEndpoint {
            kind: self.kind.clone(),
            from: self.source.to_string(),
            to: self.target.to_string(),
        }
    }
}

/// Read-only aggregate queries every repository answers.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregateQuery {
    /// Columns: `count`.
    NodeCount { label: String },
    /// Columns: `count`.
    EdgeCount { kind: String },
    /// HubDisease nodes by `relationship_count`. Columns: `disease`, `connections`.
    HubDiseases { limit: usize },
    /// MULTIMORBIDITY_PATTERN edges with strength above a floor.
    /// Columns: `source`, `relationship`, `target`, `strength`.
    StrongPatterns { min_strength: f64, limit: usize },
    /// Pattern edges between diseases of different systems, per system pair.
    /// Columns: `system1`, `system2`, `interactions`.
    CrossSystemPatterns { limit: usize },
    /// Columns: `patient`, `condition_count`, `conditions`.
    PatientBurden,
    /// LEADS_TO pattern edges by strength.
    /// Columns: `primary_condition`, `likely_progression`, `probability`.
    Progressions { limit: usize },
    /// Pattern and same-system edges around diseases whose name contains a fragment.
    /// Columns: `disease`, `relationship`, `qualifier`, `neighbour`, `strength`.
    Neighbourhood { name_fragment: String, limit: usize },
}

/// One result row keyed by column name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateRow(pub BTreeMap<String, PropValue>);

impl AggregateRow {
    pub fn with(mut self, column: &str, value: impl Into<PropValue>) -> Self {
        self.0.insert(column.to_string(), value.into());
        self
    }

    pub fn get(&self, column: &str) -> Option<&PropValue> {
        self.0.get(column)
    }

    pub fn text(&self, column: &str) -> String {
        self.get(column).map(|v| v.to_string()).unwrap_or_default()
    }

    pub fn int(&self, column: &str) -> i64 {
        self.get(column).and_then(PropValue::as_i64).unwrap_or(0)
    }

    pub fn float(&self, column: &str) -> Option<f64> {
        self.get(column).and_then(PropValue::as_f64)
    }

    pub fn texts(&self, column: &str) -> Vec<String> {
        match self.get(column) {
            Some(PropValue::TextList(v)) => v.clone(),
            Some(other) => vec![other.to_string()],
            None => Vec::new(),
        }
    }
}

/// Storage backend for the knowledge graph.
#[async_trait]
pub trait GraphRepository: Send + Sync {
    /// Create constraints and indexes. Safe to call repeatedly.
    async fn ensure_schema(&self) -> GraphResult<()>;

    /// Remove every node and edge.
    async fn reset(&self) -> GraphResult<()>;

    async fn upsert_node(&self, node: NodeUpsert) -> GraphResult<()>;

    /// Fails with [`GraphError::MissingEndpoint`] when either node is absent.
    async fn upsert_edge(&self, edge: EdgeUpsert) -> GraphResult<()>;

    async fn aggregate(&self, query: AggregateQuery) -> GraphResult<Vec<AggregateRow>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_validation() {
        let ok = NodeUpsert::new(NodeRef::disease(1)).prop("name", "Asthma").label(labels::HUB_DISEASE);
        assert!(ok.validate().is_ok());

        let bad = NodeUpsert::new(NodeRef::disease(1)).prop("name; DROP", "x");
        assert!(matches!(bad.validate(), Err(GraphError::InvalidIdentifier(_))));

        let edge = EdgeUpsert::new(NodeRef::disease(1), NodeRef::disease(2), "LEADS-TO");
        assert!(edge.validate().is_err());
    }

    #[test]
    fn test_row_accessors() {
        let row = AggregateRow::default()
            .with("disease", "Asthma")
            .with("connections", 4usize)
            .with("conditions", vec!["A".to_string(), "B".to_string()]);

        assert_eq!(row.text("disease"), "Asthma");
        assert_eq!(row.int("connections"), 4);
        assert_eq!(row.float("connections"), Some(4.0));
        assert_eq!(row.texts("conditions").len(), 2);
        assert_eq!(row.int("missing"), 0);
    }
}
