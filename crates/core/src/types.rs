//! Document identity, node model, and the storage collaborator boundary

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// DocId
// ============================================================================

/// Identifier of a document within the search subsystem
///
/// Wraps the storage engine's node ID. Unique within the subsystem; the
/// indexes key everything by it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocId(String);

impl DocId {
    /// Create a DocId from anything string-like
    pub fn new(id: impl Into<String>) -> Self {
        DocId(id.into())
    }

    /// View as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DocId {
    fn from(s: &str) -> Self {
        DocId(s.to_string())
    }
}

impl From<String> for DocId {
    fn from(s: String) -> Self {
        DocId(s)
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Node
// ============================================================================

/// A graph node as seen across the storage boundary
///
/// The search indexes hold a derived projection of these records; the
/// storage engine remains the system of record. `embedding` feeds the
/// vector indexes, string properties feed the lexical index, and labels
/// plus properties drive type filtering and result enrichment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Node {
    /// Node identifier
    pub id: DocId,
    /// Node labels (e.g. `Document`, `Person`)
    pub labels: Vec<String>,
    /// Arbitrary properties
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
    /// Optional dense embedding of fixed dimensionality
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl Node {
    /// Create a node with an ID and no labels, properties, or embedding
    pub fn new(id: impl Into<DocId>) -> Self {
        Node {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Builder: add a label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }

    /// Builder: set a string property
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties
            .insert(key.into(), serde_json::Value::String(value.into()));
        self
    }

    /// Builder: set the embedding
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Get a property as a string slice, if present and a string
    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(|v| v.as_str())
    }
}

// ============================================================================
// StorageEngine
// ============================================================================

/// Storage collaborator consumed by the search subsystem
///
/// Only the two operations the subsystem needs are part of the contract:
/// point lookup for type filtering and result enrichment, and full
/// iteration for index rebuild. Neither is owned by this subsystem.
///
/// # Thread Safety
///
/// Implementations must be Send + Sync; the orchestrator calls them from
/// concurrent queries.
pub trait StorageEngine: Send + Sync {
    /// Fetch a node by ID. `Ok(None)` when absent.
    fn get_node(&self, id: &DocId) -> Result<Option<Node>>;

    /// Visit every node. The visitor returns `false` to stop early.
    ///
    /// Used only for full index rebuild from the system of record.
    fn for_each_node(&self, visit: &mut dyn FnMut(&Node) -> bool) -> Result<()>;
}
