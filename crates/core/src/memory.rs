//! In-memory storage engine
//!
//! Reference implementation of [`StorageEngine`] backed by a `BTreeMap`
//! under a read-write lock. Used by the facade crate for embedded setups
//! and by tests that need a storage collaborator.

use crate::error::Result;
use crate::types::{DocId, Node, StorageEngine};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Thread-safe in-memory node store
///
/// Iteration order is by ID, so rebuilds are deterministic.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    nodes: RwLock<BTreeMap<DocId, Node>>,
}

impl MemoryEngine {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a node, returning the previous version if any
    pub fn put_node(&self, node: Node) -> Option<Node> {
        self.nodes.write().insert(node.id.clone(), node)
    }

    /// Remove a node, returning it if it was present
    pub fn remove_node(&self, id: &DocId) -> Option<Node> {
        self.nodes.write().remove(id)
    }

    /// Number of nodes stored
    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.read().is_empty()
    }
}

impl StorageEngine for MemoryEngine {
    fn get_node(&self, id: &DocId) -> Result<Option<Node>> {
        Ok(self.nodes.read().get(id).cloned())
    }

    fn for_each_node(&self, visit: &mut dyn FnMut(&Node) -> bool) -> Result<()> {
        for node in self.nodes.read().values() {
            if !visit(node) {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_remove() {
        let store = MemoryEngine::new();
        assert!(store.is_empty());

        store.put_node(Node::new("a").with_property("title", "first"));
        assert_eq!(store.len(), 1);

        let fetched = store.get_node(&DocId::from("a")).unwrap().unwrap();
        assert_eq!(fetched.property_str("title"), Some("first"));

        assert!(store.remove_node(&DocId::from("a")).is_some());
        assert!(store.get_node(&DocId::from("a")).unwrap().is_none());
    }

    #[test]
    fn test_put_replaces() {
        let store = MemoryEngine::new();
        store.put_node(Node::new("a").with_property("v", "1"));
        let old = store.put_node(Node::new("a").with_property("v", "2"));
        assert_eq!(old.unwrap().property_str("v"), Some("1"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_for_each_visits_in_id_order() {
        let store = MemoryEngine::new();
        store.put_node(Node::new("c"));
        store.put_node(Node::new("a"));
        store.put_node(Node::new("b"));

        let mut seen = Vec::new();
        store
            .for_each_node(&mut |node| {
                seen.push(node.id.as_str().to_string());
                true
            })
            .unwrap();
        assert_eq!(seen, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_for_each_early_stop() {
        let store = MemoryEngine::new();
        store.put_node(Node::new("a"));
        store.put_node(Node::new("b"));

        let mut count = 0;
        store
            .for_each_node(&mut |_| {
                count += 1;
                false
            })
            .unwrap();
        assert_eq!(count, 1);
    }
}
