pub mod ops;
pub mod query;
#[cfg(test)]
pub mod tests;
pub mod traversal;
pub mod validate;

use super::error::TreeError;
use super::node::{Node, NodeId};
use std::collections::BTreeMap;

/// Arena-backed rooted tree with ordered children.
#[derive(Debug, Default, Clone)]
pub struct Tree {
    /// Arena storage for all nodes
    pub(super) nodes: Vec<Node>,

    /// Root ID (a tree under construction may not have one yet)
    pub(super) root: Option<NodeId>,
}

impl Tree {
    /// Create a new empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new unlinked node to the tree. Returns the new node's ID.
    pub fn add_node(&mut self) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node::new(id));
        id
    }

    /// Number of nodes in the arena
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get_root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn get_node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// Set a node as the root of the tree. Unknown IDs are ignored.
    pub fn set_root(&mut self, id: NodeId) {
        if self.get_node(id).is_some() {
            self.root = Some(id);
        }
    }

    /// Iterate over every node of the arena, in ID order
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    // --- Delegation to ops ---

    pub fn add_child(&mut self, parent_id: NodeId, child_id: NodeId) -> Result<(), String> {
        ops::add_child(self, parent_id, child_id)
    }

    // --- Delegation to traversal ---

    pub fn preorder(&self, start_node: &NodeId) -> Result<Vec<NodeId>, String> {
        Ok(traversal::preorder(self, *start_node))
    }

    pub fn postorder(&self, start_node: &NodeId) -> Result<Vec<NodeId>, String> {
        Ok(traversal::postorder(self, *start_node))
    }

    pub fn levelorder(&self, start_node: &NodeId) -> Result<Vec<NodeId>, String> {
        Ok(traversal::levelorder(self, *start_node))
    }

    // --- Delegation to query ---

    pub fn get_path_from_root(&self, id: &NodeId) -> Result<Vec<NodeId>, String> {
        query::get_path_from_root(self, id)
    }

    pub fn get_node_by_name(&self, name: &str) -> Option<NodeId> {
        query::get_node_by_name(self, name)
    }

    pub fn get_leaves(&self) -> Vec<NodeId> {
        match self.root {
            Some(root) => query::get_leaves(self, root),
            None => Vec::new(),
        }
    }

    pub fn get_names(&self) -> Vec<String> {
        query::get_names(self)
    }

    pub fn get_name_id(&self) -> BTreeMap<String, NodeId> {
        query::get_name_id(self)
    }

    // --- Delegation to validate ---

    /// Check that the tree can key a block store.
    /// See [`validate::validate`].
    pub fn validate(&self) -> Result<(), TreeError> {
        validate::validate(self)
    }
}
