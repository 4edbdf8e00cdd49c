use super::Tree;
use crate::libs::phylo::node::NodeId;
use std::collections::BTreeMap;

/// IDs from the root down to `id`, both included.
pub fn get_path_from_root(tree: &Tree, id: &NodeId) -> Result<Vec<NodeId>, String> {
    let mut path = Vec::new();
    let mut current = *id;

    if tree.get_node(current).is_none() {
        return Err(format!("Node {} not found", current));
    }

    loop {
        path.push(current);
        if path.len() > tree.len() {
            return Err(format!("Cycle detected above node {}", id));
        }
        match tree.nodes[current].parent {
            Some(p) => current = p,
            None => break,
        }
    }

    path.reverse();
    if tree.root != Some(path[0]) {
        return Err("Node is detached from root".to_string());
    }

    Ok(path)
}

/// Get node ID by name. Returns first match.
pub fn get_node_by_name(tree: &Tree, name: &str) -> Option<NodeId> {
    tree.nodes
        .iter()
        .find(|n| n.name.as_deref() == Some(name))
        .map(|n| n.id)
}

/// IDs of all leaves in the subtree rooted at `id`, left to right.
pub fn get_leaves(tree: &Tree, id: NodeId) -> Vec<NodeId> {
    super::traversal::preorder(tree, id)
        .into_iter()
        .filter(|&n| tree.nodes[n].is_leaf())
        .collect()
}

/// Labels of all labeled nodes, in arena order
pub fn get_names(tree: &Tree) -> Vec<String> {
    tree.nodes.iter().filter_map(|n| n.name.clone()).collect()
}

/// Label -> ID. With duplicated labels the last node wins; validated trees have none.
pub fn get_name_id(tree: &Tree) -> BTreeMap<String, NodeId> {
    tree.nodes
        .iter()
        .filter_map(|n| n.name.clone().map(|name| (name, n.id)))
        .collect()
}
