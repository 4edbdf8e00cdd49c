use super::Tree;
use crate::libs::phylo::node::NodeId;
use std::collections::VecDeque;

// These walks assume an acyclic tree; run `Tree::validate` on anything not built by the parser.

/// Node IDs in preorder (node, then its children left to right)
pub fn preorder(tree: &Tree, start_node: NodeId) -> Vec<NodeId> {
    let mut result = Vec::new();
    let mut stack = vec![start_node];

    while let Some(id) = stack.pop() {
        if let Some(node) = tree.get_node(id) {
            result.push(id);
            for &child in node.children.iter().rev() {
                stack.push(child);
            }
        }
    }

    result
}

/// Node IDs in postorder (children left to right, then the node)
pub fn postorder(tree: &Tree, start_node: NodeId) -> Vec<NodeId> {
    let mut result = Vec::new();
    // (node, children already expanded)
    let mut stack = vec![(start_node, false)];

    while let Some((id, expanded)) = stack.pop() {
        let Some(node) = tree.get_node(id) else {
            continue;
        };
        if expanded {
            result.push(id);
        } else {
            stack.push((id, true));
            for &child in node.children.iter().rev() {
                stack.push((child, false));
            }
        }
    }

    result
}

/// Node IDs in levelorder (BFS)
pub fn levelorder(tree: &Tree, start_node: NodeId) -> Vec<NodeId> {
    let mut result = Vec::new();
    let mut queue = VecDeque::new();
    queue.push_back(start_node);

    while let Some(id) = queue.pop_front() {
        if let Some(node) = tree.get_node(id) {
            result.push(id);
            queue.extend(node.children.iter().copied());
        }
    }

    result
}
