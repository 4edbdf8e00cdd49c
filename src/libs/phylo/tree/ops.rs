use super::Tree;
use crate::libs::phylo::node::NodeId;

/// Add a child to a parent node.
/// Updates both parent's `children` list and child's `parent` field.
pub fn add_child(tree: &mut Tree, parent_id: NodeId, child_id: NodeId) -> Result<(), String> {
    if parent_id == child_id {
        return Err("Cannot add node as child of itself".to_string());
    }
    if tree.get_node(parent_id).is_none() {
        return Err(format!("Parent node {} not found", parent_id));
    }
    if tree.get_node(child_id).is_none() {
        return Err(format!("Child node {} not found", child_id));
    }

    if let Some(old_parent) = tree.nodes[child_id].parent {
        return Err(format!(
            "Node {} already has parent {}",
            child_id, old_parent
        ));
    }

    tree.nodes[child_id].parent = Some(parent_id);
    tree.nodes[parent_id].children.push(child_id);

    Ok(())
}
