use super::Tree;
use crate::libs::phylo::error::TreeError;
use std::collections::BTreeMap;

/// Check the invariants a cluster tree must hold before it can key a block store:
///
/// * a root is set, and every node of the arena is reached from it exactly once
///   (a node reached twice means a cycle or shared child, an unreached node means
///   a second root),
/// * every node has a non-empty label,
/// * labels are unique.
///
/// Nothing else (lengths, comments, arity) is checked.
pub fn validate(tree: &Tree) -> Result<(), TreeError> {
    let root = tree
        .root
        .ok_or_else(|| TreeError::Malformed("tree has no root".to_string()))?;

    let mut seen = vec![false; tree.nodes.len()];
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        let node = tree
            .nodes
            .get(id)
            .ok_or_else(|| TreeError::Malformed(format!("dangling node reference {}", id)))?;
        if seen[id] {
            return Err(TreeError::Malformed(format!(
                "node {} is reachable twice (cycle)",
                describe(tree, id)
            )));
        }
        seen[id] = true;
        stack.extend(node.children.iter().copied());
    }

    if let Some(orphan) = seen.iter().position(|&s| !s) {
        return Err(TreeError::Malformed(format!(
            "node {} is not reachable from the root (more than one root)",
            describe(tree, orphan)
        )));
    }

    let mut names: BTreeMap<&str, usize> = BTreeMap::new();
    for node in &tree.nodes {
        let name = match node.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => {
                return Err(TreeError::Malformed(format!(
                    "node {} has no identifier",
                    node.id
                )))
            }
        };
        if let Some(first) = names.insert(name, node.id) {
            return Err(TreeError::Malformed(format!(
                "duplicate identifier {:?} (nodes {} and {})",
                name, first, node.id
            )));
        }
    }

    Ok(())
}

fn describe(tree: &Tree, id: usize) -> String {
    match tree.nodes.get(id).and_then(|n| n.name.as_deref()) {
        Some(name) => format!("{:?}", name),
        None => format!("#{}", id),
    }
}
