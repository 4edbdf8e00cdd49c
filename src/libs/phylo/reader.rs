use super::error::TreeError;
use super::tree::Tree;
use std::io::Read;

/// Read the tree of one cluster: exactly one tree, validated with `Tree::validate`.
///
/// ```
/// let dir = tempfile::tempdir().unwrap();
/// let path = dir.path().join("c1.nw");
/// std::fs::write(&path, "(A,(C)B)R;\n").unwrap();
///
/// let tree = mof::libs::phylo::reader::cluster_tree(path.to_str().unwrap()).unwrap();
/// assert_eq!(tree.len(), 4);
/// ```
pub fn cluster_tree(infile: &str) -> anyhow::Result<Tree> {
    let mut reader = crate::reader(infile)?;
    let mut newick = String::new();
    reader
        .read_to_string(&mut newick)
        .map_err(|e| anyhow::anyhow!("Read error in {}: {}", infile, e))?;
    Ok(load_cluster_tree(&newick)?)
}

/// Parse a Newick string that must hold a single, well-formed cluster tree.
pub fn load_cluster_tree(newick: &str) -> Result<Tree, TreeError> {
    let mut trees = Tree::from_newick_multi(newick)?;
    if trees.len() != 1 {
        return Err(TreeError::Malformed(format!(
            "expected exactly one root, found {} trees",
            trees.len()
        )));
    }
    let tree = trees.remove(0);
    tree.validate()?;
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_single_tree() {
        let tree = load_cluster_tree("((A,B)X,C)R;").unwrap();
        assert_eq!(tree.len(), 5);
        assert_eq!(tree.get_leaves().len(), 3);
    }

    #[test]
    fn load_rejects_forest() {
        let res = load_cluster_tree("(A,B)X;(C,D)Y;");
        assert!(matches!(res, Err(TreeError::Malformed(_))));
    }

    #[test]
    fn load_rejects_duplicates() {
        let res = load_cluster_tree("((A,B)X,A)R;");
        match res {
            Err(TreeError::Malformed(msg)) => assert!(msg.contains("A")),
            other => panic!("Expected Malformed, got {:?}", other),
        }
    }

    #[test]
    fn load_rejects_unlabeled_internal() {
        let res = load_cluster_tree("((A,B),C)R;");
        assert!(matches!(res, Err(TreeError::Malformed(_))));
    }

    #[test]
    fn load_passes_through_syntax_errors() {
        let res = load_cluster_tree("((A,B)X,C)R");
        assert!(matches!(res, Err(TreeError::ParseError { .. })));
    }
}
