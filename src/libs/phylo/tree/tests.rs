use super::*;
use crate::libs::phylo::TreeError;

//    0
//   / \
//  1   2
// / \   \
//3   4   5
fn six_nodes() -> (Tree, Vec<NodeId>) {
    let mut tree = Tree::new();
    let ids: Vec<NodeId> = (0..6).map(|_| tree.add_node()).collect();
    tree.set_root(ids[0]);
    tree.add_child(ids[0], ids[1]).unwrap();
    tree.add_child(ids[0], ids[2]).unwrap();
    tree.add_child(ids[1], ids[3]).unwrap();
    tree.add_child(ids[1], ids[4]).unwrap();
    tree.add_child(ids[2], ids[5]).unwrap();
    for (i, &id) in ids.iter().enumerate() {
        tree.get_node_mut(id).unwrap().set_name(format!("n{}", i));
    }
    (tree, ids)
}

#[test]
fn test_tree_traversals() {
    let (tree, n) = six_nodes();

    let pre = tree.preorder(&n[0]).unwrap();
    assert_eq!(pre, vec![n[0], n[1], n[3], n[4], n[2], n[5]]);

    let post = tree.postorder(&n[0]).unwrap();
    assert_eq!(post, vec![n[3], n[4], n[1], n[5], n[2], n[0]]);

    let level = tree.levelorder(&n[0]).unwrap();
    assert_eq!(level, vec![n[0], n[1], n[2], n[3], n[4], n[5]]);
}

#[test]
fn test_tree_basic_ops() {
    let (tree, n) = six_nodes();
    assert_eq!(tree.len(), 6);

    let root = tree.get_node(n[0]).unwrap();
    assert_eq!(root.children, vec![n[1], n[2]]);
    assert!(!root.is_leaf());

    let node1 = tree.get_node(n[1]).unwrap();
    assert_eq!(node1.parent, Some(n[0]));
    assert!(tree.get_node(n[5]).unwrap().is_leaf());
}

#[test]
fn test_tree_add_child_rejects_relinking() {
    let (mut tree, n) = six_nodes();
    assert!(tree.add_child(n[2], n[3]).is_err());
    assert!(tree.add_child(n[2], n[2]).is_err());
    assert!(tree.add_child(n[2], 42).is_err());
}

#[test]
fn test_tree_paths_and_lookup() {
    let (tree, n) = six_nodes();

    assert_eq!(tree.get_path_from_root(&n[4]).unwrap(), vec![n[0], n[1], n[4]]);
    assert_eq!(tree.get_path_from_root(&n[0]).unwrap(), vec![n[0]]);
    assert!(tree.get_path_from_root(&99).is_err());

    assert_eq!(tree.get_node_by_name("n5"), Some(n[5]));
    assert_eq!(tree.get_node_by_name("nonexistent"), None);
    assert_eq!(tree.get_leaves(), vec![n[3], n[4], n[5]]);

    let name_id = tree.get_name_id();
    assert_eq!(name_id.len(), 6);
    assert_eq!(name_id.get("n2"), Some(&n[2]));
}

#[test]
fn test_validate_ok() {
    let (tree, _) = six_nodes();
    assert_eq!(tree.validate(), Ok(()));
}

#[test]
fn test_validate_no_root() {
    let mut tree = Tree::new();
    let a = tree.add_node();
    tree.get_node_mut(a).unwrap().set_name("A");
    assert!(matches!(tree.validate(), Err(TreeError::Malformed(_))));
}

#[test]
fn test_validate_second_root() {
    let (mut tree, _) = six_nodes();
    let stray = tree.add_node();
    tree.get_node_mut(stray).unwrap().set_name("stray");

    match tree.validate() {
        Err(TreeError::Malformed(msg)) => assert!(msg.contains("stray")),
        res => panic!("Expected Malformed, got {:?}", res),
    }
}

#[test]
fn test_validate_cycle() {
    // 0 -> 1 -> 0 again, reachable from the root
    let mut tree = Tree::new();
    let a = tree.add_node();
    let b = tree.add_node();
    tree.get_node_mut(a).unwrap().set_name("A");
    tree.get_node_mut(b).unwrap().set_name("B");
    tree.set_root(a);
    tree.add_child(a, b).unwrap();
    tree.add_child(b, a).unwrap();

    match tree.validate() {
        Err(TreeError::Malformed(msg)) => assert!(msg.contains("cycle")),
        res => panic!("Expected Malformed, got {:?}", res),
    }
    assert!(tree.get_path_from_root(&b).is_err());
}

#[test]
fn test_validate_duplicate_and_unlabeled() {
    let (mut tree, n) = six_nodes();
    tree.get_node_mut(n[5]).unwrap().set_name("n3");
    match tree.validate() {
        Err(TreeError::Malformed(msg)) => assert!(msg.contains("duplicate")),
        res => panic!("Expected Malformed, got {:?}", res),
    }

    let (mut tree, n) = six_nodes();
    tree.get_node_mut(n[2]).unwrap().name = None;
    match tree.validate() {
        Err(TreeError::Malformed(msg)) => assert!(msg.contains("no identifier")),
        res => panic!("Expected Malformed, got {:?}", res),
    }
}
