use super::compress::Compressor;
use super::error::BlockError;
use super::store::BlockStore;
use crate::libs::phylo::Tree;
use rayon::prelude::*;

/// Placeholders are written this many at a time.
pub const BATCH_SIZE: usize = 500;

/// Give every node of `tree` a block: nodes the partitioner did not produce
/// (internal nodes without records of their own, leaves absent from the source)
/// get the compressed form of empty content.
///
/// The node universe comes from the tree, not from the store directory.
/// Returns the number of placeholders written; running it again writes none.
pub fn complete(
    tree: &Tree,
    store: &BlockStore,
    compressor: &dyn Compressor,
) -> Result<usize, BlockError> {
    tree.validate().map_err(|source| BlockError::MalformedTree {
        cluster: store.cluster().to_string(),
        source,
    })?;

    let present = store.keys()?;
    let missing: Vec<&str> = tree
        .iter()
        .filter_map(|node| node.label())
        .filter(|name| !present.contains(*name))
        .collect();

    if missing.is_empty() {
        return Ok(0);
    }

    let empty = compressor
        .compress(&[])
        .map_err(|e| BlockError::io("compress empty block", e))?;

    for (i, batch) in missing.chunks(BATCH_SIZE).enumerate() {
        log::debug!(
            "Cluster {}: empty blocks, batch {} ({} nodes)",
            store.cluster(),
            i + 1,
            batch.len()
        );
        batch
            .par_iter()
            .try_for_each(|node| store.put(node, &empty))?;
    }

    log::info!(
        "Cluster {}: completed {} empty blocks ({} nodes in tree)",
        store.cluster(),
        missing.len(),
        tree.len()
    );
    Ok(missing.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::block::compress::Gzip;
    use crate::libs::phylo::reader::load_cluster_tree;
    use tempfile::tempdir;

    #[test]
    fn fills_every_node() {
        let tree = load_cluster_tree("(A,(C)B)R;").unwrap();
        let dir = tempdir().unwrap();
        let gz = Gzip::default();
        let store = BlockStore::create("c1", dir.path(), gz.extension()).unwrap();
        store.put("A", &gz.compress(b">A@c1\nAC\n").unwrap()).unwrap();

        assert_eq!(complete(&tree, &store, &gz).unwrap(), 3);

        let keys: Vec<String> = store.keys().unwrap().into_iter().collect();
        let mut names = tree.get_names();
        names.sort();
        assert_eq!(keys, names);

        for node in ["R", "B", "C"] {
            assert!(gz.decompress(&store.get(node).unwrap()).unwrap().is_empty());
        }
        assert_eq!(
            gz.decompress(&store.get("A").unwrap()).unwrap(),
            b">A@c1\nAC\n"
        );
    }

    #[test]
    fn second_run_is_noop() {
        let tree = load_cluster_tree("((A,B)X,C)R;").unwrap();
        let dir = tempdir().unwrap();
        let gz = Gzip::default();
        let store = BlockStore::create("c1", dir.path(), gz.extension()).unwrap();

        assert_eq!(complete(&tree, &store, &gz).unwrap(), 5);
        assert_eq!(complete(&tree, &store, &gz).unwrap(), 0);
        assert_eq!(store.keys().unwrap().len(), 5);
    }

    #[test]
    fn many_nodes_span_batches() {
        let leaves: Vec<String> = (0..1200).map(|i| format!("L{}", i)).collect();
        let newick = format!("({})R;", leaves.join(","));
        let tree = load_cluster_tree(&newick).unwrap();

        let dir = tempdir().unwrap();
        let gz = Gzip::new(1);
        let store = BlockStore::create("big", dir.path(), gz.extension()).unwrap();
        assert_eq!(complete(&tree, &store, &gz).unwrap(), 1201);
        assert_eq!(store.keys().unwrap().len(), 1201);
    }
}
