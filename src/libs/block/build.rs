use super::error::BlockError;
use super::path::PathChain;
use super::store::{staging_file, BlockStore};
use crate::libs::ledger::Ledger;
use crate::libs::phylo::{NodeId, Tree};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BuildStats {
    pub leaves: usize,
    pub written: usize,
    /// Leaves recorded in the ledger whose output was already in place
    pub skipped: usize,
    /// Compressed bytes written
    pub bytes: usize,
}

/// A leaf reached by the traversal: its name and the blocks on its root path,
/// or `None` when the ledger says it is already built.
struct LeafJob {
    name: String,
    path: Option<PathChain<Vec<u8>>>,
}

/// Materializes one output per leaf, the byte concatenation of the blocks
/// from the root down to the leaf.
///
/// Blocks are never decompressed; this relies on the store holding
/// concatenable members.
pub struct Builder<'a> {
    tree: &'a Tree,
    store: &'a BlockStore,
    outdir: PathBuf,
    parallel: usize,
    ledger: Option<&'a Ledger>,
    force: bool,
}

impl<'a> Builder<'a> {
    pub fn new(
        tree: &'a Tree,
        store: &'a BlockStore,
        outdir: impl AsRef<Path>,
    ) -> Result<Self, BlockError> {
        tree.validate().map_err(|source| BlockError::MalformedTree {
            cluster: store.cluster().to_string(),
            source,
        })?;
        Ok(Self {
            tree,
            store,
            outdir: outdir.as_ref().to_path_buf(),
            parallel: 1,
            ledger: None,
            force: false,
        })
    }

    /// Number of writer threads
    pub fn parallel(mut self, parallel: usize) -> Self {
        self.parallel = parallel.max(1);
        self
    }

    /// Record finished leaves in `ledger`, and skip leaves it already lists
    pub fn ledger(mut self, ledger: &'a Ledger) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Rewrite leaves even if the ledger lists them
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Final location of a leaf's output
    pub fn output_of(&self, leaf: &str) -> PathBuf {
        self.outdir
            .join(format!("{}.{}", leaf, self.store.extension()))
    }

    pub fn build(&self) -> Result<BuildStats, BlockError> {
        std::fs::create_dir_all(&self.outdir)
            .map_err(|e| BlockError::io(format!("create {}", self.outdir.display()), e))?;

        let stats = if self.parallel == 1 {
            let mut stats = BuildStats::default();
            self.traverse(|job| {
                let written = self.write_leaf(&job)?;
                self.record(&job.name, written, &mut stats)
            })?;
            stats
        } else {
            self.build_parallel()?
        };

        log::info!(
            "Cluster {}: {} leaves, {} written, {} skipped, {} bytes",
            self.store.cluster(),
            stats.leaves,
            stats.written,
            stats.skipped,
            stats.bytes
        );
        Ok(stats)
    }

    // Depth-first walk with an explicit stack; every node's block is read once per
    // visit and pushed onto the chain handed to its children.
    fn traverse<F>(&self, mut emit: F) -> Result<(), BlockError>
    where
        F: FnMut(LeafJob) -> Result<(), BlockError>,
    {
        let Some(root) = self.tree.get_root() else {
            return Ok(());
        };

        let mut stack: Vec<(NodeId, PathChain<Vec<u8>>)> = vec![(root, PathChain::new())];
        while let Some((id, prefix)) = stack.pop() {
            let Some(node) = self.tree.get_node(id) else {
                continue;
            };
            // validated in `new`
            let name = node.label().unwrap_or_default();

            if node.is_leaf() && self.is_done(name) {
                emit(LeafJob {
                    name: name.to_string(),
                    path: None,
                })?;
                continue;
            }

            let path = prefix.push(self.store.get(name)?);
            if node.is_leaf() {
                emit(LeafJob {
                    name: name.to_string(),
                    path: Some(path),
                })?;
            } else {
                for &child in node.children.iter().rev() {
                    stack.push((child, path.clone()));
                }
            }
        }
        Ok(())
    }

    fn is_done(&self, leaf: &str) -> bool {
        match self.ledger {
            Some(ledger) if !self.force => {
                ledger.contains(leaf) && self.output_of(leaf).is_file()
            }
            _ => false,
        }
    }

    /// Writes the leaf; `Ok(None)` if it was skipped as already done.
    fn write_leaf(&self, job: &LeafJob) -> Result<Option<usize>, BlockError> {
        let Some(path) = &job.path else {
            log::debug!("Skipping {}: already built", job.name);
            return Ok(None);
        };

        let target = self.output_of(&job.name);
        let context = || format!("write {}", target.display());

        let mut staged =
            staging_file(&self.outdir).map_err(|e| BlockError::io(context(), e))?;

        let mut bytes = 0;
        {
            let mut writer = std::io::BufWriter::new(staged.as_file_mut());
            for block in path.to_vec() {
                writer
                    .write_all(block)
                    .map_err(|e| BlockError::io(context(), e))?;
                bytes += block.len();
            }
            writer.flush().map_err(|e| BlockError::io(context(), e))?;
        }
        staged
            .as_file()
            .sync_all()
            .map_err(|e| BlockError::io(context(), e))?;

        staged
            .persist(&target)
            .map_err(|e| BlockError::io(context(), e.error))?;

        log::debug!("Created {} ({} bytes)", target.display(), bytes);
        Ok(Some(bytes))
    }

    fn record(
        &self,
        leaf: &str,
        written: Option<usize>,
        stats: &mut BuildStats,
    ) -> Result<(), BlockError> {
        stats.leaves += 1;
        match written {
            Some(bytes) => {
                stats.written += 1;
                stats.bytes += bytes;
                if let Some(ledger) = self.ledger {
                    ledger
                        .record(leaf)
                        .map_err(|e| BlockError::io("update build ledger", e))?;
                }
            }
            None => stats.skipped += 1,
        }
        Ok(())
    }

    // Traversal -> writer threads -> one sink updating stats and the ledger.
    fn build_parallel(&self) -> Result<BuildStats, BlockError> {
        let (snd_job, rcv_job) = crossbeam::channel::bounded::<LeafJob>(self.parallel * 2);
        let (snd_done, rcv_done) = crossbeam::channel::bounded::<
            Result<(String, Option<usize>), BlockError>,
        >(self.parallel * 2);

        let result = crossbeam::scope(|s| {
            //----------------------------
            // Traversal thread
            //----------------------------
            let walker = s.spawn(move |_| {
                self.traverse(|job| {
                    snd_job.send(job).map_err(|_| {
                        // writers gone: the sink already failed and reports why
                        BlockError::io(
                            "traverse tree",
                            std::io::Error::new(std::io::ErrorKind::Interrupted, "build aborted"),
                        )
                    })
                })
            });

            //----------------------------
            // Writer threads
            //----------------------------
            for _ in 0..self.parallel {
                let (sendr, recvr) = (snd_done.clone(), rcv_job.clone());
                s.spawn(move |_| {
                    for job in recvr.iter() {
                        let done = self.write_leaf(&job).map(|w| (job.name, w));
                        if sendr.send(done).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(snd_done);
            drop(rcv_job);

            //----------------------------
            // Sink
            //----------------------------
            let mut stats = BuildStats::default();
            let mut failure = None;
            for done in rcv_done.iter() {
                if let Err(e) = done.and_then(|(name, w)| self.record(&name, w, &mut stats)) {
                    failure = Some(e);
                    break;
                }
            }
            drop(rcv_done);

            let walked = walker.join().unwrap_or_else(|_| {
                Err(BlockError::io(
                    "traverse tree",
                    std::io::Error::new(std::io::ErrorKind::Other, "traversal thread panicked"),
                ))
            });
            match (failure, walked) {
                (Some(e), _) | (None, Err(e)) => Err(e),
                (None, Ok(())) => Ok(stats),
            }
        });

        result.unwrap_or_else(|_| {
            Err(BlockError::io(
                "build",
                std::io::Error::new(std::io::ErrorKind::Other, "writer thread panicked"),
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::block::compress::{Compressor, Gzip, Plain};
    use crate::libs::block::complete::complete;
    use crate::libs::phylo::reader::load_cluster_tree;
    use tempfile::tempdir;

    fn read(path: PathBuf) -> Vec<u8> {
        std::fs::read(path).unwrap()
    }

    // R -> (A, B -> C), blocks "1" "2" "3" "4"
    fn scenario(c: &dyn Compressor, dir: &Path) -> (Tree, BlockStore) {
        let tree = load_cluster_tree("(A,(C)B)R;").unwrap();
        let store = BlockStore::create("c1", dir.join("blocks"), c.extension()).unwrap();
        for (node, payload) in [("R", "1"), ("A", "2"), ("B", "3"), ("C", "4")] {
            store.put(node, &c.compress(payload.as_bytes()).unwrap()).unwrap();
        }
        (tree, store)
    }

    #[test]
    fn concrete_scenario_plain() {
        let dir = tempdir().unwrap();
        let (tree, store) = scenario(&Plain, dir.path());
        let outdir = dir.path().join("out");

        let stats = Builder::new(&tree, &store, &outdir).unwrap().build().unwrap();
        assert_eq!(stats.leaves, 2);
        assert_eq!(stats.written, 2);

        assert_eq!(read(outdir.join("A.fa")), b"12");
        assert_eq!(read(outdir.join("C.fa")), b"134");
        assert!(!outdir.join("B.fa").exists());
        assert!(!outdir.join("R.fa").exists());
    }

    #[test]
    fn concrete_scenario_gzip_decodes() {
        let dir = tempdir().unwrap();
        let gz = Gzip::default();
        let (tree, store) = scenario(&gz, dir.path());
        let outdir = dir.path().join("out");

        Builder::new(&tree, &store, &outdir)
            .unwrap()
            .parallel(3)
            .build()
            .unwrap();

        assert_eq!(gz.decompress(&read(outdir.join("A.fa.gz"))).unwrap(), b"12");
        assert_eq!(gz.decompress(&read(outdir.join("C.fa.gz"))).unwrap(), b"134");
    }

    #[test]
    fn output_is_concat_of_root_path() {
        let newick = "((L1,L2,(L3,L4)I3)I1,(L5)I2,L6)R;";
        let tree = load_cluster_tree(newick).unwrap();
        let dir = tempdir().unwrap();
        let store = BlockStore::create("c1", dir.path().join("b"), "fa").unwrap();
        for name in tree.get_names() {
            store.put(&name, format!("<{}>", name).as_bytes()).unwrap();
        }

        let outdir = dir.path().join("out");
        for parallel in [1, 4] {
            Builder::new(&tree, &store, &outdir)
                .unwrap()
                .parallel(parallel)
                .build()
                .unwrap();

            for leaf in tree.get_leaves() {
                let expected: String = tree
                    .get_path_from_root(&leaf)
                    .unwrap()
                    .into_iter()
                    .map(|id| format!("<{}>", tree.get_node(id).unwrap().label().unwrap()))
                    .collect();
                let name = tree.get_node(leaf).unwrap().label().unwrap();
                assert_eq!(read(outdir.join(format!("{}.fa", name))), expected.as_bytes());
            }
        }
    }

    #[test]
    fn missing_block_is_fatal() {
        let tree = load_cluster_tree("(A,(C)B)R;").unwrap();
        let dir = tempdir().unwrap();
        let store = BlockStore::create("c1", dir.path().join("b"), "fa").unwrap();
        store.put("R", b"1").unwrap();
        store.put("A", b"2").unwrap();
        store.put("C", b"4").unwrap();

        for parallel in [1, 2] {
            let res = Builder::new(&tree, &store, dir.path().join("out"))
                .unwrap()
                .parallel(parallel)
                .build();
            assert!(
                matches!(res, Err(BlockError::MissingBlock { ref node, .. }) if node == "B"),
                "{:?}",
                res
            );
        }
        assert!(!dir.path().join("out/C.fa").exists());
    }

    #[test]
    fn empty_path_gives_empty_output() {
        let tree = load_cluster_tree("((A)X,B)R;").unwrap();
        let dir = tempdir().unwrap();
        let store = BlockStore::create("c1", dir.path().join("b"), "fa").unwrap();
        store.put("B", b"bbb").unwrap();
        complete(&tree, &store, &Plain).unwrap();

        let outdir = dir.path().join("out");
        Builder::new(&tree, &store, &outdir).unwrap().build().unwrap();

        assert_eq!(read(outdir.join("A.fa")), b"");
        assert_eq!(read(outdir.join("B.fa")), b"bbb");
    }

    #[test]
    fn rebuild_is_byte_identical() {
        let dir = tempdir().unwrap();
        let gz = Gzip::default();
        let (tree, store) = scenario(&gz, dir.path());

        let first = dir.path().join("first");
        let second = dir.path().join("second");
        Builder::new(&tree, &store, &first).unwrap().build().unwrap();
        Builder::new(&tree, &store, &second)
            .unwrap()
            .parallel(2)
            .build()
            .unwrap();

        for leaf in ["A", "C"] {
            let name = format!("{}.fa.gz", leaf);
            assert_eq!(read(first.join(&name)), read(second.join(&name)));
        }
    }

    #[test]
    fn ledger_skips_finished_leaves() {
        let dir = tempdir().unwrap();
        let (tree, store) = scenario(&Plain, dir.path());
        let outdir = dir.path().join("out");
        let ledger = Ledger::open(outdir.join(".completed")).unwrap();

        let stats = Builder::new(&tree, &store, &outdir)
            .unwrap()
            .ledger(&ledger)
            .build()
            .unwrap();
        assert_eq!((stats.written, stats.skipped), (2, 0));
        assert!(ledger.contains("A") && ledger.contains("C"));

        // a deleted output is rebuilt even though the ledger lists it
        std::fs::remove_file(outdir.join("A.fa")).unwrap();
        let ledger = Ledger::open(outdir.join(".completed")).unwrap();
        let stats = Builder::new(&tree, &store, &outdir)
            .unwrap()
            .ledger(&ledger)
            .build()
            .unwrap();
        assert_eq!((stats.written, stats.skipped), (1, 1));
        assert_eq!(read(outdir.join("A.fa")), b"12");

        let stats = Builder::new(&tree, &store, &outdir)
            .unwrap()
            .ledger(&ledger)
            .force(true)
            .parallel(2)
            .build()
            .unwrap();
        assert_eq!((stats.written, stats.skipped), (2, 0));
    }

    #[test]
    fn no_staging_files_left() {
        let dir = tempdir().unwrap();
        let (tree, store) = scenario(&Plain, dir.path());
        let outdir = dir.path().join("out");
        Builder::new(&tree, &store, &outdir).unwrap().build().unwrap();

        let mut names: Vec<String> = std::fs::read_dir(&outdir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["A.fa", "C.fa"]);
    }

    #[cfg(unix)]
    #[test]
    fn outputs_are_world_readable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let (tree, store) = scenario(&Plain, dir.path());
        let outdir = dir.path().join("out");
        Builder::new(&tree, &store, &outdir)
            .unwrap()
            .parallel(2)
            .build()
            .unwrap();

        for leaf in ["A.fa", "C.fa"] {
            let mode = std::fs::metadata(outdir.join(leaf))
                .unwrap()
                .permissions()
                .mode();
            assert_eq!(mode & 0o777, 0o644, "{}", leaf);
        }
    }
}
