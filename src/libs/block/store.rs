use super::error::BlockError;
use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

const BLOCK_PREFIX: &str = "node_";
const STAGING_PREFIX: &str = ".staging_";
/// Records the block extension, so that readers of the store need not be told
const MANIFEST: &str = ".extension";

/// Per-cluster mapping of node identifier to compressed block, one file per node:
/// `<dir>/node_<id>.<extension>`. The extension is kept in `<dir>/.extension`.
///
/// The store keeps no state in memory, so it can be shared between threads.
/// Blocks are written once: `put` never replaces an existing file.
#[derive(Debug, Clone)]
pub struct BlockStore {
    cluster: String,
    dir: PathBuf,
    extension: String,
}

impl BlockStore {
    /// Start a fresh store in `dir`, removing blocks and staging files left by an earlier run.
    pub fn create(
        cluster: &str,
        dir: impl AsRef<Path>,
        extension: &str,
    ) -> Result<Self, BlockError> {
        let store = Self::new(cluster, dir, extension);
        fs::create_dir_all(&store.dir)
            .map_err(|e| BlockError::io(format!("create {}", store.dir.display()), e))?;

        let mut removed = 0;
        for entry in store.read_dir()? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(BLOCK_PREFIX) || name.starts_with(STAGING_PREFIX) {
                fs::remove_file(entry.path())
                    .map_err(|e| BlockError::io(format!("remove {}", name), e))?;
                removed += 1;
            }
        }
        if removed > 0 {
            log::info!("Cluster {}: superseding {} stored files", cluster, removed);
        }

        let manifest = store.dir.join(MANIFEST);
        fs::write(&manifest, format!("{}\n", store.extension))
            .map_err(|e| BlockError::io(format!("write {}", manifest.display()), e))?;

        Ok(store)
    }

    /// Use the existing store in `dir`, with the extension it was created with.
    pub fn open(cluster: &str, dir: impl AsRef<Path>) -> Result<Self, BlockError> {
        let manifest = dir.as_ref().join(MANIFEST);
        let extension = fs::read_to_string(&manifest).map_err(|e| {
            BlockError::io(
                format!("open block store of cluster {} ({})", cluster, manifest.display()),
                e,
            )
        })?;
        Ok(Self::new(cluster, dir, extension.trim()))
    }

    fn new(cluster: &str, dir: impl AsRef<Path>, extension: &str) -> Self {
        Self {
            cluster: cluster.to_string(),
            dir: dir.as_ref().to_path_buf(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// File holding the block of `node`
    pub fn path_of(&self, node: &str) -> Result<PathBuf, BlockError> {
        if !is_valid_node_id(node) {
            return Err(BlockError::InvalidNodeId {
                cluster: self.cluster.clone(),
                node: node.to_string(),
            });
        }
        Ok(self
            .dir
            .join(format!("{}{}.{}", BLOCK_PREFIX, node, self.extension)))
    }

    pub fn contains(&self, node: &str) -> bool {
        self.path_of(node).map(|p| p.is_file()).unwrap_or(false)
    }

    /// Register the block of `node`.
    ///
    /// The bytes go to a staging file first, which is then linked under the final
    /// name only if that name is still free, so a reader never sees a partial block
    /// and an existing block is never replaced.
    pub fn put(&self, node: &str, block: &[u8]) -> Result<(), BlockError> {
        let path = self.path_of(node)?;
        if path.exists() {
            return Err(self.duplicate(node));
        }

        let mut staged = staging_file(&self.dir)
            .map_err(|e| BlockError::io(format!("stage block {}", node), e))?;
        staged
            .write_all(block)
            .and_then(|_| staged.as_file().sync_all())
            .map_err(|e| BlockError::io(format!("write block {}", node), e))?;

        staged.persist_noclobber(&path).map_err(|e| {
            if e.error.kind() == std::io::ErrorKind::AlreadyExists {
                self.duplicate(node)
            } else {
                BlockError::io(format!("publish block {}", node), e.error)
            }
        })?;

        log::debug!("Cluster {}: stored block {} ({} bytes)", self.cluster, node, block.len());
        Ok(())
    }

    /// Compressed bytes of the block of `node`
    pub fn get(&self, node: &str) -> Result<Vec<u8>, BlockError> {
        let path = self.path_of(node)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(BlockError::MissingBlock {
                cluster: self.cluster.clone(),
                node: node.to_string(),
            }),
            Err(e) => Err(BlockError::io(format!("read block {}", node), e)),
        }
    }

    /// Identifiers of all stored blocks
    pub fn keys(&self) -> Result<BTreeSet<String>, BlockError> {
        let suffix = format!(".{}", self.extension);
        let mut keys = BTreeSet::new();
        for entry in self.read_dir()? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(node) = name
                .strip_prefix(BLOCK_PREFIX)
                .and_then(|rest| rest.strip_suffix(suffix.as_str()))
            {
                keys.insert(node.to_string());
            }
        }
        Ok(keys)
    }

    fn read_dir(&self) -> Result<Vec<fs::DirEntry>, BlockError> {
        let context = || format!("list {}", self.dir.display());
        fs::read_dir(&self.dir)
            .map_err(|e| BlockError::io(context(), e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| BlockError::io(context(), e))
    }

    fn duplicate(&self, node: &str) -> BlockError {
        BlockError::DuplicateBlock {
            cluster: self.cluster.clone(),
            node: node.to_string(),
        }
    }
}

/// Hidden temporary file in `dir`, world-readable like a file created with
/// `File::create`. Callers write it, sync it, then rename it into place.
pub(crate) fn staging_file(dir: &Path) -> std::io::Result<tempfile::NamedTempFile> {
    let staged = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempfile_in(dir)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        staged
            .as_file()
            .set_permissions(fs::Permissions::from_mode(0o644))?;
    }
    Ok(staged)
}

/// Identifiers become file names: they must be non-empty, not `.`/`..`,
/// and free of path separators and NUL.
pub fn is_valid_node_id(node: &str) -> bool {
    !node.is_empty()
        && node != "."
        && node != ".."
        && !node.contains(['/', '\\', '\0'])
}
