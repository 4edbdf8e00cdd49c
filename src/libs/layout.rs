use std::path::{Path, PathBuf};

/// Name of the completed-set ledger kept in each stage's directory
pub const LEDGER_FILE: &str = ".completed";

/// Source archive extensions, in order of preference
const SOURCE_EXTENSIONS: [&str; 3] = ["fa.xz", "fa.gz", "fa"];

/// Paths of one working directory.
///
/// ```text
/// <workdir>/
///     cache/downloads/<cluster>.fa.xz
///     cache/blocks/<cluster>/node_<id>.fa.gz
///     output/<cluster>/<leaf>.fa.gz
/// ```
#[derive(Debug, Clone)]
pub struct Layout {
    workdir: PathBuf,
}

impl Layout {
    pub fn new(workdir: impl AsRef<Path>) -> Self {
        Self {
            workdir: workdir.as_ref().to_path_buf(),
        }
    }

    pub fn downloads_dir(&self) -> PathBuf {
        self.workdir.join("cache").join("downloads")
    }

    /// Where `fetch` saves the archive of `cluster`
    pub fn download_file(&self, cluster: &str) -> PathBuf {
        self.downloads_dir()
            .join(format!("{}.{}", cluster, SOURCE_EXTENSIONS[0]))
    }

    /// Transfer in progress; renamed to `download_file` once complete
    pub fn partial_download_file(&self, cluster: &str) -> PathBuf {
        self.downloads_dir()
            .join(format!("{}.{}.part", cluster, SOURCE_EXTENSIONS[0]))
    }

    /// The first non-empty source of `cluster`: `.fa.xz`, `.fa.gz` or `.fa`
    pub fn source_file(&self, cluster: &str) -> Option<PathBuf> {
        SOURCE_EXTENSIONS
            .iter()
            .map(|ext| self.downloads_dir().join(format!("{}.{}", cluster, ext)))
            .find(|path| {
                std::fs::metadata(path)
                    .map(|m| m.is_file() && m.len() > 0)
                    .unwrap_or(false)
            })
    }

    pub fn blocks_root(&self) -> PathBuf {
        self.workdir.join("cache").join("blocks")
    }

    pub fn blocks_dir(&self, cluster: &str) -> PathBuf {
        self.blocks_root().join(cluster)
    }

    pub fn output_dir(&self, cluster: &str) -> PathBuf {
        self.workdir.join("output").join(cluster)
    }

    /// Clusters whose archive has been downloaded
    pub fn fetch_ledger(&self) -> PathBuf {
        self.downloads_dir().join(LEDGER_FILE)
    }

    /// Clusters whose block store is complete
    pub fn prep_ledger(&self) -> PathBuf {
        self.blocks_root().join(LEDGER_FILE)
    }

    /// Leaves of `cluster` already written
    pub fn build_ledger(&self, cluster: &str) -> PathBuf {
        self.output_dir(cluster).join(LEDGER_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn paths_under_workdir() {
        let layout = Layout::new("/work");
        assert_eq!(
            layout.download_file("c1"),
            PathBuf::from("/work/cache/downloads/c1.fa.xz")
        );
        assert_eq!(layout.blocks_dir("c1"), PathBuf::from("/work/cache/blocks/c1"));
        assert_eq!(layout.output_dir("c1"), PathBuf::from("/work/output/c1"));
        assert_eq!(
            layout.build_ledger("c1"),
            PathBuf::from("/work/output/c1/.completed")
        );
    }

    #[test]
    fn source_prefers_xz() {
        let dir = tempdir().unwrap();
        let layout = Layout::new(dir.path());
        assert_eq!(layout.source_file("c1"), None);

        std::fs::create_dir_all(layout.downloads_dir()).unwrap();
        let gz = layout.downloads_dir().join("c1.fa.gz");
        std::fs::write(&gz, b"gz").unwrap();
        assert_eq!(layout.source_file("c1"), Some(gz.clone()));

        // an empty archive is a failed transfer, not a source
        std::fs::write(layout.download_file("c1"), b"").unwrap();
        assert_eq!(layout.source_file("c1"), Some(gz));
        std::fs::write(layout.partial_download_file("c1"), b"xz").unwrap();
        assert_ne!(layout.source_file("c1"), Some(layout.partial_download_file("c1")));

        std::fs::write(layout.download_file("c1"), b"xz").unwrap();
        assert_eq!(layout.source_file("c1"), Some(layout.download_file("c1")));
    }
}
