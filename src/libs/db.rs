use crate::libs::phylo::Tree;
use anyhow::{anyhow, bail, Context};
use std::collections::{BTreeMap, BTreeSet};
use std::io::BufRead;
use std::path::{Path, PathBuf};

/// Cluster metadata kept in a plain directory:
///
/// * `downloads.tsv` - `cluster<TAB>url`, one cluster per line
/// * `clusters/<cluster>.txt` - whitespace-separated accessions of the cluster
/// * `trees/<cluster>.nw` - the cluster's tree in Newick
#[derive(Debug, Clone)]
pub struct Database {
    dir: PathBuf,
}

impl Database {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// cluster => url
    pub fn urls(&self) -> anyhow::Result<BTreeMap<String, String>> {
        let path = self.dir.join("downloads.tsv");
        let reader = crate::reader(&path.to_string_lossy())?;

        let mut urls = BTreeMap::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (cluster, url) = line
                .split_once('\t')
                .ok_or_else(|| anyhow!("{}:{}: expected cluster<TAB>url", path.display(), i + 1))?;
            urls.insert(cluster.trim().to_string(), url.trim().to_string());
        }
        Ok(urls)
    }

    /// cluster => accessions, in file order
    pub fn accessions(&self) -> anyhow::Result<BTreeMap<String, Vec<String>>> {
        let dir = self.dir.join("clusters");
        let mut accs_of = BTreeMap::new();

        let entries = std::fs::read_dir(&dir)
            .with_context(|| format!("could not read {}", dir.display()))?;
        for entry in entries {
            let path = entry?.path();
            let Some(cluster) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_suffix(".txt"))
            else {
                continue;
            };

            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("could not read {}", path.display()))?;
            let accs = content.split_whitespace().map(str::to_string).collect();
            accs_of.insert(cluster.to_string(), accs);
        }
        Ok(accs_of)
    }

    pub fn tree_file(&self, cluster: &str) -> PathBuf {
        self.dir.join("trees").join(format!("{}.nw", cluster))
    }

    /// The validated tree of `cluster`
    pub fn tree(&self, cluster: &str) -> anyhow::Result<Tree> {
        let path = self.tree_file(cluster);
        crate::libs::phylo::reader::cluster_tree(&path.to_string_lossy())
            .with_context(|| format!("tree of cluster {}", cluster))
    }

    /// Map accessions and cluster names to the sorted set of their clusters.
    ///
    /// Every cluster listed in `downloads.tsv` or `clusters/` is known by name.
    pub fn resolve_clusters(&self, objects: &[String]) -> anyhow::Result<BTreeSet<String>> {
        let accs_of = self.accessions()?;
        let urls = self.urls()?;

        let mut cluster_of: BTreeMap<&str, &str> = BTreeMap::new();
        for cluster in urls.keys().chain(accs_of.keys()) {
            cluster_of.insert(cluster, cluster);
        }
        for (cluster, accs) in &accs_of {
            for acc in accs {
                cluster_of.entry(acc).or_insert(cluster);
            }
        }

        let mut clusters = BTreeSet::new();
        let mut unknown = vec![];
        for object in objects {
            match cluster_of.get(object.as_str()) {
                Some(cluster) => {
                    clusters.insert(cluster.to_string());
                }
                None => unknown.push(object.as_str()),
            }
        }
        if !unknown.is_empty() {
            bail!("Unknown accessions or clusters: {}", unknown.join(", "));
        }

        log::info!(
            "Determined clusters: {}",
            clusters.iter().cloned().collect::<Vec<_>>().join(", ")
        );
        Ok(clusters)
    }
}
