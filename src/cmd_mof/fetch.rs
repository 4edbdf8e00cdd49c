use anyhow::Context;
use clap::*;
use cmd_lib::*;
use mof::libs::layout::Layout;
use mof::libs::ledger::Ledger;
use std::collections::BTreeMap;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("fetch")
        .about("Download the source archives of clusters")
        .after_help(
            r###"
<objects> are accessions or cluster names; each is resolved to its cluster
through the database, and every cluster is downloaded once.

* Archives are saved as <workdir>/cache/downloads/<cluster>.fa.xz; the
  transfer goes to <cluster>.fa.xz.part and is renamed once complete
* Clusters recorded in cache/downloads/.completed are not downloaded again,
  unless --force is given
* Interrupted transfers are continued by `wget --continue`

This command depends on `wget`.

Examples:
1. Download the cluster holding an accession:
   mof fetch SAMN02604091

2. Several clusters, into another working directory:
   mof --workdir /scratch/mof fetch atb_1 atb_2

"###,
        )
        .arg(super::arg_objects())
        .arg(super::arg_force())
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    let (db, layout) = super::context(args);
    let is_force = args.get_flag("force");

    let clusters = super::clusters_of(args, &db)?;
    let urls = db.urls()?;

    super::for_each_cluster("fetch", &clusters, |cluster| {
        fetch_cluster(&layout, &urls, cluster, is_force)
    })
}

/// Download the archive of `cluster`, unless the fetch ledger lists it and a
/// source is in place
pub fn fetch_cluster(
    layout: &Layout,
    urls: &BTreeMap<String, String>,
    cluster: &str,
    is_force: bool,
) -> anyhow::Result<()> {
    let ledger = Ledger::open(layout.fetch_ledger())?;
    if !is_force && ledger.contains(cluster) && layout.source_file(cluster).is_some() {
        log::info!("Cluster {}: already downloaded", cluster);
        return Ok(());
    }

    let url = urls
        .get(cluster)
        .with_context(|| format!("no URL for cluster {}", cluster))?;
    which::which("wget").context("`wget` is required to download clusters")?;

    std::fs::create_dir_all(layout.downloads_dir())?;
    let partial = layout.partial_download_file(cluster);
    let part = partial.display().to_string();
    log::info!("Cluster {}: downloading {}", cluster, url);
    run_cmd!(wget --continue --quiet -O ${part} ${url})
        .with_context(|| format!("download of cluster {}", cluster))?;

    let file = layout.download_file(cluster);
    std::fs::rename(&partial, &file)
        .with_context(|| format!("could not move {} into place", partial.display()))?;
    ledger.record(cluster)?;
    Ok(())
}
