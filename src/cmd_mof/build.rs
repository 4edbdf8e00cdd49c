use anyhow::Context;
use clap::*;
use mof::libs::block::{BlockStore, Builder};
use mof::libs::db::Database;
use mof::libs::layout::Layout;
use mof::libs::ledger::Ledger;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("build")
        .about("Materialize one file per leaf from prepared blocks")
        .after_help(
            r###"
For every leaf of a cluster's tree, the blocks of all nodes from the root down
to the leaf are concatenated, root first, into

    <workdir>/output/<cluster>/<leaf>.fa.gz

Blocks are copied as they are, without recompression; outputs keep the
extension the blocks were prepared with (`.fa` for `--compressor plain`).

* Each output is written to a temporary file and renamed into place
* Leaves listed in output/<cluster>/.completed are skipped, unless --force
  is given

Examples:
1. Build with 8 writer threads:
   mof build atb_1 -p 8

2. Rebuild everything:
   mof build atb_1 --force

"###,
        )
        .arg(super::arg_objects())
        .arg(super::arg_parallel())
        .arg(super::arg_force())
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    let (db, layout) = super::context(args);
    let parallel = super::parallel_of(args);
    let is_force = args.get_flag("force");

    let clusters = super::clusters_of(args, &db)?;
    super::for_each_cluster("build", &clusters, |cluster| {
        build_cluster(&db, &layout, cluster, parallel, is_force)
    })
}

/// Write the leaf outputs of `cluster`
pub fn build_cluster(
    db: &Database,
    layout: &Layout,
    cluster: &str,
    parallel: usize,
    is_force: bool,
) -> anyhow::Result<()> {
    let prepared = Ledger::open(layout.prep_ledger())?;
    if !prepared.contains(cluster) {
        anyhow::bail!("cluster {} is not prepared, run `mof prep` first", cluster);
    }

    let tree = db.tree(cluster)?;
    let store = BlockStore::open(cluster, layout.blocks_dir(cluster))?;
    let ledger = Ledger::open(layout.build_ledger(cluster))?;

    Builder::new(&tree, &store, layout.output_dir(cluster))?
        .parallel(parallel)
        .ledger(&ledger)
        .force(is_force)
        .build()
        .with_context(|| format!("build of cluster {}", cluster))?;

    Ok(())
}
