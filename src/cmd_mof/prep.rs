use anyhow::Context;
use clap::*;
use mof::libs::block::{self, BlockStore, Compressor, HeaderFormat, Partitioner};
use mof::libs::db::Database;
use mof::libs::layout::Layout;
use mof::libs::ledger::Ledger;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("prep")
        .about("Split downloaded clusters into per-node blocks")
        .after_help(
            r###"
For every cluster, the source archive in <workdir>/cache/downloads/ (.fa.xz,
.fa.gz or .fa) is split into blocks, one per tree node:

* A block starts at a header line `>ID@c1` and runs up to the next one;
  ID is the node the block belongs to
* Each block is compressed on its own and stored as
  <workdir>/cache/blocks/<cluster>/node_<ID>.fa.gz
* Tree nodes without records get an empty block

A node owning two separate runs in the source is an error.

Clusters recorded in cache/blocks/.completed are skipped, unless --force is
given. Preparing a cluster again invalidates its built leaves.

Examples:
1. Prepare with 4 compression threads:
   mof prep atb_1 -p 4

2. BGZF blocks:
   mof prep atb_1 --compressor bgzf

3. Headers like `>ID|first`:
   mof prep atb_1 --delimiter '|' --marker first

"###,
        )
        .arg(super::arg_objects())
        .arg(super::arg_parallel())
        .arg(super::arg_compressor())
        .arg(super::arg_level())
        .arg(super::arg_delimiter())
        .arg(super::arg_marker())
        .arg(super::arg_force())
}

/// Settings of one `prep` run
pub struct PrepOpt {
    pub compressor: Box<dyn Compressor>,
    pub format: HeaderFormat,
    pub parallel: usize,
    pub is_force: bool,
}

impl PrepOpt {
    pub fn from_args(args: &ArgMatches) -> anyhow::Result<Self> {
        let compressor = block::compress::by_name(
            args.get_one::<String>("compressor").unwrap(),
            args.get_one::<u32>("level").copied(),
        )?;
        let format = HeaderFormat::new(
            *args.get_one::<char>("delimiter").unwrap(),
            args.get_one::<String>("marker").unwrap(),
        );

        Ok(Self {
            compressor,
            format,
            parallel: super::parallel_of(args),
            is_force: args.get_flag("force"),
        })
    }
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    let (db, layout) = super::context(args);
    let opt = PrepOpt::from_args(args)?;

    let clusters = super::clusters_of(args, &db)?;
    super::for_each_cluster("prep", &clusters, |cluster| {
        prep_cluster(&db, &layout, &opt, cluster)
    })
}

/// Partition the source of `cluster` and complete its block store
pub fn prep_cluster(
    db: &Database,
    layout: &Layout,
    opt: &PrepOpt,
    cluster: &str,
) -> anyhow::Result<()> {
    let ledger = Ledger::open(layout.prep_ledger())?;
    if !opt.is_force && ledger.contains(cluster) && layout.blocks_dir(cluster).is_dir() {
        log::info!("Cluster {}: already prepared", cluster);
        return Ok(());
    }
    ledger.remove(cluster)?;

    let tree = db.tree(cluster)?;
    let source = layout
        .source_file(cluster)
        .with_context(|| format!("no downloaded source for cluster {}", cluster))?;
    log::info!("Cluster {}: splitting {}", cluster, source.display());

    // leaves built from an earlier store are stale
    Ledger::open(layout.build_ledger(cluster))?.clear()?;

    let store = BlockStore::create(
        cluster,
        layout.blocks_dir(cluster),
        opt.compressor.extension(),
    )?;
    let reader = mof::reader(&source.to_string_lossy())?;
    Partitioner::new(&store, opt.compressor.as_ref())
        .format(opt.format.clone())
        .parallel(opt.parallel)
        .partition(reader)
        .with_context(|| format!("partition of cluster {}", cluster))?;

    block::complete(&tree, &store, opt.compressor.as_ref())
        .with_context(|| format!("completion of cluster {}", cluster))?;

    ledger.record(cluster)?;
    Ok(())
}
