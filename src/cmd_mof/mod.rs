//! Subcommand modules for the `mof` binary.

pub mod build;
pub mod clusters;
pub mod fetch;
pub mod get;
pub mod prep;

use clap::*;
use mof::libs::db::Database;
use mof::libs::layout::Layout;

/// Database and working directory named by the global options
pub fn context(args: &ArgMatches) -> (Database, Layout) {
    let db = args.get_one::<String>("db").unwrap();
    let workdir = args.get_one::<String>("workdir").unwrap();
    (Database::new(db), Layout::new(workdir))
}

/// Clusters of the `objects` positional argument
pub fn clusters_of(args: &ArgMatches, db: &Database) -> anyhow::Result<Vec<String>> {
    let objects: Vec<String> = args
        .get_many::<String>("objects")
        .unwrap()
        .cloned()
        .collect();
    Ok(db.resolve_clusters(&objects)?.into_iter().collect())
}

/// Run `op` on every cluster. A failed cluster does not stop the others;
/// the failures are reported together at the end.
pub fn for_each_cluster<F>(stage: &str, clusters: &[String], mut op: F) -> anyhow::Result<()>
where
    F: FnMut(&str) -> anyhow::Result<()>,
{
    let mut failed = vec![];
    for cluster in clusters {
        if let Err(err) = op(cluster) {
            log::warn!("{} failed for cluster {}: {:#}", stage, cluster, err);
            failed.push(cluster.as_str());
        }
    }

    if !failed.is_empty() {
        anyhow::bail!("{} failed for clusters: {}", stage, failed.join(", "));
    }
    Ok(())
}

pub fn arg_objects() -> Arg {
    Arg::new("objects")
        .required(true)
        .num_args(1..)
        .index(1)
        .help("Accessions or cluster names")
}

pub fn arg_parallel() -> Arg {
    Arg::new("parallel")
        .long("parallel")
        .short('p')
        .value_parser(value_parser!(std::num::NonZeroUsize))
        .num_args(1)
        .default_value("1")
        .help("Number of threads")
}

pub fn arg_compressor() -> Arg {
    Arg::new("compressor")
        .long("compressor")
        .num_args(1)
        .value_parser(["gzip", "bgzf", "plain", "external-gzip"])
        .default_value("gzip")
        .help("Compression of blocks and leaf outputs")
}

pub fn arg_level() -> Arg {
    Arg::new("level")
        .long("level")
        .short('l')
        .value_parser(value_parser!(u32))
        .num_args(1)
        .help("Compression level (0-9)")
}

pub fn arg_delimiter() -> Arg {
    Arg::new("delimiter")
        .long("delimiter")
        .value_parser(value_parser!(char))
        .num_args(1)
        .default_value("@")
        .help("Separates the node ID from the rest of a header")
}

pub fn arg_marker() -> Arg {
    Arg::new("marker")
        .long("marker")
        .num_args(1)
        .default_value("c1")
        .help("Suffix of the header that opens a block")
}

pub fn arg_force() -> Arg {
    Arg::new("force")
        .long("force")
        .short('f')
        .action(ArgAction::SetTrue)
        .help("Redo work already recorded as completed")
}

/// Number of threads from `--parallel`
pub fn parallel_of(args: &ArgMatches) -> usize {
    args.get_one::<std::num::NonZeroUsize>("parallel")
        .unwrap()
        .get()
}
