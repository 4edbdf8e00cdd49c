use clap::*;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("get")
        .about("Fetch, prepare and build clusters")
        .after_help(
            r###"
Runs `mof fetch`, `mof prep` and `mof build` on each resolved cluster in turn.
Steps recorded as completed are skipped, so an interrupted `get` can simply be
run again.

A cluster failing at any step is reported and the remaining clusters go on.

Examples:
1. Everything for one accession:
   mof get SAMN02604091

2. Two clusters, 4 threads:
   mof get atb_1 atb_2 -p 4

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

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    let (db, layout) = super::context(args);
    let opt = super::prep::PrepOpt::from_args(args)?;

    let clusters = super::clusters_of(args, &db)?;
    let urls = db.urls()?;

    super::for_each_cluster("get", &clusters, |cluster| {
        super::fetch::fetch_cluster(&layout, &urls, cluster, opt.is_force)?;
        super::prep::prep_cluster(&db, &layout, &opt, cluster)?;
        super::build::build_cluster(&db, &layout, cluster, opt.parallel, opt.is_force)
    })
}
