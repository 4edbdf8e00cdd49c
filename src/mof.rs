extern crate clap;
use clap::*;

mod cmd_mof;

/// Initializes the logger; `verbosity` 0 is errors only, 2 is info.
fn init_log(verbosity: usize, quiet: bool) -> anyhow::Result<()> {
    stderrlog::new()
        .module(module_path!())
        .quiet(quiet)
        .verbosity(verbosity)
        .timestamp(stderrlog::Timestamp::Off)
        .init()?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let app = Command::new("mof")
        .version(crate_version!())
        .author(crate_authors!())
        .about("`mof` - Materialize per-leaf genome files from tree-organized blocks")
        .propagate_version(true)
        .arg_required_else_help(true)
        .color(ColorChoice::Auto)
        .arg(
            Arg::new("db")
                .long("db")
                .env("MOF_DB")
                .num_args(1)
                .default_value("data")
                .global(true)
                .help("Database directory: downloads.tsv, clusters/, trees/"),
        )
        .arg(
            Arg::new("workdir")
                .long("workdir")
                .short('w')
                .num_args(1)
                .default_value(".")
                .global(true)
                .help("Working directory holding cache/ and output/"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .action(ArgAction::Count)
                .global(true)
                .help("More log messages, repeat for more"),
        )
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .short('q')
                .action(ArgAction::SetTrue)
                .global(true)
                .help("No log messages"),
        )
        .subcommand(cmd_mof::get::make_subcommand())
        .subcommand(cmd_mof::fetch::make_subcommand())
        .subcommand(cmd_mof::prep::make_subcommand())
        .subcommand(cmd_mof::build::make_subcommand())
        .subcommand(cmd_mof::clusters::make_subcommand())
        .after_help(
            r###"Subcommands:

* Main command:
    * get      - fetch, prep and build in one go

* Steps:
    * fetch    - download the source archive of clusters
    * prep     - split sources into per-node blocks
    * build    - concatenate blocks along root paths, one file per leaf

* Database:
    * clusters - list clusters, URLs and accessions

Example:
    mof get SAMN02604091

"###,
        );

    let matches = app.get_matches();
    let verbose = matches.get_count("verbose") as usize;
    init_log(2 + verbose, matches.get_flag("quiet"))?;

    // Check which subcomamnd the user ran...
    match matches.subcommand() {
        Some(("get", sub_matches)) => cmd_mof::get::execute(sub_matches),
        Some(("fetch", sub_matches)) => cmd_mof::fetch::execute(sub_matches),
        Some(("prep", sub_matches)) => cmd_mof::prep::execute(sub_matches),
        Some(("build", sub_matches)) => cmd_mof::build::execute(sub_matches),
        Some(("clusters", sub_matches)) => cmd_mof::clusters::execute(sub_matches),
        _ => unreachable!(),
    }?;

    Ok(())
}
