use clap::*;
use std::io::Write;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("clusters")
        .about("List the clusters of the database")
        .after_help(
            r###"
Print one cluster per line, sorted by name.

Columns are tab-separated:
* cluster
* url         (with --urls)
* accessions  (with --accessions, comma-separated)

Examples:
1. Names only:
   mof clusters

2. Everything, with a header line:
   mof clusters -u -a -H

"###,
        )
        .arg(
            Arg::new("urls")
                .long("urls")
                .short('u')
                .action(ArgAction::SetTrue)
                .help("Print URLs"),
        )
        .arg(
            Arg::new("accessions")
                .long("accessions")
                .short('a')
                .action(ArgAction::SetTrue)
                .help("Print accessions"),
        )
        .arg(
            Arg::new("header")
                .long("header")
                .short('H')
                .action(ArgAction::SetTrue)
                .help("Print a header line"),
        )
        .arg(
            Arg::new("outfile")
                .long("outfile")
                .short('o')
                .num_args(1)
                .default_value("stdout")
                .help("Output filename. [stdout] for screen"),
        )
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    //----------------------------
    // Args
    //----------------------------
    let (db, _) = super::context(args);
    let is_urls = args.get_flag("urls");
    let is_accessions = args.get_flag("accessions");
    let is_header = args.get_flag("header");
    let mut writer = mof::writer(args.get_one::<String>("outfile").unwrap())?;

    //----------------------------
    // Output
    //----------------------------
    let urls = db.urls()?;
    let accs_of = if is_accessions {
        db.accessions()?
    } else {
        Default::default()
    };

    if is_header {
        let mut header = vec!["cluster"];
        if is_urls {
            header.push("url");
        }
        if is_accessions {
            header.push("accessions");
        }
        writer.write_fmt(format_args!("{}\n", header.join("\t")))?;
    }

    for (cluster, url) in &urls {
        let mut fields = vec![cluster.to_string()];
        if is_urls {
            fields.push(url.to_string());
        }
        if is_accessions {
            fields.push(accs_of.get(cluster).map(|a| a.join(",")).unwrap_or_default());
        }
        writer.write_fmt(format_args!("{}\n", fields.join("\t")))?;
    }

    Ok(())
}
