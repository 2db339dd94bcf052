use std::{num::NonZeroUsize, path::PathBuf};

use clap::{
    crate_description, crate_name, crate_version, value_parser, Arg, ArgAction, Command,
};

use utils::{init_log, LogLevel};

use crate::config::{Config, InFormat};

/// Set up definition of command options for clap
fn cli_model() -> Command {
    Command::new(crate_name!())
        .about(crate_description!())
        .version(crate_version!())
        .arg(
            Arg::new("timestamp")
                .short('X')
                .long("timestamp")
                .value_parser(value_parser!(stderrlog::Timestamp))
                .value_name("GRANULARITY")
                .default_value("none")
                .help("Prepend log entries with a timestamp"),
        )
        .arg(
            Arg::new("loglevel")
                .short('l')
                .long("loglevel")
                .value_name("LOGLEVEL")
                .value_parser(value_parser!(LogLevel))
                .ignore_case(true)
                .default_value("warn")
                .help("Set log level"),
        )
        .arg(
            Arg::new("quiet")
                .action(ArgAction::SetTrue)
                .long("quiet")
                .conflicts_with("loglevel")
                .help("Silence all output"),
        )
        .arg(
            Arg::new("threads")
                .long("threads")
                .value_parser(value_parser!(NonZeroUsize))
                .value_name("INT")
                .help("Set number of threads for BAM decompression [default: available cores]"),
        )
        .arg(
            Arg::new("format")
                .short('F')
                .long("format")
                .value_parser(value_parser!(InFormat))
                .value_name("FORMAT")
                .ignore_case(true)
                .default_value("bam")
                .help("Input format (bam or sam)"),
        )
        .arg(
            Arg::new("min_qual")
                .short('a')
                .long("min-qual")
                .value_parser(value_parser!(u8))
                .value_name("INT")
                .default_value("0")
                .help("Minimum mapping quality"),
        )
        .arg(
            Arg::new("fasta")
                .short('z')
                .long("reference")
                .value_parser(value_parser!(PathBuf))
                .value_name("PATH")
                .help("Reference FASTA file (adds Length and GC columns)"),
        )
        .arg(
            Arg::new("top_per_query")
                .short('T')
                .long("top-per-query")
                .action(ArgAction::SetTrue)
                .help("Count only the top-scoring alignment per query (requires name-grouped input)"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_parser(value_parser!(PathBuf))
                .value_name("PATH")
                .help("Output file [default: stdout]"),
        )
        .arg(
            Arg::new("input")
                .value_parser(value_parser!(PathBuf))
                .value_name("ALIGNMENT_FILE")
                .required(true)
                .help("Input SAM/BAM file"),
        )
}

/// Handle command line options.  Set up Config structure
pub fn handle_cli() -> anyhow::Result<Config> {
    // Get matches from command line
    let m = cli_model().get_matches();

    // Setup logging
    init_log(&m);

    debug!("Processing command line options");

    let nt = m
        .get_one::<NonZeroUsize>("threads")
        .map(|x| usize::from(*x))
        .unwrap_or_else(num_cpus::get);

    let mut cfg = Config::new(
        m.get_one::<PathBuf>("input")
            .expect("Missing input file")
            .clone(),
        m.get_one::<InFormat>("format")
            .copied()
            .expect("Missing default input format"),
    );

    cfg.set_min_qual(
        m.get_one::<u8>("min_qual")
            .copied()
            .expect("Missing default min qual"),
    );
    cfg.set_fasta(m.get_one::<PathBuf>("fasta").cloned());
    cfg.set_top_per_query(m.get_flag("top_per_query"));
    cfg.set_output(m.get_one::<PathBuf>("output").cloned());
    cfg.set_threads(nt);

    Ok(cfg)
}
