use std::{num::NonZeroUsize, path::PathBuf};

use clap::{
    crate_description, crate_name, crate_version, value_parser, Arg, ArgAction, Command,
};

use utils::{init_log, LogLevel};

use crate::config::Config;

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
            Arg::new("fasta")
                .short('f')
                .long("fasta")
                .value_parser(value_parser!(PathBuf))
                .value_name("PATH")
                .required(true)
                .help("Reference FASTA file"),
        )
        .arg(
            Arg::new("region")
                .short('c')
                .long("region")
                .value_parser(value_parser!(String))
                .value_name("REGION")
                .help("Restrict analysis to a BAM region (requires index)"),
        )
        .arg(
            Arg::new("bins")
                .short('b')
                .long("bins")
                .value_parser(value_parser!(usize))
                .value_name("INT")
                .help("Number of coverage bins [default: mean reference length]"),
        )
        .arg(
            Arg::new("per_ref")
                .short('x')
                .long("per-ref")
                .action(ArgAction::SetTrue)
                .help("Plot per-reference coverage"),
        )
        .arg(
            Arg::new("no_log")
                .short('o')
                .long("no-log-scale")
                .action(ArgAction::SetTrue)
                .help("Do not take log of coverage"),
        )
        .arg(
            Arg::new("tag")
                .short('t')
                .long("tag")
                .value_parser(value_parser!(String))
                .value_name("STRING")
                .help("Dataset tag [default: BAM file name]"),
        )
        .arg(
            Arg::new("min_qual")
                .short('q')
                .long("min-qual")
                .value_parser(value_parser!(u8))
                .value_name("INT")
                .default_value("0")
                .help("Minimum alignment quality"),
        )
        .arg(
            Arg::new("report")
                .short('r')
                .long("report")
                .value_parser(value_parser!(PathBuf))
                .value_name("PATH")
                .default_value("bam_frag_coverage.html")
                .help("Output report file"),
        )
        .arg(
            Arg::new("dump")
                .short('p')
                .long("dump")
                .value_parser(value_parser!(PathBuf))
                .value_name("PATH")
                .default_value("bam_frag_coverage.json")
                .help("Save results to this file"),
        )
        .arg(
            Arg::new("bam")
                .value_parser(value_parser!(PathBuf))
                .value_name("BAM_FILE")
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

    let bam = m
        .get_one::<PathBuf>("bam")
        .expect("Missing BAM file")
        .clone();

    let tag = m.get_one::<String>("tag").cloned().unwrap_or_else(|| {
        bam.file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| String::from("sample"))
    });

    let mut cfg = Config::new(
        bam,
        m.get_one::<PathBuf>("fasta")
            .expect("Missing reference FASTA")
            .clone(),
        tag,
        m.get_one::<PathBuf>("report")
            .expect("Missing default report path")
            .clone(),
        m.get_one::<PathBuf>("dump")
            .expect("Missing default dump path")
            .clone(),
    );

    cfg.set_region(m.get_one::<String>("region").cloned());
    cfg.set_bins(m.get_one::<usize>("bins").copied());
    cfg.set_per_ref(m.get_flag("per_ref"));
    cfg.set_log_scale(!m.get_flag("no_log"));
    cfg.set_min_qual(
        m.get_one::<u8>("min_qual")
            .copied()
            .expect("Missing default min qual"),
    );
    cfg.set_threads(nt);

    Ok(cfg)
}
