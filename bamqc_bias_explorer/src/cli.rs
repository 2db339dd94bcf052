use std::path::PathBuf;

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
                .default_value("info")
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
            Arg::new("target")
                .short('t')
                .long("target")
                .value_parser(value_parser!(PathBuf))
                .value_name("PATH")
                .help("Tab separated file with the true concentrations, merged on Reference"),
        )
        .arg(
            Arg::new("report")
                .short('r')
                .long("report")
                .value_parser(value_parser!(PathBuf))
                .value_name("PATH")
                .default_value("bias_explorer.html")
                .help("Output report file"),
        )
        .arg(
            Arg::new("counts")
                .value_parser(value_parser!(PathBuf))
                .value_name("COUNTS_FILE")
                .required(true)
                .help("Tab separated file with counts and features (bamqc_count_reads -z output)"),
        )
}

/// Handle command line options.  Set up Config structure
pub fn handle_cli() -> anyhow::Result<Config> {
    // Get matches from command line
    let m = cli_model().get_matches();

    // Setup logging
    init_log(&m);

    debug!("Processing command line options");

    let mut cfg = Config::new(
        m.get_one::<PathBuf>("counts")
            .expect("Missing counts file")
            .clone(),
        m.get_one::<PathBuf>("report")
            .expect("Missing default report path")
            .clone(),
    );
    cfg.set_target(m.get_one::<PathBuf>("target").cloned());

    Ok(cfg)
}
