use anyhow::Result;
use clap::{Arg, ArgAction, Command};
use std::path::PathBuf;

use omnitop::commands;

fn main() -> Result<()> {
    omnitop::init_logging();

    let matches = Command::new("omnitop")
        .version(env!("CARGO_PKG_VERSION"))
        .about("System telemetry for CPU, memory, disk, network, processes and GPU")
        .arg(
            Arg::new("mock")
                .short('m')
                .long("mock")
                .help("Use the synthetic provider instead of live sources")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Path to profiles.json (defaults to ./profiles.json or the user config dir)")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("interval")
                .short('i')
                .long("interval")
                .value_name("MS")
                .help("Sampling interval in milliseconds (250-5000)")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("count")
                .short('n')
                .long("count")
                .value_name("N")
                .help("Stop after N samples")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Print each snapshot as a JSON line")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-notify")
                .long("no-notify")
                .help("Log alerts instead of sending desktop notifications")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    commands::monitor(&matches)
}
