//! CLI argument definitions for `trackmix`.

use clap::{Arg, ArgAction, Command};

pub const DEFAULT_CHUNK_FRAMES: &str = "1024";

/// Build the CLI argument parser and command definitions.
pub fn build_cli() -> Command {
    Command::new("trackmix")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Mix WAV tracks through the trackmix engine")
        .arg_required_else_help(true)
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .short('q')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Suppress all console output"),
        )
        .subcommand(
            Command::new("mix")
                .about("Mix WAV files into a single 32-bit float WAV")
                .arg(
                    Arg::new("INPUT")
                        .help("Input WAV files; track ids follow argument order")
                        .required(true)
                        .num_args(1..=256)
                        .index(1),
                )
                .arg(
                    Arg::new("out")
                        .long("out")
                        .short('o')
                        .value_name("PATH")
                        .required(true)
                        .help("Output WAV path"),
                )
                .arg(
                    Arg::new("main")
                        .long("main")
                        .short('m')
                        .value_name("ID")
                        .value_parser(clap::value_parser!(u8))
                        .help("Main track id (defaults to the settings file, then 0)"),
                )
                .arg(
                    Arg::new("chunk")
                        .long("chunk")
                        .short('c')
                        .value_name("FRAMES")
                        .default_value(DEFAULT_CHUNK_FRAMES)
                        .value_parser(clap::value_parser!(u32).range(1..))
                        .help("Frames per appended buffer"),
                )
                .arg(
                    Arg::new("settings")
                        .long("settings")
                        .short('s')
                        .value_name("PATH")
                        .help("Path to a mixer settings JSON file"),
                ),
        )
        .subcommand(
            Command::new("create")
                .about("Emit default JSON payloads")
                .subcommand_required(true)
                .subcommand(
                    Command::new("settings-json").about("Print the default mixer settings JSON"),
                ),
        )
}
