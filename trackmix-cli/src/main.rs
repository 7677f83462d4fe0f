//! # Trackmix
//!
//! A command-line mixdown tool for the trackmix engine.

use log::error;

mod cli;
mod error;
mod logging;
mod runner;
mod wav;

fn main() {
    let args = cli::args::build_cli().get_matches();
    let log_buffer = logging::init(args.get_flag("quiet"));

    let code = match runner::run(&args, log_buffer) {
        Ok(code) => code,
        Err(err) => {
            error!("{}", err.to_string().to_lowercase());
            if !logging::echoes_stderr() {
                eprintln!("error: {}", err);
            }
            -1
        }
    };

    std::process::exit(code)
}
