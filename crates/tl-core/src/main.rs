//! Telemetry Lens command-line entry point.

use clap::Parser;
use tl_core::cli::{run, Cli};
use tl_core::logging;

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.log_format);
    let code = run(&cli);
    std::process::exit(code.as_i32());
}
