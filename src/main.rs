//! opscover CLI entry point.

use clap::Parser;
use opscover::cli::{self, Cli, Commands, EXIT_ERROR};
use opscover::logging;

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result = match &cli.command {
        Commands::Extract(args) => cli::run_extract(args),
        Commands::Measure(args) => cli::run_measure(args),
        Commands::Check(args) => cli::run_check(args),
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            EXIT_ERROR
        }
    };

    std::process::exit(exit_code);
}
