//! `grace-ts` command-line entry point.

use clap::Parser;
use grace_raster::Located;
use grace_runner::cli::{Cli, Command};
use grace_runner::{init_logging, locate, run_extraction};
use std::process::ExitCode;
use tracing::error;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match execute(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn execute(command: Command) -> grace_runner::Result<()> {
    match command {
        Command::Run(args) => {
            let config = args.to_config()?;
            let summary = run_extraction(&config, args.compare)?;
            println!("{}", summary.table_path.display());
            println!("{}", summary.matrix_path.display());
            if let Some(path) = summary.comparison_path {
                println!("{}", path.display());
            }
        }
        Command::Locate(args) => match locate(&args.archive, &args.product, args.date)? {
            Located::Missing => println!("no file for {}", args.date),
            Located::Found(path) => println!("{}", path.display()),
            Located::Ambiguous(paths) => {
                for path in &paths {
                    println!("{}", path.display());
                }
                return Err(grace_series::SeriesError::AmbiguousMatch {
                    product: args.product,
                    date: args.date,
                    paths,
                }
                .into());
            }
        },
    }
    Ok(())
}
