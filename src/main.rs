mod agents;
mod cli;
mod error;
mod host;
mod utils;
mod workflow;

use clap::Parser;
use cli::{Cli, Commands};
use colored::Colorize;
use std::io::IsTerminal;
use std::process;
use tracing_subscriber::EnvFilter;
use workflow::MoveOptions;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Log lines and a live bar fight over stderr, so verbose runs go without the bar.
    let show_progress = !cli.verbose && std::io::stderr().is_terminal();

    let result = match &cli.command {
        Commands::Move { package, dry_run } => workflow::execute_move(
            &cli.path,
            &MoveOptions {
                package,
                include_dependencies: false,
                dry_run: *dry_run,
                asset_root: &cli.asset_root,
                builtin_prefix: &cli.builtin_prefix,
                show_progress,
            },
        ),
        Commands::MoveWithDeps { package, dry_run } => workflow::execute_move(
            &cli.path,
            &MoveOptions {
                package,
                include_dependencies: true,
                dry_run: *dry_run,
                asset_root: &cli.asset_root,
                builtin_prefix: &cli.builtin_prefix,
                show_progress,
            },
        ),
        Commands::List => workflow::execute_list(&cli.path, &cli.asset_root, &cli.builtin_prefix),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "pkg2asset=debug"
    } else {
        "pkg2asset=warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
