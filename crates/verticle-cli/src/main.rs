//! Verticle CLI - run and check Rhai verticle scripts

mod cli;
mod commands;
mod host;

use clap::Parser;
use cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    if cli.verbose {
        tracing_subscriber::fmt().with_env_filter("debug").init();
    } else {
        tracing_subscriber::fmt().with_env_filter("info").init();
    }

    match cli.command {
        Commands::Run {
            scripts,
            roots,
            conf,
        } => commands::run::run(&scripts, &roots, cli.config.as_deref(), conf.as_deref()),

        Commands::Check { scripts, roots } => {
            commands::check::run(&scripts, &roots, cli.config.as_deref())
        }
    }
}
