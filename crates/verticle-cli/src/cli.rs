//! CLI command definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Verticle CLI - deploy Rhai scripts as verticles
#[derive(Parser)]
#[command(name = "verticle")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Language module configuration file (yaml, toml or json)
    #[arg(short = 'c', long, global = true, env = "VERTICLE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Start scripts as verticles and run until Ctrl-C
    Run {
        /// Script names, resolved against the roots
        #[arg(required = true)]
        scripts: Vec<String>,

        /// Resource root; may be repeated, first match wins
        #[arg(short, long = "root", default_value = ".")]
        roots: Vec<PathBuf>,

        /// Container configuration as a JSON object
        #[arg(long)]
        conf: Option<String>,
    },

    /// Compile scripts without running them
    Check {
        /// Script names, resolved against the roots
        #[arg(required = true)]
        scripts: Vec<String>,

        /// Resource root; may be repeated, first match wins
        #[arg(short, long = "root", default_value = ".")]
        roots: Vec<PathBuf>,
    },
}
