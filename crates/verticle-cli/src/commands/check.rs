//! `verticle check` command implementation

use super::{load_config, loader};
use colored::Colorize;
use std::path::{Path, PathBuf};
use verticle_rhai::RhaiRuntime;

/// Execute the `verticle check` command
pub fn run(scripts: &[String], roots: &[PathBuf], config: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config)?;
    let runtime = RhaiRuntime::new(config.with_agent_threads(1))
        .map_err(|report| anyhow::anyhow!("{report:?}"))?;
    runtime.set_loader(loader(roots));

    let mut failed = 0;
    for script in scripts {
        match runtime.compile_script(script) {
            Ok(_) => println!("{} {}", "✓".green(), script),
            Err(e) => {
                failed += 1;
                println!("{} {}: {}", "✗".red(), script, e);
            }
        }
    }
    runtime.shutdown_agents();

    if failed > 0 {
        anyhow::bail!("{failed} of {} scripts failed to compile", scripts.len());
    }
    Ok(())
}
