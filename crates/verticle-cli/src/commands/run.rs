//! `verticle run` command implementation

use super::{load_config, loader};
use crate::host::{JsonContainer, LoggingCore};
use anyhow::Context;
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use verticle_kernel::{
    ContainerHandle, CoreHandle, FactoryState, TracingLogger, Verticle, VerticleFactory,
};
use verticle_rhai::RhaiVerticleFactory;

/// Execute the `verticle run` command
pub fn run(
    scripts: &[String],
    roots: &[PathBuf],
    config: Option<&Path>,
    conf: Option<&str>,
) -> anyhow::Result<()> {
    let config = load_config(config)?;
    let container_config = match conf {
        Some(raw) => serde_json::from_str(raw).context("--conf is not valid JSON")?,
        None => serde_json::json!({}),
    };

    let container = Arc::new(JsonContainer::new(container_config));
    let mut factory = RhaiVerticleFactory::new(config);
    factory.init(
        CoreHandle::new(Arc::new(LoggingCore)),
        ContainerHandle::new(container.clone()),
        loader(roots),
    );
    if let FactoryState::Failed(reason) = factory.state() {
        anyhow::bail!("language module failed to initialize: {reason}");
    }

    let mut started: Vec<Box<dyn Verticle>> = Vec::new();
    let mut failure = None;
    for script in scripts {
        let result = factory
            .create_verticle(script)
            .and_then(|mut verticle| verticle.start().map(|()| verticle));
        match result {
            Ok(verticle) => {
                println!("{} {} ({})", "✓".green(), script, verticle.id());
                started.push(verticle);
            }
            Err(e) => {
                println!("{} {}", "✗".red(), script);
                factory.report_exception(&TracingLogger, &e);
                failure = Some(e);
                break;
            }
        }
    }

    if failure.is_none() && !container.exit_requested() {
        info!(verticles = started.len(), "Running; press Ctrl-C to stop");
        wait_for_ctrl_c()?;
    }

    for verticle in started.iter_mut().rev() {
        verticle.stop();
    }
    factory.close();

    match failure {
        Some(e) => Err(e).context("deployment aborted"),
        None => Ok(()),
    }
}

fn wait_for_ctrl_c() -> anyhow::Result<()> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    rt.block_on(tokio::signal::ctrl_c())?;
    Ok(())
}
