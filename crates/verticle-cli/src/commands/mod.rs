//! Command implementations

pub mod check;
pub mod run;

use anyhow::Context;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use verticle_kernel::{DirResourceLoader, LangConfig, ResourceLoader};

/// Configuration from `--config`, or the defaults.
pub(crate) fn load_config(path: Option<&Path>) -> anyhow::Result<LangConfig> {
    match path {
        Some(path) => LangConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(LangConfig::default()),
    }
}

pub(crate) fn loader(roots: &[PathBuf]) -> Arc<dyn ResourceLoader> {
    Arc::new(DirResourceLoader::new(roots.iter().cloned()))
}
