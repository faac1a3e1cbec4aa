//! Resource loading.
//!
//! Scripts are host-application resources. A language module never touches
//! the filesystem directly; it resolves every script (and every module a
//! script imports) through the [`ResourceLoader`] the host supplied at
//! `init`.

use crate::error::LangError;
use parking_lot::RwLock;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Locates script resources by name.
pub trait ResourceLoader: Send + Sync {
    /// Read the resource `name`. `Ok(None)` means it does not exist.
    fn read(&self, name: &str) -> io::Result<Option<String>>;

    /// Directory backing the resource `name`, when the loader is filesystem
    /// based and such a directory exists.
    fn resource_dir(&self, name: &str) -> Option<PathBuf> {
        None
    }

    /// Make resources under `root` visible through this loader.
    fn add_root(&self, root: PathBuf) -> Result<(), LangError> {
        Err(LangError::Unsupported(format!(
            "{} cannot add root {}",
            self.describe(),
            root.display()
        )))
    }

    /// Human-readable description used in logs.
    fn describe(&self) -> String;
}

/// Loader over an ordered list of directories. The first root that holds a
/// resource wins.
#[derive(Debug, Default)]
pub struct DirResourceLoader {
    roots: RwLock<Vec<PathBuf>>,
}

impl DirResourceLoader {
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            roots: RwLock::new(roots.into_iter().map(Into::into).collect()),
        }
    }

    pub fn roots(&self) -> Vec<PathBuf> {
        self.roots.read().clone()
    }

    fn resolve(&self, name: &str) -> io::Result<Option<PathBuf>> {
        let relative = checked_relative(name)?;
        Ok(self
            .roots
            .read()
            .iter()
            .map(|root| root.join(relative))
            .find(|candidate| candidate.exists()))
    }
}

impl ResourceLoader for DirResourceLoader {
    fn read(&self, name: &str) -> io::Result<Option<String>> {
        match self.resolve(name)? {
            Some(path) if path.is_file() => std::fs::read_to_string(path).map(Some),
            _ => Ok(None),
        }
    }

    fn resource_dir(&self, name: &str) -> Option<PathBuf> {
        self.resolve(name).ok().flatten().filter(|p| p.is_dir())
    }

    fn add_root(&self, root: PathBuf) -> Result<(), LangError> {
        if !root.exists() {
            return Err(LangError::LoaderRegistration(format!(
                "root {} does not exist",
                root.display()
            )));
        }
        let mut roots = self.roots.write();
        if !roots.contains(&root) {
            roots.push(root);
        }
        Ok(())
    }

    fn describe(&self) -> String {
        let roots = self.roots.read();
        let listed: Vec<String> = roots.iter().map(|r| r.display().to_string()).collect();
        format!("dir loader [{}]", listed.join(", "))
    }
}

/// Resource names are relative and may not escape their root.
fn checked_relative(name: &str) -> io::Result<&Path> {
    let path = Path::new(name);
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if name.is_empty() || escapes {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid resource name: {name:?}"),
        ));
    }
    Ok(path)
}

/// Adds every entry of the loader's `marker` directory as an extra root.
///
/// Returns the number of roots added; `Ok(0)` when the loader has no such
/// directory. Any failure is reported rather than skipped.
pub fn widen_with_runtime_dir(loader: &dyn ResourceLoader, marker: &str) -> Result<usize, LangError> {
    let Some(dir) = loader.resource_dir(marker) else {
        return Ok(0);
    };

    let entries = std::fs::read_dir(&dir).map_err(|e| {
        LangError::LoaderRegistration(format!("cannot list {}: {e}", dir.display()))
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            LangError::LoaderRegistration(format!("cannot read entry of {}: {e}", dir.display()))
        })?;
        paths.push(entry.path());
    }
    // read_dir order is platform dependent
    paths.sort();

    for path in &paths {
        loader.add_root(path.clone())?;
        tracing::debug!(root = %path.display(), "Added runtime root");
    }
    Ok(paths.len())
}
