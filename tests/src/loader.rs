use parking_lot::RwLock;
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use verticle_kernel::ResourceLoader;

/// Resource loader serving scripts from memory.
///
/// It has no filesystem roots, so it cannot be widened: giving it a
/// resource directory makes loader widening fail.
#[derive(Debug, Default)]
pub struct MemoryResourceLoader {
    resources: RwLock<HashMap<String, String>>,
    dirs: HashMap<String, PathBuf>,
}

impl MemoryResourceLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, name: &str, source: &str) -> Self {
        self.insert(name, source);
        self
    }

    /// Report `path` as the directory of resource `name`.
    pub fn with_dir(mut self, name: &str, path: impl Into<PathBuf>) -> Self {
        self.dirs.insert(name.to_string(), path.into());
        self
    }

    pub fn insert(&self, name: &str, source: &str) {
        self.resources
            .write()
            .insert(name.to_string(), source.to_string());
    }

    pub fn shared(self) -> Arc<dyn ResourceLoader> {
        Arc::new(self)
    }
}

impl ResourceLoader for MemoryResourceLoader {
    fn read(&self, name: &str) -> io::Result<Option<String>> {
        Ok(self.resources.read().get(name).cloned())
    }

    fn resource_dir(&self, name: &str) -> Option<PathBuf> {
        self.dirs.get(name).cloned()
    }

    fn describe(&self) -> String {
        format!("memory ({} resources)", self.resources.read().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serves_inserted_resources() {
        let loader = MemoryResourceLoader::new().with("a.rhai", "1");
        loader.insert("b.rhai", "2");

        assert_eq!(loader.read("a.rhai").unwrap().as_deref(), Some("1"));
        assert_eq!(loader.read("b.rhai").unwrap().as_deref(), Some("2"));
        assert!(loader.read("c.rhai").unwrap().is_none());
    }
}
