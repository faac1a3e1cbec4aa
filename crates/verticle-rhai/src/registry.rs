//! Process-wide runtime registry.
//!
//! Several factories in one process share an interpreter per namespace. The
//! first factory to claim a namespace creates the runtime and owns it; later
//! claims attach to the live one. Claims are serialized so two factories
//! initializing concurrently never both become owners.

use crate::runtime::RhaiRuntime;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Weak};
use tracing::debug;
use verticle_kernel::{LangResult, Ownership};

static GLOBAL: LazyLock<Arc<RuntimeRegistry>> = LazyLock::new(|| Arc::new(RuntimeRegistry::new()));

#[derive(Debug, Default)]
pub struct RuntimeRegistry {
    runtimes: Mutex<HashMap<String, Weak<RhaiRuntime>>>,
}

impl RuntimeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry shared by every factory built with [`RhaiVerticleFactory::new`](crate::RhaiVerticleFactory::new).
    pub fn global() -> Arc<RuntimeRegistry> {
        GLOBAL.clone()
    }

    /// Attach to the live runtime for `namespace`, or bring one up with
    /// `create` and own it. Runtimes already shut down are replaced.
    pub fn claim(
        &self,
        namespace: &str,
        create: impl FnOnce() -> LangResult<Arc<RhaiRuntime>>,
    ) -> LangResult<(Arc<RhaiRuntime>, Ownership)> {
        let mut runtimes = self.runtimes.lock();

        if let Some(live) = runtimes.get(namespace).and_then(Weak::upgrade) {
            if !live.is_shut_down() {
                debug!(namespace, runtime = %live.id(), "Attaching to live runtime");
                return Ok((live, Ownership::Attached));
            }
        }

        let runtime = create()?;
        runtimes.insert(namespace.to_string(), Arc::downgrade(&runtime));
        Ok((runtime, Ownership::Owned))
    }

    /// Drop the entry for `namespace` if it still refers to `runtime`.
    pub fn release(&self, namespace: &str, runtime: &Arc<RhaiRuntime>) -> bool {
        let mut runtimes = self.runtimes.lock();
        let matches = runtimes
            .get(namespace)
            .is_some_and(|weak| std::ptr::eq(weak.as_ptr(), Arc::as_ptr(runtime)));
        if matches {
            runtimes.remove(namespace);
        }
        matches
    }

    /// Live runtime registered for `namespace`.
    pub fn lookup(&self, namespace: &str) -> Option<Arc<RhaiRuntime>> {
        self.runtimes
            .lock()
            .get(namespace)
            .and_then(Weak::upgrade)
            .filter(|rt| !rt.is_shut_down())
    }

    /// Number of namespaces with a live runtime.
    pub fn len(&self) -> usize {
        self.runtimes
            .lock()
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
