//! Rhai verticle factory.
//!
//! Implements the host plugin contract. `init` claims (or attaches to) the
//! runtime for the configured namespace, re-points its loader and publishes
//! the host handles; `close` tears the runtime down only when this factory
//! brought it up.

use crate::registry::RuntimeRegistry;
use crate::runtime::RhaiRuntime;
use crate::verticle::RhaiVerticle;
use error_stack::{Report, ResultExt};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use verticle_kernel::loader::widen_with_runtime_dir;
use verticle_kernel::{
    ContainerHandle, CoreHandle, FactoryState, LangConfig, LangError, LangResult, Ownership,
    ResourceLoader, Verticle, VerticleException, VerticleFactory,
};

pub struct RhaiVerticleFactory {
    config: LangConfig,
    registry: Arc<RuntimeRegistry>,
    supplied: Option<Arc<RhaiRuntime>>,
    runtime: Option<Arc<RhaiRuntime>>,
    ownership: Option<Ownership>,
    state: FactoryState,
}

impl RhaiVerticleFactory {
    /// Factory sharing runtimes through the process-wide registry.
    pub fn new(config: LangConfig) -> Self {
        Self {
            config,
            registry: RuntimeRegistry::global(),
            supplied: None,
            runtime: None,
            ownership: None,
            state: FactoryState::Uninitialized,
        }
    }

    /// Claim runtimes from `registry` instead of the global one.
    pub fn with_registry(mut self, registry: Arc<RuntimeRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Use an externally supplied runtime. The factory never owns it.
    pub fn with_runtime(mut self, runtime: Arc<RhaiRuntime>) -> Self {
        self.supplied = Some(runtime);
        self
    }

    pub fn state(&self) -> &FactoryState {
        &self.state
    }

    pub fn ownership(&self) -> Option<Ownership> {
        self.ownership
    }

    pub fn owns_runtime(&self) -> bool {
        self.ownership == Some(Ownership::Owned)
    }

    pub fn runtime(&self) -> Option<&Arc<RhaiRuntime>> {
        self.runtime.as_ref()
    }

    /// Effective configuration, including container overrides once `init`
    /// has run.
    pub fn config(&self) -> &LangConfig {
        &self.config
    }

    fn effective_config(&self, container: &ContainerHandle) -> LangResult<LangConfig> {
        let overrides = LangConfig::from_container_config(&container.config())
            .map_err(|e| Report::new(LangError::Config(e.to_string())))
            .attach("reading the container's \"lang\" section")?;
        Ok(overrides.unwrap_or_else(|| self.config.clone()))
    }

    fn try_init(
        &mut self,
        core: CoreHandle,
        container: ContainerHandle,
        loader: Arc<dyn ResourceLoader>,
    ) -> LangResult<()> {
        let config = self.effective_config(&container)?;

        let added = widen_with_runtime_dir(loader.as_ref(), &config.runtime_dir)
            .map_err(Report::new)
            .attach(format!("widening {} with {}", loader.describe(), config.runtime_dir))?;
        if added > 0 {
            debug!(roots = added, "Widened resource loader");
        }

        let (runtime, ownership) = match &self.supplied {
            Some(runtime) => (runtime.clone(), Ownership::Attached),
            None => self
                .registry
                .claim(&config.namespace, || RhaiRuntime::new(config.clone()))
                .attach(format!("claiming runtime for namespace {}", config.namespace))?,
        };

        if ownership == Ownership::Owned || !runtime.has_loader() {
            runtime.set_loader(loader);
        }
        runtime.bind_host(core, container);

        info!(
            runtime = %runtime.id(),
            namespace = %runtime.namespace(),
            ?ownership,
            "Rhai verticle factory initialized"
        );
        self.config = config;
        self.runtime = Some(runtime);
        self.ownership = Some(ownership);
        Ok(())
    }

    fn ready_runtime(&self) -> Result<&Arc<RhaiRuntime>, LangError> {
        match (&self.state, &self.runtime) {
            (FactoryState::Ready, Some(runtime)) => Ok(runtime),
            (FactoryState::Closed, _) => Err(LangError::Closed),
            _ => Err(LangError::NotInitialized),
        }
    }
}

impl VerticleFactory for RhaiVerticleFactory {
    fn init(&mut self, core: CoreHandle, container: ContainerHandle, loader: Arc<dyn ResourceLoader>) {
        match &self.state {
            FactoryState::Uninitialized => {}
            FactoryState::Ready => {
                debug!("Verticle factory already initialized");
                return;
            }
            state => {
                warn!(%state, "Ignoring init on unusable verticle factory");
                return;
            }
        }

        match self.try_init(core, container, loader) {
            Ok(()) => self.state = FactoryState::Ready,
            Err(report) => {
                error!(error = ?report, "Failed to initialize Rhai verticle factory");
                self.state = FactoryState::Failed(report.current_context().to_string());
            }
        }
    }

    fn create_verticle(&self, script: &str) -> Result<Box<dyn Verticle>, VerticleException> {
        let runtime = self.ready_runtime()?;
        Ok(Box::new(RhaiVerticle::new(runtime.clone(), script)))
    }

    fn close(&mut self) {
        if self.state == FactoryState::Closed {
            return;
        }
        self.state = FactoryState::Closed;

        let Some(runtime) = self.runtime.take() else {
            return;
        };
        match self.ownership {
            Some(Ownership::Owned) => {
                runtime.shutdown_agents();
                self.registry.release(runtime.namespace(), &runtime);
            }
            _ => debug!(runtime = %runtime.id(), "Leaving shared runtime running"),
        }
        info!("Rhai verticle factory closed");
    }
}
