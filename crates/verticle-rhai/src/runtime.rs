//! Shared Rhai runtime.
//!
//! A [`RhaiRuntime`] is the interpreter context many verticles share: one
//! engine, one set of host bindings, one loader root and one agent pool.
//! Per-verticle state never lives here; it is carried by dynamically scoped
//! frames while script code runs.

use crate::agents::AgentPool;
use crate::engine::{HostBindings, build_engine};
use crate::frame::{EvalFrame, eval_scope};
use crate::resolver::{LoaderRoot, resource_name};
use error_stack::{Report, ResultExt};
use rhai::{AST, Dynamic, Engine, Scope};
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;
use verticle_kernel::{
    ContainerHandle, CoreHandle, LangConfig, LangError, LangResult, ResourceLoader, StopHooks,
    with_stop_scope,
};

/// Scope constant holding the starting verticle's correlation id.
pub const VERTICLE_ID_CONST: &str = "VERTICLE_ID";
/// Scope constant holding the starting verticle's script name.
pub const SCRIPT_CONST: &str = "SCRIPT";

pub struct RhaiRuntime {
    id: Uuid,
    config: LangConfig,
    engine: Engine,
    bindings: Arc<OnceLock<HostBindings>>,
    loader: LoaderRoot,
    agents: AgentPool,
}

impl RhaiRuntime {
    /// Bring up a new interpreter context.
    pub fn new(config: LangConfig) -> LangResult<Arc<Self>> {
        config
            .validate()
            .map_err(|e| Report::new(LangError::Config(e.to_string())))
            .attach("validating language configuration")?;

        let agents = AgentPool::new(config.agent_threads, &config.namespace)
            .map_err(|e| Report::new(LangError::Init(e.to_string())))
            .attach("starting agent pool")?;

        let bindings = Arc::new(OnceLock::new());
        let loader = LoaderRoot::default();
        let engine = build_engine(&config, bindings.clone(), loader.clone());

        let runtime = Arc::new(Self {
            id: Uuid::now_v7(),
            config,
            engine,
            bindings,
            loader,
            agents,
        });
        info!(
            runtime = %runtime.id,
            namespace = %runtime.config.namespace,
            "Rhai runtime created"
        );
        Ok(runtime)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn namespace(&self) -> &str {
        &self.config.namespace
    }

    pub fn config(&self) -> &LangConfig {
        &self.config
    }

    pub(crate) fn engine(&self) -> &Engine {
        &self.engine
    }

    pub(crate) fn agents(&self) -> &AgentPool {
        &self.agents
    }

    // ========================================================================
    // Host bindings and loader
    // ========================================================================

    /// Publish the host handles. The first binding wins; returns `false`
    /// when the runtime was already bound.
    pub fn bind_host(&self, core: CoreHandle, container: ContainerHandle) -> bool {
        match self.bindings.set(HostBindings { core, container }) {
            Ok(()) => {
                debug!(runtime = %self.id, "Host handles bound");
                true
            }
            Err(rejected) => {
                let same = self.bindings.get().is_some_and(|b| {
                    b.core.same_as(&rejected.core) && b.container.same_as(&rejected.container)
                });
                if !same {
                    warn!(runtime = %self.id, "Runtime already bound to other host handles; keeping them");
                }
                false
            }
        }
    }

    pub fn bindings(&self) -> Option<&HostBindings> {
        self.bindings.get()
    }

    /// Resolve scripts and imports through `loader` from now on.
    pub fn set_loader(&self, loader: Arc<dyn ResourceLoader>) {
        debug!(runtime = %self.id, loader = %loader.describe(), "Loader root re-pointed");
        self.loader.set(loader);
    }

    pub fn has_loader(&self) -> bool {
        self.loader.is_set()
    }

    // ========================================================================
    // Evaluation
    // ========================================================================

    /// Read and compile a script resource.
    pub fn compile_script(&self, script: &str) -> Result<AST, LangError> {
        let loader = self.loader.get().ok_or(LangError::NotInitialized)?;
        let name = resource_name(script, &self.config.script_extension);
        let source = loader
            .read(&name)
            .map_err(|source| LangError::Load {
                script: script.to_string(),
                source,
            })?
            .ok_or_else(|| LangError::ScriptNotFound(name.clone()))?;

        let mut ast = self.engine.compile(source).map_err(|e| LangError::Compile {
            script: script.to_string(),
            message: e.to_string(),
        })?;
        ast.set_source(name.as_str());
        Ok(ast)
    }

    /// Run a verticle's top level inside a fresh stop-hook scope.
    ///
    /// Returns the hooks the script registered. On failure the hooks are
    /// discarded.
    pub(crate) fn run_start(
        self: &Arc<Self>,
        script: &str,
        verticle_id: Uuid,
        ast: Arc<AST>,
    ) -> Result<StopHooks, LangError> {
        let frame = EvalFrame {
            runtime: self.clone(),
            ast: ast.clone(),
            verticle_id,
            script: Arc::from(script),
        };

        let mut scope = Scope::new();
        scope.push_constant(VERTICLE_ID_CONST, verticle_id.to_string());
        scope.push_constant(SCRIPT_CONST, script.to_string());

        let (result, hooks) = with_stop_scope(|| {
            eval_scope()
                .enter(frame, || self.engine.run_ast_with_scope(&mut scope, &ast))
                .0
        });

        match result {
            Ok(()) => Ok(hooks),
            Err(e) => {
                if !hooks.is_empty() {
                    debug!(script, discarded = hooks.len(), "Dropping stop hooks of failed start");
                }
                Err(LangError::Eval {
                    script: script.to_string(),
                    message: e.to_string(),
                })
            }
        }
    }

    /// Evaluate a standalone expression outside any verticle.
    pub fn eval(&self, source: &str) -> Result<Dynamic, LangError> {
        self.engine
            .eval::<Dynamic>(source)
            .map_err(|e| LangError::Eval {
                script: "<eval>".to_string(),
                message: e.to_string(),
            })
    }

    // ========================================================================
    // Shutdown
    // ========================================================================

    /// Stop the background agent pool, waiting up to the configured grace
    /// period. Returns `false` if it was already stopped.
    pub fn shutdown_agents(&self) -> bool {
        self.shutdown_agents_within(self.config.shutdown_grace())
    }

    pub fn shutdown_agents_within(&self, grace: Duration) -> bool {
        let stopped = self.agents.shutdown(grace);
        if stopped {
            info!(runtime = %self.id, "Rhai runtime shut down");
        }
        stopped
    }

    pub fn is_shut_down(&self) -> bool {
        self.agents.is_shut_down()
    }

    /// Agent jobs queued or running.
    pub fn pending_agents(&self) -> usize {
        self.agents.pending()
    }
}

impl fmt::Debug for RhaiRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RhaiRuntime")
            .field("id", &self.id)
            .field("namespace", &self.config.namespace)
            .field("bound", &self.bindings.get().is_some())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}
