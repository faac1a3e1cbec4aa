//! Verticle lifecycle.
//!
//! A [`RhaiVerticle`] runs its script's top level once on `start` and keeps
//! whatever the script registered with `<ns>::on_stop` for `stop`. The
//! registration scope is opened on the starting thread only, so verticles
//! started concurrently on one runtime never see each other's hooks.

use crate::runtime::RhaiRuntime;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use verticle_kernel::{LangError, StopHooks, Verticle, VerticleException, VerticleState};

pub struct RhaiVerticle {
    id: Uuid,
    script: String,
    runtime: Arc<RhaiRuntime>,
    state: VerticleState,
    hooks: StopHooks,
}

impl RhaiVerticle {
    pub(crate) fn new(runtime: Arc<RhaiRuntime>, script: &str) -> Self {
        Self {
            id: Uuid::now_v7(),
            script: script.to_string(),
            runtime,
            state: VerticleState::Created,
            hooks: StopHooks::new(),
        }
    }

    pub fn state(&self) -> VerticleState {
        self.state
    }

    /// Stop hooks captured by a successful start and not yet run.
    pub fn stop_hook_count(&self) -> usize {
        self.hooks.len()
    }

    pub fn runtime(&self) -> &Arc<RhaiRuntime> {
        &self.runtime
    }

    fn label(&self) -> String {
        format!("{} ({})", self.script, self.id)
    }

    fn run_script(&self) -> Result<StopHooks, LangError> {
        let ast = self.runtime.compile_script(&self.script)?;
        self.runtime.run_start(&self.script, self.id, Arc::new(ast))
    }
}

impl Verticle for RhaiVerticle {
    fn id(&self) -> Uuid {
        self.id
    }

    fn script(&self) -> &str {
        &self.script
    }

    fn start(&mut self) -> Result<(), VerticleException> {
        if self.state != VerticleState::Created {
            return Err(LangError::InvalidState {
                expected: VerticleState::Created.to_string(),
                actual: self.state.to_string(),
            }
            .into());
        }

        info!(verticle = %self.id, script = %self.script, "Starting verticle");
        match self.run_script() {
            Ok(hooks) => {
                debug!(verticle = %self.id, hooks = hooks.len(), "Captured stop hooks");
                self.hooks = hooks;
                self.state = VerticleState::Started;
                Ok(())
            }
            Err(e) => {
                warn!(verticle = %self.id, script = %self.script, error = %e, "Verticle failed to start");
                self.state = VerticleState::Failed;
                Err(VerticleException::with_cause(
                    format!("Failed to start verticle {}", self.script),
                    e,
                ))
            }
        }
    }

    fn stop(&mut self) {
        if self.state != VerticleState::Started {
            debug!(verticle = %self.id, state = %self.state, "Stop ignored");
            return;
        }

        let hooks = std::mem::take(&mut self.hooks);
        let summary = hooks.run(&self.label());
        self.state = VerticleState::Stopped;

        if summary.failed > 0 {
            warn!(
                verticle = %self.id,
                invoked = summary.invoked,
                failed = summary.failed,
                "Verticle stopped with failing hooks"
            );
        } else {
            info!(verticle = %self.id, invoked = summary.invoked, "Verticle stopped");
        }
    }
}

impl fmt::Debug for RhaiVerticle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RhaiVerticle")
            .field("id", &self.id)
            .field("script", &self.script)
            .field("state", &self.state)
            .field("hooks", &self.hooks.len())
            .finish()
    }
}
