//! Stop hooks.
//!
//! A guest script cannot be asked up front which resources it will open, so
//! cleanup is delegated to the script: while its verticle starts it may
//! register any number of zero-argument callbacks, and the verticle invokes
//! them when the host stops it.
//!
//! Registration goes through a dynamically scoped collection
//! ([`with_stop_scope`] / [`register_stop_hook`]). Only code running on the
//! starting thread, inside the scope, can reach it; concurrent starts of
//! other verticles on other threads have scopes of their own.
//! [`sealed_stop_scope`] shadows any open scope with one that refuses
//! registration.

use crate::error::{BoxError, LangError};
use crate::scope::ScopeStack;
use std::cell::RefCell;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tracing::{debug, warn};

/// Cleanup action registered by a guest script.
pub type StopCallback = Box<dyn FnOnce() -> Result<(), BoxError> + Send>;

/// Ordered stop hooks of one verticle.
#[derive(Default)]
pub struct StopHooks {
    hooks: Vec<StopCallback>,
}

impl StopHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, hook: StopCallback) {
        self.hooks.push(hook);
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Invoke every hook once, in registration order.
    ///
    /// A hook that fails or panics is logged and the remaining hooks still
    /// run. `unit` labels the log lines.
    pub fn run(self, unit: &str) -> StopSummary {
        let mut summary = StopSummary::default();
        for (index, hook) in self.hooks.into_iter().enumerate() {
            summary.invoked += 1;
            match catch_unwind(AssertUnwindSafe(hook)) {
                Ok(Ok(())) => debug!(unit, index, "Stop hook completed"),
                Ok(Err(e)) => {
                    summary.failed += 1;
                    warn!(unit, index, error = %e, "Stop hook failed");
                }
                Err(panic) => {
                    summary.failed += 1;
                    warn!(unit, index, panic = %panic_message(&panic), "Stop hook panicked");
                }
            }
        }
        summary
    }
}

impl fmt::Debug for StopHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StopHooks")
            .field("len", &self.hooks.len())
            .finish()
    }
}

/// Outcome of [`StopHooks::run`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StopSummary {
    pub invoked: usize,
    pub failed: usize,
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// `None` is a sealed frame: nothing may register through it.
thread_local! {
    static STOP_FRAMES: RefCell<Vec<Option<StopHooks>>> = const { RefCell::new(Vec::new()) };
}

fn stop_scope() -> ScopeStack<Option<StopHooks>> {
    ScopeStack::new(&STOP_FRAMES)
}

/// Run `body` inside a fresh stop-hook scope and return what it registered.
///
/// The hooks are handed back even if `body` reports failure; callers decide
/// whether to keep them.
pub fn with_stop_scope<R>(body: impl FnOnce() -> R) -> (R, StopHooks) {
    let (result, hooks) = stop_scope().enter(Some(StopHooks::new()), body);
    (result, hooks.unwrap_or_default())
}

/// Run `body` with registration closed, even if an outer scope is open on
/// this thread.
///
/// Stop hooks and background jobs run under this, so a hook invoked while
/// the same thread is starting another verticle cannot register into that
/// start.
pub fn sealed_stop_scope<R>(body: impl FnOnce() -> R) -> R {
    stop_scope().enter(None, body).0
}

/// Append `hook` to the innermost stop-hook scope of the calling thread.
pub fn register_stop_hook(hook: StopCallback) -> Result<(), LangError> {
    let registered = stop_scope().with_current(|frame| match frame {
        Some(hooks) => {
            hooks.push(hook);
            true
        }
        None => false,
    });
    match registered {
        Some(true) => Ok(()),
        _ => Err(LangError::NoActiveScope("stop hook registration".to_string())),
    }
}

/// Whether the calling thread is inside an open stop-hook scope.
pub fn stop_scope_active() -> bool {
    stop_scope().with_current(|frame| frame.is_some()).unwrap_or(false)
}
