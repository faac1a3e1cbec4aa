//! Evaluation frames.
//!
//! Whenever script code runs on behalf of a verticle (its top-level start,
//! one of its stop hooks, or an agent job it submitted) an [`EvalFrame`] is
//! pushed on the calling thread. Native functions use it to find the
//! runtime and the compiled script that closures passed to them belong to.

use crate::runtime::RhaiRuntime;
use rhai::{AST, FnPtr};
use std::cell::RefCell;
use std::sync::Arc;
use uuid::Uuid;
use verticle_kernel::scope::ScopeStack;
use verticle_kernel::{LangError, StopCallback, sealed_stop_scope};

#[derive(Clone)]
pub(crate) struct EvalFrame {
    pub(crate) runtime: Arc<RhaiRuntime>,
    pub(crate) ast: Arc<AST>,
    pub(crate) verticle_id: Uuid,
    pub(crate) script: Arc<str>,
}

thread_local! {
    static EVAL_FRAMES: RefCell<Vec<EvalFrame>> = const { RefCell::new(Vec::new()) };
}

pub(crate) fn eval_scope() -> ScopeStack<EvalFrame> {
    ScopeStack::new(&EVAL_FRAMES)
}

pub(crate) fn current_frame() -> Option<EvalFrame> {
    eval_scope().with_current(|frame| frame.clone())
}

impl EvalFrame {
    /// Call `f` with this frame active on the current thread and stop-hook
    /// registration sealed.
    pub(crate) fn call(&self, f: &FnPtr) -> Result<(), LangError> {
        let (result, _) = sealed_stop_scope(|| {
            eval_scope().enter(self.clone(), || {
                f.call::<rhai::Dynamic>(self.runtime.engine(), &self.ast, ())
            })
        });
        result.map(|_| ()).map_err(|e| LangError::Eval {
            script: self.script.to_string(),
            message: e.to_string(),
        })
    }

    /// Turn a guest closure into a stop hook bound to this frame's script.
    pub(crate) fn stop_hook(self, f: FnPtr) -> StopCallback {
        Box::new(move || self.call(&f).map_err(Into::into))
    }
}
