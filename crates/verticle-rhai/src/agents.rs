//! Background agent pool.
//!
//! Scripts hand work off the host thread with `<ns>::submit(fn)`. Jobs run on
//! the blocking pool of a dedicated tokio runtime owned by the interpreter,
//! so shutting the interpreter down means shutting this pool down.

use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};
use verticle_kernel::LangError;

pub struct AgentPool {
    runtime: Mutex<Option<tokio::runtime::Runtime>>,
    pending: Arc<AtomicUsize>,
    shut_down: AtomicBool,
}

impl AgentPool {
    pub fn new(threads: usize, name: &str) -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .max_blocking_threads(threads.max(1))
            .thread_name(format!("{name}-agent"))
            .build()?;
        Ok(Self {
            runtime: Mutex::new(Some(runtime)),
            pending: Arc::new(AtomicUsize::new(0)),
            shut_down: AtomicBool::new(false),
        })
    }

    /// Queue `job`. Fails once the pool has been shut down.
    pub fn submit(&self, job: impl FnOnce() + Send + 'static) -> Result<(), LangError> {
        let guard = self.runtime.lock();
        let runtime = guard.as_ref().ok_or(LangError::AgentsShutDown)?;

        self.pending.fetch_add(1, Ordering::SeqCst);
        let done = PendingGuard(self.pending.clone());
        runtime.spawn_blocking(move || {
            let _done = done;
            job();
        });
        Ok(())
    }

    /// Jobs queued or running.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Stop accepting jobs and wait up to `grace` for running ones.
    /// Returns `false` if the pool was already shut down.
    pub fn shutdown(&self, grace: Duration) -> bool {
        let runtime = self.runtime.lock().take();
        let Some(runtime) = runtime else {
            return false;
        };
        self.shut_down.store(true, Ordering::SeqCst);
        info!(pending = self.pending(), "Shutting down agent pool");

        if tokio::runtime::Handle::try_current().is_ok() {
            // tokio refuses to block inside a runtime; wait from a plain thread
            let slot = Arc::new(Mutex::new(Some(runtime)));
            let handoff = slot.clone();
            let waiter = std::thread::Builder::new()
                .name("agent-shutdown".to_string())
                .spawn(move || {
                    if let Some(runtime) = handoff.lock().take() {
                        runtime.shutdown_timeout(grace);
                    }
                });
            match waiter {
                Ok(handle) => {
                    if handle.join().is_err() {
                        warn!("Agent pool shutdown thread panicked");
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Cannot wait for agent pool; abandoning running jobs");
                    if let Some(runtime) = slot.lock().take() {
                        runtime.shutdown_background();
                    }
                }
            }
        } else {
            runtime.shutdown_timeout(grace);
        }
        debug!("Agent pool stopped");
        true
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }
}

impl Drop for AgentPool {
    fn drop(&mut self) {
        // never block here: the last reference may be released on an agent thread
        if let Some(runtime) = self.runtime.get_mut().take() {
            runtime.shutdown_background();
        }
    }
}

struct PendingGuard(Arc<AtomicUsize>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
