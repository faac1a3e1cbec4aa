//! Host plugin contracts.
//!
//! The host discovers a language module through a [`VerticleFactory`] and
//! drives it in a fixed order:
//!
//! 1. `init(core, container, loader)` once;
//! 2. any number of `create_verticle(script)` followed by `start()` and,
//!    eventually, `stop()` on the returned [`Verticle`];
//! 3. `close()`.
//!
//! `start` and `stop` of one verticle are never called concurrently and
//! `stop` never precedes a successful `start`. Different verticles may be
//! started concurrently on different host threads.

use crate::error::VerticleException;
use crate::host::{ContainerHandle, CoreHandle, HostLogger};
use crate::loader::ResourceLoader;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;


/// Language module entry point.
pub trait VerticleFactory: Send + Sync {
    /// Bring up (or attach to) the interpreter and publish the host handles
    /// into it. Never panics and never returns an error to the host; a
    /// failure is logged and leaves the factory unusable.
    fn init(&mut self, core: CoreHandle, container: ContainerHandle, loader: Arc<dyn ResourceLoader>);

    /// Create the lifecycle object for `script`. Does no I/O.
    fn create_verticle(&self, script: &str) -> Result<Box<dyn Verticle>, VerticleException>;

    /// Forward an unexpected error raised by one of this factory's
    /// verticles to the host's logger.
    fn report_exception(&self, logger: &dyn HostLogger, error: &(dyn std::error::Error + 'static)) {
        logger.error("Unexpected exception in script verticle", error);
    }

    /// Release the interpreter if this factory brought it up.
    fn close(&mut self);
}

/// One deployed unit of guest script logic.
pub trait Verticle: Send {
    /// Correlation id, unique per created unit.
    fn id(&self) -> Uuid;

    /// Script identifier the unit was created for.
    fn script(&self) -> &str;

    /// Load and run the script. On error the unit counts as not started.
    fn start(&mut self) -> Result<(), VerticleException>;

    /// Run the cleanup the script registered. Always succeeds from the
    /// host's point of view.
    fn stop(&mut self);
}

/// Lifecycle state of a factory.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FactoryState {
    /// `init` has not run yet.
    Uninitialized,
    /// Interpreter is up and host handles are bound.
    Ready,
    /// `init` failed; the reason is kept for diagnostics.
    Failed(String),
    /// `close` has run.
    Closed,
}

impl fmt::Display for FactoryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactoryState::Uninitialized => f.write_str("uninitialized"),
            FactoryState::Ready => f.write_str("ready"),
            FactoryState::Failed(reason) => write!(f, "failed ({reason})"),
            FactoryState::Closed => f.write_str("closed"),
        }
    }
}

/// Lifecycle state of a verticle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticleState {
    /// Created, `start` not called yet.
    Created,
    /// `start` completed successfully.
    Started,
    /// `start` failed; `stop` is a no-op.
    Failed,
    /// `stop` has run.
    Stopped,
}

impl fmt::Display for VerticleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VerticleState::Created => "created",
            VerticleState::Started => "started",
            VerticleState::Failed => "failed",
            VerticleState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Whether a factory created the interpreter it uses or attached to one
/// that already existed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// This factory brought the interpreter up and shuts it down on close.
    Owned,
    /// The interpreter belongs to someone else; close leaves it running.
    Attached,
}
