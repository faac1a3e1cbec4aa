//! Verticle Kernel
//!
//! Language-independent contracts between a host application server and a
//! script language module:
//!
//! - [`verticle`]: the factory and unit traits the host drives
//! - [`host`]: the service handles the host publishes to guest scripts
//! - [`loader`]: name-based resource lookup through the host's loader
//! - [`scope`] and [`stop`]: dynamically scoped stop-hook registration
//! - [`config`], [`error`]: ambient configuration and error types

// config module
pub mod config;

// error module
pub mod error;

// host collaborators
pub mod host;

// resource loading
pub mod loader;

// dynamic scope
pub mod scope;

// stop hooks
pub mod stop;

// plugin contracts
pub mod verticle;

pub use config::{EngineLimits, LangConfig};
pub use error::{BoxError, LangError, LangResult, VerticleException};
pub use host::{ContainerHandle, CoreHandle, HostContainer, HostCore, HostLogger, TracingLogger};
pub use loader::{DirResourceLoader, ResourceLoader};
pub use scope::ScopeStack;
pub use stop::{
    StopCallback, StopHooks, StopSummary, register_stop_hook, sealed_stop_scope, with_stop_scope,
};
pub use verticle::{FactoryState, Ownership, Verticle, VerticleFactory, VerticleState};
