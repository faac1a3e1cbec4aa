//! Verticle Rhai
//!
//! Runs [Rhai](https://rhai.rs) scripts as verticles. One [`RhaiRuntime`]
//! (engine, host bindings, loader root, agent pool) is shared by every
//! verticle a factory creates; each verticle's stop hooks are captured in a
//! scope private to the thread that starts it.
//!
//! # Example
//!
//! ```rust,ignore
//! use verticle_kernel::{LangConfig, VerticleFactory};
//! use verticle_rhai::RhaiVerticleFactory;
//!
//! let mut factory = RhaiVerticleFactory::new(LangConfig::default());
//! factory.init(core, container, loader);
//!
//! let mut verticle = factory.create_verticle("server.rhai")?;
//! verticle.start()?;
//! // ...
//! verticle.stop();
//! factory.close();
//! ```

// background jobs
mod agents;

// engine and guest namespace
mod engine;

// evaluation frames
mod frame;

// import resolution
mod resolver;

pub mod factory;
pub mod registry;
pub mod runtime;
pub mod verticle;

pub use engine::{API_VERSION, HostBindings};
pub use factory::RhaiVerticleFactory;
pub use registry::RuntimeRegistry;
pub use resolver::resource_name;
pub use runtime::{RhaiRuntime, SCRIPT_CONST, VERTICLE_ID_CONST};
pub use verticle::RhaiVerticle;
