//! Crate-level error types for `verticle-kernel`.
//!
//! Two layers:
//!
//! - [`LangError`] describes what went wrong inside a language module
//!   (loading, compiling, evaluating, registering stop hooks, initializing
//!   the runtime). The initialization path wraps it in an
//!   [`error_stack::Report`] ([`LangResult`]) so context can be attached as
//!   the failure propagates up to the factory.
//! - [`VerticleException`] is the single error kind that crosses into the
//!   host. It carries a message and the original cause as its
//!   [`source`](std::error::Error::source).
//!
//! # Usage
//!
//! ```rust,ignore
//! use verticle_kernel::error::{LangError, LangResult};
//! use error_stack::{Report, ResultExt};
//!
//! fn bring_up() -> LangResult<()> {
//!     Err(Report::new(LangError::Init("engine refused limits".into())))
//!         .attach("while building the script engine")
//! }
//! ```

use thiserror::Error;

/// Boxed, thread-safe error used for opaque causes (stop hooks, host handles).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised by a language module.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LangError {
    /// The embedded interpreter could not be brought up.
    #[error("Runtime initialization failed: {0}")]
    Init(String),

    /// The host-supplied resource loader could not be widened or re-pointed.
    #[error("Resource loader registration failed: {0}")]
    LoaderRegistration(String),

    /// No resource with the given name is visible through the loader.
    #[error("Script not found: {0}")]
    ScriptNotFound(String),

    /// Reading a script resource failed.
    #[error("Failed to load script {script}: {source}")]
    Load {
        /// Script identifier as passed by the host.
        script: String,
        #[source]
        source: std::io::Error,
    },

    /// The script did not parse.
    #[error("Failed to compile script {script}: {message}")]
    Compile {
        /// Script identifier as passed by the host.
        script: String,
        /// Compiler diagnostic.
        message: String,
    },

    /// The script raised an error while running.
    #[error("Script {script} failed: {message}")]
    Eval {
        /// Script identifier as passed by the host.
        script: String,
        /// Evaluation diagnostic.
        message: String,
    },

    /// A dynamically scoped primitive was used with no scope active on the
    /// calling thread.
    #[error("{0} is only available while a verticle is starting")]
    NoActiveScope(String),

    /// The factory was used before a successful `init`.
    #[error("Verticle factory is not initialized")]
    NotInitialized,

    /// The factory or runtime was already closed.
    #[error("Verticle factory is closed")]
    Closed,

    /// Background workers were shut down; no new jobs are accepted.
    #[error("Agent pool has been shut down")]
    AgentsShutDown,

    /// Invalid language-module configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The operation is not supported by this implementation.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// A lifecycle operation was called out of order.
    #[error("Invalid verticle state: expected {expected}, got {actual}")]
    InvalidState {
        /// The state(s) that were expected.
        expected: String,
        /// The state the unit was actually in.
        actual: String,
    },
}

/// Convenience result alias using [`error_stack::Report`].
pub type LangResult<T> = Result<T, error_stack::Report<LangError>>;

/// The one error kind the host recognizes.
///
/// Every failure surfaced through [`VerticleFactory`](crate::verticle::VerticleFactory)
/// or [`Verticle`](crate::verticle::Verticle) is converted into this type;
/// the original error stays reachable through `source()`.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct VerticleException {
    message: String,
    #[source]
    cause: Option<BoxError>,
}

impl VerticleException {
    /// Exception without an underlying cause.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: None,
        }
    }

    /// Exception wrapping `cause`.
    pub fn with_cause(message: impl Into<String>, cause: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            cause: Some(cause.into()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The wrapped cause, if any.
    pub fn cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    /// Returns the wrapped [`LangError`] when this exception came from a
    /// language module.
    pub fn lang_error(&self) -> Option<&LangError> {
        self.cause.as_deref().and_then(|e| e.downcast_ref::<LangError>())
    }
}

impl From<LangError> for VerticleException {
    fn from(err: LangError) -> Self {
        Self::with_cause(err.to_string(), err)
    }
}
