//! Host collaborators.
//!
//! The host hands a language module two service handles at `init`: a core
//! handle (event bus / scheduling) and a container handle (configuration,
//! environment, process control). Both are opaque to the language module;
//! it only publishes them into the guest namespace.

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Core event/scheduling services of the host.
pub trait HostCore: Send + Sync {
    /// Publish `body` to every handler registered at `address`.
    fn publish(&self, address: &str, body: Value);

    /// Deliver `body` to one handler registered at `address`.
    fn send(&self, address: &str, body: Value);
}

/// Container/configuration services of the host.
pub trait HostContainer: Send + Sync {
    /// Deployment configuration.
    fn config(&self) -> Value;

    /// Process environment visible to verticles.
    fn env(&self) -> HashMap<String, String>;

    /// Ask the host to shut down.
    fn exit(&self);
}

/// Shared handle to the host core.
#[derive(Clone)]
pub struct CoreHandle(Arc<dyn HostCore>);

impl CoreHandle {
    pub fn new(core: Arc<dyn HostCore>) -> Self {
        Self(core)
    }

    /// Whether both handles point at the same host object.
    pub fn same_as(&self, other: &CoreHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn publish(&self, address: &str, body: Value) {
        self.0.publish(address, body)
    }

    pub fn send(&self, address: &str, body: Value) {
        self.0.send(address, body)
    }
}

impl fmt::Debug for CoreHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CoreHandle")
            .field(&Arc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}

/// Shared handle to the host container.
#[derive(Clone)]
pub struct ContainerHandle(Arc<dyn HostContainer>);

impl ContainerHandle {
    pub fn new(container: Arc<dyn HostContainer>) -> Self {
        Self(container)
    }

    pub fn same_as(&self, other: &ContainerHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn config(&self) -> Value {
        self.0.config()
    }

    pub fn env(&self) -> HashMap<String, String> {
        self.0.env()
    }

    pub fn exit(&self) {
        self.0.exit()
    }
}

impl fmt::Debug for ContainerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ContainerHandle")
            .field(&Arc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}

/// The host's logger, as passed to `report_exception`.
pub trait HostLogger: Send + Sync {
    fn error(&self, message: &str, cause: &(dyn std::error::Error + 'static));
}

/// [`HostLogger`] that writes to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl HostLogger for TracingLogger {
    fn error(&self, message: &str, cause: &(dyn std::error::Error + 'static)) {
        let mut chain = cause.to_string();
        let mut next = cause.source();
        while let Some(inner) = next {
            chain.push_str(": ");
            chain.push_str(&inner.to_string());
            next = inner.source();
        }
        tracing::error!(error = %chain, "{}", message);
    }
}
