//! Development host collaborators.
//!
//! A real application server routes `publish`/`send` over its event bus;
//! here messages are only logged so scripts can be exercised locally.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;
use verticle_kernel::{HostContainer, HostCore};

const BUS_TARGET: &str = "verticle::bus";

#[derive(Debug, Default)]
pub struct LoggingCore;

impl HostCore for LoggingCore {
    fn publish(&self, address: &str, body: Value) {
        info!(target: BUS_TARGET, address, %body, "publish");
    }

    fn send(&self, address: &str, body: Value) {
        info!(target: BUS_TARGET, address, %body, "send");
    }
}

/// Container exposing a fixed configuration and the process environment.
#[derive(Debug)]
pub struct JsonContainer {
    config: Value,
    exit_requested: AtomicBool,
}

impl JsonContainer {
    pub fn new(config: Value) -> Self {
        Self {
            config,
            exit_requested: AtomicBool::new(false),
        }
    }

    /// Whether a script asked the host to shut down.
    pub fn exit_requested(&self) -> bool {
        self.exit_requested.load(Ordering::SeqCst)
    }
}

impl HostContainer for JsonContainer {
    fn config(&self) -> Value {
        self.config.clone()
    }

    fn env(&self) -> HashMap<String, String> {
        std::env::vars().collect()
    }

    fn exit(&self) {
        info!("Exit requested by script");
        self.exit_requested.store(true, Ordering::SeqCst);
    }
}
