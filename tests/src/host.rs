use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use verticle_kernel::{ContainerHandle, CoreHandle, HostContainer, HostCore, HostLogger};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Publish,
    Send,
}

/// One message a script handed to the core.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub kind: MessageKind,
    pub address: String,
    pub body: Value,
}

/// A core that records messages instead of delivering them.
#[derive(Debug, Default)]
pub struct RecordingCore {
    messages: Mutex<Vec<Message>>,
}

impl RecordingCore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn handle(self: &Arc<Self>) -> CoreHandle {
        CoreHandle::new(self.clone())
    }

    pub fn messages(&self) -> Vec<Message> {
        self.messages.lock().clone()
    }

    /// Addresses in delivery order.
    pub fn addresses(&self) -> Vec<String> {
        self.messages.lock().iter().map(|m| m.address.clone()).collect()
    }

    pub fn count(&self, address: &str) -> usize {
        self.messages
            .lock()
            .iter()
            .filter(|m| m.address == address)
            .count()
    }

    /// Bodies delivered to `address`, oldest first.
    pub fn bodies(&self, address: &str) -> Vec<Value> {
        self.messages
            .lock()
            .iter()
            .filter(|m| m.address == address)
            .map(|m| m.body.clone())
            .collect()
    }

    /// Poll until `address` received at least `count` messages.
    pub fn wait_for(&self, address: &str, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.count(address) >= count {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    fn record(&self, kind: MessageKind, address: &str, body: Value) {
        self.messages.lock().push(Message {
            kind,
            address: address.to_string(),
            body,
        });
    }
}

impl HostCore for RecordingCore {
    fn publish(&self, address: &str, body: Value) {
        self.record(MessageKind::Publish, address, body);
    }

    fn send(&self, address: &str, body: Value) {
        self.record(MessageKind::Send, address, body);
    }
}

/// A container with fixed configuration and environment.
#[derive(Debug, Default)]
pub struct StaticContainer {
    config: Value,
    env: HashMap<String, String>,
    exits: AtomicUsize,
}

impl StaticContainer {
    pub fn new(config: Value) -> Arc<Self> {
        Arc::new(Self {
            config,
            ..Self::default()
        })
    }

    pub fn with_env<I, K, V>(config: Value, env: I) -> Arc<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Arc::new(Self {
            config,
            env: env.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            exits: AtomicUsize::new(0),
        })
    }

    pub fn handle(self: &Arc<Self>) -> ContainerHandle {
        ContainerHandle::new(self.clone())
    }

    /// How many times a script called `exit()`.
    pub fn exit_count(&self) -> usize {
        self.exits.load(Ordering::SeqCst)
    }
}

impl HostContainer for StaticContainer {
    fn config(&self) -> Value {
        self.config.clone()
    }

    fn env(&self) -> HashMap<String, String> {
        self.env.clone()
    }

    fn exit(&self) {
        self.exits.fetch_add(1, Ordering::SeqCst);
    }
}

/// Host logger keeping `(message, cause)` pairs.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    lines: Mutex<Vec<(String, String)>>,
}

impl RecordingLogger {
    pub fn lines(&self) -> Vec<(String, String)> {
        self.lines.lock().clone()
    }
}

impl HostLogger for RecordingLogger {
    fn error(&self, message: &str, cause: &(dyn std::error::Error + 'static)) {
        let mut chain = cause.to_string();
        let mut source = cause.source();
        while let Some(inner) = source {
            chain.push_str(": ");
            chain.push_str(&inner.to_string());
            source = inner.source();
        }
        self.lines.lock().push((message.to_string(), chain));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_records_in_order() {
        let core = RecordingCore::new();
        core.handle().publish("a", Value::Null);
        core.handle().send("b", serde_json::json!(1));

        assert_eq!(core.addresses(), ["a", "b"]);
        assert_eq!(core.messages()[1].kind, MessageKind::Send);
        crate::assert_published!(core, "a", 1);
    }

    #[test]
    fn wait_for_times_out() {
        let core = RecordingCore::new();
        assert!(!core.wait_for("never", 1, Duration::from_millis(20)));
    }
}
