//! Verticle Testing Framework
//!
//! Mock host collaborators for driving a language module without an
//! application server: a core that records every message, a container with
//! fixed configuration, an in-memory resource loader and a logger that keeps
//! what it was told.

pub mod host;
pub mod loader;

pub use host::{Message, MessageKind, RecordingCore, RecordingLogger, StaticContainer};
pub use loader::MemoryResourceLoader;

/// Assert how many messages were delivered to an address.
#[macro_export]
macro_rules! assert_published {
    ($core:expr, $address:expr, $expected_count:expr) => {
        let count = $core.count($address);
        assert_eq!(
            count, $expected_count,
            "Expected {} message(s) on '{}', got {}",
            $expected_count, $address, count
        );
    };
}
