//! Language module configuration
//!
//! [`LangConfig`] can be built in code, read from a file (YAML, TOML or
//! JSON, detected from the extension) with `VERTICLE__*` environment
//! overrides, or taken from the `"lang"` section of a container's
//! deployment configuration.
//!
//! ```yaml
//! namespace: vertx
//! agent_threads: 2
//! limits:
//!   max_operations: 1000000
//! ```

use config::{Config as Cfg, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;


/// Environment variable prefix for overrides, e.g. `VERTICLE__AGENT_THREADS=8`.
pub const ENV_PREFIX: &str = "VERTICLE";

/// Key of the language section inside a container configuration.
pub const CONTAINER_SECTION: &str = "lang";

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parsing error: {0}")]
    Parse(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Interpreter resource limits. `0` disables a limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineLimits {
    pub max_operations: u64,
    pub max_call_levels: usize,
    pub max_string_size: usize,
    pub max_array_size: usize,
}

impl Default for EngineLimits {
    fn default() -> Self {
        Self {
            max_operations: 0,
            max_call_levels: 64,
            max_string_size: 0,
            max_array_size: 0,
        }
    }
}

/// Configuration of a language module instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LangConfig {
    /// Guest namespace holding the host bindings and lifecycle primitives.
    pub namespace: String,
    /// Resource directory whose entries widen the host loader at init.
    pub runtime_dir: String,
    /// Extension appended to imported module names that have none.
    pub script_extension: String,
    /// Worker threads of the interpreter's background agent pool.
    pub agent_threads: usize,
    /// How long `close` waits for running agent jobs.
    pub shutdown_grace_ms: u64,
    pub limits: EngineLimits,
}

impl Default for LangConfig {
    fn default() -> Self {
        Self {
            namespace: "vertx".to_string(),
            runtime_dir: "___runtime___".to_string(),
            script_extension: "rhai".to_string(),
            agent_threads: 4,
            shutdown_grace_ms: 5_000,
            limits: EngineLimits::default(),
        }
    }
}

impl LangConfig {
    /// Read a config file, then apply `VERTICLE__*` environment overrides.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        Self::load_with_env(path.as_ref(), None)
    }

    pub(crate) fn load_with_env(
        path: &Path,
        env: Option<HashMap<String, String>>,
    ) -> ConfigResult<Self> {
        let format = detect_format(path)?;
        let content = std::fs::read_to_string(path)?;

        let config: Self = Cfg::builder()
            .add_source(File::from_str(&content, format))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()
            .map_err(|e| ConfigError::Parse(e.to_string()))?
            .try_deserialize()
            .map_err(|e| ConfigError::Parse(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Parse from an already decoded JSON value.
    pub fn from_value(value: &serde_json::Value) -> ConfigResult<Self> {
        let config: Self =
            serde_json::from_value(value.clone()).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// The `"lang"` section of a container configuration, if present.
    pub fn from_container_config(value: &serde_json::Value) -> ConfigResult<Option<Self>> {
        match value.get(CONTAINER_SECTION) {
            Some(section) if section.is_object() => Self::from_value(section).map(Some),
            Some(_) => Err(ConfigError::Invalid {
                field: CONTAINER_SECTION,
                reason: "expected an object".to_string(),
            }),
            None => Ok(None),
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if !is_identifier(&self.namespace) {
            return Err(ConfigError::Invalid {
                field: "namespace",
                reason: format!("{:?} is not an identifier", self.namespace),
            });
        }
        if self.agent_threads == 0 {
            return Err(ConfigError::Invalid {
                field: "agent_threads",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.script_extension.starts_with('.') || self.script_extension.is_empty() {
            return Err(ConfigError::Invalid {
                field: "script_extension",
                reason: "expected a bare extension such as \"rhai\"".to_string(),
            });
        }
        if self.runtime_dir.is_empty() {
            return Err(ConfigError::Invalid {
                field: "runtime_dir",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.namespace = namespace.to_string();
        self
    }

    pub fn with_agent_threads(mut self, threads: usize) -> Self {
        self.agent_threads = threads;
        self
    }

    pub fn with_limits(mut self, limits: EngineLimits) -> Self {
        self.limits = limits;
        self
    }
}

/// Detect configuration format from file extension.
pub fn detect_format(path: &Path) -> ConfigResult<FileFormat> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| ConfigError::UnsupportedFormat("No file extension found".to_string()))?;

    match ext.to_lowercase().as_str() {
        "yaml" | "yml" => Ok(FileFormat::Yaml),
        "toml" => Ok(FileFormat::Toml),
        "json" => Ok(FileFormat::Json),
        _ => Err(ConfigError::UnsupportedFormat(ext.to_string())),
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
