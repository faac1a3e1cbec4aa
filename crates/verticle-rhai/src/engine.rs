//! Engine construction.
//!
//! One [`Engine`] per runtime, shared by every verticle started on it. The
//! guest-facing surface is registered here:
//!
//! ```rhai
//! let core = vertx::core();            // host core handle
//! let conf = vertx::container().config();
//!
//! core.publish("news", #{ headline: "started" });
//!
//! vertx::on_stop(|| core.publish("news", "stopping"));
//! vertx::submit(|| log("off the host thread"));
//! ```

use crate::frame::current_frame;
use crate::resolver::{LoaderModuleResolver, LoaderRoot};
use rhai::{Dynamic, Engine, EvalAltResult, FnPtr, Map, Module};
use std::sync::{Arc, OnceLock};
use tracing::{debug, error, info, warn};
use verticle_kernel::{ContainerHandle, CoreHandle, EngineLimits, LangConfig, register_stop_hook};

/// Version of the guest-facing namespace, exposed as `<ns>::API_VERSION`.
pub const API_VERSION: i64 = 1;

const SCRIPT_TARGET: &str = "verticle::script";

/// Host handles published into the guest namespace.
#[derive(Debug, Clone)]
pub struct HostBindings {
    pub core: CoreHandle,
    pub container: ContainerHandle,
}

type RhaiResult<T> = Result<T, Box<EvalAltResult>>;

// ============================================================================
// Engine assembly
// ============================================================================

pub(crate) fn build_engine(
    config: &LangConfig,
    bindings: Arc<OnceLock<HostBindings>>,
    loader: LoaderRoot,
) -> Engine {
    let mut engine = Engine::new();

    apply_limits(&mut engine, &config.limits);
    register_logging(&mut engine);
    register_host_types(&mut engine);

    engine.set_module_resolver(LoaderModuleResolver::new(loader, &config.script_extension));
    engine.register_static_module(
        config.namespace.as_str(),
        Arc::new(namespace_module(&config.namespace, bindings)),
    );
    engine
}

fn apply_limits(engine: &mut Engine, limits: &EngineLimits) {
    if limits.max_operations > 0 {
        engine.set_max_operations(limits.max_operations);
    }
    if limits.max_call_levels > 0 {
        engine.set_max_call_levels(limits.max_call_levels);
    }
    if limits.max_string_size > 0 {
        engine.set_max_string_size(limits.max_string_size);
    }
    if limits.max_array_size > 0 {
        engine.set_max_array_size(limits.max_array_size);
    }
}

// ============================================================================
// Logging
// ============================================================================

fn register_logging(engine: &mut Engine) {
    engine.on_print(|msg| info!(target: SCRIPT_TARGET, "{}", msg));
    engine.on_debug(|msg, source, pos| {
        debug!(target: SCRIPT_TARGET, source = source.unwrap_or("<eval>"), %pos, "{}", msg)
    });

    engine.register_fn("log", |msg: &str| info!(target: SCRIPT_TARGET, "{}", msg));
    engine.register_fn("warn", |msg: &str| warn!(target: SCRIPT_TARGET, "{}", msg));
    engine.register_fn("error", |msg: &str| error!(target: SCRIPT_TARGET, "{}", msg));
}

// ============================================================================
// Host handle types
// ============================================================================

fn to_json(value: &Dynamic) -> RhaiResult<serde_json::Value> {
    rhai::serde::from_dynamic(value)
}

fn register_host_types(engine: &mut Engine) {
    engine.register_type_with_name::<CoreHandle>("Core");
    engine.register_fn(
        "publish",
        |core: &mut CoreHandle, address: &str, body: Dynamic| -> RhaiResult<()> {
            core.publish(address, to_json(&body)?);
            Ok(())
        },
    );
    engine.register_fn(
        "send",
        |core: &mut CoreHandle, address: &str, body: Dynamic| -> RhaiResult<()> {
            core.send(address, to_json(&body)?);
            Ok(())
        },
    );

    engine.register_type_with_name::<ContainerHandle>("Container");
    engine.register_fn("config", |container: &mut ContainerHandle| -> RhaiResult<Dynamic> {
        rhai::serde::to_dynamic(container.config())
    });
    engine.register_fn("env", |container: &mut ContainerHandle| -> Map {
        container
            .env()
            .into_iter()
            .map(|(k, v)| (k.into(), Dynamic::from(v)))
            .collect()
    });
    engine.register_fn("env", |container: &mut ContainerHandle, key: &str| -> Dynamic {
        container
            .env()
            .remove(key)
            .map(Dynamic::from)
            .unwrap_or(Dynamic::UNIT)
    });
    engine.register_fn("exit", |container: &mut ContainerHandle| container.exit());
}

// ============================================================================
// Guest namespace
// ============================================================================

fn unbound(namespace: &str, name: &str) -> Box<EvalAltResult> {
    format!("{namespace}::{name} is not bound yet").into()
}

fn namespace_module(namespace: &str, bindings: Arc<OnceLock<HostBindings>>) -> Module {
    let mut module = Module::new();
    module.set_var("API_VERSION", API_VERSION);

    let (ns, slot) = (namespace.to_string(), bindings.clone());
    module.set_native_fn("core", move || -> RhaiResult<CoreHandle> {
        slot.get()
            .map(|b| b.core.clone())
            .ok_or_else(|| unbound(&ns, "core"))
    });

    let (ns, slot) = (namespace.to_string(), bindings);
    module.set_native_fn("container", move || -> RhaiResult<ContainerHandle> {
        slot.get()
            .map(|b| b.container.clone())
            .ok_or_else(|| unbound(&ns, "container"))
    });

    let ns = namespace.to_string();
    module.set_native_fn("on_stop", move |f: FnPtr| -> RhaiResult<()> {
        let frame = current_frame().ok_or_else(|| {
            format!("{ns}::on_stop is only available while a verticle is starting")
        })?;
        register_stop_hook(frame.stop_hook(f))
            .map_err(|e| format!("{ns}::on_stop: {e}").into())
    });

    let ns = namespace.to_string();
    // `spawn` is a reserved word in Rhai
    module.set_native_fn("submit", move |f: FnPtr| -> RhaiResult<()> {
        let frame = current_frame().ok_or_else(|| {
            format!("{ns}::submit is only available to verticle code")
        })?;
        let runtime = frame.runtime.clone();
        runtime
            .agents()
            .submit(move || {
                if let Err(e) = frame.call(&f) {
                    warn!(verticle = %frame.verticle_id, error = %e, "Agent job failed");
                }
            })
            .map_err(|e| format!("{ns}::submit: {e}").into())
    });

    module
}
