//! Verticle start/stop behaviour on a shared runtime.

use serde_json::{Value, json};
use std::sync::{Arc, Barrier};
use std::time::Duration;
use verticle_kernel::{LangConfig, LangError, ResourceLoader, Verticle, VerticleFactory};
use verticle_rhai::{RhaiVerticleFactory, RuntimeRegistry};
use verticle_testing::{
    MemoryResourceLoader, RecordingCore, RecordingLogger, StaticContainer, assert_published,
};

const WAIT: Duration = Duration::from_secs(5);

fn ready_factory(loader: Arc<dyn ResourceLoader>) -> (RhaiVerticleFactory, Arc<RecordingCore>) {
    let core = RecordingCore::new();
    let container = StaticContainer::new(json!({ "greeting": "hi" }));
    let mut factory = RhaiVerticleFactory::new(LangConfig::default().with_agent_threads(2))
        .with_registry(Arc::new(RuntimeRegistry::new()));
    factory.init(core.handle(), container.handle(), loader);
    (factory, core)
}

fn counter_script(address: &str) -> String {
    format!(
        r#"
            let core = vertx::core();
            let work = 0;
            for i in 0..200 {{ work += i; }}
            vertx::on_stop(|| core.publish("{address}", work));
        "#
    )
}

#[test]
fn concurrent_starts_keep_hooks_isolated() {
    let loader = MemoryResourceLoader::new()
        .with("a.rhai", &counter_script("counterA"))
        .with("b.rhai", &counter_script("counterB"));
    let (factory, core) = ready_factory(loader.shared());

    for _ in 0..20 {
        let a = factory.create_verticle("a.rhai").unwrap();
        let b = factory.create_verticle("b.rhai").unwrap();
        let barrier = Barrier::new(2);

        let (mut a, mut b) = std::thread::scope(|s| {
            let start = |mut v: Box<dyn Verticle>| {
                let barrier = &barrier;
                s.spawn(move || {
                    barrier.wait();
                    v.start().unwrap();
                    v
                })
            };
            let a = start(a);
            let b = start(b);
            (a.join().unwrap(), b.join().unwrap())
        });

        a.stop();
        b.stop();
    }

    assert_published!(core, "counterA", 20);
    assert_published!(core, "counterB", 20);
    assert_eq!(core.messages().len(), 40);
}

#[test]
fn hooks_run_in_registration_order_exactly_once() {
    let loader = MemoryResourceLoader::new().with(
        "ordered.rhai",
        r#"
            let core = vertx::core();
            vertx::on_stop(|| core.publish("one", ()));
            vertx::on_stop(|| core.publish("two", ()));
            vertx::on_stop(|| core.publish("three", ()));
        "#,
    );
    let (factory, core) = ready_factory(loader.shared());

    let mut verticle = factory.create_verticle("ordered.rhai").unwrap();
    verticle.start().unwrap();
    verticle.stop();
    verticle.stop();

    assert_eq!(core.addresses(), ["one", "two", "three"]);
}

#[test]
fn failing_hook_does_not_stop_siblings() {
    let loader = MemoryResourceLoader::new().with(
        "partial.rhai",
        r#"
            let core = vertx::core();
            vertx::on_stop(|| core.publish("first", ()));
            vertx::on_stop(|| throw "resource already closed");
            vertx::on_stop(|| core.publish("third", ()));
        "#,
    );
    let (factory, core) = ready_factory(loader.shared());

    let mut verticle = factory.create_verticle("partial.rhai").unwrap();
    verticle.start().unwrap();
    verticle.stop();

    assert_published!(core, "first", 1);
    assert_published!(core, "third", 1);
}

#[test]
fn stop_without_hooks_is_noop() {
    let loader = MemoryResourceLoader::new().with("quiet.rhai", "let x = 40 + 2;");
    let (factory, core) = ready_factory(loader.shared());

    let mut verticle = factory.create_verticle("quiet.rhai").unwrap();
    verticle.start().unwrap();
    verticle.stop();
    assert!(core.messages().is_empty());
}

#[test]
fn failed_start_is_wrapped_and_registers_nothing() {
    let loader = MemoryResourceLoader::new().with(
        "broken.rhai",
        r#"
            let core = vertx::core();
            vertx::on_stop(|| core.publish("leaked", ()));
            let x = 1 / 0;
        "#,
    );
    let (factory, core) = ready_factory(loader.shared());

    let mut verticle = factory.create_verticle("broken.rhai").unwrap();
    let err = verticle.start().unwrap_err();
    assert!(err.message().contains("broken.rhai"));
    assert!(matches!(err.lang_error(), Some(LangError::Eval { .. })));

    let logger = RecordingLogger::default();
    factory.report_exception(&logger, &err);
    assert_eq!(logger.lines().len(), 1);
    assert!(logger.lines()[0].1.contains("broken.rhai"));

    verticle.stop();
    assert_published!(core, "leaked", 0);
}

#[test]
fn scripts_see_identity_and_container() {
    let loader = MemoryResourceLoader::new().with(
        "whoami.rhai",
        r#"
            let core = vertx::core();
            core.send("id", VERTICLE_ID);
            core.send("script", SCRIPT);
            core.send("greeting", vertx::container().config().greeting);
            core.send("api", vertx::API_VERSION);
        "#,
    );
    let (factory, core) = ready_factory(loader.shared());

    let mut verticle = factory.create_verticle("whoami.rhai").unwrap();
    verticle.start().unwrap();

    assert_eq!(core.bodies("id"), [Value::from(verticle.id().to_string())]);
    assert_eq!(core.bodies("script"), [json!("whoami.rhai")]);
    assert_eq!(core.bodies("greeting"), [json!("hi")]);
    assert_eq!(core.bodies("api"), [json!(verticle_rhai::API_VERSION)]);
}

#[test]
fn imports_resolve_through_host_loader() {
    let loader = MemoryResourceLoader::new()
        .with("lib/greet.rhai", r#"fn greet(name) { "hello " + name }"#)
        .with(
            "main.rhai",
            r#"
                import "lib/greet" as g;
                vertx::core().publish("greeting", g::greet("world"));
            "#,
        );
    let (factory, core) = ready_factory(loader.shared());

    let mut verticle = factory.create_verticle("main.rhai").unwrap();
    verticle.start().unwrap();
    assert_eq!(core.bodies("greeting"), [json!("hello world")]);
}

#[test]
fn submitted_jobs_run_off_the_starting_thread() {
    let loader = MemoryResourceLoader::new().with(
        "agent.rhai",
        r#"
            let core = vertx::core();
            let origin = SCRIPT;
            vertx::submit(|| core.publish("agent", origin));
        "#,
    );
    let (factory, core) = ready_factory(loader.shared());

    let mut verticle = factory.create_verticle("agent.rhai").unwrap();
    verticle.start().unwrap();
    assert!(core.wait_for("agent", 1, WAIT));
    assert_eq!(core.bodies("agent"), [json!("agent.rhai")]);
}

#[test]
fn agent_jobs_cannot_register_stop_hooks() {
    let loader = MemoryResourceLoader::new().with(
        "sneaky.rhai",
        r#"
            let core = vertx::core();
            vertx::submit(|| {
                try {
                    vertx::on_stop(|| core.publish("late", ()));
                    core.publish("registered", ());
                } catch (err) {
                    core.publish("rejected", ());
                }
            });
        "#,
    );
    let (factory, core) = ready_factory(loader.shared());

    let mut verticle = factory.create_verticle("sneaky.rhai").unwrap();
    verticle.start().unwrap();
    assert!(core.wait_for("rejected", 1, WAIT));
    verticle.stop();

    assert_published!(core, "registered", 0);
    assert_published!(core, "late", 0);
}

#[test]
fn stop_hooks_can_submit_agent_jobs() {
    let loader = MemoryResourceLoader::new().with(
        "handoff.rhai",
        r#"
            let core = vertx::core();
            vertx::on_stop(|| vertx::submit(|| core.publish("flushed", ())));
        "#,
    );
    let (factory, core) = ready_factory(loader.shared());

    let mut verticle = factory.create_verticle("handoff.rhai").unwrap();
    verticle.start().unwrap();
    verticle.stop();
    assert!(core.wait_for("flushed", 1, WAIT));
}
