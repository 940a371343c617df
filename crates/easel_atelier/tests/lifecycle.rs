//! Lifecycle scenarios driven through the runtime.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use easel_atelier::{
    ComponentHooks, ConfigurationError, EaselConfig, Error, Extension, Extensions, HookError,
    InitContext, LifecycleState, MemoryFetcher, Runtime, StaticScripts, ATTRIBUTE_CHANGED_EVENT,
    CONNECTED_EVENT, DISCONNECTED_EVENT,
};
use easel_relief::{Element, Event, Listener, Namespace};
use serde_json::{json, Value};
use tokio::task::LocalSet;

const CARD: &str = r#"
<property name="title" attribute required/>
<property name="count" type="number" default="0" expose-to-styles/>
<template>
  <h1 id="heading">{{ title }}</h1>
  <p>Count: {{count}}</p>
</template>
<script>export default function (args) {}</script>
<style>h1 { margin: 0; }</style>
"#;

const GREETING: &str = r#"<property name="name"/><template><p>Hello {{name}}!</p></template>"#;

type Log = Rc<RefCell<Vec<String>>>;

struct Recorder {
    name: &'static str,
    log: Log,
}

impl ComponentHooks for Recorder {
    fn on_init(&self, ctx: &InitContext<'_>) -> Result<(), HookError> {
        // Bindings and properties are already live
        let title = ctx.args.rx("title").get();
        self.log
            .borrow_mut()
            .push(format!("{}:init:{}", self.name, easel_croquis::render_value(&title)));
        Ok(())
    }

    fn on_cleanup(&self, _ctx: &InitContext<'_>) -> Result<(), HookError> {
        self.log.borrow_mut().push(format!("{}:cleanup", self.name));
        Ok(())
    }
}

struct Failing;

impl ComponentHooks for Failing {
    fn on_init(&self, _ctx: &InitContext<'_>) -> Result<(), HookError> {
        Err(HookError::new("init exploded"))
    }
}

fn host(tag: &str, attributes: &[(&str, &str)]) -> Element {
    let host = Element::new(tag, Namespace::Html);
    for (name, value) in attributes {
        host.set_attribute(name, value);
    }
    host
}

fn runtime_with(
    documents: &[(&str, &str)],
    extensions: Extensions,
    scripts: StaticScripts,
    config: EaselConfig,
) -> Runtime {
    let fetcher = MemoryFetcher::new();
    for (url, content) in documents {
        fetcher.insert(*url, *content);
    }
    Runtime::new(config, extensions, Rc::new(fetcher), Rc::new(scripts))
}

fn recording_extensions(log: &Log) -> Extensions {
    let extensions = Extensions::new();
    for name in ["first", "second"] {
        extensions.add(Extension::new(name).with_component_hooks(Recorder {
            name,
            log: log.clone(),
        }));
    }
    extensions
}

#[tokio::test]
async fn test_required_attribute_fails_before_hooks() {
    let log: Log = Rc::default();
    let runtime = runtime_with(
        &[("/card.html", CARD)],
        recording_extensions(&log),
        StaticScripts::new(),
        EaselConfig::default(),
    );
    runtime.load_component("x-card", "/card.html").await.unwrap();

    let err = runtime.construct("x-card", host("x-card", &[])).unwrap_err();
    assert!(matches!(
        err,
        Error::Configuration(ConfigurationError::MissingRequiredAttribute { ref property, .. })
            if property == "title"
    ));
    assert!(log.borrow().is_empty());
}

#[tokio::test]
async fn test_init_hooks_run_once_in_order() {
    let local = LocalSet::new();
    local
        .run_until(async {
            let log: Log = Rc::default();
            let runtime = runtime_with(
                &[("/card.html", CARD)],
                recording_extensions(&log),
                StaticScripts::new().with("x-card", |_| {}),
                EaselConfig::default(),
            );
            runtime.load_component("x-card", "/card.html").await.unwrap();

            let instance = runtime
                .construct("x-card", host("x-card", &[("title", "Hi")]))
                .unwrap();
            assert_eq!(instance.state(), LifecycleState::Constructed);
            instance.connect();
            instance.connect();
            instance.settled().await;

            assert_eq!(*log.borrow(), vec!["first:init:Hi", "second:init:Hi"]);
            assert_eq!(instance.state(), LifecycleState::Connected);
        })
        .await;
}

#[tokio::test]
async fn test_materialized_surface() {
    let runtime = runtime_with(
        &[("/card.html", CARD)],
        Extensions::new(),
        StaticScripts::new(),
        EaselConfig::default(),
    );
    runtime.load_component("x-card", "/card.html").await.unwrap();
    let host = host("x-card", &[("title", "Hi")]);
    let instance = runtime.construct("x-card", host.clone()).unwrap();

    let local = LocalSet::new();
    local
        .run_until(async {
            instance.connect();
            instance.settled().await;
        })
        .await;

    insta::assert_snapshot!(
        host.outer_html(),
        @r#"<x-card title="Hi"><template shadowrootmode="open"><style>h1 { margin: 0; }</style><style>:host { --count: 0; }</style><h1 id="heading">Hi</h1><p>Count: 0</p></template></x-card>"#
    );

    instance.args().set_property("count", json!(3));
    insta::assert_snapshot!(
        instance.root().children()[1].outer_html(),
        @"<style>:host { --count: 3; }</style>"
    );
    assert_eq!(instance.args().el("heading").unwrap().text_content(), "Hi");
}

#[tokio::test]
async fn test_binding_round_trip_through_rx() {
    let runtime = runtime_with(
        &[("/greeting.html", GREETING)],
        Extensions::new(),
        StaticScripts::new(),
        EaselConfig::default(),
    );
    runtime.load_component("x-greeting", "/greeting.html").await.unwrap();
    let instance = runtime.construct("x-greeting", host("x-greeting", &[])).unwrap();
    instance.connect();

    let p = instance.root().children()[0].clone();
    assert_eq!(p.text_content(), "Hello !");

    instance.args().rx("name").set(json!("World"));
    assert_eq!(p.text_content(), "Hello World!");

    // Writing the property drives the same text
    instance.args().set_property("name", json!("Ada"));
    assert_eq!(p.text_content(), "Hello Ada!");
}

#[tokio::test]
async fn test_instances_do_not_share_elements() {
    let runtime = runtime_with(
        &[("/greeting.html", GREETING)],
        Extensions::new(),
        StaticScripts::new(),
        EaselConfig::default(),
    );
    runtime.load_component("x-greeting", "/greeting.html").await.unwrap();
    let a = runtime.construct("x-greeting", host("x-greeting", &[])).unwrap();
    let b = runtime.construct("x-greeting", host("x-greeting", &[])).unwrap();
    a.connect();
    b.connect();

    a.args().rx("name").set(json!("A"));
    b.args().rx("name").set(json!("B"));
    assert_eq!(a.root().text_content(), "Hello A!");
    assert_eq!(b.root().text_content(), "Hello B!");
    assert_ne!(a.id(), b.id());
}

#[tokio::test]
async fn test_disconnect_and_reconnect() {
    let listener_log: Log = Rc::default();
    let scripts = StaticScripts::new();
    let sink = listener_log.clone();
    scripts.register("x-card", move |args| {
        let log = sink.clone();
        let listener: Listener = Rc::new(move |event: &Event| {
            log.borrow_mut().push(event.name.to_string());
        });
        args.listen("ping", listener.clone());
        args.listen(DISCONNECTED_EVENT, listener);
    });

    let log: Log = Rc::default();
    let runtime = runtime_with(
        &[("/card.html", CARD)],
        recording_extensions(&log),
        scripts,
        EaselConfig::default(),
    );
    runtime.load_component("x-card", "/card.html").await.unwrap();
    let host = host("x-card", &[("title", "Hi")]);
    let instance = runtime.construct("x-card", host.clone()).unwrap();
    let root = instance.root().clone();

    let local = LocalSet::new();
    local
        .run_until(async {
            instance.connect();
            instance.settled().await;
            assert_eq!(root.listener_count(), 2);
            assert_eq!(instance.tracked_listener_count(), 2);

            instance.args().set_property("count", json!(9));
            let count_rx = instance.rx_value("count").unwrap();
            let subscribers = count_rx.subscriber_count();

            instance.disconnect();
            assert_eq!(instance.state(), LifecycleState::Disconnected);
            assert_eq!(root.listener_count(), 0);
            assert_eq!(instance.tracked_listener_count(), 0);
            assert!(instance.properties().iter().all(|c| c.watcher_count() == 0));
            assert!(count_rx.subscriber_count() < subscribers);
            // Removed before `disconnected` fired
            assert!(listener_log.borrow().is_empty());

            // Writes while disconnected do not reach the bindings
            instance.args().set_property("count", json!(10));
            assert!(root.text_content().contains("Count: 9"));

            instance.connect();
            instance.settled().await;
            assert_eq!(root.listener_count(), 2);
            // Not reset to the default
            assert_eq!(instance.args().property("count"), Some(json!(10)));
            assert_eq!(instance.args().property("title"), Some(json!("Hi")));
            assert!(root.text_content().contains("Count: 10"));
            // Not re-materialized
            assert_eq!(root.children().len(), 4);

            root.dispatch_event(&Event::new("ping"));
            assert_eq!(*listener_log.borrow(), vec!["ping"]);
        })
        .await;

    assert_eq!(
        *log.borrow(),
        vec![
            "first:init:Hi",
            "second:init:Hi",
            "first:cleanup",
            "second:cleanup",
            "first:init:Hi",
            "second:init:Hi",
        ]
    );
}

#[tokio::test]
async fn test_behavior_runs_after_connect() {
    let order: Log = Rc::default();
    let scripts = StaticScripts::new();
    let sink = order.clone();
    scripts.register("x-card", move |args| {
        sink.borrow_mut().push("behavior".into());
        assert_eq!(args.property("title"), Some(json!("Hi")));
        assert!(args.el("heading").is_some());
    });

    let runtime = runtime_with(
        &[("/card.html", CARD)],
        Extensions::new(),
        scripts,
        EaselConfig::default(),
    );
    runtime.load_component("x-card", "/card.html").await.unwrap();
    let instance = runtime
        .construct("x-card", host("x-card", &[("title", "Hi")]))
        .unwrap();

    let sink = order.clone();
    instance.root().add_event_listener(
        CONNECTED_EVENT,
        Rc::new(move |_: &Event| sink.borrow_mut().push("connected".into())),
    );

    let local = LocalSet::new();
    local
        .run_until(async {
            instance.connect();
            order.borrow_mut().push("returned".into());
            instance.settled().await;
        })
        .await;

    assert_eq!(
        *order.borrow(),
        vec!["connected", "returned", "behavior", "connected"]
    );
}

#[tokio::test]
async fn test_missing_behavior_is_not_fatal() {
    let connected = Rc::new(Cell::new(0));
    let runtime = runtime_with(
        &[("/card.html", CARD)],
        Extensions::new(),
        StaticScripts::new(),
        EaselConfig::default(),
    );
    runtime.load_component("x-card", "/card.html").await.unwrap();
    let instance = runtime
        .construct("x-card", host("x-card", &[("title", "Hi")]))
        .unwrap();
    let count = connected.clone();
    instance.root().add_event_listener(
        CONNECTED_EVENT,
        Rc::new(move |_: &Event| count.set(count.get() + 1)),
    );

    let local = LocalSet::new();
    local
        .run_until(async {
            instance.connect();
            instance.settled().await;
        })
        .await;
    assert_eq!(connected.get(), 1);
    assert!(instance.is_mounted());
}

#[tokio::test]
async fn test_failing_hook_does_not_stop_others() {
    let log: Log = Rc::default();
    let extensions = Extensions::new();
    extensions.add(Extension::new("failing").with_component_hooks(Failing));
    extensions.add(Extension::new("after").with_component_hooks(Recorder {
        name: "after",
        log: log.clone(),
    }));
    let runtime = runtime_with(
        &[("/greeting.html", GREETING)],
        extensions,
        StaticScripts::new(),
        EaselConfig::default(),
    );
    runtime.load_component("x-greeting", "/greeting.html").await.unwrap();
    let instance = runtime.construct("x-greeting", host("x-greeting", &[])).unwrap();
    instance.connect();

    assert_eq!(*log.borrow(), vec!["after:init:"]);
    assert!(instance.is_mounted());
}

#[tokio::test]
async fn test_attribute_changed() {
    let runtime = runtime_with(
        &[("/card.html", CARD)],
        Extensions::new(),
        StaticScripts::new(),
        EaselConfig::default(),
    );
    runtime.load_component("x-card", "/card.html").await.unwrap();
    let host = host("x-card", &[("title", "Hi")]);
    let instance = runtime.construct("x-card", host.clone()).unwrap();

    let details: Rc<RefCell<Vec<Value>>> = Rc::default();
    let sink = details.clone();
    instance.root().add_event_listener(
        ATTRIBUTE_CHANGED_EVENT,
        Rc::new(move |event: &Event| sink.borrow_mut().push(event.detail.clone())),
    );

    let local = LocalSet::new();
    local
        .run_until(async {
            instance.connect();
            instance.settled().await;
        })
        .await;

    host.set_attribute("title", "Bye");
    instance.attribute_changed("title", Some("Bye"));

    assert_eq!(instance.args().attr("title").as_deref(), Some("Bye"));
    assert_eq!(instance.args().property("title"), Some(json!("Bye")));
    assert_eq!(instance.args().el("heading").unwrap().text_content(), "Bye");
    assert_eq!(
        *details.borrow(),
        vec![json!({"name": "title", "oldValue": "Hi", "newValue": "Bye"})]
    );
}

#[tokio::test]
async fn test_attribute_property_reflects_to_host() {
    let doc = r#"<property name="mode" default="light" attribute/><template><i>{{mode}}</i></template>"#;
    let runtime = runtime_with(
        &[("/theme.html", doc)],
        Extensions::new(),
        StaticScripts::new(),
        EaselConfig::default(),
    );
    runtime.load_component("x-theme", "/theme.html").await.unwrap();
    let host = host("x-theme", &[]);
    let instance = runtime.construct("x-theme", host.clone()).unwrap();
    assert_eq!(host.attribute("mode").as_deref(), Some("light"));

    instance.connect();
    instance.args().set_property("mode", json!("dark"));
    assert_eq!(host.attribute("mode").as_deref(), Some("dark"));
}

#[tokio::test]
async fn test_shadowless_renders_into_host() {
    let doc = r#"<template shadowless><b>plain</b></template>"#;
    let runtime = runtime_with(
        &[("/plain.html", doc)],
        Extensions::new(),
        StaticScripts::new(),
        EaselConfig::default(),
    );
    runtime.load_component("x-plain", "/plain.html").await.unwrap();
    let host = host("x-plain", &[]);
    let instance = runtime.construct("x-plain", host.clone()).unwrap();
    instance.connect();

    assert!(host.shadow_root().is_none());
    insta::assert_snapshot!(host.outer_html(), @"<x-plain><b>plain</b></x-plain>");
}

#[tokio::test]
async fn test_undeclared_placeholder() {
    let doc = r#"<template><p>{{ secret }}</p></template>"#;

    let strict = runtime_with(
        &[("/s.html", doc)],
        Extensions::new(),
        StaticScripts::new(),
        EaselConfig::default(),
    );
    strict.load_component("x-secret", "/s.html").await.unwrap();
    let err = strict.construct("x-secret", host("x-secret", &[])).unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"component `x-secret` uses placeholder `{{secret}}` but declares no property `secret`");

    let mut config = EaselConfig::default();
    config.components.strict_placeholders = false;
    let lenient = runtime_with(&[("/s.html", doc)], Extensions::new(), StaticScripts::new(), config);
    lenient.load_component("x-secret", "/s.html").await.unwrap();
    let instance = lenient.construct("x-secret", host("x-secret", &[])).unwrap();
    instance.connect();
    instance.args().rx("secret").set(json!(42));
    assert_eq!(instance.root().text_content(), "42");
}

#[tokio::test]
async fn test_injected_capabilities() {
    let extensions = Extensions::new();
    extensions.add(Extension::new("math").with_method("double", |args| {
        json!(args.first().and_then(Value::as_i64).unwrap_or(0) * 2)
    }));
    let runtime = runtime_with(
        &[("/greeting.html", GREETING)],
        extensions,
        StaticScripts::new(),
        EaselConfig::default(),
    );
    runtime.load_component("x-greeting", "/greeting.html").await.unwrap();
    let instance = runtime.construct("x-greeting", host("x-greeting", &[])).unwrap();
    let args = instance.args();

    assert_eq!(args.ext().call("double", &[json!(21)]), Some(json!(42)));
    assert!(args.injected("$").is_some());
    assert!(args.injected("other").is_none());
}

#[tokio::test]
async fn test_unknown_component() {
    let runtime = runtime_with(&[], Extensions::new(), StaticScripts::new(), EaselConfig::default());
    let err = runtime.construct("x-nope", host("x-nope", &[])).unwrap_err();
    assert!(matches!(err, Error::UnknownComponent(tag) if tag == "x-nope"));
}

const THEME: &str = r#"<property name="mode" default="light" attribute/><template><i>{{mode}}</i></template>"#;

#[tokio::test]
async fn test_host_style_follows_writes_outside_connection() {
    let runtime = runtime_with(
        &[("/card.html", CARD)],
        Extensions::new(),
        StaticScripts::new(),
        EaselConfig::default(),
    );
    runtime.load_component("x-card", "/card.html").await.unwrap();
    let instance = runtime
        .construct("x-card", host("x-card", &[("title", "Hi")]))
        .unwrap();
    let style = instance.root().children()[1].clone();

    instance.args().set_property("count", json!(5));
    insta::assert_snapshot!(style.outer_html(), @"<style>:host { --count: 5; }</style>");

    instance.connect();
    instance.disconnect();
    instance.args().set_property("count", json!(7));
    insta::assert_snapshot!(style.outer_html(), @"<style>:host { --count: 7; }</style>");

    instance.connect();
    insta::assert_snapshot!(style.outer_html(), @"<style>:host { --count: 7; }</style>");
    assert!(instance.root().text_content().contains("Count: 7"));
}

#[tokio::test]
async fn test_reflection_outside_connection() {
    let runtime = runtime_with(
        &[("/theme.html", THEME)],
        Extensions::new(),
        StaticScripts::new(),
        EaselConfig::default(),
    );
    runtime.load_component("x-theme", "/theme.html").await.unwrap();
    let host = host("x-theme", &[]);
    let instance = runtime.construct("x-theme", host.clone()).unwrap();

    instance.args().set_property("mode", json!("dim"));
    assert_eq!(host.attribute("mode").as_deref(), Some("dim"));

    instance.connect();
    instance.disconnect();
    instance.args().set_property("mode", json!("dark"));
    assert_eq!(host.attribute("mode").as_deref(), Some("dark"));

    instance.connect();
    assert_eq!(host.attribute("mode").as_deref(), Some("dark"));
    assert_eq!(instance.root().text_content(), "dark");
}

#[tokio::test]
async fn test_removed_host_attribute_stays_removed() {
    let runtime = runtime_with(
        &[("/theme.html", THEME)],
        Extensions::new(),
        StaticScripts::new(),
        EaselConfig::default(),
    );
    runtime.load_component("x-theme", "/theme.html").await.unwrap();
    let host = host("x-theme", &[("mode", "dark")]);
    let instance = runtime.construct("x-theme", host.clone()).unwrap();
    instance.connect();

    host.remove_attribute("mode");
    instance.attribute_changed("mode", None);

    assert!(!host.has_attribute("mode"));
    assert_eq!(instance.args().attr("mode"), None);
    // The property falls back to its default
    assert_eq!(instance.args().property("mode"), Some(json!("light")));
    assert_eq!(instance.root().text_content(), "light");

    // Writes from the component still reflect
    instance.args().set_property("mode", json!("dim"));
    assert_eq!(host.attribute("mode").as_deref(), Some("dim"));
}

#[tokio::test]
async fn test_dropped_instances_release_bindings() {
    let runtime = runtime_with(
        &[("/greeting.html", GREETING)],
        Extensions::new(),
        StaticScripts::new(),
        EaselConfig::default(),
    );
    runtime.load_component("x-greeting", "/greeting.html").await.unwrap();

    let mut values = Vec::new();
    for _ in 0..3 {
        let instance = runtime.construct("x-greeting", host("x-greeting", &[])).unwrap();
        instance.connect();
        assert_eq!(instance.binding_count(), 1);
        let name = instance.args().rx("name");
        assert_eq!(name.subscriber_count(), 1);
        values.push(name);
    }

    // Never disconnected
    assert!(values.iter().all(|name| name.subscriber_count() == 0));

    let instance = runtime.construct("x-greeting", host("x-greeting", &[])).unwrap();
    instance.connect();
    instance.disconnect();
    assert_eq!(instance.binding_count(), 0);
    instance.connect();
    assert_eq!(instance.binding_count(), 1);
}

#[tokio::test]
async fn test_connect_without_local_set() {
    let ran = Rc::new(Cell::new(0));
    let scripts = StaticScripts::new();
    let count = ran.clone();
    scripts.register("x-card", move |_| count.set(count.get() + 1));
    let runtime = runtime_with(
        &[("/card.html", CARD)],
        Extensions::new(),
        scripts,
        EaselConfig::default(),
    );
    runtime.load_component("x-card", "/card.html").await.unwrap();

    let first = runtime
        .construct("x-card", host("x-card", &[("title", "Hi")]))
        .unwrap();
    first.connect();
    assert_eq!(ran.get(), 0);
    first.settled().await;
    assert_eq!(ran.get(), 1);

    let second = runtime
        .construct("x-card", host("x-card", &[("title", "Yo")]))
        .unwrap();
    runtime
        .run_until(async {
            second.connect();
            second.settled().await;
        })
        .await;
    assert_eq!(ran.get(), 2);
    assert!(!runtime.tasks().is_driving());
}

#[tokio::test]
async fn test_connect_after_runtime_dropped() {
    let ran = Rc::new(Cell::new(false));
    let scripts = StaticScripts::new();
    let flag = ran.clone();
    scripts.register("x-card", move |_| flag.set(true));
    let runtime = runtime_with(
        &[("/card.html", CARD)],
        Extensions::new(),
        scripts,
        EaselConfig::default(),
    );
    runtime.load_component("x-card", "/card.html").await.unwrap();
    let instance = runtime
        .construct("x-card", host("x-card", &[("title", "Hi")]))
        .unwrap();
    drop(runtime);

    instance.connect();
    instance.settled().await;
    assert!(instance.is_mounted());
    assert!(!ran.get());
}
