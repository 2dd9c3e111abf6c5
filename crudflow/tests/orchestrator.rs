mod common;

use common::{blogs, crud, crud_with, events, host, init_tracing};
use crudflow::{
    Action, Catalog, ConfigStore, Crud, CrudError, EventName, Kind, Listener, Method, Outcome,
    Request, Subject,
    actions::{BulkAction, BulkSetValue},
    testing::RecordingListener,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::{Arc, Mutex};

// ============================================================================
// Registries
// ============================================================================

#[test]
fn test_unmapped_action() {
    let host = host(Request::new(Method::Get), blogs());
    let mut crud = crud(&host);

    let err = crud.execute("archive", vec![]).unwrap_err();

    assert!(matches!(&err, CrudError::ActionNotConfigured(name) if name == "archive"));
    assert!(err.is_config_error());
    assert_eq!(err.status(), 500);
}

#[test]
fn test_unknown_implementation_tag() {
    let host = host(Request::new(Method::Get), blogs());
    let mut crud = crud(&host);
    crud.map_action("archive", json!("App.Archive"), true);

    assert!(matches!(
        crud.execute("archive", vec![]),
        Err(CrudError::MissingAction(tag)) if tag == "App.Archive"
    ));
}

#[test]
fn test_listener_errors() {
    let host = host(Request::new(Method::Get), blogs());
    let mut crud = crud_with(&host, json!({"listeners": ["App.Audit"]}));

    assert!(matches!(
        crud.execute("index", vec![]),
        Err(CrudError::MissingListener(tag)) if tag == "App.Audit"
    ));
    assert!(matches!(
        crud.listener("ghost"),
        Err(CrudError::ListenerNotConfigured(name)) if name == "ghost"
    ));
}

#[test]
fn test_custom_catalog_entries() {
    init_tracing();
    let host = host(
        Request::new(Method::Post).with_data(json!({"id": {"1": "1"}})),
        blogs(),
    );
    let recorder = RecordingListener::new(&[EventName::AfterBulk]);
    let shared = recorder.clone();
    let catalog = Catalog::standard()
        .with_action("App.Archive", |name: &str, overrides| -> Box<dyn Action> {
            Box::new(BulkAction::new(name, overrides, BulkSetValue))
        })
        .with_listener("App.Audit", move |_| -> Box<dyn Listener> {
            Box::new(shared.clone())
        });

    let mut crud = Crud::with_catalog(
        host.clone(),
        json!({
            "actions": {"archive": {"className": "App.Archive", "field": "archived", "value": true}},
            "listeners": {"audit": "App.Audit"}
        }),
        catalog,
    );

    crud.execute("archive", vec![]).unwrap();

    assert_eq!(
        host.memory().row(1).and_then(|row| row.get("archived").cloned()),
        Some(json!(true))
    );
    assert_eq!(recorder.names(), ["afterBulk"]);
}

#[test]
fn test_standard_fixture_maps_every_action() {
    let host = host(Request::new(Method::Get), blogs());
    let crud = crud(&host);

    let names = [
        "index", "view", "add", "edit", "delete", "lookup", "bulkDelete", "publish", "toggle",
    ];
    for name in names {
        assert!(crud.is_action(name), "{name} is mapped and enabled");
    }
    assert_eq!(crud.config().get_bool("eventLogging"), Some(true));
}

#[test]
fn test_list_mappings_are_normalised() {
    let host = host(Request::new(Method::Get), blogs());
    let crud = Crud::new(host, json!({"actions": ["Crud.Index", "Crud.View"]}));

    assert!(crud.is_action_mapped("index"));
    assert!(crud.is_action_mapped("view"));
    assert!(!crud.is_action_mapped("add"));
}

#[test]
fn test_actions_are_resolved_once() {
    let host = host(Request::new(Method::Get), blogs());
    let mut crud = crud(&host);

    crud.view("index", "overview").unwrap();
    crud.view_var("index", "posts").unwrap();
    let response = crud.execute("index", vec![]).unwrap().unwrap();

    assert_eq!(response.view.as_deref(), Some("overview"));
    let body = response.body.unwrap();
    assert_eq!(body["posts"].as_array().map(Vec::len), Some(3));
    assert_eq!(crud.current_action().map(|action| action.name()), Some("index"));
}

#[test]
fn test_enable_disable_and_is_action() {
    let host = host(Request::new(Method::Get), blogs());
    let mut crud = crud(&host);

    assert!(crud.is_action("index"));
    crud.disable(&["index", "view"]).unwrap();
    assert!(!crud.is_action("index"));
    assert!(!crud.is_action("view"));
    crud.enable(&["index"]).unwrap();
    assert!(crud.is_action("index"));
    assert!(!crud.is_action("missing"));

    crud.map_action("drafts", json!({"className": "Crud.Index"}), false);
    assert!(crud.is_action_mapped("drafts"));
    assert!(!crud.is_action("drafts"), "Mapped disabled");
}

#[test]
fn test_find_method_override() {
    let host = host(Request::new(Method::Get), blogs());
    let mut crud = crud(&host);
    crud.find_method("index", json!({"list": {"keyField": "id"}})).unwrap();
    let recorder = common::record(&mut crud);

    crud.execute("index", vec![]).unwrap();

    let query = recorder.subject("beforePaginate").unwrap().query.unwrap();
    assert_eq!(query.finder, "list");
    assert_eq!(query.options.get("keyField"), Some(&json!("id")));
}

#[test]
fn test_listener_defaults_before_and_after_load() {
    let host = host(Request::new(Method::Get).with_format("json"), blogs());
    let mut crud = crud_with(&host, json!({"listeners": ["Crud.Api"]}));
    crud.defaults(Kind::Listeners, &["api"], json!({"exception": {"code": 418}}));

    let listener = crud.listener("api").unwrap();
    assert_eq!(listener.config().get_i64("exception.code"), Some(418));
    assert_eq!(
        listener.config().get_str("exception.message"),
        Some("Unknown error"),
        "Merged over the class defaults"
    );

    crud.defaults(Kind::Listeners, &["api"], json!({"exception": {"code": 451}}));
    let listener = crud.listener("api").unwrap();
    assert_eq!(listener.config().get_i64("exception.code"), Some(451));
}

#[test]
fn test_add_and_remove_listeners() {
    let host = host(Request::new(Method::Get), blogs());
    let mut crud = crud(&host);
    crud.load_listeners().unwrap();

    crud.add_listener("api", json!("Crud.Api")).unwrap();
    assert_eq!(
        crud.bus().handler_count("beforeHandle"),
        1,
        "Attached immediately once listeners are loaded"
    );

    assert!(crud.remove_listener("api"));
    assert_eq!(crud.bus().handler_count("beforeHandle"), 0);
    assert!(!crud.remove_listener("api"));
}

// ============================================================================
// Events
// ============================================================================

#[test]
fn test_before_handle_may_rewrite_action_and_args() {
    let host = host(Request::new(Method::Get), blogs());
    let mut crud = crud(&host);
    crud.on("beforeHandle", 1, |event: &mut crudflow::Event<'_>| {
        let subject = event.subject_mut();
        subject.action = Some("view".into());
        subject.args = vec!["2".into()];
    });

    let response = crud.execute("index", vec![]).unwrap().unwrap();

    assert_eq!(response.view.as_deref(), Some("view"));
    assert_eq!(response.body.unwrap()["blog"]["name"], json!("Second post"));
    assert_eq!(crud.current_action().map(|action| action.name()), Some("view"));
}

#[test]
fn test_priority_order_with_stable_ties() {
    let host = host(Request::new(Method::Get), blogs());
    let mut crud = crud(&host);
    let order = Arc::new(Mutex::new(Vec::new()));
    for (label, priority) in [("late", 50), ("first", 1), ("tie-a", 10), ("tie-b", 10)] {
        let order = order.clone();
        crud.on("beforeRender", priority, move |_event: &mut crudflow::Event<'_>| {
            order.lock().unwrap().push(label);
        });
    }

    crud.execute("index", vec![]).unwrap();

    assert_eq!(*order.lock().unwrap(), ["first", "tie-a", "tie-b", "late"]);
}

#[test]
fn test_manual_trigger_and_custom_prefix() {
    let host = host(Request::new(Method::Get), blogs());
    let mut crud = crud_with(&host, json!({"eventPrefix": "Blog"}));
    crud.on("published", 10, |event: &mut crudflow::Event<'_>| {
        event.subject_mut().set_field("seen", true);
    });

    let mut subject = Subject::new();
    let outcome = crud.trigger("published", &mut subject).unwrap();

    assert!(matches!(outcome, Outcome::Continue));
    assert_eq!(subject.get("seen"), Some(&json!(true)));
    assert!(subject.has_event("Blog.published"));
    assert_eq!(crud.event_log()[0].name, "Blog.published");
}

#[test]
fn test_event_log_is_off_by_default() {
    let host = host(Request::new(Method::Get), blogs());
    let mut crud = Crud::new(host, json!({"actions": ["Crud.Index"]}));

    crud.execute("index", vec![]).unwrap();

    assert!(crud.event_log().is_empty());
    assert!(events(&crud).is_empty());
}

#[test]
fn test_event_log_keeps_subject_snapshots() {
    let host = host(Request::new(Method::Get), blogs());
    let mut crud = crud(&host);

    crud.execute("view", vec!["1".into()]).unwrap();

    let log = crud.event_log();
    let before_find = log
        .iter()
        .find(|event| event.name == "Crud.beforeFind")
        .unwrap();
    assert!(before_find.subject.entity.is_none(), "Snapshot predates the find");
    let after_find = log
        .iter()
        .find(|event| event.name == "Crud.afterFind")
        .unwrap();
    assert!(after_find.subject.entity.is_some());
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_config_merge_semantics() {
    let mut store = ConfigStore::new();
    store.set("a.b", json!({"x": 1}));
    store.set("a.b", json!({"y": 2}));
    assert_eq!(store.get("a.b"), Some(&json!({"x": 1, "y": 2})));

    let mut store = ConfigStore::new();
    store.set("a.b", json!({"x": 1}));
    store.set_with("a.b", json!({"y": 2}), false);
    assert_eq!(store.get("a.b"), Some(&json!({"y": 2})));
}

#[test]
fn test_orchestrator_defaults() {
    let host = host(Request::new(Method::Get), blogs());
    let crud = Crud::new(host, json!({"messages": {"invalidId": {"code": 422}}}));

    let config = crud.config();
    assert_eq!(config.get_str("eventPrefix"), Some("Crud"));
    assert_eq!(config.get_bool("eventLogging"), Some(false));
    assert_eq!(config.get_i64("messages.invalidId.code"), Some(422));
    assert_eq!(
        config.get_str("messages.invalidId.text"),
        Some("Invalid id"),
        "Sibling keys survive the merge"
    );
}
