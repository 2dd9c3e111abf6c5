#![allow(dead_code)]

use crudflow::{
    Crud, EventName, LoggedEvent, Method, Request,
    testing::{MemoryRepository, RecordingListener, TestHost},
};
use serde_json::{Value, json};
use std::sync::{Arc, Once};

// ============================================================================
// Tracing
// ============================================================================

static TRACING: Once = Once::new();

/// Install a test-writer subscriber once per test binary.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
            .try_init();
    });
}

// ============================================================================
// Fixtures
// ============================================================================

/// Three blog posts; `name` is required on save.
pub fn blogs() -> MemoryRepository {
    MemoryRepository::new("Blogs")
        .with_rows(vec![
            json!({"id": 1, "name": "First post", "body": "One", "published": true}),
            json!({"id": 2, "name": "Second post", "body": "Two", "published": false}),
            json!({"id": 3, "name": "Third post", "body": "Three", "published": false}),
        ])
        .with_required(&["name"])
}

/// Every standard action mapped under its usual name.
pub fn standard_actions() -> Value {
    json!({
        "index": "Crud.Index",
        "view": "Crud.View",
        "add": "Crud.Add",
        "edit": "Crud.Edit",
        "delete": "Crud.Delete",
        "lookup": "Crud.Lookup",
        "bulkDelete": "Crud.Bulk/Delete",
        "publish": {"className": "Crud.Bulk/SetValue", "field": "published", "value": true},
        "toggle": {"className": "Crud.Bulk/Toggle", "field": "published"}
    })
}

/// A host for the `Blogs` resource answering `request`.
pub fn host(request: Request, repository: MemoryRepository) -> Arc<TestHost> {
    Arc::new(TestHost::new("Blogs", request, repository))
}

/// Orchestrator over `host` with the standard actions, event logging on and
/// `extra` merged into the configuration.
pub fn crud_with(host: &Arc<TestHost>, extra: Value) -> Crud {
    init_tracing();
    let mut config = json!({
        "actions": standard_actions(),
        "eventLogging": true
    });
    if !extra.is_null() {
        crudflow::crudflow_core::merge_value(&mut config, extra);
    }
    Crud::new(host.clone(), config)
}

/// Orchestrator over `host` with the standard actions.
pub fn crud(host: &Arc<TestHost>) -> Crud {
    crud_with(host, Value::Null)
}

/// A request with `method` and body `data`.
pub fn request(method: Method, data: Value) -> Request {
    Request::new(method).with_data(data)
}

/// Attach a recorder for every well-known event.
pub fn record(crud: &mut Crud) -> RecordingListener {
    let recorder = RecordingListener::all();
    crud.attach_listener("recorder", Box::new(recorder.clone()))
        .expect("recorder attaches");
    recorder
}

/// Attach a recorder answering `event` with `result`.
pub fn record_with(
    crud: &mut Crud,
    event: EventName,
    result: crudflow::HookResult,
) -> RecordingListener {
    let recorder = RecordingListener::all().with_result(event, result);
    crud.attach_listener("recorder", Box::new(recorder.clone()))
        .expect("recorder attaches");
    recorder
}

/// Short names of the events logged so far, excluding `beforeHandle`.
pub fn events(crud: &Crud) -> Vec<String> {
    short_names(&crud.event_log())
        .into_iter()
        .filter(|name| name != "beforeHandle")
        .collect()
}

fn short_names(log: &[LoggedEvent]) -> Vec<String> {
    log.iter()
        .map(|event| {
            event
                .name
                .rsplit_once('.')
                .map(|(_, short)| short.to_string())
                .unwrap_or_else(|| event.name.clone())
        })
        .collect()
}
