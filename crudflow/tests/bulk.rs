mod common;

use common::{blogs, crud, events, host, record, record_with, request};
use crudflow::{CrudError, EventName, HookResult, Method};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

fn ids(values: &[&str]) -> Vec<Value> {
    values.iter().map(|id| Value::from(*id)).collect()
}

fn published(host: &crudflow::testing::TestHost, id: i64) -> Option<Value> {
    host.memory()
        .row(id)
        .and_then(|row| row.get("published").cloned())
}

// ============================================================================
// Selection
// ============================================================================

#[test]
fn test_bulk_delete_checked_rows() {
    let body = json!({"id": {"1": "1", "2": "0", "3": "3"}});
    let host = host(request(Method::Post, body), blogs());
    let mut crud = crud(&host);
    let recorder = record(&mut crud);

    let response = crud.execute("bulkDelete", vec![]).unwrap().unwrap();

    assert_eq!(
        events(&crud),
        ["beforeBulk", "afterBulk", "setFlash", "beforeRedirect"]
    );
    assert_eq!(recorder.subject("beforeBulk").unwrap().ids, ids(&["1", "3"]));
    assert_eq!(host.memory().count(), 1);
    assert!(host.memory().row(2).is_some(), "Unchecked row survives");
    assert_eq!(response.location.as_deref(), Some("/blogs/index"));
    assert_eq!(host.flashes()[0].text, "Delete completed successfully");
}

#[test]
fn test_select_all_uses_every_offered_key_once() {
    let body = json!({"id": {"3": "0", "1": "0", "_all": "1"}});
    let host = host(request(Method::Post, body), blogs());
    let mut crud = crud(&host);
    let recorder = record(&mut crud);

    crud.execute("toggle", vec![]).unwrap();

    let subject = recorder.subject("beforeBulk").unwrap();
    assert_eq!(
        subject.ids,
        ids(&["3", "1"]),
        "Original order, no sentinel"
    );
    assert_eq!(published(&host, 1), Some(json!(false)));
    assert_eq!(published(&host, 3), Some(json!(true)));
    assert_eq!(published(&host, 2), Some(json!(false)), "Not offered, not touched");
}

#[test]
fn test_duplicate_values_are_collapsed() {
    let body = json!({"id": {"a": "2", "b": 2, "c": "3"}});
    let host = host(request(Method::Post, body), blogs());
    let mut crud = crud(&host);
    let recorder = record(&mut crud);

    crud.execute("publish", vec![]).unwrap();

    assert_eq!(
        recorder.subject("beforeBulk").unwrap().ids,
        vec![json!("2"), json!("3")]
    );
    assert_eq!(published(&host, 2), Some(json!(true)));
    assert_eq!(published(&host, 3), Some(json!(true)));
}

#[test]
fn test_select_all_without_ids_is_a_bad_request() {
    let host = host(request(Method::Post, json!({"id": {"_all": true}})), blogs());
    let mut crud = crud(&host);

    let err = crud.execute("bulkDelete", vec![]).unwrap_err();

    assert!(
        matches!(&err, CrudError::BadRequest { message, status: 400 } if message == "Bad request data"),
        "{err:?}"
    );
    assert!(events(&crud).is_empty());
    assert_eq!(host.memory().count(), 3);
}

#[test]
fn test_missing_selection_is_a_bad_request() {
    let host = host(request(Method::Post, json!({"id": ["1", "2"]})), blogs());
    let mut crud = crud(&host);

    assert!(matches!(
        crud.execute("bulkDelete", vec![]),
        Err(CrudError::BadRequest { .. })
    ));
}

// ============================================================================
// Operations
// ============================================================================

#[test]
fn test_cascading_delete_rolls_back_on_failure() {
    let body = json!({"id": {"1": "1", "2": "2", "3": "3"}});
    let host = host(request(Method::Post, body), blogs().fail_delete(2));
    let mut crud = crud(&host);
    crud.defaults(crudflow::Kind::Actions, &["bulkDelete"], json!({"cascade": true}));
    let recorder = record(&mut crud);
    let before = host.memory().rows();

    crud.execute("bulkDelete", vec![]).unwrap();

    assert_eq!(host.memory().rows(), before, "End state equals the start state");
    assert_eq!(recorder.subject("afterBulk").unwrap().success, Some(false));
    assert_eq!(host.flashes()[0].text, "Could not complete deletion");
}

#[test]
fn test_cascading_delete_commits_when_every_delete_succeeds() {
    let body = json!({"id": {"1": "1", "3": "3"}});
    let host = host(request(Method::Post, body), blogs());
    let mut crud = crud(&host);
    crud.defaults(crudflow::Kind::Actions, &["bulkDelete"], json!({"cascade": true}));

    crud.execute("bulkDelete", vec![]).unwrap();

    assert_eq!(host.memory().count(), 1);
    assert!(host.memory().row(2).is_some());
}

#[test]
fn test_bulk_delete_nothing_matched_fails() {
    let body = json!({"id": {"8": "8", "9": "9"}});
    let host = host(request(Method::Post, body), blogs());
    let mut crud = crud(&host);

    crud.execute("bulkDelete", vec![]).unwrap();

    assert_eq!(host.flashes()[0].kind, "bulkDelete.error");
}

#[test]
fn test_cascading_delete_nothing_matched_fails() {
    let body = json!({"id": {"8": "8", "9": "9"}});
    let host = host(request(Method::Post, body), blogs());
    let mut crud = crud(&host);
    crud.defaults(crudflow::Kind::Actions, &["bulkDelete"], json!({"cascade": true}));
    let recorder = record(&mut crud);

    crud.execute("bulkDelete", vec![]).unwrap();

    assert_eq!(recorder.subject("afterBulk").unwrap().success, Some(false));
    assert_eq!(host.flashes()[0].kind, "bulkDelete.error");
    assert_eq!(host.memory().count(), 3);
}

#[test]
fn test_set_value() {
    let body = json!({"id": {"2": "2", "3": "3"}});
    let host = host(request(Method::Put, body), blogs());
    let mut crud = crud(&host);

    crud.execute("publish", vec![]).unwrap();

    assert_eq!(published(&host, 2), Some(json!(true)));
    assert_eq!(published(&host, 3), Some(json!(true)));
    assert_eq!(host.flashes()[0].text, "Set value successfully");
}

#[test]
fn test_missing_field_is_a_config_error() {
    let host = host(request(Method::Post, json!({})), blogs());
    let mut crud = crud(&host);
    crud.map_action("broken", json!({"className": "Crud.Bulk/Toggle"}), true);

    let err = crud.execute("broken", vec![]).unwrap_err();

    assert!(
        matches!(&err, CrudError::Config(message) if message == "No field value specified"),
        "The field is checked before the selection: {err:?}"
    );
    assert!(err.is_config_error());
}

#[test]
fn test_find_config_replaces_key_filter() {
    let body = json!({"id": {"1": "1"}});
    let host = host(request(Method::Post, body), blogs().with_finder("drafts"));
    let mut crud = crud(&host);
    crud.map_action(
        "purge",
        json!({
            "className": "Crud.Bulk/Delete",
            "findMethod": "drafts",
            "findConfig": {"olderThan": 30}
        }),
        true,
    );
    let recorder = record(&mut crud);

    crud.execute("purge", vec![]).unwrap();

    let query = recorder.subject("beforeBulk").unwrap().query.unwrap();
    assert_eq!(query.finder, "drafts");
    assert_eq!(query.options.get("olderThan"), Some(&json!(30)));
    assert!(query.conditions.is_empty(), "findConfig shapes the query itself");
    assert_eq!(host.memory().count(), 0);
}

#[test]
fn test_vetoed_bulk_changes_nothing() {
    let body = json!({"id": {"1": "1"}});
    let host = host(request(Method::Post, body), blogs());
    let mut crud = crud(&host);
    record_with(&mut crud, EventName::BeforeBulk, HookResult::Stop);

    crud.execute("bulkDelete", vec![]).unwrap();

    assert_eq!(events(&crud), ["beforeBulk", "setFlash", "beforeRedirect"]);
    assert_eq!(host.memory().count(), 3);
    assert_eq!(host.flashes()[0].kind, "bulkDelete.error");
}
