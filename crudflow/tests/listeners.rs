mod common;

use common::{blogs, crud_with, events, host, request};
use crudflow::{CrudError, Kind, Method, Request};
use pretty_assertions::assert_eq;
use serde_json::json;

fn with_redirects() -> serde_json::Value {
    json!({"listeners": ["Crud.Redirect"]})
}

fn api(method: Method, data: serde_json::Value) -> Request {
    Request::new(method).with_data(data).with_format("json")
}

// ============================================================================
// Redirect rules
// ============================================================================

#[test]
fn test_post_add_rule() {
    let host = host(request(Method::Post, json!({"name": "Another", "_add": "1"})), blogs());
    let mut crud = crud_with(&host, with_redirects());

    let response = crud.execute("add", vec![]).unwrap().unwrap();

    assert_eq!(response.location.as_deref(), Some("/blogs/add"));
}

#[test]
fn test_post_edit_rule_reads_saved_entity() {
    let host = host(request(Method::Post, json!({"name": "Keep editing", "_edit": "1"})), blogs());
    let mut crud = crud_with(&host, with_redirects());

    let response = crud.execute("add", vec![]).unwrap().unwrap();

    assert_eq!(
        response.location.as_deref(),
        Some("/blogs/edit/4"),
        "The new record's key fills the pass argument"
    );
}

#[test]
fn test_edit_post_edit_rule_reads_subject_id() {
    let host = host(request(Method::Put, json!({"name": "Again", "_edit": true})), blogs());
    let mut crud = crud_with(&host, with_redirects());

    let response = crud.execute("edit", vec!["2".into()]).unwrap().unwrap();

    assert_eq!(response.location.as_deref(), Some("/blogs/edit/2"));
}

#[test]
fn test_rules_without_matching_key_keep_fallback() {
    let host = host(request(Method::Post, json!({"name": "Plain", "_add": "0"})), blogs());
    let mut crud = crud_with(&host, with_redirects());

    let response = crud.execute("add", vec![]).unwrap().unwrap();

    assert_eq!(response.location.as_deref(), Some("/blogs/index"));
}

#[test]
fn test_rule_query_map_is_expanded() {
    let host = host(
        Request::new(Method::Post)
            .with_data(json!({"name": "Tagged", "_tag": "rust"}))
            .with_query(json!({"ref": "home"})),
        blogs(),
    );
    let mut crud = crud_with(&host, with_redirects());
    crud.defaults(
        Kind::Actions,
        &["add"],
        json!({"redirect": {"tagged": {
            "reader": "request.data",
            "key": "_tag",
            "url": {"action": "index", "?": {"tag": ["request.data", "_tag"], "from": ["request.query", "ref"]}}
        }}}),
    );

    let response = crud.execute("add", vec![]).unwrap().unwrap();

    assert_eq!(
        response.location.as_deref(),
        Some("/blogs/index?tag=rust&from=home")
    );
}

#[test]
fn test_unknown_reader_is_a_config_error() {
    let host = host(request(Method::Post, json!({"name": "Odd"})), blogs());
    let mut crud = crud_with(&host, with_redirects());
    crud.defaults(
        Kind::Actions,
        &["add"],
        json!({"redirect": {"cookie": {"reader": "cookie.jar", "key": "x", "url": "/x"}}}),
    );

    let err = crud.execute("add", vec![]).unwrap_err();

    assert!(
        matches!(&err, CrudError::Config(message) if message == "Invalid reader: cookie.jar"),
        "{err:?}"
    );
}

#[test]
fn test_redirect_url_precedence() {
    let body = json!({"name": "Away", "_redirect_url": "/from-body"});
    let request = request(Method::Post, body).with_query(json!({
        "_redirect_url": "/from-query",
        "redirect_url": "/plain-query"
    }));
    let host = host(request, blogs());
    let mut crud = crud_with(&host, json!({}));

    let response = crud.execute("add", vec![]).unwrap().unwrap();
    assert_eq!(response.location.as_deref(), Some("/from-body"));

    let request = Request::new(Method::Post)
        .with_data(json!({"name": "Away", "redirect_url": ""}))
        .with_query(json!({"redirect_url": "/plain-query"}));
    let host = common::host(request, blogs());
    let mut crud = crud_with(&host, json!({}));

    let response = crud.execute("add", vec![]).unwrap().unwrap();
    assert_eq!(
        response.location.as_deref(),
        Some("/plain-query"),
        "Empty values don't count"
    );
}

// ============================================================================
// API listener
// ============================================================================

#[test]
fn test_api_create_answers_with_status_and_key() {
    let host = host(api(Method::Post, json!({"name": "Via API"})), blogs());
    let mut crud = crud_with(&host, json!({"listeners": ["Crud.Api", "Crud.Redirect"]}));

    let response = crud.execute("add", vec![]).unwrap().unwrap();

    assert_eq!(response.status, 201);
    let body = response.body.unwrap();
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"], json!({"id": 4}));
    assert!(host.redirects().is_empty(), "No redirect for API clients");
    assert_eq!(events(&crud).last().map(String::as_str), Some("beforeRedirect"));
}

#[test]
fn test_api_validation_failure_raises() {
    let host = host(api(Method::Post, json!({"body": "Missing name"})), blogs());
    let mut crud = crud_with(&host, json!({"listeners": ["Crud.Api"]}));

    let err = crud.execute("add", vec![]).unwrap_err();

    let CrudError::Validation(validation) = &err else {
        panic!("expected a validation error, got {err:?}");
    };
    assert_eq!(validation.count(), 1);
    assert_eq!(err.status(), 422);
    assert_eq!(err.to_string(), "A validation error occurred");
}

#[test]
fn test_api_rejects_unlisted_methods() {
    let host = host(api(Method::Get, json!({})), blogs());
    let mut crud = crud_with(&host, json!({"listeners": ["Crud.Api"]}));

    let err = crud.execute("add", vec![]).unwrap_err();

    assert!(
        matches!(&err, CrudError::MethodNotAllowed { message, status: 405 }
            if message == "Method not allowed. This action permits only post, put"),
        "{err:?}"
    );
    assert!(events(&crud).is_empty(), "Rejected before the action ran");
}

#[test]
fn test_api_skips_disabled_actions() {
    let host = host(api(Method::Get, json!({})), blogs());
    let mut crud = crud_with(&host, json!({"listeners": ["Crud.Api"]}));
    crud.disable(&["add"]).unwrap();

    assert!(crud.execute("add", vec![]).unwrap().is_none());
    assert!(events(&crud).is_empty());
}

#[test]
fn test_api_configured_exception() {
    let host = host(api(Method::Post, json!({"id": {"1": "1"}})), blogs().fail_delete(1));
    let mut crud = crud_with(&host, json!({"listeners": ["Crud.Api"]}));
    crud.defaults(
        Kind::Actions,
        &["bulkDelete"],
        json!({
            "cascade": true,
            "api": {"error": {"exception": {"message": "Bulk failed", "code": 409}}}
        }),
    );

    let err = crud.execute("bulkDelete", vec![]).unwrap_err();

    assert!(
        matches!(&err, CrudError::BadRequest { message, status: 409 } if message == "Bulk failed"),
        "{err:?}"
    );
}

#[test]
fn test_api_listener_ignores_html_requests() {
    let host = host(request(Method::Get, json!({})), blogs());
    let mut crud = crud_with(&host, json!({"listeners": ["Crud.Api"]}));

    let response = crud.execute("add", vec![]).unwrap().unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.view.as_deref(), Some("add"));
}

// ============================================================================
// Logging listener
// ============================================================================

#[test]
fn test_logging_listener_observes_every_event() {
    let host = host(Request::new(Method::Get), blogs());
    let mut crud = crud_with(&host, json!({"listeners": {"logging": "Crud.Logging"}}));

    crud.execute("index", vec![]).unwrap();

    assert!(crud.listener("logging").is_ok());
    assert_eq!(crud.bus().handler_count("beforeRender"), 1);
    assert_eq!(crud.bus().handler_count("setFlash"), 1);
}
