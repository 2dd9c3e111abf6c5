//! Flash messages and client-facing error messages.
//!
//! Message templates are looked up under `messages.<type>` in the action's
//! configuration, on top of the orchestrator-wide `messages.<type>`, on top
//! of built-in defaults. A template may be a plain string, which is
//! shorthand for `{"text": ...}`.

use crudflow_core::{
    Action, ActionContext, ConfigStore, CrudError, EventName, FlashMessage, Flow, Subject, Verbs,
    merge_value, text,
};
use serde_json::{Map, Value, json};

/// Orchestrator-wide message templates for client errors.
pub fn default_messages() -> Value {
    json!({
        "invalidId": {
            "code": 400,
            "text": "Invalid id"
        },
        "recordNotFound": {
            "code": 404,
            "text": "Not found"
        },
        "badRequestMethod": {
            "code": 405,
            "text": "Method not allowed. This action permits only {methods}"
        },
        "badRequest": {
            "code": 400,
            "text": "Bad request data"
        }
    })
}

/// Build the flash message of type `kind` (`"success"`, `"error"`, ...).
///
/// Fails with [`CrudError::Config`] when no template defines `text`.
pub fn message(
    action: &dyn Action,
    ctx: &ActionContext<'_>,
    kind: &str,
    replacements: &Map<String, Value>,
) -> Result<FlashMessage, CrudError> {
    let path = format!("messages.{kind}");
    let mut config = json!({
        "element": "default",
        "params": {"class": "message"},
        "key": "flash",
        "type": format!("{}.{kind}", action.name()),
        "name": action.resource_name(ctx.repository()),
    });
    for layer in [ctx.settings().get(&path), action.config().get(&path)]
        .into_iter()
        .flatten()
    {
        merge_value(&mut config, template(layer));
    }

    let field = |key: &str| {
        config
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_default()
    };
    let Some(text_template) = config.get("text").and_then(Value::as_str) else {
        return Err(CrudError::Config(format!(
            "Invalid message config for \"{kind}\" no text key found"
        )));
    };

    let name = field("name");
    let original = text::ucfirst(&text_template.replace("{name}", &name));
    let mut values = replacements.clone();
    values
        .entry("name")
        .or_insert_with(|| Value::String(name.clone()));
    let rendered = text::insert(&original, &values);

    let mut params = config
        .get("params")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    let class = params
        .get("class")
        .and_then(Value::as_str)
        .unwrap_or("message")
        .to_string();
    params.insert("class".into(), Value::String(format!("{class} {kind}")));
    params.insert("original".into(), Value::String(original));

    Ok(FlashMessage {
        text: rendered,
        element: field("element"),
        key: field("key"),
        kind: field("type"),
        name,
        params,
    })
}

/// Put the `kind` message on the subject, raise `setFlash` and hand the
/// message to the host unless a listener stopped the event.
pub fn set_flash(
    action: &dyn Action,
    ctx: &ActionContext<'_>,
    kind: &str,
    subject: &mut Subject,
) -> Flow {
    subject.flash = Some(message(action, ctx, kind, &Map::new())?);
    ctx.trigger(action, EventName::SetFlash, subject)?;
    if subject.is_stopped() {
        return Ok(());
    }
    if let Some(flash) = &subject.flash {
        ctx.host().set_flash(flash);
    }
    Ok(())
}

// ============================================================================
// Client errors
// ============================================================================

/// `invalidId` error for `id`.
pub fn invalid_id(settings: &ConfigStore, id: &str) -> CrudError {
    let (message, status) = client_error(settings, "invalidId", &replace("id", id));
    CrudError::InvalidId { message, status }
}

/// `recordNotFound` error for `id`.
pub fn record_not_found(settings: &ConfigStore, id: &str) -> CrudError {
    let (message, status) = client_error(settings, "recordNotFound", &replace("id", id));
    CrudError::RecordNotFound { message, status }
}

/// `badRequest` error for a malformed payload.
pub fn bad_request(settings: &ConfigStore) -> CrudError {
    let (message, status) = client_error(settings, "badRequest", &Map::new());
    CrudError::BadRequest { message, status }
}

/// `badRequestMethod` error listing the permitted verbs.
pub fn method_not_allowed(settings: &ConfigStore, allowed: Verbs) -> CrudError {
    let methods = allowed.names().join(", ");
    let (message, status) = client_error(settings, "badRequestMethod", &replace("methods", &methods));
    CrudError::MethodNotAllowed { message, status }
}

/// Text and status of a client error template.
fn client_error(
    settings: &ConfigStore,
    kind: &str,
    replacements: &Map<String, Value>,
) -> (String, u16) {
    let mut config = default_messages()
        .get(kind)
        .cloned()
        .unwrap_or_else(|| json!({"code": 400, "text": kind}));
    if let Some(layer) = settings.get(&format!("messages.{kind}")) {
        merge_value(&mut config, template(layer));
    }
    let message = config.get("text").and_then(Value::as_str).unwrap_or(kind);
    let status = config
        .get("code")
        .and_then(Value::as_u64)
        .and_then(|code| u16::try_from(code).ok())
        .unwrap_or(400);
    (text::insert(message, replacements), status)
}

fn template(value: &Value) -> Value {
    match value {
        Value::String(text) => json!({ "text": text }),
        other => other.clone(),
    }
}

fn replace(key: &str, value: &str) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(key.to_string(), Value::String(value.to_string()));
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{IndexAction, testing::{MemoryRepository, TestHost}};
    use crudflow_core::{EventBus, Request};
    use pretty_assertions::assert_eq;

    fn host() -> TestHost {
        TestHost::new("Blogs", Request::default(), MemoryRepository::new("Blogs"))
    }

    #[test]
    fn test_message_layers_and_placeholders() {
        let action = IndexAction::new(
            "index",
            json!({"messages": {"success": {"text": "Loaded {name} page {page}"}}}),
        );
        let settings = ConfigStore::from_value(json!({
            "messages": {"success": {"element": "notice", "text": "ignored"}}
        }));
        let bus = EventBus::new();
        let host = host();
        let ctx = ActionContext::new(&bus, &host, &settings);

        let message = message(&action, &ctx, "success", &replace("page", "2")).unwrap();
        assert_eq!(message.text, "Loaded blogs page 2");
        assert_eq!(message.element, "notice", "Orchestrator layer applies");
        assert_eq!(message.kind, "index.success");
        assert_eq!(message.params.get("class"), Some(&json!("message success")));
        assert_eq!(
            message.params.get("original"),
            Some(&json!("Loaded blogs page {page}"))
        );
    }

    #[test]
    fn test_context_subject_names_action_and_repository() {
        let action = IndexAction::new("index", Value::Null);
        let settings = ConfigStore::new();
        let bus = EventBus::new();
        let host = host();
        let ctx = ActionContext::new(&bus, &host, &settings);

        let subject = ctx.subject(&action);
        assert_eq!(subject.action.as_deref(), Some("index"));
        assert_eq!(subject.repository.as_deref(), Some("Blogs"));
        assert!(subject.args.is_empty());
        assert!(subject.events().is_empty());
    }

    #[test]
    fn test_message_without_text_is_a_config_error() {
        let action = IndexAction::new("index", Value::Null);
        let settings = ConfigStore::new();
        let bus = EventBus::new();
        let host = host();
        let ctx = ActionContext::new(&bus, &host, &settings);

        let err = message(&action, &ctx, "error", &Map::new()).unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_client_errors_use_templates() {
        let settings = ConfigStore::from_value(json!({
            "messages": {"recordNotFound": {"text": "No record {id}", "code": 410}}
        }));

        let err = record_not_found(&settings, "7");
        assert_eq!(err.to_string(), "No record 7");
        assert_eq!(err.status(), 410);

        let err = method_not_allowed(&settings, Verbs::PUT | Verbs::POST);
        assert_eq!(
            err.to_string(),
            "Method not allowed. This action permits only post, put"
        );
        assert_eq!(err.status(), 405);
    }
}
