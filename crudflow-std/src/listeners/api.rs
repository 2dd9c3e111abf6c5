//! Machine-readable responses for API requests.
//!
//! Active only when the request asks for an API format (see
//! [`Request::is_api`](crudflow_core::Request::is_api)). It reads the
//! running action's `api` configuration:
//!
//! ```json
//! {"methods": ["put", "post"],
//!  "success": {"code": 201, "data": {"entity": ["id"]}},
//!  "error": {"exception": {"type": "validate"}}}
//! ```
//!
//! - `beforeHandle`: rejects verbs outside `methods`.
//! - `beforeRender` / `beforeRedirect`: picks `success` or `error` by the
//!   subject's outcome, then raises the configured exception or answers
//!   directly with the rendered view and `code`.

use crate::actions::messages;
use crudflow_core::{
    Action, ConfigStore, CrudError, Event, EventName, HookResult, Listener, Subscription,
    ValidationError, Verbs, merge_value,
};
use serde_json::{Map, Value, json};

/// Priority of the method check.
pub const CHECK_PRIORITY: i32 = 10;

/// Priority of the response handlers. Runs after regular listeners.
pub const RESPOND_PRIORITY: i32 = 100;

/// Turns outcomes into API responses.
pub struct ApiListener {
    config: ConfigStore,
}

impl ApiListener {
    /// Create the listener.
    pub fn new(overrides: Value) -> Self {
        Self {
            config: ConfigStore::with_defaults(Self::default_config(), overrides),
        }
    }

    /// Class-level configuration.
    pub fn default_config() -> Value {
        json!({
            "exception": {
                "type": "default",
                "message": "Unknown error",
                "code": 0
            },
            "messages": messages::default_messages()
        })
    }

    fn check_method(&self, event: &Event<'_>, action: &dyn Action) -> Result<HookResult, CrudError> {
        let Some(methods) = action.config().get("api.methods").and_then(Value::as_array) else {
            return Ok(HookResult::Next);
        };
        let allowed = Verbs::from_names(methods.iter().filter_map(Value::as_str));
        if allowed.contains(event.request().method.verb()) {
            return Ok(HookResult::Next);
        }
        Err(messages::method_not_allowed(&self.config, allowed))
    }

    fn respond(&self, event: &Event<'_>, action: &dyn Action) -> Result<HookResult, CrudError> {
        let subject = event.subject();
        let kind = if subject.success.unwrap_or(false) {
            "success"
        } else {
            "error"
        };
        let config = action
            .config()
            .get(&format!("api.{kind}"))
            .cloned()
            .unwrap_or(Value::Null);

        if let Some(exception) = config.get("exception") {
            return Err(self.exception(event, exception));
        }

        let host = event.host();
        let mut vars = action.view_vars(subject, host);
        if let Some(data) = self.data(event, config.get("data")) {
            vars.insert("data".into(), data);
        }
        let view = action.view().unwrap_or(action.name());
        let code = config
            .get("code")
            .and_then(Value::as_u64)
            .and_then(|code| u16::try_from(code).ok())
            .unwrap_or(200);
        let response = host.render(view, &vars)?.with_status(code);
        Ok(HookResult::Respond(response))
    }

    /// The configured exception, on top of the listener's `exception` defaults.
    fn exception(&self, event: &Event<'_>, overrides: &Value) -> CrudError {
        let mut exception = self.config.get("exception").cloned().unwrap_or(Value::Null);
        merge_value(&mut exception, overrides.clone());

        if exception.get("type").and_then(Value::as_str) == Some("validate") {
            return match &event.subject().entity {
                Some(entity) => ValidationError::from_entity(entity).into(),
                None => ValidationError::new(Map::new()).into(),
            };
        }

        let message = exception
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Unknown error")
            .to_string();
        let status = exception
            .get("code")
            .and_then(Value::as_u64)
            .and_then(|code| u16::try_from(code).ok())
            .filter(|code| *code >= 400)
            .unwrap_or(400);
        CrudError::BadRequest { message, status }
    }

    /// Entity fields listed under `data.entity`.
    fn data(&self, event: &Event<'_>, shape: Option<&Value>) -> Option<Value> {
        let fields = shape?.get("entity")?.as_array()?;
        let entity = event.subject().entity.as_ref()?;
        let data: Map<String, Value> = fields
            .iter()
            .filter_map(Value::as_str)
            .filter_map(|field| Some((field.to_string(), entity.get(field)?.clone())))
            .collect();
        Some(Value::Object(data))
    }
}

impl Default for ApiListener {
    fn default() -> Self {
        Self::new(Value::Null)
    }
}

impl Listener for ApiListener {
    fn implemented_events(&self) -> Vec<Subscription> {
        vec![
            Subscription::from(EventName::BeforeHandle).with_priority(CHECK_PRIORITY),
            Subscription::from(EventName::BeforeRender).with_priority(RESPOND_PRIORITY),
            Subscription::from(EventName::BeforeRedirect).with_priority(RESPOND_PRIORITY),
        ]
    }

    fn on_event(&self, event: &mut Event<'_>) -> Result<HookResult, CrudError> {
        if !event.request().is_api() {
            return Ok(HookResult::Next);
        }
        let Some(action) = event.action().filter(|action| action.enabled()) else {
            return Ok(HookResult::Next);
        };

        if event.is(EventName::BeforeHandle) {
            self.check_method(event, action)
        } else {
            self.respond(event, action)
        }
    }

    fn config(&self) -> &ConfigStore {
        &self.config
    }

    fn config_mut(&mut self) -> &mut ConfigStore {
        &mut self.config
    }
}
