//! Configurable post-save redirects.
//!
//! Actions declare named rules under `redirect`:
//!
//! ```json
//! {"post_edit": {"reader": "request.data", "key": "_edit",
//!                "url": {"action": "edit", "0": ["entity.field", "id"]}}}
//! ```
//!
//! On `beforeRedirect` the first rule whose reader yields a truthy value for
//! its key replaces the redirect target. List values inside the URL are
//! `[reader, key]` pairs and are replaced by what the reader returns; the
//! `?` query map is expanded the same way.

use crudflow_core::{
    ConfigStore, CrudError, Event, EventName, HookResult, Listener, Subscription, Url, text,
};
use serde_json::{Map, Value, json};

/// Priority of the `beforeRedirect` handler.
pub const PRIORITY: i32 = 90;

/// Applies an action's redirect rules.
pub struct RedirectListener {
    config: ConfigStore,
}

impl RedirectListener {
    /// Create the listener.
    pub fn new(overrides: Value) -> Self {
        Self {
            config: ConfigStore::with_defaults(Self::default_config(), overrides),
        }
    }

    /// Class-level configuration.
    pub fn default_config() -> Value {
        json!({})
    }

    fn read(event: &Event<'_>, reader: &str, key: &str) -> Result<Option<Value>, CrudError> {
        let subject = event.subject();
        let request = event.request();
        let value = match reader {
            "request.key" => request.param(key).cloned(),
            "request.data" => request.data(key).cloned(),
            "request.query" => request.query(key).cloned(),
            "entity.field" => subject
                .entity
                .as_ref()
                .and_then(|entity| entity.get(key))
                .cloned(),
            "subject.key" => subject.field(key),
            other => return Err(CrudError::Config(format!("Invalid reader: {other}"))),
        };
        Ok(value)
    }

    fn expand(event: &Event<'_>, route: &Map<String, Value>) -> Result<Map<String, Value>, CrudError> {
        let mut out = Map::with_capacity(route.len());
        for (key, value) in route {
            let value = match value {
                Value::Object(query) if key == "?" => Value::Object(Self::expand(event, query)?),
                Value::Array(pair) => {
                    let reader = pair.first().and_then(Value::as_str).unwrap_or_default();
                    let field = pair.get(1).and_then(Value::as_str).unwrap_or_default();
                    Self::read(event, reader, field)?.unwrap_or(Value::Null)
                }
                other => other.clone(),
            };
            out.insert(key.clone(), value);
        }
        Ok(out)
    }

    fn url(event: &Event<'_>, url: &Value) -> Result<Option<Url>, CrudError> {
        match url {
            Value::Object(route) => Ok(Some(Url::Route(Self::expand(event, route)?))),
            other => Ok(Url::from_value(other)),
        }
    }
}

impl Default for RedirectListener {
    fn default() -> Self {
        Self::new(Value::Null)
    }
}

impl Listener for RedirectListener {
    fn implemented_events(&self) -> Vec<Subscription> {
        vec![Subscription::from(EventName::BeforeRedirect).with_priority(PRIORITY)]
    }

    fn on_event(&self, event: &mut Event<'_>) -> Result<HookResult, CrudError> {
        let Some(action) = event.action() else {
            return Ok(HookResult::Next);
        };

        for (name, rule) in action.redirect_rules() {
            let Some(rule) = rule.as_object() else {
                continue;
            };
            let reader = rule.get("reader").and_then(Value::as_str).unwrap_or_default();
            let key = rule.get("key").and_then(Value::as_str).unwrap_or_default();
            let matched = Self::read(event, reader, key)?.is_some_and(|value| text::truthy(&value));
            if !matched {
                continue;
            }

            let url = match rule.get("url") {
                Some(url) => Self::url(event, url)?,
                None => None,
            };
            let Some(url) = url else {
                continue;
            };

            #[cfg(feature = "tracing")]
            tracing::debug!(rule = %name, url = ?url, "Redirect rule matched");
            #[cfg(not(feature = "tracing"))]
            let _ = name;

            event.subject_mut().url = Some(url);
            break;
        }
        Ok(HookResult::Next)
    }

    fn config(&self) -> &ConfigStore {
        &self.config
    }

    fn config_mut(&mut self) -> &mut ConfigStore {
        &mut self.config
    }
}
