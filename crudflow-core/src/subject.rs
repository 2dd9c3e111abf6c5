//! Per-operation event context.
//!
//! One [`Subject`] is created for each logical operation and threaded through
//! every event that operation raises. It is the only mutable state listeners,
//! actions and the orchestrator share.

use crate::{
    host::{FlashMessage, Url},
    repository::{Entity, Paging, Query},
};
use serde_json::{Map, Value};

/// Whether [`Subject::should_process`] selects or excludes the listed actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessMode {
    /// Process only the listed actions.
    Only,
    /// Process every action except the listed ones.
    Not,
}

/// Typed, mutable context of one operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Subject {
    /// Logical action name.
    pub action: Option<String>,
    /// Positional request arguments.
    pub args: Vec<String>,
    /// Identifier of the record being operated on.
    pub id: Option<String>,
    /// Identifiers of a bulk operation.
    pub ids: Vec<Value>,
    /// Repository alias.
    pub repository: Option<String>,
    /// Query about to run, or that ran.
    pub query: Option<Query>,
    /// The single entity of an entity-scoped operation.
    pub entity: Option<Entity>,
    /// Entities of a table-scoped operation.
    pub entities: Option<Vec<Entity>>,
    /// Pagination state after a paginated find.
    pub paging: Option<Paging>,
    /// Whether the operation succeeded.
    pub success: Option<bool>,
    /// Whether a new record was created.
    pub created: Option<bool>,
    /// Redirect target.
    pub url: Option<Url>,
    /// Redirect status.
    pub status: Option<u16>,
    /// Whether the redirect ends the request.
    pub exit: Option<bool>,
    /// Flash message about to be stored.
    pub flash: Option<FlashMessage>,
    extra: Map<String, Value>,
    events: Vec<String>,
    stopped: bool,
}

impl Subject {
    /// Create an empty subject.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subject for `action` invoked with `args`.
    pub fn for_action(action: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            action: Some(action.into()),
            args,
            ..Self::default()
        }
    }

    /// Shallow-merge listener-defined fields. Last write wins.
    pub fn set(&mut self, fields: Map<String, Value>) {
        self.extra.extend(fields);
    }

    /// Set one listener-defined field.
    pub fn set_field(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.extra.insert(key.into(), value.into());
    }

    /// Read a listener-defined field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// Listener-defined fields.
    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }

    /// Read a field by name, typed fields first.
    ///
    /// Used by configuration-driven readers such as redirect rules.
    pub fn field(&self, key: &str) -> Option<Value> {
        let typed = match key {
            "action" => self.action.clone().map(Value::String),
            "id" => self.id.clone().map(Value::String),
            "ids" => Some(Value::Array(self.ids.clone())),
            "repository" => self.repository.clone().map(Value::String),
            "success" => self.success.map(Value::Bool),
            "created" => self.created.map(Value::Bool),
            "status" => self.status.map(Value::from),
            _ => None,
        };
        typed.or_else(|| self.extra.get(key).cloned())
    }

    /// Record that `name` was raised against this subject.
    pub fn add_event(&mut self, name: impl Into<String>) {
        self.events.push(name.into());
    }

    /// Whether `name` was raised. Accepts the prefixed or the short name.
    pub fn has_event(&self, name: &str) -> bool {
        self.events
            .iter()
            .any(|event| event == name || short_name(event) == name)
    }

    /// Every event raised, prefixed, in order.
    pub fn events(&self) -> &[String] {
        &self.events
    }

    /// Every event raised, without prefix, in order.
    pub fn event_names(&self) -> Vec<&str> {
        self.events.iter().map(|event| short_name(event)).collect()
    }

    /// Stop the event currently being dispatched.
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    /// Whether the last triggered event was stopped.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Clear the stop flag before a new event is dispatched.
    pub(crate) fn resume(&mut self) {
        self.stopped = false;
    }

    /// Whether a listener restricted to `actions` should act on this subject.
    pub fn should_process(&self, mode: ProcessMode, actions: &[&str]) -> bool {
        let listed = self
            .action
            .as_deref()
            .is_some_and(|action| actions.contains(&action));
        match mode {
            ProcessMode::Only => listed,
            ProcessMode::Not => !listed,
        }
    }
}

fn short_name(event: &str) -> &str {
    event.split_once('.').map_or(event, |(_, name)| name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_log_is_ordered_and_keeps_duplicates() {
        let mut subject = Subject::new();
        subject.add_event("Crud.beforeFind");
        subject.add_event("Crud.afterFind");
        subject.add_event("Crud.beforeFind");

        assert_eq!(
            subject.event_names(),
            vec!["beforeFind", "afterFind", "beforeFind"]
        );
        assert!(subject.has_event("afterFind"));
        assert!(subject.has_event("Crud.afterFind"));
        assert!(!subject.has_event("beforeSave"));
    }

    #[test]
    fn test_set_is_shallow_last_write_wins() {
        let mut subject = Subject::new();
        subject.set_field("a", json!({"x": 1}));
        let mut fields = Map::new();
        fields.insert("a".into(), json!({"y": 2}));
        fields.insert("b".into(), json!(true));
        subject.set(fields);

        assert_eq!(subject.get("a"), Some(&json!({"y": 2})));
        assert_eq!(subject.field("b"), Some(json!(true)));
    }

    #[test]
    fn test_should_process() {
        let subject = Subject::for_action("edit", vec![]);
        assert!(subject.should_process(ProcessMode::Only, &["add", "edit"]));
        assert!(!subject.should_process(ProcessMode::Not, &["add", "edit"]));
        assert!(subject.should_process(ProcessMode::Not, &["index"]));
    }
}
