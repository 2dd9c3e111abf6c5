//! Logging listener for pipeline observation.

use crudflow_core::{
    ConfigStore, CrudError, Event, EventName, HookResult, Listener, Subscription,
};
use serde_json::{Value, json};

/// Logs every well-known event with a summary of the subject.
pub struct LoggingListener {
    config: ConfigStore,
}

impl LoggingListener {
    /// Create the listener.
    pub fn new(overrides: Value) -> Self {
        Self {
            config: ConfigStore::with_defaults(Self::default_config(), overrides),
        }
    }

    /// Class-level configuration. `priority` places the handlers relative to
    /// other listeners.
    pub fn default_config() -> Value {
        json!({"priority": 1})
    }
}

impl Default for LoggingListener {
    fn default() -> Self {
        Self::new(Value::Null)
    }
}

impl Listener for LoggingListener {
    fn implemented_events(&self) -> Vec<Subscription> {
        let priority = self
            .config
            .get_i64("priority")
            .and_then(|priority| i32::try_from(priority).ok())
            .unwrap_or(1);
        EventName::ALL
            .into_iter()
            .map(|event| Subscription::from(event).with_priority(priority))
            .collect()
    }

    fn on_event(&self, event: &mut Event<'_>) -> Result<HookResult, CrudError> {
        #[cfg(feature = "tracing")]
        {
            let subject = event.subject();
            tracing::info!(
                event = event.name(),
                action = subject.action.as_deref().unwrap_or_default(),
                id = subject.id.as_deref().unwrap_or_default(),
                success = ?subject.success,
                "Crud event"
            );
        }
        #[cfg(not(feature = "tracing"))]
        {
            let _ = event; // Suppress unused warning
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
