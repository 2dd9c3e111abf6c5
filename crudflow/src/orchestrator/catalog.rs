//! Implementation tags and their factories.
//!
//! Mappings name an implementation by tag (`"Crud.Index"`, `"App.Publish"`).
//! The catalog is the only place a tag turns into a concrete type, and it is
//! populated explicitly by the application.

use crudflow_core::{Action, Listener};
use crudflow_std::{
    AddAction, ApiListener, BulkAction, BulkDelete, BulkSetValue, BulkToggle, DeleteAction,
    EditAction, IndexAction, LoggingListener, LookupAction, RedirectListener, ViewAction,
};
use serde_json::Value;
use std::{collections::HashMap, fmt, sync::Arc};

/// Builds an action from its mapped name and instance overrides.
pub type ActionFactory = Arc<dyn Fn(&str, Value) -> Box<dyn Action> + Send + Sync>;

/// Builds a listener from its instance overrides.
pub type ListenerFactory = Arc<dyn Fn(Value) -> Box<dyn Listener> + Send + Sync>;

/// Tag to factory tables for actions and listeners.
///
/// # Example
///
/// ```rust,ignore
/// let catalog = Catalog::standard()
///     .with_action("App.Publish", |name, overrides| {
///         Box::new(BulkAction::new(name, overrides, Publish))
///     });
/// ```
#[derive(Clone, Default)]
pub struct Catalog {
    actions: HashMap<String, ActionFactory>,
    listeners: HashMap<String, ListenerFactory>,
}

impl Catalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// The catalog of every standard `Crud.*` implementation.
    pub fn standard() -> Self {
        Self::new()
            .with_action("Crud.Index", |name, overrides| {
                Box::new(IndexAction::new(name, overrides))
            })
            .with_action("Crud.View", |name, overrides| {
                Box::new(ViewAction::new(name, overrides))
            })
            .with_action("Crud.Add", |name, overrides| {
                Box::new(AddAction::new(name, overrides))
            })
            .with_action("Crud.Edit", |name, overrides| {
                Box::new(EditAction::new(name, overrides))
            })
            .with_action("Crud.Delete", |name, overrides| {
                Box::new(DeleteAction::new(name, overrides))
            })
            .with_action("Crud.Lookup", |name, overrides| {
                Box::new(LookupAction::new(name, overrides))
            })
            .with_action("Crud.Bulk/Delete", |name, overrides| {
                Box::new(BulkAction::new(name, overrides, BulkDelete))
            })
            .with_action("Crud.Bulk/SetValue", |name, overrides| {
                Box::new(BulkAction::new(name, overrides, BulkSetValue))
            })
            .with_action("Crud.Bulk/Toggle", |name, overrides| {
                Box::new(BulkAction::new(name, overrides, BulkToggle))
            })
            .with_listener("Crud.Redirect", |overrides| {
                Box::new(RedirectListener::new(overrides))
            })
            .with_listener("Crud.Api", |overrides| Box::new(ApiListener::new(overrides)))
            .with_listener("Crud.Logging", |overrides| {
                Box::new(LoggingListener::new(overrides))
            })
    }

    /// Register an action factory under `tag`, replacing any previous one.
    pub fn with_action<F>(mut self, tag: &str, factory: F) -> Self
    where
        F: Fn(&str, Value) -> Box<dyn Action> + Send + Sync + 'static,
    {
        self.register_action(tag, factory);
        self
    }

    /// Register an action factory under `tag` (mutable version).
    pub fn register_action<F>(&mut self, tag: &str, factory: F)
    where
        F: Fn(&str, Value) -> Box<dyn Action> + Send + Sync + 'static,
    {
        self.actions.insert(tag.to_string(), Arc::new(factory));
    }

    /// Register a listener factory under `tag`, replacing any previous one.
    pub fn with_listener<F>(mut self, tag: &str, factory: F) -> Self
    where
        F: Fn(Value) -> Box<dyn Listener> + Send + Sync + 'static,
    {
        self.register_listener(tag, factory);
        self
    }

    /// Register a listener factory under `tag` (mutable version).
    pub fn register_listener<F>(&mut self, tag: &str, factory: F)
    where
        F: Fn(Value) -> Box<dyn Listener> + Send + Sync + 'static,
    {
        self.listeners.insert(tag.to_string(), Arc::new(factory));
    }

    /// The action factory registered under `tag`.
    pub fn action(&self, tag: &str) -> Option<&ActionFactory> {
        self.actions.get(tag)
    }

    /// The listener factory registered under `tag`.
    pub fn listener(&self, tag: &str) -> Option<&ListenerFactory> {
        self.listeners.get(tag)
    }
}

impl fmt::Debug for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut actions: Vec<&str> = self.actions.keys().map(String::as_str).collect();
        let mut listeners: Vec<&str> = self.listeners.keys().map(String::as_str).collect();
        actions.sort_unstable();
        listeners.sort_unstable();
        f.debug_struct("Catalog")
            .field("actions", &actions)
            .field("listeners", &listeners)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_standard_tags() {
        let catalog = Catalog::standard();
        for tag in ["Crud.Index", "Crud.Add", "Crud.Bulk/Toggle"] {
            assert!(catalog.action(tag).is_some(), "{tag} is registered");
        }
        assert!(catalog.listener("Crud.Api").is_some());
        assert!(catalog.action("Crud.Missing").is_none());
    }

    #[test]
    fn test_factory_receives_name_and_overrides() {
        let catalog = Catalog::standard();
        let factory = catalog.action("Crud.Index").unwrap();
        let action = factory("list", json!({"view": "overview"}));
        assert_eq!(action.name(), "list");
        assert_eq!(action.view(), Some("overview"));
    }
}
