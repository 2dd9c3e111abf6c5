//! Lazy action and listener registries.
//!
//! Both registries keep a table of mappings, `name -> {className, ...overrides}`,
//! and instantiate an entry the first time it is referenced. Instances are
//! cached by name for the lifetime of the orchestrator.

use super::catalog::Catalog;
use crudflow_core::{Action, CrudError, EventBus, Listener, ListenerId, merge_value, text};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Key holding the implementation tag inside a mapping.
pub const CLASS_NAME: &str = "className";

// ============================================================================
// Mapping normalisation
// ============================================================================

/// Normalise a mapping table.
///
/// Accepts a map (`name -> tag`, `name -> {className, ...}` or
/// `name -> null`) or a list of tags (`"Crud.Index"` is mapped as `index`).
/// Entries without a `className` get `Crud.<Name>`.
pub fn normalize(mappings: &Value) -> Map<String, Value> {
    let mut out = Map::new();
    match mappings {
        Value::Array(tags) => {
            for tag in tags.iter().filter_map(Value::as_str) {
                out.insert(name_of(tag), Value::Object(mapping(tag.into())));
            }
        }
        Value::Object(entries) => {
            for (name, entry) in entries {
                let mut entry = normalize_entry(entry);
                if !entry.contains_key(CLASS_NAME) {
                    entry.insert(CLASS_NAME.into(), default_tag(name).into());
                }
                out.insert(name.clone(), Value::Object(entry));
            }
        }
        _ => {}
    }
    out
}

/// Normalise one mapping entry. A string is a tag.
pub fn normalize_entry(entry: &Value) -> Map<String, Value> {
    match entry {
        Value::String(tag) => mapping(tag.clone()),
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    }
}

fn mapping(tag: String) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(CLASS_NAME.into(), Value::String(tag));
    map
}

fn name_of(tag: &str) -> String {
    let class = tag.rsplit('.').next().unwrap_or(tag);
    text::variable(&class.replace('/', ""))
}

fn default_tag(name: &str) -> String {
    format!("Crud.{}", text::ucfirst(name))
}

/// Split a mapping into its tag and instance overrides.
fn split(mapping: &Value) -> (Option<String>, Value) {
    let mut overrides = mapping.as_object().cloned().unwrap_or_default();
    let tag = match overrides.remove(CLASS_NAME) {
        Some(Value::String(tag)) => Some(tag),
        _ => None,
    };
    (tag, Value::Object(overrides))
}

// ============================================================================
// ActionRegistry
// ============================================================================

/// Resolves logical action names to cached instances.
#[derive(Default)]
pub struct ActionRegistry {
    mappings: Map<String, Value>,
    instances: HashMap<String, Box<dyn Action>>,
}

impl ActionRegistry {
    /// A registry over `mappings` (see [`normalize`]).
    pub fn new(mappings: &Value) -> Self {
        Self {
            mappings: normalize(mappings),
            instances: HashMap::new(),
        }
    }

    /// Map (or remap) `name`. A cached instance is discarded.
    pub fn map(&mut self, name: &str, mapping: &Value) {
        let mut entry = normalize_entry(mapping);
        if !entry.contains_key(CLASS_NAME) {
            entry.insert(CLASS_NAME.into(), default_tag(name).into());
        }
        self.mappings.insert(name.to_string(), Value::Object(entry));
        self.instances.remove(name);
    }

    /// Whether `name` has a mapping.
    pub fn is_mapped(&self, name: &str) -> bool {
        self.mappings.contains_key(name)
    }

    /// The mapping of `name`.
    pub fn mapping(&self, name: &str) -> Option<&Value> {
        self.mappings.get(name)
    }

    /// Mapped names, in mapping order.
    pub fn names(&self) -> Vec<String> {
        self.mappings.keys().cloned().collect()
    }

    /// Whether `name` is mapped and enabled. Does not instantiate.
    pub fn is_enabled(&self, name: &str) -> bool {
        if let Some(action) = self.get(name) {
            return action.enabled();
        }
        self.mappings.get(name).is_some_and(|mapping| {
            mapping
                .get("enabled")
                .and_then(Value::as_bool)
                .unwrap_or(true)
        })
    }

    /// The cached instance of `name`, if already resolved.
    pub fn get(&self, name: &str) -> Option<&dyn Action> {
        self.instances.get(name).map(|action| &**action)
    }

    /// Resolve `name`, instantiating it on first use.
    ///
    /// # Errors
    ///
    /// [`CrudError::ActionNotConfigured`] when `name` has no mapping,
    /// [`CrudError::MissingAction`] when its tag has no factory.
    pub fn resolve(
        &mut self,
        name: &str,
        catalog: &Catalog,
    ) -> Result<&mut (dyn Action + 'static), CrudError> {
        if !self.instances.contains_key(name) {
            let action = self.instantiate(name, catalog)?;
            self.instances.insert(name.to_string(), action);
        }
        self.instances
            .get_mut(name)
            .map(|action| &mut **action)
            .ok_or_else(|| CrudError::ActionNotConfigured(name.to_string()))
    }

    fn instantiate(&self, name: &str, catalog: &Catalog) -> Result<Box<dyn Action>, CrudError> {
        let mapping = self
            .mappings
            .get(name)
            .ok_or_else(|| CrudError::ActionNotConfigured(name.to_string()))?;
        let (tag, overrides) = split(mapping);
        let tag = tag.unwrap_or_else(|| default_tag(name));
        let factory = catalog
            .action(&tag)
            .ok_or_else(|| CrudError::MissingAction(tag.clone()))?;

        #[cfg(feature = "tracing")]
        tracing::debug!(action = name, class = %tag, "Instantiating action");

        Ok(factory(name, overrides))
    }

    /// Merge `config` into `name`: into the live instance when resolved,
    /// otherwise into its mapping.
    pub fn defaults(&mut self, name: &str, config: Value) {
        if let Some(action) = self.instances.get_mut(name) {
            action.config_mut().merge(config);
            return;
        }
        let entry = self
            .mappings
            .entry(name.to_string())
            .or_insert_with(|| Value::Object(mapping(default_tag(name))));
        merge_value(entry, config);
    }
}

// ============================================================================
// ListenerRegistry
// ============================================================================

/// Resolves logical listener names to instances attached to an [`EventBus`].
#[derive(Default)]
pub struct ListenerRegistry {
    mappings: Map<String, Value>,
    loaded: HashMap<String, ListenerId>,
}

impl ListenerRegistry {
    /// A registry over `mappings` (see [`normalize`]).
    pub fn new(mappings: &Value) -> Self {
        Self {
            mappings: normalize(mappings),
            loaded: HashMap::new(),
        }
    }

    /// Map (or remap) `name`. Does not touch an already attached instance.
    pub fn map(&mut self, name: &str, mapping: &Value) {
        let mut entry = normalize_entry(mapping);
        if !entry.contains_key(CLASS_NAME) {
            entry.insert(CLASS_NAME.into(), default_tag(name).into());
        }
        self.mappings.insert(name.to_string(), Value::Object(entry));
    }

    /// Whether `name` has a mapping.
    pub fn is_mapped(&self, name: &str) -> bool {
        self.mappings.contains_key(name)
    }

    /// Mapped names, in mapping order.
    pub fn names(&self) -> Vec<String> {
        self.mappings.keys().cloned().collect()
    }

    /// Bus handle of `name`, if already attached.
    pub fn id(&self, name: &str) -> Option<ListenerId> {
        self.loaded.get(name).copied()
    }

    /// Resolve `name`, instantiating and attaching it on first use.
    ///
    /// # Errors
    ///
    /// [`CrudError::ListenerNotConfigured`] when `name` has no mapping,
    /// [`CrudError::MissingListener`] when its tag has no factory, or
    /// whatever the listener's `setup` returns.
    pub fn resolve(
        &mut self,
        name: &str,
        catalog: &Catalog,
        bus: &mut EventBus,
    ) -> Result<ListenerId, CrudError> {
        if let Some(id) = self.id(name) {
            return Ok(id);
        }

        let mapping = self
            .mappings
            .get(name)
            .ok_or_else(|| CrudError::ListenerNotConfigured(name.to_string()))?;
        let (tag, overrides) = split(mapping);
        let tag = tag.unwrap_or_else(|| default_tag(name));
        let factory = catalog
            .listener(&tag)
            .ok_or_else(|| CrudError::MissingListener(tag.clone()))?;

        #[cfg(feature = "tracing")]
        tracing::debug!(listener = name, class = %tag, "Attaching listener");

        self.attach(name, factory(overrides), bus)
    }

    /// Resolve every mapped listener, in mapping order.
    pub fn load_all(&mut self, catalog: &Catalog, bus: &mut EventBus) -> Result<(), CrudError> {
        for name in self.names() {
            self.resolve(&name, catalog, bus)?;
        }
        Ok(())
    }

    /// Attach an already built listener under `name`, replacing a previously
    /// attached one.
    pub fn attach(
        &mut self,
        name: &str,
        mut listener: Box<dyn Listener>,
        bus: &mut EventBus,
    ) -> Result<ListenerId, CrudError> {
        listener.setup()?;
        if let Some(previous) = self.loaded.remove(name) {
            bus.detach(previous);
        }
        if !self.mappings.contains_key(name) {
            self.mappings
                .insert(name.to_string(), Value::Object(Map::new()));
        }
        let id = bus.attach(listener);
        self.loaded.insert(name.to_string(), id);
        Ok(id)
    }

    /// Remove the mapping of `name` and detach its instance.
    ///
    /// Returns `false` when `name` was not mapped.
    pub fn remove(&mut self, name: &str, bus: &mut EventBus) -> bool {
        if self.mappings.shift_remove(name).is_none() {
            return false;
        }
        if let Some(id) = self.loaded.remove(name) {
            bus.detach(id);
        }
        true
    }

    /// Merge `config` into `name`: into the live instance when attached,
    /// otherwise into its mapping.
    pub fn defaults(&mut self, name: &str, config: Value, bus: &mut EventBus) {
        if let Some(listener) = self.id(name).and_then(|id| bus.listener_mut(id)) {
            listener.config_mut().merge(config);
            return;
        }
        let entry = self
            .mappings
            .entry(name.to_string())
            .or_insert_with(|| Value::Object(mapping(default_tag(name))));
        merge_value(entry, config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_normalize_list_of_tags() {
        let mappings = normalize(&json!(["Crud.Index", "Crud.View", "Crud.Bulk/Delete"]));
        assert_eq!(
            Value::Object(mappings),
            json!({
                "index": {"className": "Crud.Index"},
                "view": {"className": "Crud.View"},
                "bulkDelete": {"className": "Crud.Bulk/Delete"}
            })
        );
    }

    #[test]
    fn test_normalize_map_defaults_class_name() {
        let mappings = normalize(&json!({
            "add": {"view": "form"},
            "archive": "Crud.Bulk/SetValue",
            "index": null
        }));
        assert_eq!(
            Value::Object(mappings),
            json!({
                "add": {"view": "form", "className": "Crud.Add"},
                "archive": {"className": "Crud.Bulk/SetValue"},
                "index": {"className": "Crud.Index"}
            })
        );
    }

    #[test]
    fn test_resolve_caches_instances() {
        let catalog = Catalog::standard();
        let mut registry = ActionRegistry::new(&json!({"index": {"view": "listing"}}));
        assert!(registry.get("index").is_none(), "Resolution is lazy");

        registry.resolve("index", &catalog).unwrap().set_view("changed");
        let action = registry.resolve("index", &catalog).unwrap();
        assert_eq!(action.view(), Some("changed"), "Second resolve hits the cache");
    }

    #[test]
    fn test_resolution_errors() {
        let catalog = Catalog::standard();
        let mut registry = ActionRegistry::new(&json!({"publish": "App.Publish"}));
        assert!(matches!(
            registry.resolve("missing", &catalog),
            Err(CrudError::ActionNotConfigured(name)) if name == "missing"
        ));
        assert!(matches!(
            registry.resolve("publish", &catalog),
            Err(CrudError::MissingAction(tag)) if tag == "App.Publish"
        ));

        let mut listeners = ListenerRegistry::new(&json!(["Crud.Nope"]));
        let mut bus = EventBus::new();
        assert!(matches!(
            listeners.resolve("nope", &catalog, &mut bus),
            Err(CrudError::MissingListener(_))
        ));
        assert!(matches!(
            listeners.resolve("api", &catalog, &mut bus),
            Err(CrudError::ListenerNotConfigured(_))
        ));
    }

    #[test]
    fn test_defaults_before_and_after_load() {
        let catalog = Catalog::standard();
        let mut registry = ActionRegistry::new(&json!(["Crud.Index"]));
        registry.defaults("index", json!({"view": "early"}));
        assert_eq!(registry.resolve("index", &catalog).unwrap().view(), Some("early"));

        registry.defaults("index", json!({"view": "late"}));
        assert_eq!(registry.get("index").and_then(|a| a.view()), Some("late"));
    }

    #[test]
    fn test_listener_attach_and_remove() {
        let catalog = Catalog::standard();
        let mut bus = EventBus::new();
        let mut registry = ListenerRegistry::new(&json!(["Crud.Api"]));
        registry.load_all(&catalog, &mut bus).unwrap();
        assert_eq!(bus.handler_count("beforeHandle"), 1);

        assert!(registry.remove("api", &mut bus));
        assert_eq!(bus.handler_count("beforeHandle"), 0);
        assert!(!registry.remove("api", &mut bus), "Already removed");
    }
}
