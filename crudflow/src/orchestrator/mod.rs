//! The orchestrator and its registries.

pub(crate) mod catalog;
pub(crate) mod registry;

pub use catalog::{ActionFactory, Catalog, ListenerFactory};
pub use registry::{ActionRegistry, CLASS_NAME, ListenerRegistry, normalize};

use crudflow_core::{
    Action, ActionContext, ConfigStore, CrudError, EventBus, EventName, Handled, Host,
    IntoHookResult, Listener, ListenerId, LoggedEvent, Outcome, Response, Subject,
};
use crudflow_std::actions::messages;
use serde_json::{Value, json};
use std::{fmt, sync::Arc};

/// Which registry [`Crud::defaults`] writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Action mappings.
    Actions,
    /// Listener mappings.
    Listeners,
}

/// Entry point of the pipeline for one request.
///
/// Holds the host, the event bus and the lazy registries. `execute` loads
/// the configured listeners, resolves the action, raises `beforeHandle`,
/// runs the action and renders its view unless a response was produced.
///
/// # Example
///
/// ```rust,ignore
/// let mut crud = Crud::new(host, json!({
///     "actions": ["Crud.Index", "Crud.Add"],
///     "listeners": ["Crud.Redirect"]
/// }));
/// let response = crud.execute("add", vec![])?;
/// ```
pub struct Crud {
    host: Arc<dyn Host>,
    config: ConfigStore,
    catalog: Catalog,
    bus: EventBus,
    actions: ActionRegistry,
    listeners: ListenerRegistry,
    listeners_loaded: bool,
    current: Option<String>,
}

impl Crud {
    /// Create an orchestrator using the standard catalog.
    pub fn new(host: Arc<dyn Host>, config: Value) -> Self {
        Self::with_catalog(host, config, Catalog::standard())
    }

    /// Create an orchestrator resolving tags through `catalog`.
    pub fn with_catalog(host: Arc<dyn Host>, config: Value, catalog: Catalog) -> Self {
        let config = ConfigStore::with_defaults(Self::default_config(), config);
        let prefix = config
            .get_str("eventPrefix")
            .unwrap_or(crudflow_core::DEFAULT_PREFIX);
        let mut bus = EventBus::with_prefix(prefix);
        bus.set_logging(config.get_bool("eventLogging").unwrap_or(false));

        let actions = ActionRegistry::new(config.get("actions").unwrap_or(&Value::Null));
        let listeners = ListenerRegistry::new(config.get("listeners").unwrap_or(&Value::Null));

        Self {
            host,
            config,
            catalog,
            bus,
            actions,
            listeners,
            listeners_loaded: false,
            current: None,
        }
    }

    /// Orchestrator configuration defaults.
    pub fn default_config() -> Value {
        json!({
            "actions": {},
            "listeners": {},
            "eventPrefix": crudflow_core::DEFAULT_PREFIX,
            "eventLogging": false,
            "messages": messages::default_messages()
        })
    }

    // ========================================================================
    // Execution
    // ========================================================================

    /// Run `action` for the current request.
    ///
    /// Returns `None` when the action is disabled and the host should route
    /// the request itself.
    ///
    /// # Errors
    ///
    /// Configuration errors, client errors raised by the action, and any
    /// error returned by a handler.
    pub fn execute(&mut self, action: &str, args: Vec<String>) -> Result<Option<Response>, CrudError> {
        self.run(action, args).inspect_err(report)
    }

    fn run(&mut self, action: &str, args: Vec<String>) -> Result<Option<Response>, CrudError> {
        self.load_listeners()?;

        let mut name = action.to_string();
        self.actions.resolve(&name, &self.catalog)?;
        self.current = Some(name.clone());

        #[cfg(feature = "tracing")]
        tracing::debug!(action = %name, args = ?args, "Executing action");

        let mut subject = Subject::for_action(name.clone(), args);
        subject.repository = Some(self.host.repository().alias().to_string());
        let outcome = self.bus.trigger(
            EventName::BeforeHandle.as_str(),
            &mut subject,
            self.host.as_ref(),
            self.actions.get(&name),
        )?;
        if let Outcome::Respond(response) = outcome {
            return Ok(Some(response));
        }

        if let Some(rewritten) = subject.action.clone().filter(|rewritten| *rewritten != name) {
            #[cfg(feature = "tracing")]
            tracing::debug!(from = %name, to = %rewritten, "Action rewritten by beforeHandle");

            self.actions.resolve(&rewritten, &self.catalog)?;
            self.current = Some(rewritten.clone());
            name = rewritten;
        }

        let action = self
            .actions
            .get(&name)
            .ok_or_else(|| CrudError::ActionNotConfigured(name.clone()))?;
        let host = self.host.as_ref();
        let ctx = ActionContext::new(&self.bus, host, &self.config);

        let response = match action.handle(&ctx, &subject.args)? {
            Handled::Declined => None,
            Handled::Respond(response) => Some(response),
            Handled::Render(subject) => {
                let view = action.view().unwrap_or(action.name());
                let vars = action.view_vars(&subject, host);
                Some(host.render(view, &vars)?)
            }
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(
            action = %name,
            status = response.as_ref().map(|response| response.status),
            "Action finished"
        );

        Ok(response)
    }

    /// Attach every configured listener. A no-op once done.
    pub fn load_listeners(&mut self) -> Result<(), CrudError> {
        if self.listeners_loaded {
            return Ok(());
        }
        self.listeners.load_all(&self.catalog, &mut self.bus)?;
        self.listeners_loaded = true;
        Ok(())
    }

    /// Trigger `event` against `subject` with the current action.
    pub fn trigger(&self, event: &str, subject: &mut Subject) -> Result<Outcome, CrudError> {
        self.bus
            .trigger(event, subject, self.host.as_ref(), self.current_action())
    }

    /// Events recorded so far. Empty unless `eventLogging` is on.
    pub fn event_log(&self) -> Vec<LoggedEvent> {
        self.bus.event_log()
    }

    // ========================================================================
    // Actions
    // ========================================================================

    /// Resolve the action mapped as `name`.
    pub fn action(&mut self, name: &str) -> Result<&mut (dyn Action + 'static), CrudError> {
        self.actions.resolve(name, &self.catalog)
    }

    /// The action being executed, if any.
    pub fn current_action(&self) -> Option<&dyn Action> {
        self.current
            .as_deref()
            .and_then(|name| self.actions.get(name))
    }

    /// Enable every action in `names`.
    pub fn enable(&mut self, names: &[&str]) -> Result<(), CrudError> {
        for name in names {
            self.action(name)?.enable();
        }
        Ok(())
    }

    /// Disable every action in `names`.
    pub fn disable(&mut self, names: &[&str]) -> Result<(), CrudError> {
        for name in names {
            self.action(name)?.disable();
        }
        Ok(())
    }

    /// Whether `name` is mapped and enabled.
    pub fn is_action(&self, name: &str) -> bool {
        self.actions.is_enabled(name)
    }

    /// Change the view of `action`.
    pub fn view(&mut self, action: &str, view: &str) -> Result<(), CrudError> {
        self.action(action)?.set_view(view);
        Ok(())
    }

    /// Change the view variable of `action`.
    pub fn view_var(&mut self, action: &str, name: &str) -> Result<(), CrudError> {
        self.action(action)?.set_view_var(name);
        Ok(())
    }

    /// Change the finder of `action`.
    pub fn find_method(&mut self, action: &str, finder: Value) -> Result<(), CrudError> {
        self.action(action)?.set_find_method(finder);
        Ok(())
    }

    /// Map `name` to `mapping`, disabled unless `enable`.
    pub fn map_action(&mut self, name: &str, mapping: Value, enable: bool) {
        self.actions.map(name, &mapping);
        if !enable {
            self.actions.defaults(name, json!({"enabled": false}));
        }
    }

    /// Whether `name` has an action mapping.
    pub fn is_action_mapped(&self, name: &str) -> bool {
        self.actions.is_mapped(name)
    }

    // ========================================================================
    // Listeners
    // ========================================================================

    /// Subscribe a callback to `event`.
    pub fn on<F, R>(&mut self, event: &str, priority: i32, callback: F)
    where
        F: Fn(&mut crudflow_core::Event<'_>) -> R + Send + Sync + 'static,
        R: IntoHookResult,
    {
        self.bus.on(event, priority, callback);
    }

    /// The listener mapped as `name`, attaching it if needed.
    pub fn listener(&mut self, name: &str) -> Result<&dyn Listener, CrudError> {
        let id = self.listeners.resolve(name, &self.catalog, &mut self.bus)?;
        self.bus
            .listener(id)
            .ok_or_else(|| CrudError::ListenerNotConfigured(name.to_string()))
    }

    /// Map a listener. It is attached immediately when listeners are
    /// already loaded.
    pub fn add_listener(&mut self, name: &str, mapping: Value) -> Result<(), CrudError> {
        self.listeners.map(name, &mapping);
        if self.listeners_loaded {
            self.listeners.resolve(name, &self.catalog, &mut self.bus)?;
        }
        Ok(())
    }

    /// Attach an already built listener under `name`.
    pub fn attach_listener(
        &mut self,
        name: &str,
        listener: Box<dyn Listener>,
    ) -> Result<ListenerId, CrudError> {
        self.listeners.attach(name, listener, &mut self.bus)
    }

    /// Remove the listener mapped as `name`. Returns `false` if it wasn't.
    pub fn remove_listener(&mut self, name: &str) -> bool {
        self.listeners.remove(name, &mut self.bus)
    }

    /// Merge `config` into every entry of `names`: into live instances when
    /// loaded, otherwise into their mappings.
    pub fn defaults(&mut self, kind: Kind, names: &[&str], config: Value) {
        for name in names {
            match kind {
                Kind::Actions => self.actions.defaults(name, config.clone()),
                Kind::Listeners => self.listeners.defaults(name, config.clone(), &mut self.bus),
            }
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Orchestrator configuration.
    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    /// Mutable orchestrator configuration.
    pub fn config_mut(&mut self) -> &mut ConfigStore {
        &mut self.config
    }

    /// The host collaborator.
    pub fn host(&self) -> &dyn Host {
        self.host.as_ref()
    }

    /// The event bus.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }
}

impl fmt::Debug for Crud {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Crud")
            .field("host", &self.host.name())
            .field("actions", &self.actions.names())
            .field("listeners", &self.listeners.names())
            .field("current", &self.current)
            .finish()
    }
}

fn report(err: &CrudError) {
    #[cfg(feature = "tracing")]
    {
        if err.is_config_error() {
            tracing::warn!(error = %err, "Crud misconfiguration");
        } else {
            tracing::debug!(error = %err, status = err.status(), "Action failed");
        }
    }
    #[cfg(not(feature = "tracing"))]
    {
        let _ = err; // Suppress unused warning
    }
}
