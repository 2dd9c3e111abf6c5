//! # Actions
//!
//! An [`Action`] is the handler of one logical operation (`index`, `add`,
//! `edit`, ...). It picks a code path by HTTP verb and runs a fixed sequence
//! of lifecycle events around the repository calls.
//!
//! Implementations provide [`Action::dispatch`]; the provided
//! [`Action::handle`] takes care of the enabled check and verb selection.

use crate::{
    bus::EventBus,
    config::ConfigStore,
    error::CrudError,
    event::EventName,
    host::{Host, Method, Request, Verbs, ViewVars},
    repository::Repository,
    response::{Flow, Handled},
    subject::Subject,
    text,
};
use serde_json::{Map, Value};

/// What an action operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// A list of records.
    Table,
    /// A single record.
    Entity,
    /// A set of records selected by identifier.
    Bulk,
}

impl Scope {
    /// Parse a configuration value.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "table" => Some(Scope::Table),
            "entity" => Some(Scope::Entity),
            "bulk" => Some(Scope::Bulk),
            _ => None,
        }
    }

    /// Configuration value.
    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Table => "table",
            Scope::Entity => "entity",
            Scope::Bulk => "bulk",
        }
    }
}

/// Everything an action needs while it runs.
#[derive(Clone, Copy)]
pub struct ActionContext<'a> {
    bus: &'a EventBus,
    host: &'a dyn Host,
    settings: &'a ConfigStore,
}

impl<'a> ActionContext<'a> {
    /// Create a context.
    pub fn new(bus: &'a EventBus, host: &'a dyn Host, settings: &'a ConfigStore) -> Self {
        Self {
            bus,
            host,
            settings,
        }
    }

    /// The event bus.
    pub fn bus(&self) -> &'a EventBus {
        self.bus
    }

    /// The host framework.
    pub fn host(&self) -> &'a dyn Host {
        self.host
    }

    /// The current request.
    pub fn request(&self) -> &'a Request {
        self.host.request()
    }

    /// Repository of the current resource.
    pub fn repository(&self) -> &'a dyn Repository {
        self.host.repository()
    }

    /// Orchestrator-wide settings (shared message templates and the like).
    pub fn settings(&self) -> &'a ConfigStore {
        self.settings
    }

    /// Trigger `name` on behalf of `action`.
    ///
    /// A listener response comes back as `Err(Halt::Respond(..))` so that `?`
    /// abandons the rest of the pipeline.
    pub fn trigger(&self, action: &dyn Action, name: EventName, subject: &mut Subject) -> Flow {
        self.bus
            .trigger(name.as_str(), subject, self.host, Some(action))?
            .proceed()
    }

    /// A fresh subject for an operation of `action`.
    pub fn subject(&self, action: &dyn Action) -> Subject {
        let mut subject = Subject::for_action(action.name(), Vec::new());
        subject.repository = Some(self.repository().alias().to_string());
        subject
    }
}

/// Handler of one logical operation.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not an `Action`",
    label = "missing `Action` implementation",
    note = "Actions declare their `verbs` and implement `dispatch`."
)]
pub trait Action: Send + Sync + 'static {
    /// Logical name the action was mapped under.
    fn name(&self) -> &str;

    /// The action's configuration.
    fn config(&self) -> &ConfigStore;

    /// Mutable access to the action's configuration.
    fn config_mut(&mut self) -> &mut ConfigStore;

    /// Verbs with a dedicated code path.
    fn verbs(&self) -> Verbs;

    /// Whether a generic code path handles verbs outside [`Action::verbs`].
    fn has_fallback(&self) -> bool {
        false
    }

    /// Run the code path for `method`, or the generic path when `None`.
    fn dispatch(
        &self,
        method: Option<Method>,
        ctx: &ActionContext<'_>,
        args: &[String],
    ) -> Flow<Handled>;

    /// Handle the current request.
    ///
    /// A disabled action declines without raising any event. A verb with no
    /// code path and no fallback is [`CrudError::NotImplemented`].
    fn handle(&self, ctx: &ActionContext<'_>, args: &[String]) -> Result<Handled, CrudError> {
        if !self.enabled() {
            return Ok(Handled::Declined);
        }

        let method = ctx.request().method;
        let route = if self.verbs().contains(method.verb()) {
            Some(method)
        } else if self.has_fallback() {
            None
        } else {
            return Err(CrudError::NotImplemented {
                action: self.name().to_string(),
                method,
            });
        };

        Handled::from_flow(self.dispatch(route, ctx, args))
    }

    /// Whether the action may be invoked.
    fn enabled(&self) -> bool {
        self.config().get_bool("enabled").unwrap_or(true)
    }

    /// Enable the action.
    fn enable(&mut self) {
        self.config_mut().set("enabled", true);
    }

    /// Disable the action.
    fn disable(&mut self) {
        self.config_mut().set("enabled", false);
    }

    /// What the action operates on.
    fn scope(&self) -> Scope {
        self.config()
            .get_str("scope")
            .and_then(Scope::parse)
            .unwrap_or(Scope::Entity)
    }

    /// Configured view name.
    fn view(&self) -> Option<&str> {
        self.config().get_str("view")
    }

    /// Change the view name.
    fn set_view(&mut self, view: &str) {
        self.config_mut().set("view", view);
    }

    /// Name of the view variable holding the entity or entities.
    ///
    /// Defaults to the camel-cased resource name, singular for entity scope.
    fn view_var(&self, host: &dyn Host) -> String {
        if let Some(name) = self.config().get_str("viewVar") {
            return name.to_string();
        }
        match self.scope() {
            Scope::Entity => text::variable(&text::singularize(host.name())),
            Scope::Table | Scope::Bulk => text::variable(host.name()),
        }
    }

    /// Change the view variable name.
    fn set_view_var(&mut self, name: &str) {
        self.config_mut().set("viewVar", name);
    }

    /// Finder name and options. `findMethod` is either a finder name or a
    /// single-entry `{finder: options}` map.
    fn find_method(&self) -> (String, Map<String, Value>) {
        match self.config().get("findMethod") {
            Some(Value::String(finder)) => (finder.clone(), Map::new()),
            Some(Value::Object(map)) => map
                .iter()
                .next()
                .map(|(finder, options)| {
                    (finder.clone(), options.as_object().cloned().unwrap_or_default())
                })
                .unwrap_or_else(|| ("all".to_string(), Map::new())),
            _ => ("all".to_string(), Map::new()),
        }
    }

    /// Change the finder.
    fn set_find_method(&mut self, finder: Value) {
        self.config_mut().set_with("findMethod", finder, false);
    }

    /// Redirect rules by name, as configured under `redirect`.
    fn redirect_rules(&self) -> Map<String, Value> {
        self.config()
            .get_map("redirect")
            .cloned()
            .unwrap_or_default()
    }

    /// Resource name used in messages: the humanised, lower-cased repository
    /// alias, singular for entity scope.
    fn resource_name(&self, repository: &dyn Repository) -> String {
        if let Some(name) = self.config().get_str("name") {
            return name.to_string();
        }
        let name = text::humanize(&text::underscore(repository.alias())).to_lowercase();
        match self.scope() {
            Scope::Entity => text::singularize(&name),
            Scope::Table | Scope::Bulk => name,
        }
    }

    /// Variables to publish to the view for a finished `subject`.
    fn view_vars(&self, subject: &Subject, host: &dyn Host) -> ViewVars {
        let mut vars = ViewVars::new();
        vars.insert("success".into(), Value::Bool(subject.success.unwrap_or(false)));

        let view_var = self.view_var(host);
        let data = match self.scope() {
            Scope::Entity => subject
                .entity
                .as_ref()
                .map(|entity| Value::Object(entity.fields().clone())),
            Scope::Table | Scope::Bulk => subject.entities.as_ref().map(|entities| {
                Value::Array(
                    entities
                        .iter()
                        .map(|entity| Value::Object(entity.fields().clone()))
                        .collect(),
                )
            }),
        };
        if let Some(data) = data {
            vars.insert(view_var.clone(), data);
        }
        if let Some(paging) = subject.paging {
            if let Ok(paging) = serde_json::to_value(paging) {
                vars.insert("paging".into(), paging);
            }
        }
        vars.insert("viewVar".into(), Value::String(view_var));
        vars
    }
}
