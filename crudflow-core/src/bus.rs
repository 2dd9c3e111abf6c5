//! Synchronous, priority-ordered, stoppable event dispatch.
//!
//! Handlers are bound to fully qualified event names (`"Crud.beforeSave"`).
//! Unqualified names are prefixed with the bus prefix. For every trigger:
//!
//! 1. the event name is appended to the subject's event log and the
//!    subject's stop flag is cleared,
//! 2. matching handlers run in ascending priority, ties in registration order,
//! 3. a handler that stops the event ends the loop; the trigger still
//!    returns [`Outcome::Continue`],
//! 4. a handler that responds ends the loop and the trigger returns
//!    [`Outcome::Respond`],
//! 5. a handler error is returned unchanged.

use crate::{
    action::Action,
    error::CrudError,
    event::Event,
    hook::{Hook, HookResult},
    host::Host,
    listener::{Listener, Subscription},
    response::Outcome,
    subject::Subject,
};
use std::sync::Mutex;

/// Default event prefix.
pub const DEFAULT_PREFIX: &str = "Crud";

/// Handle of a listener attached to an [`EventBus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(usize);

enum Target {
    Listener(ListenerId),
    Hook(Box<dyn Hook>),
}

struct Binding {
    event: String,
    priority: i32,
    target: Target,
}

/// A triggered event captured by the event log.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggedEvent {
    /// Fully qualified event name.
    pub name: String,
    /// Subject as it was when the event was triggered.
    pub subject: Subject,
}

/// The event bus of one request.
pub struct EventBus {
    prefix: String,
    listeners: Vec<Option<Box<dyn Listener>>>,
    bindings: Vec<Binding>,
    log: Option<Mutex<Vec<LoggedEvent>>>,
}

impl EventBus {
    /// Create a bus using the default prefix.
    pub fn new() -> Self {
        Self::with_prefix(DEFAULT_PREFIX)
    }

    /// Create a bus using `prefix`.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            listeners: Vec::new(),
            bindings: Vec::new(),
            log: None,
        }
    }

    /// The event prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Fully qualified name of `event`.
    pub fn qualify(&self, event: &str) -> String {
        if event.contains('.') {
            event.to_string()
        } else {
            format!("{}.{}", self.prefix, event)
        }
    }

    /// Start or stop recording every trigger.
    pub fn set_logging(&mut self, enabled: bool) {
        match (enabled, self.log.is_some()) {
            (true, false) => self.log = Some(Mutex::new(Vec::new())),
            (false, true) => self.log = None,
            _ => {}
        }
    }

    /// Recorded triggers, oldest first. Empty unless logging is on.
    pub fn event_log(&self) -> Vec<LoggedEvent> {
        self.log
            .as_ref()
            .and_then(|log| log.lock().ok().map(|log| log.clone()))
            .unwrap_or_default()
    }

    /// Attach a listener and subscribe its declared events.
    pub fn attach(&mut self, listener: Box<dyn Listener>) -> ListenerId {
        let id = ListenerId(self.listeners.len());
        for Subscription { event, priority } in listener.implemented_events() {
            let event = self.qualify(&event);
            self.bind(event, priority, Target::Listener(id));
        }
        self.listeners.push(Some(listener));
        id
    }

    /// Detach a listener, removing all its subscriptions.
    pub fn detach(&mut self, id: ListenerId) -> Option<Box<dyn Listener>> {
        let listener = self.listeners.get_mut(id.0)?.take()?;
        self.bindings
            .retain(|binding| !matches!(binding.target, Target::Listener(bound) if bound == id));
        Some(listener)
    }

    /// Borrow an attached listener.
    pub fn listener(&self, id: ListenerId) -> Option<&dyn Listener> {
        self.listeners.get(id.0)?.as_deref()
    }

    /// Mutably borrow an attached listener.
    pub fn listener_mut(&mut self, id: ListenerId) -> Option<&mut (dyn Listener + 'static)> {
        self.listeners.get_mut(id.0)?.as_deref_mut()
    }

    /// Subscribe a callback to `event`.
    pub fn on<F, R>(&mut self, event: &str, priority: i32, callback: F)
    where
        F: Fn(&mut Event<'_>) -> R + Send + Sync + 'static,
        R: crate::response::IntoHookResult,
    {
        self.on_hook(event, priority, callback);
    }

    /// Subscribe a [`Hook`] to `event`.
    pub fn on_hook(&mut self, event: &str, priority: i32, hook: impl Hook) {
        let event = self.qualify(event);
        self.bind(event, priority, Target::Hook(Box::new(hook)));
    }

    /// Number of handlers bound to `event`.
    pub fn handler_count(&self, event: &str) -> usize {
        let event = self.qualify(event);
        self.bindings.iter().filter(|b| b.event == event).count()
    }

    /// Dispatch `event` to its handlers.
    pub fn trigger(
        &self,
        event: &str,
        subject: &mut Subject,
        host: &dyn Host,
        action: Option<&dyn Action>,
    ) -> Result<Outcome, CrudError> {
        let name = self.qualify(event);
        subject.add_event(name.clone());
        subject.resume();

        #[cfg(feature = "tracing")]
        tracing::debug!(event = %name, handlers = self.handler_count(&name), "Triggering event");

        if let Some(log) = &self.log {
            if let Ok(mut log) = log.lock() {
                log.push(LoggedEvent {
                    name: name.clone(),
                    subject: subject.clone(),
                });
            }
        }

        let mut context = Event::new(&name, subject, host, action);
        for binding in self.bindings.iter().filter(|b| b.event == name) {
            let result = match &binding.target {
                Target::Listener(id) => match self.listener(*id) {
                    Some(listener) => listener.on_event(&mut context)?,
                    None => continue,
                },
                Target::Hook(hook) => hook.on_event(&mut context)?,
            };

            match result {
                HookResult::Next => {}
                HookResult::Stop => context.stop(),
                HookResult::Respond(response) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(event = %name, status = response.status, "Handler responded");
                    return Ok(Outcome::Respond(response));
                }
            }

            if context.is_stopped() {
                #[cfg(feature = "tracing")]
                tracing::debug!(event = %name, priority = binding.priority, "Event stopped");
                break;
            }
        }

        Ok(Outcome::Continue)
    }

    fn bind(&mut self, event: String, priority: i32, target: Target) {
        // Insert after every binding with the same or lower priority so ties
        // keep registration order.
        let position = self
            .bindings
            .iter()
            .position(|binding| binding.priority > priority)
            .unwrap_or(self.bindings.len());
        self.bindings.insert(
            position,
            Binding {
                event,
                priority,
                target,
            },
        );
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
