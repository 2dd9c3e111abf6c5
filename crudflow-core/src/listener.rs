//! # Listeners
//!
//! A [`Listener`] is a named, configurable object that subscribes several of
//! its own handlers to lifecycle events. Listeners are attached to the
//! [`EventBus`](crate::EventBus) before the action is resolved, so they see
//! every event of the request.
//!
//! Unlike a [`Hook`](crate::Hook), a listener owns a
//! [`ConfigStore`] and may need a [`setup`](Listener::setup) step once it is
//! attached.

use crate::{
    config::ConfigStore,
    error::CrudError,
    event::{Event, EventName},
    hook::HookResult,
};

/// Priority used when a subscription doesn't specify one.
pub const DEFAULT_PRIORITY: i32 = 10;

/// One event a listener handles, with its priority (lower runs first).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    /// Unprefixed event name, or a fully qualified one containing a `.`.
    pub event: String,
    /// Dispatch priority.
    pub priority: i32,
}

impl Subscription {
    /// Subscribe to `event` with the default priority.
    pub fn new(event: impl AsRef<str>) -> Self {
        Self {
            event: event.as_ref().to_string(),
            priority: DEFAULT_PRIORITY,
        }
    }

    /// Set priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl From<EventName> for Subscription {
    fn from(event: EventName) -> Self {
        Self::new(event)
    }
}

/// A stateful event subscriber.
///
/// # Example
///
/// ```rust,ignore
/// struct AuditListener { config: ConfigStore }
///
/// impl Listener for AuditListener {
///     fn implemented_events(&self) -> Vec<Subscription> {
///         vec![EventName::AfterSave.into()]
///     }
///
///     fn on_event(&self, event: &mut Event<'_>) -> Result<HookResult, CrudError> {
///         event.subject_mut().set_field("audited", true);
///         Ok(HookResult::Next)
///     }
///
///     fn config(&self) -> &ConfigStore { &self.config }
///     fn config_mut(&mut self) -> &mut ConfigStore { &mut self.config }
/// }
/// ```
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a `Listener`",
    label = "missing `Listener` implementation",
    note = "Listeners declare `implemented_events` and handle them in `on_event`."
)]
pub trait Listener: Send + Sync + 'static {
    /// Events this listener subscribes to.
    fn implemented_events(&self) -> Vec<Subscription>;

    /// Handle one of the subscribed events.
    fn on_event(&self, event: &mut Event<'_>) -> Result<HookResult, CrudError>;

    /// Called once, right after the listener is attached.
    fn setup(&mut self) -> Result<(), CrudError> {
        Ok(())
    }

    /// The listener's configuration.
    fn config(&self) -> &ConfigStore;

    /// Mutable access to the listener's configuration.
    fn config_mut(&mut self) -> &mut ConfigStore;
}
