//! # Event callbacks (Hook)
//!
//! A [`Hook`] is the smallest unit that can be subscribed to an event: it
//! receives the [`Event`] and decides whether the remaining handlers run.
//! Plain closures are hooks, so one-off callbacks need no type of their own:
//!
//! ```rust,ignore
//! bus.on("beforeSave", 10, |event: &mut Event<'_>| {
//!     event.subject_mut().set_field("audited", true);
//! });
//! ```
//!
//! Stateful handlers that subscribe to several events implement
//! [`Listener`](crate::Listener) instead.

use crate::{error::CrudError, event::Event, response::IntoHookResult, response::Response};

/// What the bus should do after a handler returns.
#[derive(Debug, Clone, PartialEq)]
pub enum HookResult {
    /// Continue with the next handler.
    Next,
    /// Stop this event. The operation itself carries on.
    Stop,
    /// Answer the request with this response and abandon the operation.
    Respond(Response),
}

/// A single event callback.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a `Hook`",
    label = "missing `Hook` implementation",
    note = "Hooks implement `on_event`, or are closures taking `&mut Event<'_>`."
)]
pub trait Hook: Send + Sync + 'static {
    /// Called when a subscribed event is triggered.
    fn on_event(&self, event: &mut Event<'_>) -> Result<HookResult, CrudError>;
}

impl<F, R> Hook for F
where
    F: Fn(&mut Event<'_>) -> R + Send + Sync + 'static,
    R: IntoHookResult,
{
    fn on_event(&self, event: &mut Event<'_>) -> Result<HookResult, CrudError> {
        (self)(event).into_hook_result()
    }
}
