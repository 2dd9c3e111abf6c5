//! Event names and the event handed to handlers.

use crate::{action::Action, host::Host, host::Request, subject::Subject};
use std::fmt;

/// The well-known lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    /// Before the orchestrator invokes an action.
    BeforeHandle,
    /// Before a single record is looked up.
    BeforeFind,
    /// After a single record was found.
    AfterFind,
    /// A single record lookup came back empty.
    RecordNotFound,
    /// The request identifier failed validation.
    InvalidId,
    /// Before a paginated find.
    BeforePaginate,
    /// After a paginated find.
    AfterPaginate,
    /// Before an entity is saved.
    BeforeSave,
    /// After a save attempt, successful or not.
    AfterSave,
    /// Before an entity is deleted.
    BeforeDelete,
    /// After a delete attempt, successful or not.
    AfterDelete,
    /// Before a bulk operation.
    BeforeBulk,
    /// After a bulk operation.
    AfterBulk,
    /// Before the redirect is performed.
    BeforeRedirect,
    /// Before the view is rendered.
    BeforeRender,
    /// Before a flash message is stored.
    SetFlash,
}

impl EventName {
    /// Every well-known event.
    pub const ALL: [EventName; 16] = [
        EventName::BeforeHandle,
        EventName::BeforeFind,
        EventName::AfterFind,
        EventName::RecordNotFound,
        EventName::InvalidId,
        EventName::BeforePaginate,
        EventName::AfterPaginate,
        EventName::BeforeSave,
        EventName::AfterSave,
        EventName::BeforeDelete,
        EventName::AfterDelete,
        EventName::BeforeBulk,
        EventName::AfterBulk,
        EventName::BeforeRedirect,
        EventName::BeforeRender,
        EventName::SetFlash,
    ];

    /// Unprefixed event name.
    pub const fn as_str(self) -> &'static str {
        match self {
            EventName::BeforeHandle => "beforeHandle",
            EventName::BeforeFind => "beforeFind",
            EventName::AfterFind => "afterFind",
            EventName::RecordNotFound => "recordNotFound",
            EventName::InvalidId => "invalidId",
            EventName::BeforePaginate => "beforePaginate",
            EventName::AfterPaginate => "afterPaginate",
            EventName::BeforeSave => "beforeSave",
            EventName::AfterSave => "afterSave",
            EventName::BeforeDelete => "beforeDelete",
            EventName::AfterDelete => "afterDelete",
            EventName::BeforeBulk => "beforeBulk",
            EventName::AfterBulk => "afterBulk",
            EventName::BeforeRedirect => "beforeRedirect",
            EventName::BeforeRender => "beforeRender",
            EventName::SetFlash => "setFlash",
        }
    }

    /// Look up a well-known event by its unprefixed name.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|event| event.as_str() == name)
    }
}

impl AsRef<str> for EventName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event being dispatched.
///
/// Handlers observe and mutate the operation through [`Event::subject_mut`]
/// and may stop the remaining handlers with [`Event::stop`].
pub struct Event<'a> {
    name: &'a str,
    subject: &'a mut Subject,
    host: &'a dyn Host,
    action: Option<&'a dyn Action>,
}

impl<'a> Event<'a> {
    /// Create an event. Normally only the bus does this.
    pub fn new(
        name: &'a str,
        subject: &'a mut Subject,
        host: &'a dyn Host,
        action: Option<&'a dyn Action>,
    ) -> Self {
        Self {
            name,
            subject,
            host,
            action,
        }
    }

    /// Full, prefixed event name.
    pub fn name(&self) -> &str {
        self.name
    }

    /// Event name without the prefix.
    pub fn short_name(&self) -> &str {
        self.name.split_once('.').map_or(self.name, |(_, name)| name)
    }

    /// Whether this is the well-known event `name`.
    pub fn is(&self, name: EventName) -> bool {
        self.short_name() == name.as_str()
    }

    /// The operation's subject.
    pub fn subject(&self) -> &Subject {
        &*self.subject
    }

    /// Mutable access to the operation's subject.
    pub fn subject_mut(&mut self) -> &mut Subject {
        &mut *self.subject
    }

    /// The host framework.
    pub fn host(&self) -> &'a dyn Host {
        self.host
    }

    /// The current request.
    pub fn request(&self) -> &'a Request {
        self.host.request()
    }

    /// The action that raised the event, if any.
    pub fn action(&self) -> Option<&'a dyn Action> {
        self.action
    }

    /// Stop the remaining handlers of this event.
    pub fn stop(&mut self) {
        self.subject.stop();
    }

    /// Whether a handler stopped this event.
    pub fn is_stopped(&self) -> bool {
        self.subject.is_stopped()
    }
}

impl fmt::Debug for Event<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("name", &self.name)
            .field("action", &self.action.map(|action| action.name()))
            .field("stopped", &self.subject.is_stopped())
            .finish()
    }
}
