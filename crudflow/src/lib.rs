//! # crudflow - Event-Driven CRUD Actions
//!
//! `crudflow` runs the create/read/update/delete operations of a web
//! resource as fixed event skeletons. Every step (find, save, delete,
//! redirect, render) raises a named event, and listeners reshape queries,
//! rewrite redirects, veto steps or answer the request themselves.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use crudflow::prelude::*;
//! use serde_json::json;
//!
//! let mut crud = Crud::new(host, json!({
//!     "actions": ["Crud.Index", "Crud.View", "Crud.Add", "Crud.Edit", "Crud.Delete"],
//!     "listeners": ["Crud.Redirect", "Crud.Api"]
//! }));
//!
//! crud.on("beforeSave", 10, |event: &mut Event<'_>| {
//!     event.subject_mut().set_field("audited", true);
//! });
//!
//! match crud.execute("add", vec![])? {
//!     Some(response) => send(response),
//!     None => route_normally(),
//! }
//! ```
//!
//! ## Crates
//!
//! - `crudflow-core`: configuration, subject, event bus and the collaborator
//!   traits
//! - `crudflow-std`: the standard actions and listeners
//! - `crudflow`: the orchestrator, registries and catalog

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod orchestrator;

pub use orchestrator::{
    ActionFactory, ActionRegistry, CLASS_NAME, Catalog, Crud, Kind, ListenerFactory,
    ListenerRegistry, normalize,
};

// Re-export core traits
pub use crudflow_core::{
    Action, ActionContext, BoxError, ColumnType, ConfigStore, CrudError, Entity, Event, EventBus,
    EventName, FlashMessage, Flow, Halt, Handled, Hook, HookResult, Host, IntoHookResult, Listener,
    ListenerId, LoggedEvent, Method, Outcome, Page, Paging, Query, Repository, RepositoryError,
    Request, Response, Scope, Subject, Subscription, Update, Url, ValidationError, Verbs, ViewVars,
};

pub use crudflow_core;
pub use crudflow_std;

/// Standard action implementations.
pub mod actions {
    pub use crudflow_std::actions::{
        AddAction, BulkAction, BulkDelete, BulkOperation, BulkSetValue, BulkToggle, DeleteAction,
        EditAction, IndexAction, LookupAction, RedirectResolver, ViewAction,
    };
}

/// Standard listener implementations.
pub mod listeners {
    pub use crudflow_std::listeners::{ApiListener, LoggingListener, RedirectListener};
}

/// Testing utilities.
pub mod testing {
    pub use crudflow_std::testing::{MemoryRepository, RecordingListener, TestHost};
}

/// Prelude module - common imports for Crudflow.
///
/// # Usage
///
/// ```rust,ignore
/// use crudflow::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        Action, Catalog, ConfigStore, Crud, CrudError, Event, EventName, Handled, HookResult,
        Host, Listener, Method, Outcome, Repository, Request, Response, Subject, Subscription, Url,
    };
}
