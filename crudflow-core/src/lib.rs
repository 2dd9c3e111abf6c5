//! # crudflow-core
//!
//! Core traits for the Crudflow action pipeline.
//!
//! This crate has minimal dependencies and is meant to be imported by
//! applications and extensions that provide their own actions, listeners or
//! collaborators without pulling in `crudflow-std`.
//!
//! # Architecture
//!
//! A request against a logical action (`index`, `add`, `edit`, ...) runs
//! through four cooperating pieces:
//!
//! ## Configuration ([`ConfigStore`])
//!
//! Every action and listener owns a dot-path configuration tree built once
//! from its class defaults and the instance overrides of its mapping.
//! Maps merge recursively, scalars and lists are replaced.
//!
//! ## Context ([`Subject`])
//!
//! One typed, mutable record per operation. It accumulates the query, the
//! entity, success flags and redirect target as the pipeline advances, and
//! logs every event raised against it. It is the only state listeners share
//! with actions.
//!
//! ## Dispatch ([`EventBus`], [`Hook`], [`Listener`])
//!
//! Synchronous, priority-ordered dispatch keyed by prefixed event names.
//! A handler may:
//!
//! - **continue** ([`HookResult::Next`]),
//! - **stop** the current event ([`HookResult::Stop`] or [`Event::stop`]); the
//!   operation itself continues,
//! - **respond** ([`HookResult::Respond`]); the whole remaining operation is
//!   abandoned and the response reaches the caller.
//!
//! ## Operations ([`Action`])
//!
//! An action selects a code path by HTTP verb and runs a fixed event
//! skeleton around the repository calls. Its result is [`Handled`]: declined,
//! render, or respond.
//!
//! # Collaborators
//!
//! Storage, routing, sessions and rendering belong to the host application
//! and are reached through [`Host`] and [`Repository`].
//!
//! # Error Types
//!
//! - [`CrudError`] - Top-level error type
//! - [`ValidationError`] - Field-level validation failures
//! - [`RepositoryError`] - Storage collaborator errors

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod action;
mod bus;
mod config;
mod error;
mod event;
mod hook;
mod host;
mod listener;
mod repository;
mod response;
mod subject;
pub mod text;

// Re-exports
pub use action::{Action, ActionContext, Scope};
pub use bus::{DEFAULT_PREFIX, EventBus, ListenerId, LoggedEvent};
pub use config::{ConfigStore, merge_value};
pub use error::{BoxError, CrudError, ValidationError};
pub use event::{Event, EventName};
pub use hook::{Hook, HookResult};
pub use host::{FlashMessage, Host, Method, Request, Url, Verbs, ViewVars};
pub use listener::{DEFAULT_PRIORITY, Listener, Subscription};
pub use repository::{
    ColumnType, Condition, Entity, Page, Paging, Query, QueryKind, Repository, RepositoryError,
    Update,
};
pub use response::{Flow, Halt, Handled, IntoHookResult, Outcome, Response};
pub use subject::{ProcessMode, Subject};

