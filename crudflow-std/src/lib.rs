//! # crudflow-std
//!
//! Standard implementations for the Crudflow action pipeline.
//!
//! This crate provides:
//! - **Table actions**: [`IndexAction`], [`LookupAction`]
//! - **Entity actions**: [`ViewAction`], [`AddAction`], [`EditAction`], [`DeleteAction`]
//! - **Bulk actions**: [`BulkAction`] with [`BulkDelete`], [`BulkSetValue`], [`BulkToggle`]
//! - **Shared behaviour**: flash messages, identifier validation, record
//!   lookup and [`RedirectResolver`]
//! - **Standard listeners**: [`RedirectListener`], [`ApiListener`], [`LoggingListener`]
//! - **Testing utilities**: see [`testing`]

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core traits
pub use crudflow_core;

// Modules
pub mod actions;
pub mod listeners;
pub mod testing;

pub use actions::{
    AddAction, BulkAction, BulkDelete, BulkOperation, BulkSetValue, BulkToggle, DeleteAction,
    EditAction, IndexAction, LookupAction, RedirectResolver, ViewAction,
};
pub use listeners::{ApiListener, LoggingListener, RedirectListener};
