//! Error types for Crudflow.
//!
//! - [`CrudError`] - Every failure an action pipeline can surface
//! - [`ValidationError`] - Field-level validation failures of one entity
//! - [`RepositoryError`](crate::RepositoryError) - Failures of the storage collaborator
//!
//! Short-circuit responses are not errors; see [`Halt`](crate::Halt).

use crate::{host::Method, repository::Entity, repository::RepositoryError};
use serde_json::{Map, Value};
use thiserror::Error;

/// A boxed error type for dynamic error handling.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error type for all Crudflow operations.
#[derive(Error, Debug)]
pub enum CrudError {
    /// No mapping exists for the requested action name.
    #[error("Action \"{0}\" has not been mapped")]
    ActionNotConfigured(String),

    /// The action mapping names an implementation tag with no factory.
    #[error("Could not find action implementation: {0}")]
    MissingAction(String),

    /// No mapping exists for the requested listener name.
    #[error("Listener \"{0}\" is not configured")]
    ListenerNotConfigured(String),

    /// The listener mapping names an implementation tag with no factory.
    #[error("Could not find listener implementation: {0}")]
    MissingListener(String),

    /// The action has no handler for the request verb and no fallback.
    #[error("Action {action} does not implement a handler for HTTP verb {method}")]
    NotImplemented {
        /// Action name.
        action: String,
        /// Request verb.
        method: Method,
    },

    /// A configuration value required at use time is missing or malformed.
    #[error("{0}")]
    Config(String),

    /// The request identifier failed type validation.
    #[error("{message}")]
    InvalidId {
        /// Client-facing message.
        message: String,
        /// HTTP status.
        status: u16,
    },

    /// No record matched the request identifier.
    #[error("{message}")]
    RecordNotFound {
        /// Client-facing message.
        message: String,
        /// HTTP status.
        status: u16,
    },

    /// The request payload is malformed.
    #[error("{message}")]
    BadRequest {
        /// Client-facing message.
        message: String,
        /// HTTP status.
        status: u16,
    },

    /// The request verb is not allowed for this action.
    #[error("{message}")]
    MethodNotAllowed {
        /// Client-facing message.
        message: String,
        /// HTTP status.
        status: u16,
    },

    /// An entity failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The repository failed.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// A custom error raised by a listener.
    #[error(transparent)]
    Custom(BoxError),
}

impl CrudError {
    /// HTTP status the host should answer with.
    pub fn status(&self) -> u16 {
        match self {
            CrudError::InvalidId { status, .. }
            | CrudError::RecordNotFound { status, .. }
            | CrudError::BadRequest { status, .. }
            | CrudError::MethodNotAllowed { status, .. } => *status,
            CrudError::Validation(err) => err.status(),
            CrudError::NotImplemented { .. } => 501,
            _ => 500,
        }
    }

    /// Whether the error was caused by the client rather than configuration.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status())
    }

    /// Whether the error is a configuration error.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            CrudError::ActionNotConfigured(_)
                | CrudError::MissingAction(_)
                | CrudError::ListenerNotConfigured(_)
                | CrudError::MissingListener(_)
                | CrudError::Config(_)
        )
    }
}

impl From<BoxError> for CrudError {
    fn from(err: BoxError) -> Self {
        CrudError::Custom(err)
    }
}

/// Field-level validation failures of one entity.
///
/// The message distinguishes one error from many:
/// `"A validation error occurred"` vs `"3 validation errors occurred"`.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct ValidationError {
    errors: Map<String, Value>,
    count: usize,
    message: String,
    status: u16,
}

impl ValidationError {
    /// Collect the errors recorded on `entity`.
    pub fn from_entity(entity: &Entity) -> Self {
        Self::new(entity.errors().clone())
    }

    /// Build from an error tree keyed by field.
    pub fn new(errors: Map<String, Value>) -> Self {
        let errors: Map<String, Value> = errors
            .into_iter()
            .filter(|(_, value)| !is_empty(value))
            .collect();
        let count = errors.values().map(count_leaves).sum();
        let message = if count == 1 {
            "A validation error occurred".to_string()
        } else {
            format!("{count} validation errors occurred")
        };
        Self {
            errors,
            count,
            message,
            status: 422,
        }
    }

    /// Errors keyed by field, then rule.
    pub fn errors(&self) -> &Map<String, Value> {
        &self.errors
    }

    /// Number of individual failures.
    pub fn count(&self) -> usize {
        self.count
    }

    /// HTTP status (422).
    pub fn status(&self) -> u16 {
        self.status
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(list) => list.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn count_leaves(value: &Value) -> usize {
    match value {
        Value::Object(map) => map.values().map(count_leaves).sum(),
        Value::Array(list) => list.iter().map(count_leaves).sum(),
        _ => 1,
    }
}
