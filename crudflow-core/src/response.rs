//! Responses and pipeline control flow.
//!
//! A listener that wants to answer the request immediately returns
//! [`HookResult::Respond`]. The bus reports that as [`Outcome::Respond`],
//! actions carry it up through [`Halt::Respond`] and the action boundary
//! turns it into [`Handled::Respond`]. It never travels as an error.

use crate::{
    error::{CrudError, ValidationError},
    hook::HookResult,
    repository::RepositoryError,
    subject::Subject,
};
use serde::Serialize;
use serde_json::Value;

/// An opaque response payload produced by the host or a listener.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    /// HTTP status.
    pub status: u16,
    /// Redirect location, if this is a redirect.
    pub location: Option<String>,
    /// Rendered view name, if this came from the view layer.
    pub view: Option<String>,
    /// Body payload.
    pub body: Option<Value>,
}

impl Response {
    /// An empty response with `status`.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            location: None,
            view: None,
            body: None,
        }
    }

    /// A redirect to `location`.
    pub fn redirect(location: impl Into<String>, status: u16) -> Self {
        Self {
            location: Some(location.into()),
            ..Self::new(status)
        }
    }

    /// Attach a body.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Attach the rendered view name.
    pub fn with_view(mut self, view: impl Into<String>) -> Self {
        self.view = Some(view.into());
        self
    }

    /// Replace the status.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Whether this response redirects.
    pub fn is_redirect(&self) -> bool {
        self.location.is_some() && (300..400).contains(&self.status)
    }
}

/// Result of triggering one event.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Every handler ran, or one stopped the event. The pipeline goes on.
    Continue,
    /// A handler produced a response. The rest of the operation is abandoned.
    Respond(Response),
}

impl Outcome {
    /// Convert into pipeline flow so `?` can propagate a response.
    pub fn proceed(self) -> Flow {
        match self {
            Outcome::Continue => Ok(()),
            Outcome::Respond(response) => Err(Halt::Respond(response)),
        }
    }

    /// Whether the pipeline goes on.
    pub fn is_continue(&self) -> bool {
        matches!(self, Outcome::Continue)
    }
}

/// Why an action pipeline stopped early.
#[derive(Debug)]
pub enum Halt {
    /// A response is ready and must reach the caller unchanged.
    Respond(Response),
    /// The operation failed.
    Error(CrudError),
}

impl From<CrudError> for Halt {
    fn from(err: CrudError) -> Self {
        Halt::Error(err)
    }
}

impl From<RepositoryError> for Halt {
    fn from(err: RepositoryError) -> Self {
        Halt::Error(err.into())
    }
}

impl From<ValidationError> for Halt {
    fn from(err: ValidationError) -> Self {
        Halt::Error(err.into())
    }
}

/// Control flow inside an action pipeline.
pub type Flow<T = ()> = Result<T, Halt>;

/// Result of [`Action::handle`](crate::Action::handle).
#[derive(Debug)]
pub enum Handled {
    /// The action is disabled; the host should route the request itself.
    Declined,
    /// The pipeline finished without a response; render the view.
    Render(Subject),
    /// A response is ready.
    Respond(Response),
}

impl Handled {
    /// Fold pipeline flow back into a handle result.
    pub fn from_flow(flow: Flow<Handled>) -> Result<Handled, CrudError> {
        match flow {
            Ok(handled) => Ok(handled),
            Err(Halt::Respond(response)) => Ok(Handled::Respond(response)),
            Err(Halt::Error(err)) => Err(err),
        }
    }
}

/// Trait for converting a callback's output into a [`HookResult`].
///
/// # Default Implementations
///
/// - `()` → Next
/// - `bool` → `true` = Stop, `false` = Next
/// - `HookResult` → As is
/// - `Response` → Respond
/// - `Option<T>` → Delegates to inner `T`, `None` = Next
/// - `Result<T, E>` → Delegates to inner `T` or propagates the error
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot be returned from an event callback",
    label = "missing `IntoHookResult` implementation",
    note = "Return `()`, `bool`, `HookResult`, `Response`, or a `Result` of those."
)]
pub trait IntoHookResult {
    /// Convert the output into propagation behaviour.
    fn into_hook_result(self) -> Result<HookResult, CrudError>;
}

impl IntoHookResult for () {
    fn into_hook_result(self) -> Result<HookResult, CrudError> {
        Ok(HookResult::Next)
    }
}

impl IntoHookResult for bool {
    fn into_hook_result(self) -> Result<HookResult, CrudError> {
        Ok(if self {
            HookResult::Stop
        } else {
            HookResult::Next
        })
    }
}

impl IntoHookResult for HookResult {
    fn into_hook_result(self) -> Result<HookResult, CrudError> {
        Ok(self)
    }
}

impl IntoHookResult for Response {
    fn into_hook_result(self) -> Result<HookResult, CrudError> {
        Ok(HookResult::Respond(self))
    }
}

impl<T: IntoHookResult> IntoHookResult for Option<T> {
    fn into_hook_result(self) -> Result<HookResult, CrudError> {
        match self {
            Some(t) => t.into_hook_result(),
            None => Ok(HookResult::Next),
        }
    }
}

impl<T, E> IntoHookResult for Result<T, E>
where
    T: IntoHookResult,
    E: Into<CrudError>,
{
    fn into_hook_result(self) -> Result<HookResult, CrudError> {
        match self {
            Ok(t) => t.into_hook_result(),
            Err(e) => Err(e.into()),
        }
    }
}
