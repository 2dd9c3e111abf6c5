//! Host framework boundary: request, URLs, flash, rendering.
//!
//! Routing, sessions and view rendering belong to the host application.
//! The pipeline only talks to them through [`Host`].

use crate::{
    error::CrudError,
    repository::Repository,
    response::Response,
};
use bitflags::bitflags;
use serde::Serialize;
use serde_json::{Map, Value};
use std::{fmt, str::FromStr};

// ============================================================================
// HTTP verbs
// ============================================================================

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Method {
    /// GET
    #[default]
    Get,
    /// HEAD
    Head,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
    /// OPTIONS
    Options,
}

impl Method {
    /// Upper-case method name.
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
        }
    }

    /// The single-verb flag for this method.
    pub fn verb(self) -> Verbs {
        match self {
            Method::Get => Verbs::GET,
            Method::Head => Verbs::HEAD,
            Method::Post => Verbs::POST,
            Method::Put => Verbs::PUT,
            Method::Patch => Verbs::PATCH,
            Method::Delete => Verbs::DELETE,
            Method::Options => Verbs::OPTIONS,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = CrudError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "HEAD" => Ok(Method::Head),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            "OPTIONS" => Ok(Method::Options),
            other => Err(CrudError::Config(format!("Unknown HTTP method: {other}"))),
        }
    }
}

bitflags! {
    /// A set of HTTP verbs.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Verbs: u8 {
        /// GET
        const GET = 1;
        /// HEAD
        const HEAD = 1 << 1;
        /// POST
        const POST = 1 << 2;
        /// PUT
        const PUT = 1 << 3;
        /// PATCH
        const PATCH = 1 << 4;
        /// DELETE
        const DELETE = 1 << 5;
        /// OPTIONS
        const OPTIONS = 1 << 6;
    }
}

impl Verbs {
    /// Parse a list of method names, ignoring unknown entries.
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        names
            .into_iter()
            .filter_map(|name| name.parse::<Method>().ok())
            .fold(Verbs::empty(), |acc, method| acc | method.verb())
    }

    /// Lower-case names of the verbs in this set, in declaration order.
    pub fn names(self) -> Vec<&'static str> {
        [
            (Verbs::GET, "get"),
            (Verbs::HEAD, "head"),
            (Verbs::POST, "post"),
            (Verbs::PUT, "put"),
            (Verbs::PATCH, "patch"),
            (Verbs::DELETE, "delete"),
            (Verbs::OPTIONS, "options"),
        ]
        .into_iter()
        .filter(|(flag, _)| self.contains(*flag))
        .map(|(_, name)| name)
        .collect()
    }
}

// ============================================================================
// Request
// ============================================================================

/// The inbound request, as far as the pipeline needs it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Request {
    /// Request verb.
    pub method: Method,
    /// Routing parameters (`controller`, `action`, ...).
    pub params: Map<String, Value>,
    /// Parsed request body.
    pub data: Map<String, Value>,
    /// Query string.
    pub query: Map<String, Value>,
    /// Response format requested by the client (`"json"`, `"xml"`), if any.
    pub format: Option<String>,
}

impl Request {
    /// A request with the given verb.
    pub fn new(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    /// Set the request body. Non-object values are ignored.
    pub fn with_data(mut self, data: Value) -> Self {
        if let Value::Object(map) = data {
            self.data = map;
        }
        self
    }

    /// Set the query string. Non-object values are ignored.
    pub fn with_query(mut self, query: Value) -> Self {
        if let Value::Object(map) = query {
            self.query = map;
        }
        self
    }

    /// Set a routing parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Set the requested response format.
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Body field, dot paths allowed.
    pub fn data(&self, key: &str) -> Option<&Value> {
        lookup(&self.data, key)
    }

    /// Query field, dot paths allowed.
    pub fn query(&self, key: &str) -> Option<&Value> {
        lookup(&self.query, key)
    }

    /// Routing parameter.
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    /// The routed action name.
    pub fn action(&self) -> Option<&str> {
        self.params.get("action").and_then(Value::as_str)
    }

    /// Whether the request uses `method`.
    pub fn is(&self, method: Method) -> bool {
        self.method == method
    }

    /// Whether the client asked for a machine-readable response.
    pub fn is_api(&self) -> bool {
        matches!(self.format.as_deref(), Some("json") | Some("xml"))
    }
}

fn lookup<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    if let Some(value) = map.get(key) {
        return Some(value);
    }
    let mut segments = key.split('.');
    let mut current = map.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

// ============================================================================
// URLs, flash, view vars
// ============================================================================

/// A redirect target.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Url {
    /// A literal path or absolute URL.
    Path(String),
    /// A route description for the host router. The `"?"` key holds query
    /// parameters; any other non-routing keys are positional pass arguments.
    Route(Map<String, Value>),
}

impl Url {
    /// Route to `action` of the current resource.
    pub fn action(action: &str) -> Self {
        let mut route = Map::new();
        route.insert("action".into(), Value::String(action.into()));
        Url::Route(route)
    }

    /// Build from a JSON value: strings become paths, maps become routes.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(path) => Some(Url::Path(path.clone())),
            Value::Object(route) => Some(Url::Route(route.clone())),
            _ => None,
        }
    }

    /// Add a positional pass argument to a route.
    pub fn with_pass(mut self, value: impl Into<Value>) -> Self {
        if let Url::Route(route) = &mut self {
            let index = route.keys().filter(|k| k.parse::<usize>().is_ok()).count();
            route.insert(index.to_string(), value.into());
        }
        self
    }

    /// Add a query parameter to a route.
    pub fn with_query(mut self, key: &str, value: impl Into<Value>) -> Self {
        if let Url::Route(route) = &mut self {
            let query = route
                .entry("?")
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(query) = query {
                query.insert(key.to_string(), value.into());
            }
        }
        self
    }
}

impl From<&str> for Url {
    fn from(path: &str) -> Self {
        Url::Path(path.to_string())
    }
}

/// A flash message ready for the session collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlashMessage {
    /// Final message text.
    pub text: String,
    /// Element (template) used to render the message.
    pub element: String,
    /// Session key.
    pub key: String,
    /// Message type, e.g. `"add.success"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Resource name substituted into the text.
    pub name: String,
    /// Element parameters.
    pub params: Map<String, Value>,
}

/// Variables handed to the view layer.
pub type ViewVars = Map<String, Value>;

// ============================================================================
// Host
// ============================================================================

/// The host framework as seen by the pipeline.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a `Host`",
    label = "missing `Host` implementation",
    note = "Hosts provide the request, repository, flash, render and redirect collaborators."
)]
pub trait Host: Send + Sync {
    /// Resource (controller) name, e.g. `"Blogs"`.
    fn name(&self) -> &str;

    /// The current request.
    fn request(&self) -> &Request;

    /// Repository of the current resource.
    fn repository(&self) -> &dyn Repository;

    /// Store a flash message in the session.
    fn set_flash(&self, message: &FlashMessage);

    /// Render `view` with `vars`.
    fn render(&self, view: &str, vars: &ViewVars) -> Result<Response, CrudError>;

    /// Build a redirect response.
    fn redirect(&self, url: &Url, status: u16) -> Response;

    /// The response as it currently stands, used when a redirect is
    /// cancelled.
    fn response(&self) -> Response {
        Response::new(200)
    }
}
