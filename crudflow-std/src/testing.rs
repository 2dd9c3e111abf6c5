//! Testing utilities for Crudflow.
//!
//! This module provides in-memory collaborators so actions, listeners and
//! the orchestrator can be exercised without a real application.
//!
//! # Features
//!
//! - [`MemoryRepository`]: rows in memory, finders, pagination, failure
//!   injection and snapshot transactions
//! - [`TestHost`]: a host that records flashes, renders and redirects
//! - [`RecordingListener`]: a listener that captures the subject per event and
//!   can be programmed to stop or respond

use crudflow_core::{
    ColumnType, ConfigStore, CrudError, Entity, Event, EventName, FlashMessage, HookResult, Host,
    Listener, Page, Paging, Query, QueryKind, Repository, RepositoryError, Request, Response,
    Subject, Subscription, Update, Url, ViewVars, text,
};
use serde_json::{Map, Value};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Memory Repository
// ============================================================================

/// An in-memory [`Repository`].
///
/// Knows the `all` and `list` finders plus any registered with
/// [`with_finder`](Self::with_finder). Saves validate required fields and
/// assign incrementing integer keys to new rows.
///
/// # Example
///
/// ```rust,ignore
/// let repository = MemoryRepository::new("Blogs")
///     .with_rows(vec![json!({"id": 1, "name": "First"})])
///     .with_required(&["name"])
///     .fail_delete(2);
/// ```
pub struct MemoryRepository {
    alias: String,
    primary_key: String,
    key_type: Option<ColumnType>,
    fields: Vec<String>,
    required: Vec<String>,
    finders: Vec<String>,
    failing_deletes: Vec<Value>,
    rows: Mutex<Vec<Map<String, Value>>>,
}

impl MemoryRepository {
    /// An empty repository with an integer `id` key.
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            primary_key: "id".to_string(),
            key_type: Some(ColumnType::Integer),
            fields: vec!["id".to_string()],
            required: Vec::new(),
            finders: vec!["all".to_string(), "list".to_string()],
            failing_deletes: Vec::new(),
            rows: Mutex::new(Vec::new()),
        }
    }

    /// Seed rows. Fields of the first row become the schema.
    pub fn with_rows(mut self, rows: Vec<Value>) -> Self {
        let rows: Vec<Map<String, Value>> = rows
            .into_iter()
            .filter_map(|row| match row {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect();
        for row in &rows {
            for field in row.keys() {
                if !self.fields.contains(field) {
                    self.fields.push(field.clone());
                }
            }
        }
        *lock(&self.rows) = rows;
        self
    }

    /// Declare additional schema fields.
    pub fn with_fields(mut self, fields: &[&str]) -> Self {
        for field in fields {
            if !self.fields.iter().any(|known| known == field) {
                self.fields.push((*field).to_string());
            }
        }
        self
    }

    /// Change the primary key and its declared type.
    pub fn with_primary_key(mut self, field: &str, key_type: Option<ColumnType>) -> Self {
        self.primary_key = field.to_string();
        self.key_type = key_type;
        self
    }

    /// Fields a save requires to be non-empty.
    pub fn with_required(mut self, fields: &[&str]) -> Self {
        self.required = fields.iter().map(|field| (*field).to_string()).collect();
        self
    }

    /// Register a custom finder name.
    pub fn with_finder(mut self, finder: &str) -> Self {
        self.finders.push(finder.to_string());
        self
    }

    /// Make deleting the row with this key report failure.
    pub fn fail_delete(mut self, id: impl Into<Value>) -> Self {
        self.failing_deletes.push(id.into());
        self
    }

    /// A snapshot of every row.
    pub fn rows(&self) -> Vec<Map<String, Value>> {
        lock(&self.rows).clone()
    }

    /// Number of rows.
    pub fn count(&self) -> usize {
        lock(&self.rows).len()
    }

    /// The row with key `id`.
    pub fn row(&self, id: impl Into<Value>) -> Option<Map<String, Value>> {
        let id = id.into();
        lock(&self.rows)
            .iter()
            .find(|row| self.key_matches(row, &id))
            .cloned()
    }

    fn key_matches(&self, row: &Map<String, Value>, id: &Value) -> bool {
        row.get(&self.primary_key)
            .is_some_and(|key| text::loose_eq(key, id))
    }

    fn matching(&self, query: &Query) -> Vec<Entity> {
        lock(&self.rows)
            .iter()
            .map(|row| Entity::persisted(row.clone()))
            .filter(|entity| query.matches(entity))
            .collect()
    }

    fn next_id(rows: &[Map<String, Value>], key: &str) -> i64 {
        rows.iter()
            .filter_map(|row| row.get(key).and_then(Value::as_i64))
            .max()
            .unwrap_or(0)
            + 1
    }

    fn validate(&self, entity: &mut Entity) -> bool {
        entity.clear_errors();
        for field in &self.required {
            if !entity.get(field).is_some_and(text::truthy) {
                entity.set_error(field, "_required", "This field is required");
            }
        }
        !entity.has_errors()
    }
}

/// Restores the row snapshot unless committed.
struct Rollback<'a> {
    rows: &'a Mutex<Vec<Map<String, Value>>>,
    snapshot: Option<Vec<Map<String, Value>>>,
}

impl Rollback<'_> {
    fn commit(mut self) {
        self.snapshot = None;
    }
}

impl Drop for Rollback<'_> {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            *lock(self.rows) = snapshot;
        }
    }
}

impl Repository for MemoryRepository {
    fn alias(&self) -> &str {
        &self.alias
    }

    fn primary_key(&self) -> &str {
        &self.primary_key
    }

    fn primary_key_type(&self) -> Option<ColumnType> {
        self.key_type
    }

    fn has_field(&self, field: &str) -> bool {
        self.fields.iter().any(|known| known == field)
    }

    fn find(&self, finder: &str, options: &Map<String, Value>) -> Result<Query, RepositoryError> {
        if !self.finders.iter().any(|known| known == finder) {
            return Err(RepositoryError::UnknownFinder(finder.to_string()));
        }
        Ok(Query::select(finder).with_options(options.clone()))
    }

    fn first(&self, query: &Query) -> Result<Option<Entity>, RepositoryError> {
        Ok(self.matching(query).into_iter().next())
    }

    fn all(&self, query: &Query) -> Result<Vec<Entity>, RepositoryError> {
        Ok(self.matching(query))
    }

    fn paginate(&self, query: &Query, page: u64, limit: u64) -> Result<Page, RepositoryError> {
        let matching = self.matching(query);
        let count = matching.len() as u64;
        let limit = limit.max(1);
        let page_count = count.div_ceil(limit).max(1);
        if page > page_count {
            return Err(RepositoryError::PageOutOfRange { page, page_count });
        }
        let skip = usize::try_from((page.max(1) - 1) * limit).unwrap_or(usize::MAX);
        let take = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(Page {
            entities: matching.into_iter().skip(skip).take(take).collect(),
            paging: Paging {
                page,
                limit,
                count,
                page_count,
            },
        })
    }

    fn new_entity(&self, data: &Map<String, Value>, _options: &Value) -> Entity {
        Entity::new(data.clone())
    }

    fn patch_entity(&self, entity: &mut Entity, data: &Map<String, Value>, _options: &Value) {
        entity.patch(data);
    }

    fn save(
        &self,
        method: &str,
        entity: &mut Entity,
        options: &Value,
    ) -> Result<bool, RepositoryError> {
        if method != "save" {
            return Err(RepositoryError::UnknownMethod(method.to_string()));
        }
        let validate = options.get("validate").and_then(Value::as_bool).unwrap_or(true);
        if validate && !self.validate(entity) {
            return Ok(false);
        }

        let mut rows = lock(&self.rows);
        if entity.is_new() {
            let id = Self::next_id(&rows, &self.primary_key);
            entity.set(self.primary_key.clone(), id);
            rows.push(entity.fields().clone());
            entity.set_new(false);
            return Ok(true);
        }

        let Some(id) = entity.get(&self.primary_key).cloned() else {
            return Ok(false);
        };
        match rows.iter_mut().find(|row| self.key_matches(row, &id)) {
            Some(row) => {
                *row = entity.fields().clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete(&self, method: &str, entity: &Entity) -> Result<bool, RepositoryError> {
        if method != "delete" {
            return Err(RepositoryError::UnknownMethod(method.to_string()));
        }
        let Some(id) = entity.get(&self.primary_key) else {
            return Ok(false);
        };
        if self.failing_deletes.iter().any(|failing| text::loose_eq(failing, id)) {
            return Ok(false);
        }
        let mut rows = lock(&self.rows);
        let before = rows.len();
        rows.retain(|row| !self.key_matches(row, id));
        Ok(rows.len() < before)
    }

    fn execute(&self, query: &Query) -> Result<u64, RepositoryError> {
        let mut rows = lock(&self.rows);
        let matches = |row: &Map<String, Value>| query.matches(&Entity::persisted(row.clone()));
        match query.kind {
            QueryKind::Select => Ok(rows.iter().filter(|row| matches(row)).count() as u64),
            QueryKind::Delete => {
                let before = rows.len();
                rows.retain(|row| !matches(row));
                Ok((before - rows.len()) as u64)
            }
            QueryKind::Update => {
                let mut affected = 0;
                for row in rows.iter_mut().filter(|row| matches(row)) {
                    for update in &query.updates {
                        match update {
                            Update::Set(field, value) => {
                                row.insert(field.clone(), value.clone());
                            }
                            Update::Toggle(field) => {
                                let current = row.get(field).is_some_and(text::truthy);
                                row.insert(field.clone(), Value::Bool(!current));
                            }
                        }
                    }
                    affected += 1;
                }
                Ok(affected)
            }
        }
    }

    fn transactional(
        &self,
        work: &mut dyn FnMut() -> Result<bool, CrudError>,
    ) -> Result<bool, CrudError> {
        let guard = Rollback {
            rows: &self.rows,
            snapshot: Some(self.rows()),
        };
        let committed = work()?;
        if committed {
            guard.commit();
        }
        Ok(committed)
    }
}

// ============================================================================
// Test Host
// ============================================================================

/// A [`Host`] that records what the pipeline asks of it.
///
/// Renders answer `200` with the view name and the variables as body.
/// Redirects answer with a location built from the route:
/// `/<controller>/<action>/<pass...>?<query>`.
pub struct TestHost {
    name: String,
    request: Request,
    repository: MemoryRepository,
    flashes: Mutex<Vec<FlashMessage>>,
    renders: Mutex<Vec<(String, ViewVars)>>,
    redirects: Mutex<Vec<(Url, u16)>>,
}

impl TestHost {
    /// Create a host for resource `name`.
    pub fn new(name: impl Into<String>, request: Request, repository: MemoryRepository) -> Self {
        Self {
            name: name.into(),
            request,
            repository,
            flashes: Mutex::new(Vec::new()),
            renders: Mutex::new(Vec::new()),
            redirects: Mutex::new(Vec::new()),
        }
    }

    /// The in-memory repository, for inspection.
    pub fn memory(&self) -> &MemoryRepository {
        &self.repository
    }

    /// Flash messages stored so far.
    pub fn flashes(&self) -> Vec<FlashMessage> {
        lock(&self.flashes).clone()
    }

    /// Views rendered so far, with their variables.
    pub fn renders(&self) -> Vec<(String, ViewVars)> {
        lock(&self.renders).clone()
    }

    /// Redirects issued so far.
    pub fn redirects(&self) -> Vec<(Url, u16)> {
        lock(&self.redirects).clone()
    }

    /// Location string of `url`.
    pub fn location(&self, url: &Url) -> String {
        let route = match url {
            Url::Path(path) => return path.clone(),
            Url::Route(route) => route,
        };
        let controller = route
            .get("controller")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| text::underscore(&self.name));
        let action = route.get("action").and_then(Value::as_str).unwrap_or("index");

        let mut location = format!("/{controller}/{action}");
        let mut pass: Vec<(usize, &Value)> = route
            .iter()
            .filter_map(|(key, value)| Some((key.parse::<usize>().ok()?, value)))
            .collect();
        pass.sort_by_key(|(index, _)| *index);
        for (_, value) in pass {
            location.push('/');
            location.push_str(&scalar(value));
        }

        if let Some(Value::Object(query)) = route.get("?") {
            let pairs: Vec<String> = query
                .iter()
                .map(|(key, value)| format!("{key}={}", scalar(value)))
                .collect();
            if !pairs.is_empty() {
                location.push('?');
                location.push_str(&pairs.join("&"));
            }
        }
        location
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl Host for TestHost {
    fn name(&self) -> &str {
        &self.name
    }

    fn request(&self) -> &Request {
        &self.request
    }

    fn repository(&self) -> &dyn Repository {
        &self.repository
    }

    fn set_flash(&self, message: &FlashMessage) {
        lock(&self.flashes).push(message.clone());
    }

    fn render(&self, view: &str, vars: &ViewVars) -> Result<Response, CrudError> {
        lock(&self.renders).push((view.to_string(), vars.clone()));
        Ok(Response::new(200)
            .with_view(view)
            .with_body(Value::Object(vars.clone())))
    }

    fn redirect(&self, url: &Url, status: u16) -> Response {
        lock(&self.redirects).push((url.clone(), status));
        Response::redirect(self.location(url), status)
    }
}

// ============================================================================
// Recording Listener
// ============================================================================

/// A listener that records a snapshot of the subject for every event it
/// receives and answers with a programmed [`HookResult`].
///
/// Clones share their recordings.
///
/// # Example
///
/// ```rust,ignore
/// let recorder = RecordingListener::all().with_result(EventName::BeforeSave, HookResult::Stop);
/// crud.add_listener("recorder", Box::new(recorder.clone()))?;
/// crud.execute("add", vec![])?;
/// assert!(recorder.has("afterSave"));
/// ```
#[derive(Clone)]
pub struct RecordingListener {
    config: ConfigStore,
    events: Vec<EventName>,
    priority: i32,
    results: HashMap<&'static str, HookResult>,
    recorded: Arc<Mutex<Vec<(String, Subject)>>>,
}

impl RecordingListener {
    /// Record `events`.
    pub fn new(events: &[EventName]) -> Self {
        Self {
            config: ConfigStore::new(),
            events: events.to_vec(),
            priority: crudflow_core::DEFAULT_PRIORITY,
            results: HashMap::new(),
            recorded: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Record every well-known event.
    pub fn all() -> Self {
        Self::new(&EventName::ALL)
    }

    /// Subscribe with `priority`.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Answer `event` with `result`.
    pub fn with_result(mut self, event: EventName, result: HookResult) -> Self {
        if !self.events.contains(&event) {
            self.events.push(event);
        }
        self.results.insert(event.as_str(), result);
        self
    }

    /// Recorded short event names, in order.
    pub fn names(&self) -> Vec<String> {
        lock(&self.recorded)
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Subject snapshot taken when `event` was last received.
    pub fn subject(&self, event: &str) -> Option<Subject> {
        lock(&self.recorded)
            .iter()
            .rev()
            .find(|(name, _)| name == event)
            .map(|(_, subject)| subject.clone())
    }

    /// Whether `event` was received.
    pub fn has(&self, event: &str) -> bool {
        lock(&self.recorded).iter().any(|(name, _)| name == event)
    }

    /// Forget everything recorded.
    pub fn clear(&self) {
        lock(&self.recorded).clear();
    }
}

impl Listener for RecordingListener {
    fn implemented_events(&self) -> Vec<Subscription> {
        self.events
            .iter()
            .map(|event| Subscription::from(*event).with_priority(self.priority))
            .collect()
    }

    fn on_event(&self, event: &mut Event<'_>) -> Result<HookResult, CrudError> {
        let name = event.short_name().to_string();
        lock(&self.recorded).push((name.clone(), event.subject().clone()));
        Ok(self
            .results
            .get(name.as_str())
            .cloned()
            .unwrap_or(HookResult::Next))
    }

    fn config(&self) -> &ConfigStore {
        &self.config
    }

    fn config_mut(&mut self) -> &mut ConfigStore {
        &mut self.config
    }
}
