//! Persistence collaborator boundary.
//!
//! The engine never stores or validates records itself. It builds [`Query`]
//! descriptions and hands them, together with [`Entity`] values, to a
//! [`Repository`] supplied by the host application.

use crate::{error::BoxError, error::CrudError, text::loose_eq};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

// ============================================================================
// Entity
// ============================================================================

/// A domain record as seen by the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Entity {
    fields: Map<String, Value>,
    errors: Map<String, Value>,
    new: bool,
}

impl Entity {
    /// A new, not yet persisted entity.
    pub fn new(fields: Map<String, Value>) -> Self {
        Self {
            fields,
            errors: Map::new(),
            new: true,
        }
    }

    /// An entity loaded from storage.
    pub fn persisted(fields: Map<String, Value>) -> Self {
        Self {
            fields,
            errors: Map::new(),
            new: false,
        }
    }

    /// Read a field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Write a field.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Overwrite fields with the given data.
    pub fn patch(&mut self, data: &Map<String, Value>) {
        for (key, value) in data {
            self.fields.insert(key.clone(), value.clone());
        }
    }

    /// All fields.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Whether the entity has never been persisted.
    pub fn is_new(&self) -> bool {
        self.new
    }

    /// Mark the entity as new or persisted.
    pub fn set_new(&mut self, new: bool) {
        self.new = new;
    }

    /// Record a validation failure for `field` under `rule`.
    pub fn set_error(&mut self, field: &str, rule: &str, message: impl Into<String>) {
        let entry = self
            .errors
            .entry(field.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(rules) = entry {
            rules.insert(rule.to_string(), Value::String(message.into()));
        }
    }

    /// Field validation errors, keyed by field then rule.
    pub fn errors(&self) -> &Map<String, Value> {
        &self.errors
    }

    /// Whether any validation error is recorded.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Drop all recorded validation errors.
    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }
}

// ============================================================================
// Query
// ============================================================================

/// A filter applied to a query.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `field = value`
    Eq(String, Value),
    /// `field IN (values)`
    In(String, Vec<Value>),
}

impl Condition {
    /// Whether `entity` satisfies the condition, using loose equality.
    pub fn matches(&self, entity: &Entity) -> bool {
        match self {
            Condition::Eq(field, value) => entity
                .get(field)
                .is_some_and(|actual| loose_eq(actual, value)),
            Condition::In(field, values) => entity
                .get(field)
                .is_some_and(|actual| values.iter().any(|v| loose_eq(actual, v))),
        }
    }
}

/// A field assignment for update queries.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    /// `field = value`
    Set(String, Value),
    /// `field = NOT field`
    Toggle(String),
}

/// What a query does when executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryKind {
    /// Read rows.
    #[default]
    Select,
    /// Update matched rows in place.
    Update,
    /// Delete matched rows.
    Delete,
}

/// A storage-agnostic query description.
///
/// Listeners may reshape a query in `beforeFind`, `beforePaginate` or
/// `beforeBulk` before the repository executes it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Query {
    /// Finder name, e.g. `"all"` or `"list"`.
    pub finder: String,
    /// Finder options.
    pub options: Map<String, Value>,
    /// Filters, all of which must hold.
    pub conditions: Vec<Condition>,
    /// Query kind.
    pub kind: QueryKind,
    /// Assignments for [`QueryKind::Update`].
    pub updates: Vec<Update>,
}

impl Query {
    /// A select query using `finder`.
    pub fn select(finder: impl Into<String>) -> Self {
        Self {
            finder: finder.into(),
            ..Self::default()
        }
    }

    /// Add finder options.
    pub fn with_options(mut self, options: Map<String, Value>) -> Self {
        self.options.extend(options);
        self
    }

    /// Add an equality filter.
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Eq(field.into(), value.into()));
        self
    }

    /// Add a membership filter.
    pub fn where_in(mut self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.conditions.push(Condition::In(field.into(), values));
        self
    }

    /// Turn the query into a batch update.
    pub fn update(mut self, update: Update) -> Self {
        self.kind = QueryKind::Update;
        self.updates.push(update);
        self
    }

    /// Turn the query into a batch delete.
    pub fn delete(mut self) -> Self {
        self.kind = QueryKind::Delete;
        self
    }

    /// Whether `entity` satisfies every condition.
    pub fn matches(&self, entity: &Entity) -> bool {
        self.conditions.iter().all(|c| c.matches(entity))
    }
}

// ============================================================================
// Pagination
// ============================================================================

/// Pagination state of a result page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Paging {
    /// 1-based page number.
    pub page: u64,
    /// Rows per page.
    pub limit: u64,
    /// Total matching rows.
    pub count: u64,
    /// Total number of pages (at least 1).
    pub page_count: u64,
}

/// One page of results.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Entities on this page.
    pub entities: Vec<Entity>,
    /// Pagination state.
    pub paging: Paging,
}

// ============================================================================
// Schema
// ============================================================================

/// Declared type of a column, used to pick identifier validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// Integer column.
    Integer,
    /// Character column with optional fixed length.
    String {
        /// Declared length.
        length: Option<u32>,
    },
    /// Binary column with optional fixed length.
    Binary {
        /// Declared length.
        length: Option<u32>,
    },
    /// Anything else.
    Other,
}

// ============================================================================
// Repository
// ============================================================================

/// Errors raised by a [`Repository`].
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// The requested page lies beyond the last page.
    #[error("page {page} is out of range ({page_count} pages)")]
    PageOutOfRange {
        /// Requested page.
        page: u64,
        /// Number of available pages.
        page_count: u64,
    },

    /// The repository has no finder with this name.
    #[error("unknown finder: {0}")]
    UnknownFinder(String),

    /// The repository has no save/delete method with this name.
    #[error("unknown method: {0}")]
    UnknownMethod(String),

    /// A backend failure.
    #[error(transparent)]
    Backend(BoxError),
}

/// Storage collaborator for one resource.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a `Repository`",
    label = "missing `Repository` implementation",
    note = "Repositories provide find/save/delete/execute for a single resource."
)]
pub trait Repository: Send + Sync {
    /// Resource alias, e.g. `"Blogs"`.
    fn alias(&self) -> &str;

    /// Primary key field.
    fn primary_key(&self) -> &str {
        "id"
    }

    /// Declared type of the primary key, if the schema knows it.
    fn primary_key_type(&self) -> Option<ColumnType> {
        None
    }

    /// Whether the schema has `field`.
    fn has_field(&self, field: &str) -> bool;

    /// Build a select query for `finder`.
    fn find(&self, finder: &str, options: &Map<String, Value>) -> Result<Query, RepositoryError>;

    /// First row matching the query.
    fn first(&self, query: &Query) -> Result<Option<Entity>, RepositoryError>;

    /// Every row matching the query.
    fn all(&self, query: &Query) -> Result<Vec<Entity>, RepositoryError>;

    /// One page of rows matching the query.
    fn paginate(&self, query: &Query, page: u64, limit: u64) -> Result<Page, RepositoryError>;

    /// Build a new entity from request data.
    fn new_entity(&self, data: &Map<String, Value>, options: &Value) -> Entity;

    /// Apply request data to an existing entity.
    fn patch_entity(&self, entity: &mut Entity, data: &Map<String, Value>, options: &Value);

    /// Persist an entity with the named save method. `Ok(false)` means the
    /// save was rejected (e.g. validation) and is not an error.
    fn save(&self, method: &str, entity: &mut Entity, options: &Value)
    -> Result<bool, RepositoryError>;

    /// Delete an entity with the named delete method.
    fn delete(&self, method: &str, entity: &Entity) -> Result<bool, RepositoryError>;

    /// Execute a batch update or delete, returning the affected row count.
    fn execute(&self, query: &Query) -> Result<u64, RepositoryError>;

    /// Run `work` atomically.
    ///
    /// Implementations commit only when `work` returns `Ok(true)`. Any other
    /// exit, unwinding included, must leave storage as it was before.
    fn transactional(
        &self,
        work: &mut dyn FnMut() -> Result<bool, CrudError>,
    ) -> Result<bool, CrudError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entity(value: Value) -> Entity {
        match value {
            Value::Object(map) => Entity::persisted(map),
            _ => Entity::default(),
        }
    }

    #[test]
    fn test_query_matching_is_loose() {
        let row = entity(json!({"id": 2, "name": "b"}));
        assert!(Query::select("all").where_eq("id", "2").matches(&row));
        assert!(
            Query::select("all")
                .where_in("id", vec![json!("1"), json!("2")])
                .matches(&row)
        );
        assert!(!Query::select("all").where_eq("id", 3).matches(&row));
    }

    #[test]
    fn test_entity_errors() {
        let mut row = Entity::new(Map::new());
        assert!(!row.has_errors());
        row.set_error("name", "required", "Name is required");
        row.set_error("name", "length", "Too short");
        assert!(row.has_errors());
        assert_eq!(
            row.errors().get("name"),
            Some(&json!({"required": "Name is required", "length": "Too short"}))
        );
    }
}
