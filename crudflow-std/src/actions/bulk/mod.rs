//! Operations over a set of records selected by identifier.
//!
//! The identifiers come from the `id` map of the request body:
//!
//! ```json
//! {"id": {"1": "1", "2": "0", "3": "3", "_all": false}}
//! ```
//!
//! Without `_all` the checked values are used (`["1", "3"]`). A truthy `_all`
//! selects every key offered to the client (`["1", "2", "3"]`). The sentinel
//! itself is never part of the result, falsy entries are dropped and
//! duplicates are removed keeping the first occurrence.
//!
//! `beforeBulk` → operation → `afterBulk` → `setFlash` → `beforeRedirect`.

mod delete;
mod set_value;
mod toggle;

pub use delete::BulkDelete;
pub use set_value::BulkSetValue;
pub use toggle::BulkToggle;

use super::{finder_with_config, messages, redirect::RedirectResolver};
use crudflow_core::{
    Action, ActionContext, ConfigStore, CrudError, EventName, Flow, Handled, Method, Query,
    Repository, Subject, Url, Verbs, merge_value, text,
};
use serde_json::{Map, Value, json};

/// Key of the "select all" sentinel.
pub const SELECT_ALL: &str = "_all";

/// The work a [`BulkAction`] performs on the selected records.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a `BulkOperation`",
    label = "missing `BulkOperation` implementation",
    note = "Bulk operations provide their default configuration and `run`."
)]
pub trait BulkOperation: Send + Sync + 'static {
    /// Configuration layered over the shared bulk defaults.
    fn default_config(&self) -> Value;

    /// Reject a configuration the operation can't run with.
    fn check(&self, _config: &ConfigStore) -> Result<(), CrudError> {
        Ok(())
    }

    /// Perform the operation on the records matched by `query`.
    ///
    /// `Ok(false)` is a failed operation, reported with the error message.
    fn run(
        &self,
        config: &ConfigStore,
        repository: &dyn Repository,
        query: &Query,
    ) -> Result<bool, CrudError>;
}

/// An action running a [`BulkOperation`].
pub struct BulkAction<O> {
    name: String,
    config: ConfigStore,
    operation: O,
}

impl<O: BulkOperation> BulkAction<O> {
    /// Create the action mapped under `name`.
    pub fn new(name: &str, overrides: Value, operation: O) -> Self {
        let mut defaults = Self::default_config();
        merge_value(&mut defaults, operation.default_config());
        Self {
            name: name.to_string(),
            config: ConfigStore::with_defaults(defaults, overrides),
            operation,
        }
    }

    /// Configuration shared by every bulk action.
    pub fn default_config() -> Value {
        json!({
            "enabled": true,
            "scope": "bulk",
            "findMethod": "all",
            "messages": {
                "success": {"text": "Bulk action successfully completed"},
                "error": {"text": "Could not complete bulk action"}
            }
        })
    }

    /// The operation.
    pub fn operation(&self) -> &O {
        &self.operation
    }

    /// Selected identifiers of the current request.
    fn ids(&self, ctx: &ActionContext<'_>) -> Result<Vec<Value>, CrudError> {
        let Some(Value::Object(selection)) = ctx.request().data("id") else {
            return Err(messages::bad_request(ctx.settings()));
        };
        let ids = selected_ids(selection);
        if ids.is_empty() {
            return Err(messages::bad_request(ctx.settings()));
        }
        Ok(ids)
    }

    /// Query matching `ids`: the primary key IN the list, unless `findConfig`
    /// shapes the query itself.
    fn query(&self, repository: &dyn Repository, ids: &[Value]) -> Result<Query, CrudError> {
        let custom = self
            .config
            .get_map("findConfig")
            .is_some_and(|config| !config.is_empty());
        let (finder, options) = finder_with_config(self);
        let query = repository.find(&finder, &options)?;
        if custom {
            return Ok(query);
        }
        Ok(query.where_in(repository.primary_key(), ids.to_vec()))
    }

    fn finish(
        &self,
        ctx: &ActionContext<'_>,
        mut subject: Subject,
        kind: &str,
    ) -> Flow<Handled> {
        messages::set_flash(self, ctx, kind, &mut subject)?;
        RedirectResolver::new().redirect(self, ctx, &mut subject, Url::action("index"))
    }
}

impl<O: BulkOperation> Action for BulkAction<O> {
    config_accessors!();

    fn verbs(&self) -> Verbs {
        Verbs::empty()
    }

    fn has_fallback(&self) -> bool {
        true
    }

    fn dispatch(
        &self,
        _method: Option<Method>,
        ctx: &ActionContext<'_>,
        _args: &[String],
    ) -> Flow<Handled> {
        self.operation.check(&self.config)?;

        let repository = ctx.repository();
        let ids = self.ids(ctx)?;
        let mut subject = ctx.subject(self);
        subject.query = Some(self.query(repository, &ids)?);
        subject.ids = ids;

        ctx.trigger(self, EventName::BeforeBulk, &mut subject)?;
        if subject.is_stopped() {
            subject.success = Some(false);
            return self.finish(ctx, subject, "error");
        }

        let query = subject.query.take().unwrap_or_default();
        let result = self.operation.run(&self.config, repository, &query);
        subject.query = Some(query);
        let success = result?;

        #[cfg(feature = "tracing")]
        tracing::debug!(action = self.name(), ids = subject.ids.len(), success, "Bulk operation finished");

        subject.success = Some(success);
        ctx.trigger(self, EventName::AfterBulk, &mut subject)?;
        self.finish(ctx, subject, if success { "success" } else { "error" })
    }
}

/// Normalise the `id` selection map into an ordered, de-duplicated list.
pub fn selected_ids(selection: &Map<String, Value>) -> Vec<Value> {
    let select_all = selection.get(SELECT_ALL).is_some_and(text::truthy);
    let candidates: Vec<Value> = selection
        .iter()
        .filter(|(key, _)| key.as_str() != SELECT_ALL)
        .map(|(key, value)| {
            if select_all {
                Value::String(key.clone())
            } else {
                value.clone()
            }
        })
        .collect();

    let mut ids: Vec<Value> = Vec::with_capacity(candidates.len());
    for id in candidates {
        if text::truthy(&id) && !ids.iter().any(|seen| text::loose_eq(seen, &id)) {
            ids.push(id);
        }
    }
    ids
}
