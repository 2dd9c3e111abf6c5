//! Standard action implementations.
//!
//! Every action owns a [`ConfigStore`](crudflow_core::ConfigStore) built once
//! from `default_config()` and the overrides of its mapping. The shared
//! behaviour (messages, record lookup, redirects, pagination) lives in the
//! helper modules and is called by the concrete actions.

use crudflow_core::{
    Action, ActionContext, EventName, Flow, Handled, RepositoryError, Subject, Url,
};
use serde_json::{Map, Value};

/// Implements the name and configuration accessors of [`Action`] for a struct
/// with `name: String` and `config: ConfigStore` fields.
macro_rules! config_accessors {
    () => {
        fn name(&self) -> &str {
            &self.name
        }

        fn config(&self) -> &::crudflow_core::ConfigStore {
            &self.config
        }

        fn config_mut(&mut self) -> &mut ::crudflow_core::ConfigStore {
            &mut self.config
        }
    };
}

pub mod bulk;
pub mod finder;
pub mod messages;
pub mod redirect;

mod add;
mod delete;
mod edit;
mod index;
mod lookup;
mod save;
mod view;

pub use add::AddAction;
pub use bulk::{BulkAction, BulkDelete, BulkOperation, BulkSetValue, BulkToggle};
pub use delete::DeleteAction;
pub use edit::EditAction;
pub use index::IndexAction;
pub use lookup::LookupAction;
pub use redirect::RedirectResolver;
pub use view::ViewAction;

/// Rows per page when an action doesn't configure `limit`.
pub const DEFAULT_LIMIT: u64 = 20;

/// Paginate `subject.query` and render the page.
///
/// Raises `beforePaginate`, `afterPaginate` and `beforeRender`. A page past
/// the end redirects to the last page, keeping the rest of the query string.
pub(crate) fn paginate(
    action: &dyn Action,
    ctx: &ActionContext<'_>,
    mut subject: Subject,
) -> Flow<Handled> {
    ctx.trigger(action, EventName::BeforePaginate, &mut subject)?;

    let request = ctx.request();
    let page = request
        .query("page")
        .and_then(as_u64)
        .filter(|page| *page > 0)
        .unwrap_or(1);
    let limit = action
        .config()
        .get("limit")
        .and_then(as_u64)
        .filter(|limit| *limit > 0)
        .unwrap_or(DEFAULT_LIMIT);

    let query = subject.query.take().unwrap_or_default();
    let result = ctx.repository().paginate(&query, page, limit);
    subject.query = Some(query);

    match result {
        Ok(page) => {
            subject.entities = Some(page.entities);
            subject.paging = Some(page.paging);
        }
        Err(RepositoryError::PageOutOfRange { page_count, .. }) => {
            #[cfg(feature = "tracing")]
            tracing::debug!(page, page_count, "Page out of range, redirecting to last page");

            let mut route = request.params.clone();
            let mut query = request.query.clone();
            query.insert("page".into(), Value::from(page_count.max(1)));
            route.insert("?".into(), Value::Object(query));
            return Ok(Handled::Respond(
                ctx.host().redirect(&Url::Route(route), 302),
            ));
        }
        Err(err) => return Err(err.into()),
    }

    ctx.trigger(action, EventName::AfterPaginate, &mut subject)?;
    ctx.trigger(action, EventName::BeforeRender, &mut subject)?;
    Ok(Handled::Render(subject))
}

/// Finder options from `findMethod` merged with `findConfig`.
pub(crate) fn finder_with_config(action: &dyn Action) -> (String, Map<String, Value>) {
    let (finder, mut options) = action.find_method();
    if let Some(config) = action.config().get_map("findConfig") {
        options.extend(config.clone());
    }
    (finder, options)
}

fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
