use super::paginate;
use crudflow_core::{Action, ActionContext, ConfigStore, Flow, Handled, Method, Verbs};
use serde_json::{Value, json};

/// Paginated list of records.
///
/// Every verb runs the same path:
/// `beforePaginate` → paginate → `afterPaginate` → `beforeRender`.
pub struct IndexAction {
    name: String,
    config: ConfigStore,
}

impl IndexAction {
    /// Create the action mapped under `name`.
    pub fn new(name: &str, overrides: Value) -> Self {
        Self {
            name: name.to_string(),
            config: ConfigStore::with_defaults(Self::default_config(), overrides),
        }
    }

    /// Class-level configuration.
    pub fn default_config() -> Value {
        json!({
            "enabled": true,
            "scope": "table",
            "findMethod": "all",
            "view": null,
            "viewVar": null,
            "serialize": [],
            "api": {
                "success": {"code": 200},
                "error": {"code": 400}
            }
        })
    }
}

impl Action for IndexAction {
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
        let (finder, options) = self.find_method();
        let mut subject = ctx.subject(self);
        subject.success = Some(true);
        subject.query = Some(ctx.repository().find(&finder, &options)?);
        paginate(self, ctx, subject)
    }
}
