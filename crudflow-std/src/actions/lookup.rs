use super::{finder_with_config, paginate};
use crudflow_core::{Action, ActionContext, ConfigStore, Flow, Handled, Method, Request, Verbs};
use serde_json::{Map, Value, json};

/// Key/value list for select boxes and autocompletion.
///
/// Runs the same skeleton as [`IndexAction`](super::IndexAction) with the
/// `list` finder. The `key_field` (or `id`) and `value_field` (or `value`)
/// query parameters pick the columns when they name existing fields.
pub struct LookupAction {
    name: String,
    config: ConfigStore,
}

impl LookupAction {
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
            "findMethod": "list"
        })
    }

    fn field_options(
        &self,
        request: &Request,
        has_field: impl Fn(&str) -> bool,
    ) -> Map<String, Value> {
        let mut options = Map::new();
        let pick = |primary: &str, alternate: &str| {
            [primary, alternate]
                .into_iter()
                .filter_map(|key| request.query(key).and_then(Value::as_str))
                .find(|field| !field.is_empty())
                .filter(|field| has_field(field))
                .map(str::to_string)
        };
        if let Some(field) = pick("key_field", "id") {
            options.insert("keyField".into(), Value::String(field));
        }
        if let Some(field) = pick("value_field", "value") {
            options.insert("valueField".into(), Value::String(field));
        }
        options
    }
}

impl Action for LookupAction {
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
        let repository = ctx.repository();
        let (finder, mut options) = finder_with_config(self);
        options.extend(self.field_options(ctx.request(), |field| repository.has_field(field)));

        let mut subject = ctx.subject(self);
        subject.success = Some(true);
        subject.query = Some(repository.find(&finder, &options)?);
        paginate(self, ctx, subject)
    }
}
