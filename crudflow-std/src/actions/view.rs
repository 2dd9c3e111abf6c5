use super::finder::{find_record, validate_id};
use crudflow_core::{
    Action, ActionContext, ConfigStore, EventName, Flow, Handled, Method, Verbs,
};
use serde_json::{Value, json};

/// A single record.
pub struct ViewAction {
    name: String,
    config: ConfigStore,
}

impl ViewAction {
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
            "scope": "entity",
            "findMethod": "all",
            "view": null,
            "viewVar": null,
            "serialize": []
        })
    }
}

impl Action for ViewAction {
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
        args: &[String],
    ) -> Flow<Handled> {
        let id = args.first().map(String::as_str).unwrap_or_default();
        let mut subject = ctx.subject(self);
        subject.args = args.to_vec();

        validate_id(self, ctx, &mut subject, id)?;
        subject.id = Some(id.to_string());
        find_record(self, ctx, &mut subject, id)?;

        ctx.trigger(self, EventName::BeforeRender, &mut subject)?;
        Ok(Handled::Render(subject))
    }
}
