use super::save::{save, save_settings};
use crudflow_core::{
    Action, ActionContext, ConfigStore, EventName, Flow, Handled, Method, Verbs, merge_value,
};
use serde_json::{Value, json};

/// Creates a record.
///
/// `GET` renders a fresh entity pre-filled from the query string. `POST` and
/// `PUT` build an entity from the body and save it:
///
/// - success: `beforeSave` → `afterSave` → `setFlash` → `beforeRedirect`
/// - failure: `beforeSave` → `afterSave` → `setFlash` → `beforeRender`
pub struct AddAction {
    name: String,
    config: ConfigStore,
}

impl AddAction {
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
            "saveMethod": "save",
            "saveOptions": {},
            "view": null,
            "viewVar": null,
            "serialize": [],
            "api": {
                "methods": ["put", "post"],
                "success": {
                    "code": 201,
                    "data": {"entity": ["id"]}
                },
                "error": {
                    "exception": {"type": "validate"}
                }
            },
            "redirect": {
                "post_add": {
                    "reader": "request.data",
                    "key": "_add",
                    "url": {"action": "add"}
                },
                "post_edit": {
                    "reader": "request.data",
                    "key": "_edit",
                    "url": {"action": "edit", "0": ["entity.field", "id"]}
                }
            },
            "messages": {
                "success": {"text": "Successfully created {name}"},
                "error": {"text": "Could not create {name}"}
            }
        })
    }

    fn form(&self, ctx: &ActionContext<'_>) -> Flow<Handled> {
        let (_, mut options) = save_settings(self);
        merge_value(&mut options, json!({"validate": false}));

        let mut subject = ctx.subject(self);
        subject.success = Some(true);
        subject.entity = Some(
            ctx.repository()
                .new_entity(&ctx.request().query, &options),
        );
        ctx.trigger(self, EventName::BeforeRender, &mut subject)?;
        Ok(Handled::Render(subject))
    }

    fn create(&self, ctx: &ActionContext<'_>) -> Flow<Handled> {
        let (_, options) = save_settings(self);
        let mut subject = ctx.subject(self);
        subject.entity = Some(ctx.repository().new_entity(&ctx.request().data, &options));
        save(self, ctx, subject, true)
    }
}

impl Action for AddAction {
    config_accessors!();

    fn verbs(&self) -> Verbs {
        Verbs::GET | Verbs::POST | Verbs::PUT
    }

    fn dispatch(
        &self,
        method: Option<Method>,
        ctx: &ActionContext<'_>,
        _args: &[String],
    ) -> Flow<Handled> {
        match method {
            Some(Method::Get) => self.form(ctx),
            _ => self.create(ctx),
        }
    }
}
