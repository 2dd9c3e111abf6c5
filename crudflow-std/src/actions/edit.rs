use super::{
    finder::{find_record, validate_id},
    messages,
    save::{save, save_settings},
};
use crudflow_core::{
    Action, ActionContext, ConfigStore, EventName, Flow, Handled, Method, Subject, Verbs, text,
};
use serde_json::{Value, json};

/// Updates a record.
///
/// `GET` loads and renders the record. `POST`, `PUT` and `PATCH` patch it
/// with the request body and save it, with the same success and failure
/// branches as [`AddAction`](super::AddAction) except that `created` is
/// always false.
pub struct EditAction {
    name: String,
    config: ConfigStore,
}

impl EditAction {
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
            "saveMethod": "save",
            "saveOptions": {},
            "view": null,
            "viewVar": null,
            "serialize": [],
            "api": {
                "methods": ["put", "post", "patch"],
                "success": {"code": 200},
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
                    "url": {"action": "edit", "0": ["subject.key", "id"]}
                }
            },
            "messages": {
                "success": {"text": "Successfully updated {name}"},
                "error": {"text": "Could not update {name}"}
            }
        })
    }

    fn load(&self, ctx: &ActionContext<'_>, args: &[String]) -> Flow<(Subject, String)> {
        let id = args.first().cloned().unwrap_or_default();
        let mut subject = ctx.subject(self);
        subject.args = args.to_vec();
        validate_id(self, ctx, &mut subject, &id)?;
        subject.id = Some(id.clone());
        Ok((subject, id))
    }

    fn form(&self, ctx: &ActionContext<'_>, args: &[String]) -> Flow<Handled> {
        let (mut subject, id) = self.load(ctx, args)?;
        find_record(self, ctx, &mut subject, &id)?;
        ctx.trigger(self, EventName::BeforeRender, &mut subject)?;
        Ok(Handled::Render(subject))
    }

    fn update(&self, ctx: &ActionContext<'_>, args: &[String]) -> Flow<Handled> {
        let (mut subject, id) = self.load(ctx, args)?;
        self.check_body_id(ctx, &mut subject, &id)?;

        find_record(self, ctx, &mut subject, &id)?;
        let (_, options) = save_settings(self);
        // The URL id is authoritative; a matching or blank body id is dropped.
        let mut data = ctx.request().data.clone();
        data.remove(ctx.repository().primary_key());
        if let Some(entity) = subject.entity.as_mut() {
            ctx.repository().patch_entity(entity, &data, &options);
        }
        save(self, ctx, subject, false)
    }

    /// A truthy identifier in the body must match the one in the URL.
    fn check_body_id(&self, ctx: &ActionContext<'_>, subject: &mut Subject, id: &str) -> Flow {
        let key = ctx.repository().primary_key();
        let Some(body_id) = ctx.request().data.get(key) else {
            return Ok(());
        };
        if !text::truthy(body_id) || text::loose_eq(body_id, &Value::String(id.to_string())) {
            return Ok(());
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(id, body_id = %body_id, "Body identifier does not match the URL");

        ctx.trigger(self, EventName::InvalidId, subject)?;
        Err(messages::invalid_id(ctx.settings(), id).into())
    }
}

impl Action for EditAction {
    config_accessors!();

    fn verbs(&self) -> Verbs {
        Verbs::GET | Verbs::POST | Verbs::PUT | Verbs::PATCH
    }

    fn dispatch(
        &self,
        method: Option<Method>,
        ctx: &ActionContext<'_>,
        args: &[String],
    ) -> Flow<Handled> {
        match method {
            Some(Method::Get) => self.form(ctx, args),
            _ => self.update(ctx, args),
        }
    }
}
