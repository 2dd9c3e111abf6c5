use super::{
    finder::{find_record, validate_id},
    messages::set_flash,
    redirect::RedirectResolver,
};
use crudflow_core::{
    Action, ActionContext, ConfigStore, EventName, Flow, Handled, Method, Subject, Url, Verbs,
};
use serde_json::{Value, json};

/// Deletes a record.
///
/// `beforeDelete` → delete → `afterDelete` → `setFlash` → `beforeRedirect`.
/// A missing record fails with `recordNotFound` before `beforeDelete` is
/// raised. Stopping `beforeDelete` skips the delete and redirects with the
/// error message.
pub struct DeleteAction {
    name: String,
    config: ConfigStore,
}

impl DeleteAction {
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
            "deleteMethod": "delete",
            "api": {
                "methods": ["delete"],
                "success": {"code": 200},
                "error": {"code": 400}
            },
            "messages": {
                "success": {"text": "Successfully deleted {name}"},
                "error": {"text": "Could not delete {name}"}
            }
        })
    }

    fn finish(&self, ctx: &ActionContext<'_>, mut subject: Subject) -> Flow<Handled> {
        RedirectResolver::new().redirect(self, ctx, &mut subject, Url::action("index"))
    }
}

impl Action for DeleteAction {
    config_accessors!();

    fn verbs(&self) -> Verbs {
        Verbs::POST | Verbs::DELETE
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

        ctx.trigger(self, EventName::BeforeDelete, &mut subject)?;
        if subject.is_stopped() {
            subject.success = Some(false);
            set_flash(self, ctx, "error", &mut subject)?;
            return self.finish(ctx, subject);
        }

        let method = self.config.get_str("deleteMethod").unwrap_or("delete");
        let deleted = match &subject.entity {
            Some(entity) => ctx.repository().delete(method, entity)?,
            None => false,
        };

        #[cfg(feature = "tracing")]
        {
            if !deleted {
                tracing::warn!(action = self.name(), id, "Delete failed");
            }
        }

        subject.success = Some(deleted);
        ctx.trigger(self, EventName::AfterDelete, &mut subject)?;
        set_flash(self, ctx, if deleted { "success" } else { "error" }, &mut subject)?;
        self.finish(ctx, subject)
    }
}
