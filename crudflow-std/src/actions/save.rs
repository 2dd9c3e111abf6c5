//! The save skeleton shared by [`AddAction`](super::AddAction) and
//! [`EditAction`](super::EditAction).

use super::{messages::set_flash, redirect::RedirectResolver};
use crudflow_core::{Action, ActionContext, EventName, Flow, Handled, Subject, Url};
use serde_json::{Map, Value};

/// Save method and options, as configured.
pub(crate) fn save_settings(action: &dyn Action) -> (String, Value) {
    let method = action
        .config()
        .get_str("saveMethod")
        .unwrap_or("save")
        .to_string();
    let options = action
        .config()
        .get("saveOptions")
        .cloned()
        .unwrap_or_else(|| Value::Object(Map::new()));
    (method, options)
}

/// Save `subject.entity`.
///
/// `saveMethod` and `saveOptions` are published on the subject before
/// `beforeSave`, so listeners can swap them. `created` is what a successful
/// save reports.
pub(crate) fn save(
    action: &dyn Action,
    ctx: &ActionContext<'_>,
    mut subject: Subject,
    created: bool,
) -> Flow<Handled> {
    let (method, options) = save_settings(action);
    subject.set_field("saveMethod", method);
    subject.set_field("saveOptions", options);

    ctx.trigger(action, EventName::BeforeSave, &mut subject)?;
    if subject.is_stopped() {
        return stopped(action, ctx, subject, created);
    }

    let method = subject
        .get("saveMethod")
        .and_then(Value::as_str)
        .unwrap_or("save")
        .to_string();
    let options = subject.get("saveOptions").cloned().unwrap_or(Value::Null);
    let saved = match subject.entity.as_mut() {
        Some(entity) => ctx.repository().save(&method, entity, &options)?,
        None => false,
    };

    if saved {
        success(action, ctx, subject, created)
    } else {
        #[cfg(feature = "tracing")]
        tracing::warn!(action = action.name(), method = %method, "Save failed");
        error(action, ctx, subject)
    }
}

fn success(
    action: &dyn Action,
    ctx: &ActionContext<'_>,
    mut subject: Subject,
    created: bool,
) -> Flow<Handled> {
    subject.success = Some(true);
    subject.created = Some(created);
    ctx.trigger(action, EventName::AfterSave, &mut subject)?;
    set_flash(action, ctx, "success", &mut subject)?;
    RedirectResolver::new().redirect(action, ctx, &mut subject, Url::action("index"))
}

fn error(action: &dyn Action, ctx: &ActionContext<'_>, mut subject: Subject) -> Flow<Handled> {
    subject.success = Some(false);
    subject.created = Some(false);
    ctx.trigger(action, EventName::AfterSave, &mut subject)?;
    set_flash(action, ctx, "error", &mut subject)?;
    ctx.trigger(action, EventName::BeforeRender, &mut subject)?;
    Ok(Handled::Render(subject))
}

/// A listener stopped `beforeSave`. If it already marked the operation
/// successful the success path runs, otherwise it fails with a redirect.
fn stopped(
    action: &dyn Action,
    ctx: &ActionContext<'_>,
    mut subject: Subject,
    created: bool,
) -> Flow<Handled> {
    if subject.success == Some(true) {
        return success(action, ctx, subject, created);
    }
    subject.success = Some(false);
    set_flash(action, ctx, "error", &mut subject)?;
    RedirectResolver::new().redirect(action, ctx, &mut subject, Url::action("index"))
}
