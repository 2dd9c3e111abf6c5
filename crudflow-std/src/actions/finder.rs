//! Identifier validation and single-record lookup.

use super::messages;
use crudflow_core::{Action, ActionContext, ColumnType, EventName, Flow, Repository, Subject};
use serde_json::Value;
use uuid::Uuid;

/// Expected shape of a record identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    /// Numeric identifier.
    Integer,
    /// Canonical 36-character UUID.
    Uuid,
}

impl IdKind {
    /// Infer the identifier kind from the declared primary key type.
    pub fn detect(column: Option<ColumnType>) -> Option<Self> {
        match column? {
            ColumnType::Integer => Some(IdKind::Integer),
            ColumnType::String { length: Some(36) } | ColumnType::Binary { length: Some(36) } => {
                Some(IdKind::Uuid)
            }
            _ => None,
        }
    }

    /// Whether `id` has this shape.
    pub fn accepts(self, id: &str) -> bool {
        match self {
            IdKind::Integer => !id.is_empty() && id.parse::<f64>().is_ok_and(f64::is_finite),
            IdKind::Uuid => id.len() == 36 && Uuid::try_parse(id).is_ok(),
        }
    }
}

/// Identifier kind an action validates against.
///
/// `validateId` unset or `true` detects it from the repository schema,
/// `null`/`false` disables validation, `"uuid"` selects UUIDs and any other
/// string selects integers.
pub fn id_kind(action: &dyn Action, repository: &dyn Repository) -> Option<IdKind> {
    match action.config().get("validateId") {
        None | Some(Value::Bool(true)) => IdKind::detect(repository.primary_key_type()),
        Some(Value::String(kind)) if kind == "uuid" => Some(IdKind::Uuid),
        Some(Value::String(_)) => Some(IdKind::Integer),
        Some(_) => None,
    }
}

/// Reject an identifier of the wrong shape.
///
/// Raises `invalidId` before failing with
/// [`CrudError::InvalidId`](crudflow_core::CrudError::InvalidId).
pub fn validate_id(
    action: &dyn Action,
    ctx: &ActionContext<'_>,
    subject: &mut Subject,
    id: &str,
) -> Flow {
    let Some(kind) = id_kind(action, ctx.repository()) else {
        return Ok(());
    };
    if kind.accepts(id) {
        return Ok(());
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(id, ?kind, "Rejecting identifier");

    subject.id = Some(id.to_string());
    ctx.trigger(action, EventName::InvalidId, subject)?;
    Err(messages::invalid_id(ctx.settings(), id).into())
}

/// Load the record `id` into `subject.entity`.
///
/// The query is published on the subject before `beforeFind` so listeners
/// can reshape it. An empty result raises `recordNotFound` and fails with
/// [`CrudError::RecordNotFound`](crudflow_core::CrudError::RecordNotFound).
pub fn find_record(
    action: &dyn Action,
    ctx: &ActionContext<'_>,
    subject: &mut Subject,
    id: &str,
) -> Flow {
    let repository = ctx.repository();
    let (finder, options) = action.find_method();
    let query = repository
        .find(&finder, &options)?
        .where_eq(repository.primary_key(), id);
    subject.query = Some(query);

    ctx.trigger(action, EventName::BeforeFind, subject)?;
    let found = match &subject.query {
        Some(query) => repository.first(query)?,
        None => None,
    };

    let Some(entity) = found else {
        subject.success = Some(false);
        ctx.trigger(action, EventName::RecordNotFound, subject)?;
        return Err(messages::record_not_found(ctx.settings(), id).into());
    };

    subject.entity = Some(entity);
    subject.success = Some(true);
    ctx.trigger(action, EventName::AfterFind, subject)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_from_primary_key_type() {
        assert_eq!(IdKind::detect(Some(ColumnType::Integer)), Some(IdKind::Integer));
        assert_eq!(
            IdKind::detect(Some(ColumnType::String { length: Some(36) })),
            Some(IdKind::Uuid)
        );
        assert_eq!(
            IdKind::detect(Some(ColumnType::Binary { length: Some(36) })),
            Some(IdKind::Uuid)
        );
        assert_eq!(IdKind::detect(Some(ColumnType::String { length: Some(255) })), None);
        assert_eq!(IdKind::detect(None), None);
    }

    #[test]
    fn test_accepts() {
        assert!(IdKind::Integer.accepts("42"));
        assert!(!IdKind::Integer.accepts("abc"));
        assert!(!IdKind::Integer.accepts(""));
        assert!(IdKind::Uuid.accepts("67e55044-10b1-426f-9247-bb680e5fe0c8"));
        assert!(!IdKind::Uuid.accepts("67e5504410b1426f9247bb680e5fe0c8"));
        assert!(!IdKind::Uuid.accepts("42"));
    }
}
