use super::BulkOperation;
use crudflow_core::{ConfigStore, CrudError, Query, Repository};
use serde_json::{Value, json};

/// Deletes the selected records.
///
/// By default a single batch delete runs and succeeds when it removed at
/// least one row. With `cascade` enabled every record is loaded and deleted
/// one by one with `deleteMethod` inside a repository transaction, so that
/// per-record delete logic runs. One failed delete rolls the whole batch
/// back. Either way, matching nothing is a failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct BulkDelete;

impl BulkOperation for BulkDelete {
    fn default_config(&self) -> Value {
        json!({
            "cascade": false,
            "deleteMethod": "delete",
            "messages": {
                "success": {"text": "Delete completed successfully"},
                "error": {"text": "Could not complete deletion"}
            }
        })
    }

    fn run(
        &self,
        config: &ConfigStore,
        repository: &dyn Repository,
        query: &Query,
    ) -> Result<bool, CrudError> {
        if !config.get_bool("cascade").unwrap_or(false) {
            let affected = repository.execute(&query.clone().delete())?;
            return Ok(affected > 0);
        }

        let method = config.get_str("deleteMethod").unwrap_or("delete");
        let committed = repository.transactional(&mut || -> Result<bool, CrudError> {
            let entities = repository.all(query)?;
            if entities.is_empty() {
                return Ok(false);
            }
            for entity in &entities {
                if !repository.delete(method, entity)? {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(entity = ?entity.fields(), "Cascading delete failed, rolling back");
                    return Ok(false);
                }
            }
            Ok(true)
        })?;
        Ok(committed)
    }
}
