use super::{BulkOperation, set_value::required_field};
use crudflow_core::{ConfigStore, CrudError, Query, Repository, Update};
use serde_json::{Value, json};

/// Flips the boolean `field` on the selected records.
#[derive(Debug, Clone, Copy, Default)]
pub struct BulkToggle;

impl BulkOperation for BulkToggle {
    fn default_config(&self) -> Value {
        json!({
            "field": null,
            "messages": {
                "success": {"text": "Value toggled successfully"},
                "error": {"text": "Could not toggle value"}
            }
        })
    }

    fn check(&self, config: &ConfigStore) -> Result<(), CrudError> {
        required_field(config).map(|_| ())
    }

    fn run(
        &self,
        config: &ConfigStore,
        repository: &dyn Repository,
        query: &Query,
    ) -> Result<bool, CrudError> {
        let field = required_field(config)?;
        let affected = repository.execute(&query.clone().update(Update::Toggle(field)))?;
        Ok(affected > 0)
    }
}
