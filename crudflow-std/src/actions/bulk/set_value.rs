use super::BulkOperation;
use crudflow_core::{ConfigStore, CrudError, Query, Repository, Update, text};
use serde_json::{Value, json};

/// Sets `field` to `value` on the selected records.
#[derive(Debug, Clone, Copy, Default)]
pub struct BulkSetValue;

impl BulkOperation for BulkSetValue {
    fn default_config(&self) -> Value {
        json!({
            "field": null,
            "value": null,
            "messages": {
                "success": {"text": "Set value successfully"},
                "error": {"text": "Could not set value"}
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
        let value = config.get("value").cloned().unwrap_or(Value::Null);
        let affected = repository.execute(&query.clone().update(Update::Set(field, value)))?;
        Ok(affected > 0)
    }
}

/// The configured `field`, which bulk updates can't do without.
pub(super) fn required_field(config: &ConfigStore) -> Result<String, CrudError> {
    config
        .get("field")
        .filter(|field| text::truthy(field))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| CrudError::Config("No field value specified".to_string()))
}
