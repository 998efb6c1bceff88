//! Per-entity validation configuration

use crate::core::error::FieldValidationError;
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;

type ValidatorFn = Arc<dyn Fn(&str, &Value) -> Result<(), String> + Send + Sync>;
type FilterFn = Arc<dyn Fn(&str, Value) -> Value + Send + Sync>;

/// Validators and filters for one entity and one operation
///
/// Filters run first and only touch fields present in the payload.
/// Validators then run in declaration order; a field declared `optional`
/// skips its remaining validators when absent or null.
#[derive(Clone)]
pub struct EntityValidationConfig {
    pub entity_type: &'static str,
    validators: IndexMap<String, Vec<(bool, ValidatorFn)>>,
    filters: IndexMap<String, Vec<FilterFn>>,
}

impl EntityValidationConfig {
    pub fn new(entity_type: &'static str) -> Self {
        Self {
            entity_type,
            validators: IndexMap::new(),
            filters: IndexMap::new(),
        }
    }

    pub fn add_validator<F>(&mut self, field: &str, validator: F)
    where
        F: Fn(&str, &Value) -> Result<(), String> + Send + Sync + 'static,
    {
        self.validators
            .entry(field.to_string())
            .or_default()
            .push((false, Arc::new(validator)));
    }

    /// Mark a field optional: absent or null values skip its validators
    pub fn mark_optional(&mut self, field: &str) {
        self.validators
            .entry(field.to_string())
            .or_default()
            .push((true, Arc::new(|_: &str, _: &Value| Ok(()))));
    }

    pub fn add_filter<F>(&mut self, field: &str, filter: F)
    where
        F: Fn(&str, Value) -> Value + Send + Sync + 'static,
    {
        self.filters
            .entry(field.to_string())
            .or_default()
            .push(Arc::new(filter));
    }

    /// Apply filters then validators, collecting every field error
    pub fn validate_and_filter(&self, payload: Value) -> Result<Value, Vec<FieldValidationError>> {
        let Value::Object(mut fields) = payload else {
            return Err(vec![FieldValidationError {
                field: "_root".to_string(),
                message: format!("{} payload must be a JSON object", self.entity_type),
            }]);
        };

        for (field, filters) in &self.filters {
            if let Some(value) = fields.remove(field) {
                let filtered = filters.iter().fold(value, |v, f| f(field, v));
                fields.insert(field.clone(), filtered);
            }
        }

        let mut errors = Vec::new();
        for (field, validators) in &self.validators {
            let value = fields.get(field).cloned().unwrap_or(Value::Null);
            let optional = validators.iter().any(|(is_optional, _)| *is_optional);
            if optional && value.is_null() {
                continue;
            }
            for (_, validator) in validators {
                if let Err(message) = validator(field, &value) {
                    errors.push(FieldValidationError {
                        field: field.clone(),
                        message,
                    });
                    break;
                }
            }
        }

        if errors.is_empty() {
            Ok(Value::Object(fields))
        } else {
            Err(errors)
        }
    }
}

impl std::fmt::Debug for EntityValidationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityValidationConfig")
            .field("entity_type", &self.entity_type)
            .field("validated_fields", &self.validators.keys().collect::<Vec<_>>())
            .field("filtered_fields", &self.filters.keys().collect::<Vec<_>>())
            .finish()
    }
}
