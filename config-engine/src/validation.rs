// Configuration validation and schema enforcement
use crate::error::{ConfigError, ConfigResult};
use error_common::FieldViolation;
use jsonschema::JSONSchema;
use serde_json::Value;

/// Field label used when a violation concerns the whole document
pub const ROOT_FIELD: &str = "(root)";

pub trait ConfigValidator: Send + Sync {
    /// Check that `schema` is itself a usable JSON Schema
    fn validate_schema_definition(&self, schema: &Value) -> ConfigResult<()>;

    /// Check `data` against `schema`, reporting every violation
    fn validate_json(&self, schema: &Value, data: &Value) -> ConfigResult<()>;
}

/// JSON Schema validation backed by the `jsonschema` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSchemaValidator;

impl JsonSchemaValidator {
    pub fn new() -> Self {
        Self
    }
}

impl ConfigValidator for JsonSchemaValidator {
    fn validate_schema_definition(&self, schema: &Value) -> ConfigResult<()> {
        JSONSchema::compile(schema)
            .map(|_| ())
            .map_err(|e| ConfigError::InvalidSchema(format!("Schema validation error: {e}")))
    }

    fn validate_json(&self, schema: &Value, data: &Value) -> ConfigResult<()> {
        let compiled = JSONSchema::compile(schema).map_err(|e| {
            ConfigError::Internal(format!("Stored schema no longer compiles: {e}"))
        })?;

        let violations: Vec<FieldViolation> = match compiled.validate(data) {
            Ok(()) => return Ok(()),
            Err(errors) => errors
                .map(|error| {
                    FieldViolation::new(field_path(&error.instance_path.to_string()), error.to_string())
                })
                .collect(),
        };

        Err(ConfigError::validation_failed(violations))
    }
}

/// Parse a raw schema document, rejecting malformed JSON as an invalid schema
pub fn parse_schema_definition(raw: &[u8]) -> ConfigResult<Value> {
    serde_json::from_slice(raw)
        .map_err(|e| ConfigError::InvalidSchema(format!("Schema validation error: {e}")))
}

/// `/address/zip` becomes `address.zip`; the empty pointer is the root
fn field_path(pointer: &str) -> String {
    let trimmed = pointer.trim_start_matches('/');
    if trimmed.is_empty() {
        ROOT_FIELD.to_string()
    } else {
        trimmed.replace('/', ".")
    }
}
