use std::fmt;
use std::sync::Arc;

use jsonschema::Validator;
use serde_json::Value;

use crate::config::SchemaConfig;
use crate::error::{Result, SchemaError};
use crate::strict::apply_strict_mode;

const MAX_REPORTED_ERRORS: usize = 4;

/// A compiled JSON Schema together with the document it was compiled from.
///
/// Clones share the compiled validator. Equality compares source documents,
/// so two validators compiled from the same schema are equal.
#[derive(Clone)]
pub struct SchemaValidator {
    schema: Arc<Value>,
    // `None` is the accept-all schema (`true`), which needs no compilation.
    compiled: Option<Arc<Validator>>,
}

impl SchemaValidator {
    /// Validator that accepts every value.
    pub fn accept_all() -> Self {
        Self {
            schema: Arc::new(Value::Bool(true)),
            compiled: None,
        }
    }

    /// Compile a schema with default config.
    pub fn compile(schema: &Value) -> Result<Self> {
        Self::compile_for("schema", schema, &SchemaConfig::default())
    }

    /// Compile a schema, naming `target` in any compile error.
    pub fn compile_for(target: &str, schema: &Value, config: &SchemaConfig) -> Result<Self> {
        if matches!(schema, Value::Bool(true)) {
            return Ok(Self::accept_all());
        }

        let mut schema_to_compile = schema.clone();
        if config.strict_mode {
            apply_strict_mode(&mut schema_to_compile);
        }

        let compiled = jsonschema::validator_for(&schema_to_compile).map_err(|err| {
            SchemaError::CompileFailed {
                target: target.to_string(),
                message: err.to_string(),
            }
        })?;

        Ok(Self {
            schema: Arc::new(schema_to_compile),
            compiled: Some(Arc::new(compiled)),
        })
    }

    /// Source schema document (after strict-mode rewriting, if any).
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// Validate a value, naming `target` in the error.
    pub fn validate(&self, target: &str, value: &Value) -> Result<()> {
        let Some(validator) = &self.compiled else {
            return Ok(());
        };

        let mut errors = validator.iter_errors(value);
        if let Some(first) = errors.next() {
            let mut message = first.to_string();
            for err in errors.take(MAX_REPORTED_ERRORS - 1) {
                message.push_str("; ");
                message.push_str(&err.to_string());
            }
            return Err(SchemaError::ValidationFailed {
                target: target.to_string(),
                message,
            });
        }

        Ok(())
    }

    /// Parse a JSON payload and validate it.
    pub fn validate_slice(&self, target: &str, payload: &[u8]) -> Result<Value> {
        let value: Value = serde_json::from_slice(payload)?;
        self.validate(target, &value)?;
        Ok(value)
    }

    /// Cheap check without building an error message.
    pub fn is_valid(&self, value: &Value) -> bool {
        match &self.compiled {
            Some(validator) => validator.is_valid(value),
            None => true,
        }
    }

    /// True when both handles share one compiled validator.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.schema, &other.schema)
    }
}

impl Default for SchemaValidator {
    fn default() -> Self {
        Self::accept_all()
    }
}

impl PartialEq for SchemaValidator {
    fn eq(&self, other: &Self) -> bool {
        self.schema == other.schema
    }
}

impl fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SchemaValidator").field(&self.schema).finish()
    }
}
