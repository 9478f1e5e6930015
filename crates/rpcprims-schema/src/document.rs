use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::config::SchemaConfig;
use crate::error::{Result, SchemaError};
use crate::kind::MethodKind;
use crate::validator::SchemaValidator;

/// Declaration of one endpoint method.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodSchema {
    kind: MethodKind,
    input: SchemaValidator,
    result: SchemaValidator,
}

impl MethodSchema {
    pub fn new(kind: MethodKind, input: SchemaValidator, result: SchemaValidator) -> Self {
        Self {
            kind,
            input,
            result,
        }
    }

    pub fn query(input: SchemaValidator, result: SchemaValidator) -> Self {
        Self::new(MethodKind::Query, input, result)
    }

    pub fn mutation(input: SchemaValidator, result: SchemaValidator) -> Self {
        Self::new(MethodKind::Mutation, input, result)
    }

    pub fn stream(input: SchemaValidator, result: SchemaValidator) -> Self {
        Self::new(MethodKind::Stream, input, result)
    }

    pub fn kind(&self) -> MethodKind {
        self.kind
    }

    /// Validator for call parameters.
    pub fn input(&self) -> &SchemaValidator {
        &self.input
    }

    /// Validator for each result (each element, for streams).
    pub fn result(&self) -> &SchemaValidator {
        &self.result
    }
}

/// Immutable description of an endpoint: name, routing path, methods.
///
/// Method names are unique keys. Iteration order is by name.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointSchema {
    name: String,
    path: String,
    methods: BTreeMap<String, MethodSchema>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEndpoint {
    name: String,
    path: String,
    #[serde(default)]
    methods: BTreeMap<String, RawMethod>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawMethod {
    kind: MethodKind,
    #[serde(default = "accept_all_schema")]
    input: Value,
    #[serde(default = "accept_all_schema")]
    result: Value,
}

fn accept_all_schema() -> Value {
    Value::Bool(true)
}

impl EndpointSchema {
    /// Create a schema with no methods.
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            methods: BTreeMap::new(),
        }
    }

    /// Add or replace a method declaration.
    pub fn with_method(mut self, name: impl Into<String>, method: MethodSchema) -> Self {
        self.methods.insert(name.into(), method);
        self
    }

    /// Parse an endpoint document with default config.
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_json_with_config(json, &SchemaConfig::default())
    }

    /// Parse an endpoint document with explicit config.
    pub fn from_json_with_config(json: &str, config: &SchemaConfig) -> Result<Self> {
        let raw: RawEndpoint = serde_json::from_str(json)?;
        Self::from_raw(raw, config)
    }

    /// Build from an already-parsed endpoint document.
    pub fn from_value(document: Value, config: &SchemaConfig) -> Result<Self> {
        let raw: RawEndpoint = serde_json::from_value(document)?;
        Self::from_raw(raw, config)
    }

    fn from_raw(raw: RawEndpoint, config: &SchemaConfig) -> Result<Self> {
        if raw.name.trim().is_empty() {
            return Err(SchemaError::InvalidDocument(
                "endpoint name must not be empty".to_string(),
            ));
        }

        let mut schema = Self::new(raw.name, raw.path);
        for (method_name, method) in raw.methods {
            if method_name.trim().is_empty() {
                return Err(SchemaError::InvalidDocument(format!(
                    "endpoint {} declares a method with an empty name",
                    schema.name
                )));
            }

            let target = format!("{}.{method_name}", schema.name);
            let input =
                SchemaValidator::compile_for(&format!("{target} input"), &method.input, config)?;
            let result =
                SchemaValidator::compile_for(&format!("{target} result"), &method.result, config)?;

            schema
                .methods
                .insert(method_name, MethodSchema::new(method.kind, input, result));
        }

        tracing::debug!(
            endpoint = %schema.name,
            methods = schema.methods.len(),
            "parsed endpoint schema"
        );
        Ok(schema)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Routing hint for transports. Not interpreted here.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn methods(&self) -> &BTreeMap<String, MethodSchema> {
        &self.methods
    }

    pub fn method(&self, name: &str) -> Option<&MethodSchema> {
        self.methods.get(name)
    }

    pub fn method_names(&self) -> Vec<&str> {
        self.methods.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const GREETER: &str = r#"{
        "name": "greeter",
        "path": "/rpc/greeter",
        "methods": {
            "hello": {
                "kind": "query",
                "input": {
                    "type": "object",
                    "properties": { "message": { "type": "string" } },
                    "required": ["message"]
                },
                "result": {
                    "type": "object",
                    "properties": { "response": { "type": "string" } },
                    "required": ["response"]
                }
            },
            "rename": { "kind": "mutation" },
            "count": {
                "kind": "stream",
                "input": { "type": "object", "properties": { "count": { "type": "integer" } } },
                "result": { "type": "object", "properties": { "number": { "type": "integer" } } }
            }
        }
    }"#;

    #[test]
    fn parses_endpoint_document() {
        let schema = EndpointSchema::from_json(GREETER).unwrap();

        assert_eq!(schema.name(), "greeter");
        assert_eq!(schema.path(), "/rpc/greeter");
        assert_eq!(schema.method_names(), vec!["count", "hello", "rename"]);
        assert_eq!(schema.method("hello").unwrap().kind(), MethodKind::Query);
        assert_eq!(
            schema.method("rename").unwrap().kind(),
            MethodKind::Mutation
        );
        assert_eq!(schema.method("count").unwrap().kind(), MethodKind::Stream);
        assert!(schema.method("missing").is_none());
    }

    #[test]
    fn omitted_validators_accept_everything() {
        let schema = EndpointSchema::from_json(GREETER).unwrap();
        let rename = schema.method("rename").unwrap();

        assert_eq!(rename.input(), &SchemaValidator::accept_all());
        assert!(rename.result().is_valid(&json!("anything")));
    }

    #[test]
    fn compiled_validators_check_values() {
        let schema = EndpointSchema::from_json(GREETER).unwrap();
        let hello = schema.method("hello").unwrap();

        assert!(hello.input().is_valid(&json!({"message": "world"})));
        assert!(!hello.input().is_valid(&json!({"message": 5})));
        assert!(matches!(
            hello.result().validate("greeter.hello result", &json!({})),
            Err(SchemaError::ValidationFailed { .. })
        ));
    }

    #[test]
    fn methods_default_to_empty() {
        let schema = EndpointSchema::from_json(r#"{"name":"empty","path":"/empty"}"#).unwrap();
        assert!(schema.methods().is_empty());
    }

    #[test]
    fn rejects_unknown_kind_and_fields() {
        assert!(matches!(
            EndpointSchema::from_json(
                r#"{"name":"x","path":"/x","methods":{"m":{"kind":"subscription"}}}"#
            ),
            Err(SchemaError::InvalidJson(_))
        ));
        assert!(matches!(
            EndpointSchema::from_json(r#"{"name":"x","path":"/x","extra":1}"#),
            Err(SchemaError::InvalidJson(_))
        ));
    }

    #[test]
    fn rejects_empty_names() {
        assert!(matches!(
            EndpointSchema::from_json(r#"{"name":" ","path":"/x"}"#),
            Err(SchemaError::InvalidDocument(_))
        ));
        assert!(matches!(
            EndpointSchema::from_json(
                r#"{"name":"x","path":"/x","methods":{"":{"kind":"query"}}}"#
            ),
            Err(SchemaError::InvalidDocument(_))
        ));
    }

    #[test]
    fn compile_error_names_the_method() {
        let err = EndpointSchema::from_json(
            r#"{"name":"x","path":"/x","methods":{"m":{"kind":"query","result":{"type":"nope"}}}}"#,
        )
        .unwrap_err();

        assert!(matches!(
            err,
            SchemaError::CompileFailed { ref target, .. } if target == "x.m result"
        ));
    }

    #[test]
    fn strict_config_applies_to_every_method() {
        let config = SchemaConfig {
            strict_mode: true,
            ..SchemaConfig::default()
        };
        let schema = EndpointSchema::from_json_with_config(GREETER, &config).unwrap();
        let hello = schema.method("hello").unwrap();

        assert!(!hello
            .input()
            .is_valid(&json!({"message": "world", "extra": true})));
    }

    #[test]
    fn builder_matches_parsed_document() {
        let built = EndpointSchema::new("empty", "/empty").with_method(
            "ping",
            MethodSchema::query(SchemaValidator::accept_all(), SchemaValidator::accept_all()),
        );
        let parsed = EndpointSchema::from_value(
            json!({"name": "empty", "path": "/empty", "methods": {"ping": {"kind": "query"}}}),
            &SchemaConfig::default(),
        )
        .unwrap();

        assert_eq!(built, parsed);
    }
}
