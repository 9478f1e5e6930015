//! Strict-mode rewriting: object schemas that do not say otherwise get
//! `additionalProperties: false`, recursively through every subschema slot.

use serde_json::{Map, Value};

/// Keywords whose value is an object of named subschemas.
const SCHEMA_MAPS: [&str; 5] = [
    "properties",
    "patternProperties",
    "dependentSchemas",
    "$defs",
    "definitions",
];

/// Keywords whose value is a single subschema.
const SCHEMA_SLOTS: [&str; 11] = [
    "propertyNames",
    "additionalProperties",
    "unevaluatedProperties",
    "items",
    "contains",
    "additionalItems",
    "unevaluatedItems",
    "not",
    "if",
    "then",
    "else",
];

/// Keywords whose value is an array of subschemas.
const SCHEMA_LISTS: [&str; 4] = ["prefixItems", "allOf", "anyOf", "oneOf"];

/// Keywords that only make sense on object schemas.
const OBJECT_KEYWORDS: [&str; 8] = [
    "properties",
    "patternProperties",
    "additionalProperties",
    "unevaluatedProperties",
    "required",
    "dependentRequired",
    "dependentSchemas",
    "propertyNames",
];

pub(crate) fn apply_strict_mode(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if describes_object(map) && !map.contains_key("additionalProperties") {
                map.insert("additionalProperties".to_string(), Value::Bool(false));
            }

            for key in SCHEMA_MAPS {
                if let Some(Value::Object(children)) = map.get_mut(key) {
                    children.values_mut().for_each(apply_strict_mode);
                }
            }
            for key in SCHEMA_SLOTS {
                if let Some(child) = map.get_mut(key) {
                    apply_strict_mode(child);
                }
            }
            for key in SCHEMA_LISTS {
                if let Some(Value::Array(children)) = map.get_mut(key) {
                    children.iter_mut().for_each(apply_strict_mode);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(apply_strict_mode),
        _ => {}
    }
}

fn describes_object(map: &Map<String, Value>) -> bool {
    match map.get("type") {
        Some(Value::String(kind)) => kind == "object",
        Some(Value::Array(kinds)) => kinds
            .iter()
            .any(|kind| matches!(kind, Value::String(kind) if kind == "object")),
        _ => OBJECT_KEYWORDS.iter().any(|keyword| map.contains_key(*keyword)),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn object_keywords_without_type_are_treated_as_object() {
        let mut schema = json!({
            "properties": { "id": { "type": "integer" } },
            "required": ["id"]
        });
        apply_strict_mode(&mut schema);
        assert_eq!(schema["additionalProperties"], json!(false));
    }

    #[test]
    fn nested_objects_are_rewritten() {
        let mut schema = json!({
            "type": "object",
            "properties": {
                "nested": {
                    "type": "object",
                    "properties": { "v": { "type": "integer" } }
                },
                "list": {
                    "type": "array",
                    "items": { "type": "object", "properties": {} }
                }
            }
        });
        apply_strict_mode(&mut schema);

        assert_eq!(schema["additionalProperties"], json!(false));
        assert_eq!(
            schema["properties"]["nested"]["additionalProperties"],
            json!(false)
        );
        assert_eq!(
            schema["properties"]["list"]["items"]["additionalProperties"],
            json!(false)
        );
    }

    #[test]
    fn explicit_additional_properties_is_kept() {
        let mut schema = json!({
            "type": ["object", "null"],
            "additionalProperties": { "type": "string" }
        });
        apply_strict_mode(&mut schema);
        assert_eq!(schema["additionalProperties"], json!({ "type": "string" }));
    }

    #[test]
    fn non_object_schemas_are_untouched() {
        let mut schema = json!({ "anyOf": [{ "type": "integer" }, { "type": "string" }] });
        let before = schema.clone();
        apply_strict_mode(&mut schema);
        assert_eq!(schema, before);
    }
}
