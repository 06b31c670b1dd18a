//! Tool parameter schema cleanup for backends whose function declarations
//! accept a narrower JSON-Schema dialect.
//!
//! The legacy boolean form of `exclusiveMinimum`/`exclusiveMaximum` is
//! dropped and the sibling `minimum`/`maximum` stays as an inclusive bound.
//! The strict inequality is lost: "> 0" reaches the backend as ">= 0".
//! The numeric form of the keywords is a bound in its own right and passes
//! through untouched.

use schemars::JsonSchema;
use serde_json::Value;

const EXCLUSIVE_BOUND_FLAGS: [&str; 2] = ["exclusiveMinimum", "exclusiveMaximum"];

// Keywords whose value maps arbitrary names to subschemas.
const SCHEMA_MAP_KEYWORDS: [&str; 6] = [
    "properties",
    "patternProperties",
    "$defs",
    "definitions",
    "dependentSchemas",
    "dependencies",
];

/// Returns `node` with every boolean exclusive-bound flag removed, at any depth.
pub fn normalize(mut node: Value) -> Value {
    normalize_in_place(&mut node);
    node
}

pub fn normalize_in_place(node: &mut Value) {
    match node {
        Value::Object(map) => {
            for key in EXCLUSIVE_BOUND_FLAGS {
                if map.get(key).is_some_and(Value::is_boolean) {
                    map.remove(key);
                }
            }
            for (key, value) in map.iter_mut() {
                if SCHEMA_MAP_KEYWORDS.contains(&key.as_str()) {
                    normalize_schema_map(value);
                } else {
                    normalize_in_place(value);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                normalize_in_place(item);
            }
        }
        _ => {}
    }
}

// Entry names are user data, not keywords: only the subschemas are cleaned.
fn normalize_schema_map(node: &mut Value) {
    match node {
        Value::Object(entries) => {
            for schema in entries.values_mut() {
                normalize_in_place(schema);
            }
        }
        other => normalize_in_place(other),
    }
}

/// Renders the parameter schema for `T`, ready for a function declaration.
pub fn tool_schema<T: JsonSchema>() -> Value {
    normalize(schemars::schema_for!(T).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    fn contains_boolean_flag(node: &Value) -> bool {
        match node {
            Value::Object(map) => {
                EXCLUSIVE_BOUND_FLAGS
                    .iter()
                    .any(|key| map.get(*key).is_some_and(Value::is_boolean))
                    || map.values().any(contains_boolean_flag)
            }
            Value::Array(items) => items.iter().any(contains_boolean_flag),
            _ => false,
        }
    }

    #[test]
    fn removes_exclusive_minimum_and_keeps_minimum() {
        let cleaned = normalize(json!({"type": "integer", "minimum": 0, "exclusiveMinimum": true}));
        assert_eq!(cleaned, json!({"type": "integer", "minimum": 0}));
    }

    #[test]
    fn removes_exclusive_maximum_and_keeps_maximum() {
        let cleaned =
            normalize(json!({"type": "number", "maximum": 100, "exclusiveMaximum": false}));
        assert_eq!(cleaned, json!({"type": "number", "maximum": 100}));
    }

    #[test]
    fn cleans_nested_properties() {
        let cleaned = normalize(json!({
            "type": "object",
            "properties": {
                "age": {"type": "integer", "minimum": 0, "exclusiveMinimum": true},
                "score": {"type": "number", "maximum": 100, "exclusiveMaximum": true},
                "address": {
                    "type": "object",
                    "properties": {
                        "floor": {"type": "integer", "minimum": -5, "exclusiveMinimum": true}
                    }
                }
            }
        }));

        assert_eq!(
            cleaned,
            json!({
                "type": "object",
                "properties": {
                    "age": {"type": "integer", "minimum": 0},
                    "score": {"type": "number", "maximum": 100},
                    "address": {
                        "type": "object",
                        "properties": {
                            "floor": {"type": "integer", "minimum": -5}
                        }
                    }
                }
            })
        );
    }

    #[test]
    fn cleans_array_items_and_combinators() {
        let cleaned = normalize(json!({
            "type": "array",
            "items": {"type": "integer", "maximum": 9, "exclusiveMaximum": true},
            "anyOf": [
                {"type": "number", "minimum": 1, "exclusiveMinimum": true},
                {"type": "null"}
            ]
        }));

        assert!(!contains_boolean_flag(&cleaned));
        assert_eq!(cleaned["items"], json!({"type": "integer", "maximum": 9}));
        assert_eq!(cleaned["anyOf"][0], json!({"type": "number", "minimum": 1}));
    }

    #[test]
    fn numeric_bounds_and_property_names_pass_through() {
        let schema = json!({
            "type": "object",
            "properties": {
                "exclusiveMinimum": {"type": "boolean"},
                "ratio": {"type": "number", "exclusiveMinimum": 0, "exclusiveMaximum": 1}
            }
        });

        assert_eq!(normalize(schema.clone()), schema);
    }

    #[test]
    fn boolean_subschemas_named_like_flags_are_kept() {
        let schema = json!({
            "type": "object",
            "properties": {
                "exclusiveMaximum": true,
                "a": {"type": "string"}
            },
            "patternProperties": {"^x": {"exclusiveMinimum": true, "minimum": 1}},
            "$defs": {"exclusiveMinimum": false},
            "required": ["exclusiveMaximum"]
        });

        let cleaned = normalize(schema);
        assert_eq!(cleaned["properties"]["exclusiveMaximum"], json!(true));
        assert_eq!(cleaned["properties"]["a"], json!({"type": "string"}));
        assert_eq!(cleaned["patternProperties"]["^x"], json!({"minimum": 1}));
        assert_eq!(cleaned["$defs"]["exclusiveMinimum"], json!(false));
        assert_eq!(cleaned["required"], json!(["exclusiveMaximum"]));
    }

    #[test]
    fn normalize_is_idempotent() {
        let schema = json!({
            "type": "object",
            "properties": {
                "a": {
                    "type": "object",
                    "properties": {
                        "b": {"type": "integer", "minimum": 0, "exclusiveMinimum": true,
                              "maximum": 10, "exclusiveMaximum": true}
                    }
                }
            }
        });

        let once = normalize(schema);
        assert_eq!(normalize(once.clone()), once);
        assert!(!contains_boolean_flag(&once));
    }

    #[test]
    fn scalars_are_untouched() {
        assert_eq!(normalize(json!(true)), json!(true));
        assert_eq!(normalize(json!("x")), json!("x"));
        assert_eq!(normalize(Value::Null), Value::Null);
    }

    #[derive(Deserialize, JsonSchema)]
    #[allow(dead_code)]
    struct WeatherInput {
        /// City to look up.
        location: String,
        days: Option<u8>,
    }

    #[test]
    fn tool_schema_describes_struct_fields() {
        let schema = tool_schema::<WeatherInput>();

        assert_eq!(schema["type"], "object");
        assert!(schema["properties"]["location"].is_object());
        assert!(schema["properties"]["days"].is_object());
        assert_eq!(schema["required"], json!(["location"]));
        assert!(!contains_boolean_flag(&schema));
    }
}
