//! Tool input schemas.
//!
//! Schemas are generated from the parameter types with schemars
//! (draft-2020-12) and rewritten into the draft-07 shape most MCP clients
//! accept:
//! - `$defs` → `definitions`, with `$ref`s updated
//! - nullable `anyOf` pairs and `["T", "null"]` type arrays collapsed to `T`
//! - root `$schema` and `title` removed

use schemars::JsonSchema;
use serde_json::{json, Map, Value};

/// Input schema for tool parameters of type `T`.
pub fn input_schema<T: JsonSchema>() -> Value {
    let schema = schemars::schema_for!(T);
    match serde_json::to_value(&schema) {
        Ok(value) => SchemaTransformer::transform(value),
        Err(_) => json!({ "type": "object", "properties": {} }),
    }
}

/// Rewrites generated schemas for client compatibility.
pub struct SchemaTransformer;

impl SchemaTransformer {
    /// Apply every rewrite to `schema`.
    pub fn transform(mut schema: Value) -> Value {
        if let Some(obj) = schema.as_object_mut() {
            obj.remove("$schema");
            obj.remove("title");
            if let Some(defs) = obj.remove("$defs") {
                obj.insert("definitions".to_string(), defs);
            }
            Self::rewrite(obj);
        }
        schema
    }

    fn rewrite(obj: &mut Map<String, Value>) {
        if let Some(Value::String(target)) = obj.get_mut("$ref") {
            if let Some(name) = target.strip_prefix("#/$defs/") {
                *target = format!("#/definitions/{name}");
            }
        }

        if let Some(Value::Array(any_of)) = obj.get("anyOf") {
            if let Some(Value::Object(inner)) = Self::non_null_variant(any_of) {
                obj.remove("anyOf");
                for (k, v) in inner {
                    obj.insert(k, v);
                }
            }
        }

        if let Some(Value::Array(types)) = obj.get("type") {
            let concrete: Vec<&Value> = types.iter().filter(|t| *t != "null").collect();
            if concrete.len() == 1 && types.len() == 2 {
                let single = concrete[0].clone();
                obj.insert("type".to_string(), single);
            }
        }

        for val in obj.values_mut() {
            match val {
                Value::Object(nested) => Self::rewrite(nested),
                Value::Array(items) => {
                    for item in items {
                        if let Value::Object(nested) = item {
                            Self::rewrite(nested);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    /// The non-null half of a `[T, {"type": "null"}]` pair, in either order.
    fn non_null_variant(any_of: &[Value]) -> Option<Value> {
        match any_of {
            [a, b] if Self::is_bare_null(b) => Some(a.clone()),
            [a, b] if Self::is_bare_null(a) => Some(b.clone()),
            _ => None,
        }
    }

    fn is_bare_null(schema: &Value) -> bool {
        schema
            .as_object()
            .map_or(false, |o| o.len() == 1 && o.get("type") == Some(&json!("null")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(JsonSchema)]
    #[allow(dead_code)]
    struct Paging {
        /// How many
        limit: Option<u32>,
        /// Where to start
        offset: Option<u32>,
    }

    #[test]
    fn test_defs_renamed_and_refs_updated() {
        let schema = json!({
            "$defs": { "Message": { "type": "string" } },
            "properties": { "message": { "$ref": "#/$defs/Message" } }
        });

        let result = SchemaTransformer::transform(schema);

        assert!(result.get("$defs").is_none());
        assert!(result["definitions"]["Message"].is_object());
        assert_eq!(
            result["properties"]["message"]["$ref"],
            "#/definitions/Message"
        );
    }

    #[test]
    fn test_nullable_any_of_collapsed() {
        let schema = json!({
            "properties": {
                "limit": { "anyOf": [{ "type": "null" }, { "type": "integer" }] }
            }
        });

        let result = SchemaTransformer::transform(schema);

        assert!(result["properties"]["limit"].get("anyOf").is_none());
        assert_eq!(result["properties"]["limit"]["type"], "integer");
    }

    #[test]
    fn test_non_nullable_any_of_untouched() {
        let schema = json!({ "anyOf": [{ "type": "string" }, { "type": "integer" }] });
        let result = SchemaTransformer::transform(schema.clone());
        assert_eq!(result, schema);
    }

    #[test]
    fn test_nullable_type_array_collapsed() {
        let schema = json!({ "properties": { "offset": { "type": ["integer", "null"] } } });
        let result = SchemaTransformer::transform(schema);
        assert_eq!(result["properties"]["offset"]["type"], "integer");
    }

    #[test]
    fn test_root_metadata_removed() {
        let schema = json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "title": "Paging",
            "type": "object"
        });
        let result = SchemaTransformer::transform(schema);
        assert_eq!(result, json!({ "type": "object" }));
    }

    #[test]
    fn test_generated_schema_is_client_ready() {
        let schema = input_schema::<Paging>();

        assert_eq!(schema["type"], "object");
        assert!(schema.get("$schema").is_none());
        assert!(schema.get("title").is_none());
        assert_eq!(schema["properties"]["limit"]["type"], "integer");
        assert_eq!(schema["properties"]["limit"]["description"], "How many");
        assert_eq!(schema["properties"]["offset"]["type"], "integer");
    }
}
