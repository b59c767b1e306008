//! A JSON-Schema *subset* validator for tool parameters.
//!
//! Covers exactly what the original `registry.py` dispatch contract checks:
//! `object`/`properties`/`required`/`additionalProperties: false`, plus
//! primitive type checks for `string`/`integer`/`number`/`boolean`/`array`/
//! `object`. This is in-scope core logic, not a stand-in for a general
//! JSON Schema implementation — nested `$ref`, `oneOf`, `pattern`, and
//! friends are deliberately unsupported.

use serde_json::Value;

/// Validate `params` against `schema`. Returns `Err(message)` describing the
/// first violation found; callers feed that message back to the model as
/// `"Parameter validation failed: {message}"`.
pub fn validate(schema: &Value, params: &Value) -> Result<(), String> {
    let params_obj = params
        .as_object()
        .ok_or_else(|| "parameters must be a JSON object".to_string())?;
    let schema_obj = schema
        .as_object()
        .ok_or_else(|| "schema must be a JSON object".to_string())?;

    let properties = schema_obj.get("properties").and_then(Value::as_object);

    if schema_obj
        .get("additionalProperties")
        .and_then(Value::as_bool)
        == Some(false)
    {
        if let Some(properties) = properties {
            for key in params_obj.keys() {
                if !properties.contains_key(key) {
                    return Err(format!("unexpected property '{key}'"));
                }
            }
        } else {
            for key in params_obj.keys() {
                return Err(format!("unexpected property '{key}'"));
            }
        }
    }

    if let Some(required) = schema_obj.get("required").and_then(Value::as_array) {
        for entry in required {
            let name = entry
                .as_str()
                .ok_or_else(|| "'required' entries must be strings".to_string())?;
            if !params_obj.contains_key(name) {
                return Err(format!("missing required property '{name}'"));
            }
        }
    }

    if let Some(properties) = properties {
        for (key, property_schema) in properties {
            if let Some(value) = params_obj.get(key) {
                check_type(key, property_schema, value)?;
            }
        }
    }

    Ok(())
}

fn check_type(key: &str, property_schema: &Value, value: &Value) -> Result<(), String> {
    let Some(expected) = property_schema.get("type").and_then(Value::as_str) else {
        return Ok(());
    };
    let matches = match expected {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        _ => true,
    };
    if matches {
        Ok(())
    } else {
        Err(format!(
            "property '{key}' expected type '{expected}', got {}",
            type_name(value)
        ))
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {"type": "string"},
                "limit": {"type": "integer"},
            },
            "required": ["path"],
            "additionalProperties": false,
        })
    }

    #[test]
    fn accepts_valid_params() {
        let schema = sample_schema();
        let params = json!({"path": "a.txt", "limit": 5});
        assert!(validate(&schema, &params).is_ok());
    }

    #[test]
    fn rejects_missing_required() {
        let schema = sample_schema();
        let params = json!({"limit": 5});
        let err = validate(&schema, &params).unwrap_err();
        assert!(err.contains("path"));
    }

    #[test]
    fn rejects_additional_property() {
        let schema = sample_schema();
        let params = json!({"path": "a.txt", "bogus": true});
        let err = validate(&schema, &params).unwrap_err();
        assert!(err.contains("bogus"));
    }

    #[test]
    fn rejects_wrong_type() {
        let schema = sample_schema();
        let params = json!({"path": 5});
        let err = validate(&schema, &params).unwrap_err();
        assert!(err.contains("expected type 'string'"));
    }

    #[test]
    fn optional_property_may_be_absent() {
        let schema = sample_schema();
        let params = json!({"path": "a.txt"});
        assert!(validate(&schema, &params).is_ok());
    }

    #[test]
    fn non_object_params_is_error() {
        let schema = sample_schema();
        let params = json!("not an object");
        assert!(validate(&schema, &params).is_err());
    }
}
