//! Validation of the free-form context object sent with generation requests.
//!
//! The context is at most two levels deep. String fields at either level go
//! through [`sanitize`]; numbers, booleans and nulls pass through; arrays keep
//! their sanitized scalar elements. Anything nested deeper is dropped.

use serde_json::{Map, Value};
use tracing::debug;

use super::sanitize::{sanitize, SanitizeOptions, ValidationResult, INJECTION_ERROR};

/// Maximum length of each string in the context.
pub const MAX_CONTEXT_FIELD_LENGTH: usize = 1000;
/// Maximum number of fields per context object.
pub const MAX_CONTEXT_FIELDS: usize = 50;

const FIELD_OPTIONS: SanitizeOptions = SanitizeOptions {
    max_length: MAX_CONTEXT_FIELD_LENGTH,
    allow_empty: true,
    check_injection: true,
};

/// Validate a context object. A missing context is an empty one.
pub fn validate_context(value: &Value) -> ValidationResult<Map<String, Value>> {
    match value {
        Value::Null => ValidationResult::valid(Map::new()),
        Value::Object(map) => match validate_object(map, "", true) {
            Ok(cleaned) => ValidationResult::valid(cleaned),
            Err(error) => ValidationResult::invalid(error),
        },
        _ => ValidationResult::invalid("Context must be an object"),
    }
}

fn validate_object(
    map: &Map<String, Value>,
    parent: &str,
    allow_nested: bool,
) -> Result<Map<String, Value>, String> {
    if map.len() > MAX_CONTEXT_FIELDS {
        return Err("Context has too many fields".to_string());
    }

    let mut cleaned = Map::with_capacity(map.len());
    for (key, value) in map {
        let path = if parent.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", parent, key)
        };

        let kept = match value {
            Value::String(_) => Some(validate_string(value, &path)?),
            Value::Number(_) | Value::Bool(_) | Value::Null => Some(value.clone()),
            Value::Array(items) => Some(Value::Array(validate_array(items, &path)?)),
            Value::Object(inner) if allow_nested => {
                Some(Value::Object(validate_object(inner, &path, false)?))
            }
            Value::Object(_) => {
                debug!(field = %path, "Dropping context object nested too deeply");
                None
            }
        };

        if let Some(kept) = kept {
            cleaned.insert(key.clone(), kept);
        }
    }
    Ok(cleaned)
}

fn validate_array(items: &[Value], path: &str) -> Result<Vec<Value>, String> {
    let mut cleaned = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        match item {
            Value::String(_) => {
                cleaned.push(validate_string(item, &format!("{}[{}]", path, i))?);
            }
            Value::Number(_) | Value::Bool(_) => cleaned.push(item.clone()),
            _ => {
                debug!(field = %path, index = i, "Dropping non-scalar context array element");
            }
        }
    }
    Ok(cleaned)
}

fn validate_string(value: &Value, path: &str) -> Result<Value, String> {
    sanitize(value, &FIELD_OPTIONS)
        .into_result()
        .map(Value::String)
        .map_err(|error| {
            if error == INJECTION_ERROR {
                error
            } else {
                format!("Invalid context field '{}': {}", path, error)
            }
        })
}
