//! Shallow input schema validation
//!
//! Only top-level object schemas are checked: required property names and the
//! type tag of each declared property. Nested schemas are not descended into.

use serde_json::Value;

use crate::error::DispatchError;

/// Type tags understood by the validator. Anything else matches every value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
}

impl TypeTag {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "string" => Some(TypeTag::String),
            "number" => Some(TypeTag::Number),
            "integer" => Some(TypeTag::Integer),
            "boolean" => Some(TypeTag::Boolean),
            "object" => Some(TypeTag::Object),
            "array" => Some(TypeTag::Array),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TypeTag::String => "string",
            TypeTag::Number => "number",
            TypeTag::Integer => "integer",
            TypeTag::Boolean => "boolean",
            TypeTag::Object => "object",
            TypeTag::Array => "array",
        }
    }

    /// Whether the runtime kind of `value` satisfies this tag
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            TypeTag::String => value.is_string(),
            TypeTag::Number => value.is_number(),
            TypeTag::Integer => is_integer(value),
            TypeTag::Boolean => value.is_boolean(),
            TypeTag::Object => value.is_object(),
            TypeTag::Array => value.is_array(),
        }
    }
}

fn is_integer(value: &Value) -> bool {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => true,
        Value::Number(n) => n.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0),
        _ => false,
    }
}

/// Check `value` against a shallow object schema.
///
/// Schemas whose `type` is not `"object"` always pass. Reports the first
/// violation only.
pub fn validate(value: Option<&Value>, schema: &Value) -> Result<(), DispatchError> {
    if schema.get("type").and_then(Value::as_str) != Some("object") {
        return Ok(());
    }

    let obj = match value {
        Some(Value::Object(obj)) => obj,
        _ => return Err(DispatchError::invalid_params("expected an object")),
    };

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for name in required.iter().filter_map(Value::as_str) {
            if !obj.contains_key(name) {
                return Err(DispatchError::invalid_params(format!(
                    "missing required property '{}'",
                    name
                )));
            }
        }
    }

    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Ok(());
    };

    for (name, actual) in obj {
        let expected = properties
            .get(name)
            .and_then(|prop| prop.get("type"))
            .and_then(Value::as_str)
            .and_then(TypeTag::from_tag);

        if let Some(tag) = expected {
            if !tag.matches(actual) {
                return Err(DispatchError::invalid_params(format!(
                    "property '{}' must be of type {}",
                    name,
                    tag.as_str()
                )));
            }
        }
    }

    Ok(())
}
