use crate::errors::{EvalError, Result};
use serde_json::Value;

/// Type name shown in diagnostics.
pub fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "decimal",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}

/// Convert a value to a boolean. Strings accept true/on/yes/1 and false/off/no/0.
pub fn to_boolean(v: &Value) -> Result<bool> {
    match v {
        Value::Bool(b) => Ok(*b),
        Value::Null => Err(EvalError::NullResult),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "" => Err(EvalError::NullResult),
            "true" | "on" | "yes" | "1" => Ok(true),
            "false" | "off" | "no" | "0" => Ok(false),
            _ => Err(EvalError::NotBoolean("string")),
        },
        other => Err(EvalError::NotBoolean(type_name(other))),
    }
}

/// String form used for concatenation and template rendering.
pub fn render(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
