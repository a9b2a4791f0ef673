//! Built-in tools and the default registry
//!
//! Each tool is a small struct implementing [`ToolHandler`]; the schema
//! functions mirror what the handler expects to read.

use anyhow::{bail, Context};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::mcp::registry::{ToolDescriptor, ToolHandler, ToolRegistry};

/// Build the registry with every built-in tool
pub fn default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(ToolDescriptor::new(
        "greet",
        "Returns a greeting for the given name",
        greet_schema(),
        Greet,
    ));
    registry.register(ToolDescriptor::new("add", "Adds two numbers", add_schema(), Add));
    registry.register(ToolDescriptor::new(
        "time",
        "Returns the current UTC time in ISO 8601 format",
        time_schema(),
        Time,
    ));
    registry
}

// ==================== Tool Handlers ====================

/// `greet(name) -> { message }`
pub struct Greet;

#[async_trait]
impl ToolHandler for Greet {
    async fn invoke(&self, arguments: Value) -> anyhow::Result<Value> {
        #[derive(Deserialize)]
        struct Args {
            name: String,
        }

        let args: Args =
            serde_json::from_value(arguments).context("Invalid arguments for greet")?;
        Ok(json!({ "message": format!("Hello, {}!", args.name) }))
    }
}

/// `add(a, b) -> { sum }`
pub struct Add;

#[async_trait]
impl ToolHandler for Add {
    async fn invoke(&self, arguments: Value) -> anyhow::Result<Value> {
        let a = arguments.get("a").context("Missing operand 'a'")?;
        let b = arguments.get("b").context("Missing operand 'b'")?;
        Ok(json!({ "sum": sum(a, b)? }))
    }
}

/// Integer addition when both operands are integers and the result fits,
/// floating point otherwise.
fn sum(a: &Value, b: &Value) -> anyhow::Result<Value> {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        if let Some(total) = x.checked_add(y) {
            return Ok(json!(total));
        }
    }

    let x = a.as_f64().context("Operand 'a' is not a number")?;
    let y = b.as_f64().context("Operand 'b' is not a number")?;
    let total = x + y;
    if !total.is_finite() {
        bail!("sum is not a finite number");
    }
    Ok(number(total))
}

/// Render a finite float as an integer when it has no fractional part
fn number(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        json!(value as i64)
    } else {
        json!(value)
    }
}

/// `time() -> { iso }`
pub struct Time;

#[async_trait]
impl ToolHandler for Time {
    async fn invoke(&self, _arguments: Value) -> anyhow::Result<Value> {
        let iso = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        Ok(json!({ "iso": iso }))
    }
}

// ==================== Tool Schemas ====================

fn greet_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "name": {
                "type": "string",
                "description": "Name of the person to greet"
            }
        },
        "required": ["name"]
    })
}

fn add_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "a": {
                "type": "number",
                "description": "First operand"
            },
            "b": {
                "type": "number",
                "description": "Second operand"
            }
        },
        "required": ["a", "b"]
    })
}

fn time_schema() -> Value {
    json!({"type": "object", "properties": {}})
}
