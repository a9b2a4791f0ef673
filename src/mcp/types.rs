//! JSON-RPC message model
//!
//! Inbound envelopes are classified from a generic JSON value so that any
//! identifier (number, string, null, or otherwise) is echoed back verbatim.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON-RPC version
pub const JSONRPC_VERSION: &str = "2.0";

/// Protocol name reported by `handshake`
pub const PROTOCOL_NAME: &str = "tool-rpc";

/// Protocol version reported by `handshake`
pub const PROTOCOL_VERSION: &str = "1.0";

/// JSON-RPC error codes
pub mod error_codes {
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// Protocol methods
pub mod methods {
    pub const HANDSHAKE: &str = "handshake";
    pub const LIST_TOOLS: &str = "list_tools";
    pub const CALL_TOOL: &str = "call_tool";
}

/// A parsed inbound request
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRpcRequest {
    /// Request ID; `None` marks a notification. A present `null` is kept as `Some(Value::Null)`.
    pub id: Option<Value>,

    /// Method name
    pub method: String,

    /// Method parameters
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Classify a decoded JSON value.
    ///
    /// Returns `None` unless the value is an object tagged `"jsonrpc": "2.0"`
    /// with a textual `method`.
    pub fn parse(raw: &Value) -> Option<Self> {
        let obj = raw.as_object()?;

        if obj.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
            return None;
        }
        let method = obj.get("method")?.as_str()?.to_string();

        Some(Self {
            id: obj.get("id").cloned(),
            method,
            params: obj.get("params").cloned(),
        })
    }

    /// Whether the sender expects no reply
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// Identifier of an envelope that failed to parse, if it carries one
pub fn extract_id(raw: &Value) -> Option<Value> {
    raw.as_object()?.get("id").cloned()
}

/// JSON-RPC response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC version
    pub jsonrpc: String,

    /// Echoed request ID (`null` when it could not be determined)
    #[serde(default)]
    pub id: Value,

    /// Result (on success)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Error (on failure)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Create a success response
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn error(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// JSON-RPC error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Error code
    pub code: i32,

    /// Error message
    pub message: String,

    /// Additional data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Attach structured detail
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Invalid request (-32600)
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(error_codes::INVALID_REQUEST, message)
    }

    /// Method not found (-32601)
    pub fn method_not_found(method: impl Into<String>) -> Self {
        Self::new(
            error_codes::METHOD_NOT_FOUND,
            format!("Method not found: {}", method.into()),
        )
    }

    /// Invalid params (-32602)
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(error_codes::INVALID_PARAMS, message)
    }

    /// Internal error (-32603)
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(error_codes::INTERNAL_ERROR, message)
    }
}

/// Server identity block of the handshake result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Server name
    pub name: String,

    /// Server version
    pub version: String,
}

/// Handshake result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandshakeResult {
    pub protocol: String,
    pub version: String,
    pub server: ServerInfo,
}

/// Listed tool: the `(name, description, inputSchema)` triple
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInfo {
    /// Tool name
    pub name: String,

    /// Tool description
    pub description: String,

    /// Input schema, exactly as registered
    pub input_schema: Value,
}

/// List tools result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListToolsResult {
    /// Available tools
    pub tools: Vec<ToolInfo>,
}

/// Call tool params, after the dispatcher has checked their shape
#[derive(Debug, Clone, PartialEq)]
pub struct CallToolParams {
    /// Tool name
    pub name: String,

    /// Tool arguments, an empty object when omitted
    pub arguments: Value,
}

impl CallToolParams {
    pub fn new(name: impl Into<String>, arguments: Option<Value>) -> Self {
        Self {
            name: name.into(),
            arguments: arguments.unwrap_or_else(|| Value::Object(Map::new())),
        }
    }
}

/// Call tool result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallToolResult {
    /// Whatever the tool handler produced
    pub output: Value,
}
