//! Request dispatcher
//!
//! Routes parsed requests to `handshake`, `list_tools` or `call_tool` and
//! turns every outcome into at most one reply. Nothing raised while handling a
//! request escapes this module.

use std::any::Any;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, warn};

use crate::error::DispatchError;
use crate::mcp::registry::ToolRegistry;
use crate::mcp::schema;
use crate::mcp::types::*;

/// Server identity used when none is configured
pub const DEFAULT_SERVER_NAME: &str = "tool-rpc-server";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Stateless request router; cheap to clone into per-message tasks
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    server_info: ServerInfo,
}

impl Dispatcher {
    /// Create a dispatcher with the default server identity
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self::with_server_name(registry, DEFAULT_SERVER_NAME)
    }

    pub fn with_server_name(registry: Arc<ToolRegistry>, name: impl Into<String>) -> Self {
        Self {
            registry,
            server_info: ServerInfo {
                name: name.into(),
                version: SERVER_VERSION.to_string(),
            },
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Decode one raw message and handle it. Undecodable input gets no reply.
    pub async fn handle_text(&self, text: &str) -> Option<JsonRpcResponse> {
        match serde_json::from_str::<Value>(text) {
            Ok(raw) => self.handle_value(raw).await,
            Err(e) => {
                debug!("Dropping undecodable message: {}", e);
                None
            }
        }
    }

    /// Handle one decoded envelope
    pub async fn handle_value(&self, raw: Value) -> Option<JsonRpcResponse> {
        let Some(request) = JsonRpcRequest::parse(&raw) else {
            return match extract_id(&raw) {
                Some(id) => {
                    warn!(id = %id, "Rejecting malformed envelope");
                    Some(JsonRpcResponse::error(
                        id,
                        DispatchError::InvalidRequest.into_rpc_error(),
                    ))
                }
                None => {
                    debug!("Dropping malformed envelope without id");
                    None
                }
            };
        };

        debug!(method = %request.method, id = ?request.id, "Dispatching request");
        let outcome = self.dispatch(&request).await;

        if let Err(e) = &outcome {
            warn!(method = %request.method, code = e.code(), "Request failed: {}", e);
        }

        let id = request.id?;
        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(e) => JsonRpcResponse::error(id, e.into_rpc_error()),
        })
    }

    /// Route a parsed request to its method
    pub async fn dispatch(&self, request: &JsonRpcRequest) -> Result<Value, DispatchError> {
        match request.method.as_str() {
            methods::HANDSHAKE => self.handle_handshake(),
            methods::LIST_TOOLS => self.handle_list_tools(),
            methods::CALL_TOOL => self.handle_call_tool(request.params.as_ref()).await,
            other => Err(DispatchError::MethodNotFound(other.to_string())),
        }
    }

    fn handle_handshake(&self) -> Result<Value, DispatchError> {
        let result = HandshakeResult {
            protocol: PROTOCOL_NAME.to_string(),
            version: PROTOCOL_VERSION.to_string(),
            server: self.server_info.clone(),
        };
        to_result(result)
    }

    fn handle_list_tools(&self) -> Result<Value, DispatchError> {
        let result = ListToolsResult {
            tools: self.registry.list_descriptors(),
        };
        to_result(result)
    }

    async fn handle_call_tool(&self, params: Option<&Value>) -> Result<Value, DispatchError> {
        let params = parse_call_params(params)?;

        let tool = self.registry.get(&params.name).ok_or_else(|| {
            DispatchError::invalid_params(format!("Unknown tool: {}", params.name))
        })?;

        schema::validate(Some(&params.arguments), &tool.input_schema)?;

        // Run on a separate task so a panicking handler cannot take the caller down with it
        let handler = Arc::clone(&tool.handler);
        let arguments = params.arguments;
        let joined = tokio::spawn(async move { handler.invoke(arguments).await }).await;

        let output = match joined {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                error!(tool = %params.name, "Tool failed: {:#}", e);
                return Err(DispatchError::internal(&e));
            }
            Err(join_err) => {
                let message = if join_err.is_panic() {
                    format!("Tool panicked: {}", panic_message(join_err.into_panic()))
                } else {
                    "Tool task was cancelled".to_string()
                };
                error!(tool = %params.name, "{}", message);
                return Err(DispatchError::Internal {
                    message,
                    trace: None,
                });
            }
        };

        to_result(CallToolResult { output })
    }
}

/// Check the shape of `call_tool` params
fn parse_call_params(params: Option<&Value>) -> Result<CallToolParams, DispatchError> {
    let obj = params
        .and_then(Value::as_object)
        .ok_or_else(|| DispatchError::invalid_params("params must be an object"))?;

    let name = obj
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| DispatchError::invalid_params("params.name must be a string"))?;

    Ok(CallToolParams::new(name, obj.get("arguments").cloned()))
}

fn to_result(value: impl serde::Serialize) -> Result<Value, DispatchError> {
    serde_json::to_value(value).map_err(|e| DispatchError::Internal {
        message: format!("Failed to serialize result: {}", e),
        trace: None,
    })
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::builtin::default_registry;
    use crate::mcp::registry::{ToolDescriptor, ToolHandler};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Failing;

    #[async_trait]
    impl ToolHandler for Failing {
        async fn invoke(&self, _arguments: Value) -> anyhow::Result<Value> {
            Err(anyhow::anyhow!("backend unavailable"))
        }
    }

    struct Panicking;

    #[async_trait]
    impl ToolHandler for Panicking {
        async fn invoke(&self, _arguments: Value) -> anyhow::Result<Value> {
            panic!("handler exploded");
        }
    }

    struct Counting(Arc<AtomicUsize>);

    #[async_trait]
    impl ToolHandler for Counting {
        async fn invoke(&self, _arguments: Value) -> anyhow::Result<Value> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(json!("counted"))
        }
    }

    fn dispatcher() -> Dispatcher {
        let mut registry = default_registry();
        let schema = json!({"type": "object"});
        registry.register(ToolDescriptor::new("fail", "Always fails", schema.clone(), Failing));
        registry.register(ToolDescriptor::new("panic", "Always panics", schema, Panicking));
        Dispatcher::new(Arc::new(registry))
    }

    fn call_tool(id: i64, params: Value) -> Value {
        json!({"jsonrpc": "2.0", "id": id, "method": "call_tool", "params": params})
    }

    fn error_code(response: &JsonRpcResponse) -> i32 {
        response.error.as_ref().expect("error response").code
    }

    #[tokio::test]
    async fn test_handshake() {
        let resp = dispatcher()
            .handle_value(json!({"jsonrpc":"2.0","id":"h","method":"handshake","params":"ignored"}))
            .await
            .unwrap();
        let result = resp.result.unwrap();
        assert_eq!(resp.id, json!("h"));
        assert_eq!(result["protocol"], PROTOCOL_NAME);
        assert_eq!(result["version"], PROTOCOL_VERSION);
        assert_eq!(result["server"]["name"], DEFAULT_SERVER_NAME);
        assert_eq!(result["server"]["version"], SERVER_VERSION);
    }

    #[tokio::test]
    async fn test_list_tools() {
        let resp = dispatcher()
            .handle_value(json!({"jsonrpc":"2.0","id":1,"method":"list_tools"}))
            .await
            .unwrap();
        let tools = resp.result.unwrap()["tools"].as_array().unwrap().clone();
        assert_eq!(tools.len(), 5);
        assert_eq!(tools[1]["name"], "add");
        assert_eq!(tools[1]["inputSchema"]["required"], json!(["a", "b"]));
    }

    #[tokio::test]
    async fn test_call_tool_wraps_output() {
        let resp = dispatcher()
            .handle_value(json!({
                "jsonrpc":"2.0","id":1,"method":"call_tool",
                "params":{"name":"greet","arguments":{"name":"Bo"}}
            }))
            .await
            .unwrap();
        assert_eq!(resp.result, Some(json!({"output": {"message": "Hello, Bo!"}})));
    }

    #[tokio::test]
    async fn test_call_tool_arguments_default_to_empty_object() {
        let resp = dispatcher()
            .handle_value(call_tool(1, json!({"name": "time"})))
            .await
            .unwrap();
        assert!(resp.result.unwrap()["output"]["iso"].is_string());
    }

    #[tokio::test]
    async fn test_call_tool_param_shape_errors() {
        let d = dispatcher();
        let cases = [
            json!({"jsonrpc":"2.0","id":1,"method":"call_tool"}),
            json!({"jsonrpc":"2.0","id":1,"method":"call_tool","params":["add"]}),
            json!({"jsonrpc":"2.0","id":1,"method":"call_tool","params":{}}),
            json!({"jsonrpc":"2.0","id":1,"method":"call_tool","params":{"name":42}}),
            call_tool(1, json!({"name": "add", "arguments": null})),
        ];
        for raw in cases {
            let resp = d.handle_value(raw.clone()).await.unwrap();
            assert_eq!(error_code(&resp), -32602, "for {}", raw);
        }
    }

    #[tokio::test]
    async fn test_unknown_tool_is_invalid_params() {
        let resp = dispatcher()
            .handle_value(call_tool(9, json!({"name": "nope"})))
            .await
            .unwrap();
        assert_eq!(error_code(&resp), -32602);
        assert!(resp.error.unwrap().message.contains("nope"));
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let resp = dispatcher()
            .handle_value(json!({"jsonrpc":"2.0","id":3,"method":"nope"}))
            .await
            .unwrap();
        assert_eq!(error_code(&resp), -32601);
        assert_eq!(resp.id, json!(3));
    }

    #[tokio::test]
    async fn test_handler_error_becomes_internal_error() {
        let resp = dispatcher()
            .handle_value(call_tool(4, json!({"name": "fail"})))
            .await
            .unwrap();
        let err = resp.error.unwrap();
        assert_eq!(err.code, -32603);
        assert_eq!(err.message, "backend unavailable");
        assert!(err.data.unwrap()["trace"].is_string());
    }

    #[tokio::test]
    async fn test_handler_panic_is_contained() {
        let d = dispatcher();
        let resp = d
            .handle_value(call_tool(5, json!({"name": "panic"})))
            .await
            .unwrap();
        let err = resp.error.unwrap();
        assert_eq!(err.code, -32603);
        assert!(err.message.contains("handler exploded"));

        // Dispatcher keeps working afterwards
        let resp = d
            .handle_value(json!({"jsonrpc":"2.0","id":6,"method":"handshake"}))
            .await
            .unwrap();
        assert!(!resp.is_error());
    }

    #[tokio::test]
    async fn test_malformed_envelope_with_id() {
        let resp = dispatcher()
            .handle_value(json!({"jsonrpc":"1.0","id":"x","method":"handshake"}))
            .await
            .unwrap();
        assert_eq!(resp.id, json!("x"));
        assert_eq!(error_code(&resp), -32600);
    }

    #[tokio::test]
    async fn test_malformed_envelope_without_id_is_dropped() {
        let d = dispatcher();
        assert!(d.handle_value(json!({"method":"handshake"})).await.is_none());
        assert!(d.handle_value(json!([1, 2, 3])).await.is_none());
        assert!(d.handle_text("not json at all").await.is_none());
    }

    #[tokio::test]
    async fn test_notifications_run_but_never_reply() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = ToolRegistry::new();
        registry.register(ToolDescriptor::new(
            "count",
            "Counts calls",
            json!({"type": "object"}),
            Counting(Arc::clone(&calls)),
        ));
        let d = Dispatcher::new(Arc::new(registry));

        let ok = d
            .handle_value(json!({"jsonrpc":"2.0","method":"call_tool","params":{"name":"count"}}))
            .await;
        assert!(ok.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let failed = d.handle_value(json!({"jsonrpc":"2.0","method":"nope"})).await;
        assert!(failed.is_none());
    }

    #[tokio::test]
    async fn test_id_echoed_verbatim() {
        let d = dispatcher();
        for id in [json!(null), json!(7.5), json!("abc"), json!({"k": [1, 2]})] {
            let raw = json!({"jsonrpc":"2.0","id":id.clone(),"method":"handshake"});
            let resp = d.handle_value(raw).await.unwrap();
            assert_eq!(resp.id, id);
        }
    }
}
