//! Error types for the Tool RPC Server
//!
//! `ServerError` covers process-level failures (configuration, transports, I/O).
//! `DispatchError` is the protocol taxonomy: every variant maps onto a JSON-RPC
//! error code and is always turned into an error reply, never propagated.

use serde_json::json;
use thiserror::Error;

use crate::mcp::types::{error_codes, JsonRpcError};

/// Main error type for the Tool RPC Server
#[derive(Error, Debug)]
pub enum ServerError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Transport errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid port '{value}' in {var}")]
    InvalidPort { var: String, value: String },

    #[error("Invalid bind address: {address}")]
    InvalidBindAddress { address: String },
}

/// Transport errors
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to bind {address}: {message}")]
    BindFailed { address: String, message: String },

    #[error("Server stopped unexpectedly: {message}")]
    ServeFailed { message: String },
}

/// Failures raised while routing a single request
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    /// Envelope is not a valid request
    #[error("Invalid Request")]
    InvalidRequest,

    /// Schema violation, missing or mistyped field, unknown tool
    #[error("{0}")]
    InvalidParams(String),

    /// Unrecognized top-level method
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    /// Handler failure or any other unexpected condition
    #[error("{message}")]
    Internal {
        message: String,
        trace: Option<String>,
    },
}

impl DispatchError {
    pub fn invalid_params(message: impl Into<String>) -> Self {
        DispatchError::InvalidParams(message.into())
    }

    /// Build an internal error from a handler failure, keeping the full cause chain
    pub fn internal(err: &anyhow::Error) -> Self {
        DispatchError::Internal {
            message: err.to_string(),
            trace: Some(format!("{:?}", err)),
        }
    }

    /// JSON-RPC error code for this failure
    pub fn code(&self) -> i32 {
        match self {
            DispatchError::InvalidRequest => error_codes::INVALID_REQUEST,
            DispatchError::InvalidParams(_) => error_codes::INVALID_PARAMS,
            DispatchError::MethodNotFound(_) => error_codes::METHOD_NOT_FOUND,
            DispatchError::Internal { .. } => error_codes::INTERNAL_ERROR,
        }
    }

    /// Convert into the wire error object
    pub fn into_rpc_error(self) -> JsonRpcError {
        match self {
            DispatchError::InvalidRequest => JsonRpcError::invalid_request("Invalid Request"),
            DispatchError::InvalidParams(message) => JsonRpcError::invalid_params(message),
            DispatchError::MethodNotFound(method) => JsonRpcError::method_not_found(method),
            DispatchError::Internal { message, trace } => {
                let error = JsonRpcError::internal_error(message);
                match trace {
                    Some(trace) => error.with_data(json!({ "trace": trace })),
                    None => error,
                }
            }
        }
    }
}

/// Result type alias for server operations
pub type Result<T> = std::result::Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ConfigError::InvalidPort {
            var: "TOOL_RPC_PORT".to_string(),
            value: "eighty".to_string(),
        };
        assert!(err.to_string().contains("eighty"));
        assert!(err.to_string().contains("TOOL_RPC_PORT"));
    }

    #[test]
    fn test_error_conversion() {
        let config_err = ConfigError::InvalidBindAddress {
            address: "nowhere".to_string(),
        };
        let server_err: ServerError = config_err.into();
        assert!(matches!(server_err, ServerError::Config(_)));
    }

    #[test]
    fn test_dispatch_error_codes() {
        assert_eq!(DispatchError::InvalidRequest.code(), -32600);
        assert_eq!(DispatchError::MethodNotFound("x".into()).code(), -32601);
        assert_eq!(DispatchError::invalid_params("bad").code(), -32602);
        let internal = DispatchError::internal(&anyhow::anyhow!("boom"));
        assert_eq!(internal.code(), -32603);
    }

    #[test]
    fn test_internal_error_carries_trace() {
        let err = anyhow::anyhow!("disk full").context("writing cache");
        let rpc = DispatchError::internal(&err).into_rpc_error();
        assert_eq!(rpc.code, -32603);
        assert_eq!(rpc.message, "writing cache");
        let trace = rpc.data.unwrap()["trace"].as_str().unwrap().to_string();
        assert!(trace.contains("disk full"));
    }

    #[test]
    fn test_wire_message_matches_display() {
        let errors = [
            DispatchError::InvalidRequest,
            DispatchError::invalid_params("params must be an object"),
            DispatchError::MethodNotFound("nope".into()),
            DispatchError::Internal {
                message: "Tool panicked: boom".into(),
                trace: None,
            },
        ];
        for err in errors {
            let expected_code = err.code();
            let expected_message = err.to_string();
            let rpc = err.into_rpc_error();
            assert_eq!(rpc.code, expected_code);
            assert_eq!(rpc.message, expected_message);
            assert!(rpc.data.is_none());
        }
    }

    #[test]
    fn test_method_not_found_wire_message() {
        let rpc = DispatchError::MethodNotFound("nope".into()).into_rpc_error();
        assert_eq!(rpc.message, "Method not found: nope");
    }

    #[test]
    fn test_invalid_params_has_no_data() {
        let rpc = DispatchError::invalid_params("missing required property 'b'").into_rpc_error();
        assert_eq!(rpc.message, "missing required property 'b'");
        assert!(rpc.data.is_none());
    }
}
