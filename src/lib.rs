//! Tool RPC Server Library
//!
//! A minimal JSON-RPC 2.0 dispatcher exposing named tools with declared input
//! schemas over a line-delimited stream or a WebSocket connection.

pub mod config;
pub mod error;
pub mod mcp;
pub mod transport;

pub use config::Config;
pub use error::{Result, ServerError};
