//! Configuration management for the Tool RPC Server
//!
//! Settings come from environment variables with defaults; CLI flags in the
//! binary override them.

use std::net::{SocketAddr, ToSocketAddrs};

use crate::error::{ConfigError, Result};
use crate::mcp::dispatcher::DEFAULT_SERVER_NAME;

/// Environment variable names
pub mod env {
    pub const HOST: &str = "TOOL_RPC_HOST";
    pub const PORT: &str = "TOOL_RPC_PORT";
    pub const SERVER_NAME: &str = "TOOL_RPC_SERVER_NAME";
}

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8765;

/// Configuration for the Tool RPC Server
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Host the WebSocket transport binds to
    pub host: String,

    /// Port the WebSocket transport binds to
    pub port: u16,

    /// Server name reported by `handshake`
    pub server_name: String,
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup(env::HOST).unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = match lookup(env::PORT) {
            Some(value) => value.trim().parse().map_err(|_| ConfigError::InvalidPort {
                var: env::PORT.to_string(),
                value,
            })?,
            None => DEFAULT_PORT,
        };

        let server_name =
            lookup(env::SERVER_NAME).unwrap_or_else(|| DEFAULT_SERVER_NAME.to_string());

        Ok(Self {
            host,
            port,
            server_name,
        })
    }

    /// Resolve `host:port` to a socket address
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let address = format!("{}:{}", self.host, self.port);
        let resolved = address
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or(ConfigError::InvalidBindAddress { address })?;
        Ok(resolved)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            server_name: DEFAULT_SERVER_NAME.to_string(),
        }
    }
}
