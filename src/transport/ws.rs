//! WebSocket transport
//!
//! `GET /` and `GET /ws` upgrade to a WebSocket where each frame carries one
//! envelope. `GET /health` reports liveness and the number of registered tools.

use std::net::SocketAddr;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::error::{Result, TransportError};
use crate::mcp::types::JsonRpcResponse;
use crate::mcp::Dispatcher;

#[derive(Clone)]
struct AppState {
    dispatcher: Dispatcher,
}

/// Build the HTTP router
pub fn router(dispatcher: Dispatcher) -> Router {
    Router::new()
        .route("/", get(ws_handler))
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .with_state(AppState { dispatcher })
}

/// Bind `addr` and serve until Ctrl-C
pub async fn serve_ws(dispatcher: Dispatcher, addr: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| TransportError::BindFailed {
            address: addr.to_string(),
            message: e.to_string(),
        })?;

    info!(%addr, tools = dispatcher.registry().len(), "Serving WebSocket transport");

    axum::serve(listener, router(dispatcher))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| TransportError::ServeFailed {
            message: e.to_string(),
        })?;

    info!("WebSocket transport stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "tools": state.dispatcher.registry().len(),
    }))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.dispatcher))
}

async fn handle_socket(mut socket: WebSocket, dispatcher: Dispatcher) {
    debug!("WebSocket connection opened");
    let (tx, mut rx) = mpsc::unbounded_channel::<JsonRpcResponse>();

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                let message = match incoming {
                    Some(Ok(message)) => message,
                    Some(Err(e)) => {
                        warn!("WebSocket receive failed: {}", e);
                        break;
                    }
                    None => break,
                };

                let raw = match message {
                    Message::Text(text) => serde_json::from_str(&text).ok(),
                    Message::Binary(bytes) => decode_binary_frame(&bytes),
                    Message::Close(_) => break,
                    Message::Ping(_) | Message::Pong(_) => continue,
                };
                let Some(raw) = raw else {
                    debug!("Dropping undecodable frame");
                    continue;
                };

                let dispatcher = dispatcher.clone();
                let tx = tx.clone();
                tokio::spawn(async move {
                    if let Some(response) = dispatcher.handle_value(raw).await {
                        let _ = tx.send(response);
                    }
                });
            }
            Some(response) = rx.recv() => {
                let text = match serde_json::to_string(&response) {
                    Ok(text) => text,
                    Err(e) => {
                        error!("Failed to serialize response: {}", e);
                        continue;
                    }
                };
                if let Err(e) = socket.send(Message::Text(text)).await {
                    warn!("WebSocket send failed: {}", e);
                    break;
                }
            }
        }
    }

    debug!("WebSocket connection closed");
}

/// Decode a binary frame.
///
/// A frame whose first four bytes are a big-endian length equal to the rest
/// of the frame is length-prefixed; anything else is taken as raw UTF-8 JSON.
pub fn decode_binary_frame(frame: &[u8]) -> Option<Value> {
    let payload = match frame {
        [a, b, c, d, rest @ ..]
            if u32::from_be_bytes([*a, *b, *c, *d]) as usize == rest.len() =>
        {
            rest
        }
        _ => frame,
    };
    serde_json::from_slice(payload).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefixed(payload: &[u8]) -> Vec<u8> {
        let mut frame = (payload.len() as u32).to_be_bytes().to_vec();
        frame.extend_from_slice(payload);
        frame
    }

    #[test]
    fn test_decode_length_prefixed_frame() {
        let frame = prefixed(br#"{"jsonrpc":"2.0","id":1,"method":"handshake"}"#);
        let value = decode_binary_frame(&frame).unwrap();
        assert_eq!(value["method"], "handshake");
    }

    #[test]
    fn test_decode_plain_binary_frame() {
        let frame = br#"{"jsonrpc":"2.0","id":1,"method":"list_tools"}"#;
        let value = decode_binary_frame(frame).unwrap();
        assert_eq!(value["method"], "list_tools");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_binary_frame(b"").is_none());
        assert!(decode_binary_frame(&prefixed(b"{not json")).is_none());
        assert!(decode_binary_frame(&[0, 0, 0, 9, b'{']).is_none());
    }
}
