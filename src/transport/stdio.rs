//! Newline-delimited JSON transport
//!
//! Each non-blank input line is one envelope; each reply is written as one
//! JSON line.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::error::{Result, TransportError};
use crate::mcp::types::JsonRpcResponse;
use crate::mcp::Dispatcher;

/// Run the server on the process's stdin/stdout
pub async fn run_stdio(dispatcher: Dispatcher) -> Result<()> {
    info!(tools = dispatcher.registry().len(), "Serving on stdio");
    serve(dispatcher, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await
}

/// Serve requests read from `reader`, writing replies to `writer`.
///
/// Returns once the input ends and every in-flight request has replied.
pub async fn serve<R, W>(dispatcher: Dispatcher, reader: R, writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let writer_task = tokio::spawn(write_replies(writer, rx));

    let mut in_flight = JoinSet::new();
    let mut lines = reader.lines();
    let mut read_error = None;

    loop {
        let next = tokio::select! {
            next = lines.next_line() => next,
            _ = tx.closed() => {
                warn!("Reply writer stopped, no longer reading input");
                break;
            }
        };
        let line = match next {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!("Received EOF, draining in-flight requests");
                break;
            }
            Err(e) => {
                error!("Failed to read input: {}", e);
                read_error = Some(e);
                break;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        let dispatcher = dispatcher.clone();
        let tx = tx.clone();
        in_flight.spawn(async move {
            if let Some(response) = dispatcher.handle_text(&line).await {
                // Receiver only goes away if the writer failed; that is already logged
                let _ = tx.send(response);
            }
        });

        while in_flight.try_join_next().is_some() {}
    }

    while in_flight.join_next().await.is_some() {}
    drop(tx);

    let written = writer_task.await.map_err(|e| TransportError::ServeFailed {
        message: e.to_string(),
    })?;

    if let Some(e) = read_error {
        return Err(e.into());
    }
    written?;

    info!("Stdio transport finished");
    Ok(())
}

async fn write_replies<W>(
    mut writer: W,
    mut rx: mpsc::UnboundedReceiver<JsonRpcResponse>,
) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let mut line = match serde_json::to_string(&response) {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to serialize response: {}", e);
                continue;
            }
        };
        line.push('\n');

        if let Err(e) = writer.write_all(line.as_bytes()).await {
            error!("Failed to write response: {}", e);
            return Err(e);
        }
        writer.flush().await?;
    }
    writer.shutdown().await
}
