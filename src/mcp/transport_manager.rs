// ABOUTME: Transport coordination for the MCP server over stdio or streamable HTTP
// ABOUTME: Runs the newline-delimited stdio loop and hands HTTP mode to the axum router
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::Arc;

use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::mcp_request_processor::McpRequestProcessor;
use super::resources::ServerResources;
use crate::config::{TransportConfig, TransportMode};
use crate::errors::{AppError, AppResult};
use crate::jsonrpc::{JsonRpcError, JsonRpcResponse};
use crate::routes;

/// Runs the configured transport
pub struct TransportManager {
    processor: McpRequestProcessor,
}

impl TransportManager {
    /// Create a transport manager over shared resources
    #[must_use]
    pub fn new(resources: Arc<ServerResources>) -> Self {
        Self {
            processor: McpRequestProcessor::new(resources),
        }
    }

    /// Serve until stdin closes (stdio) or the process is interrupted (HTTP)
    ///
    /// # Errors
    ///
    /// Returns an error if the transport cannot start or fails while running
    pub async fn run(&self, config: &TransportConfig) -> AppResult<()> {
        match config.mode {
            TransportMode::Stdio => StdioTransport::new(self.processor.clone()).run().await,
            TransportMode::StreamableHttp => routes::serve(config, self.processor.clone()).await,
        }
    }
}

/// Newline-delimited JSON-RPC over stdin/stdout
///
/// Requests are processed concurrently; each response is written as one line
/// while holding the output lock, so lines never interleave.
pub struct StdioTransport {
    processor: McpRequestProcessor,
}

impl StdioTransport {
    /// Creates a new stdio transport instance
    #[must_use]
    pub const fn new(processor: McpRequestProcessor) -> Self {
        Self { processor }
    }

    /// Serve the process stdin and stdout
    ///
    /// # Errors
    ///
    /// Returns an error if reading stdin fails
    pub async fn run(&self) -> AppResult<()> {
        info!("MCP stdio transport ready - listening on stdin/stdout");
        let stdout = Arc::new(Mutex::new(io::stdout()));
        self.serve(BufReader::new(io::stdin()), stdout).await
    }

    /// Serve an arbitrary line source and sink
    ///
    /// Returns once the reader is exhausted and every in-flight request has
    /// been answered.
    ///
    /// # Errors
    ///
    /// Returns an error if reading a line fails
    pub async fn serve<R, W>(&self, reader: R, writer: Arc<Mutex<W>>) -> AppResult<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let mut lines = reader.lines();
        let mut in_flight = JoinSet::new();

        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| AppError::internal(format!("Failed to read stdin: {e}")).with_source(e))?
        {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match serde_json::from_str(line) {
                Ok(message) => {
                    let processor = self.processor.clone();
                    let writer = Arc::clone(&writer);
                    in_flight.spawn(async move {
                        if let Some(response) = processor.handle_value(message).await {
                            write_response(&response, &writer).await;
                        }
                    });
                }
                Err(e) => {
                    warn!("Invalid JSON-RPC message: {e}");
                    let response =
                        JsonRpcResponse::error(None, JsonRpcError::parse_error(e.to_string()));
                    write_response(&response, &writer).await;
                }
            }
        }

        while let Some(joined) = in_flight.join_next().await {
            if let Err(e) = joined {
                warn!("stdio request task failed: {e}");
            }
        }
        info!("stdin closed, stdio transport stopping");
        Ok(())
    }
}

/// Write one response line; failures are logged because the peer is gone
async fn write_response<W>(response: &JsonRpcResponse, writer: &Mutex<W>)
where
    W: AsyncWrite + Unpin,
{
    let mut line = match serde_json::to_vec(response) {
        Ok(line) => line,
        Err(e) => {
            warn!("Failed to serialize MCP response: {e}");
            return;
        }
    };
    line.push(b'\n');
    debug!(bytes = line.len(), "Sending MCP response");

    let mut writer = writer.lock().await;
    let written = async {
        writer.write_all(&line).await?;
        writer.flush().await
    }
    .await;
    if let Err(e) = written {
        warn!("Failed to write MCP response: {e}");
    }
}
