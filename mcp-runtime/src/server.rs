//! JSON-RPC 2.0 handling for the MCP methods this server speaks, and the
//! stdio serve loop.

use std::sync::Arc;

use serde_json::{Map, Value, json};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::client::CarapaceClient;
use crate::config::{ConfigError, RuntimeConfig};
use crate::framing::{Framing, read_frame, write_frame};
use crate::tools::{ToolDispatcher, tool_definitions};

pub const MCP_SERVER_NAME: &str = "carapace";
/// Newest first; the first entry is offered when the client asks for
/// something else.
pub const SUPPORTED_PROTOCOL_VERSIONS: [&str; 3] = ["2025-06-18", "2025-03-26", "2024-11-05"];

#[derive(Debug, Error)]
pub enum ServeError {
    #[error("Failed to read MCP message: {0}")]
    Read(#[source] std::io::Error),
    #[error("Failed to write MCP response: {0}")]
    Write(#[source] std::io::Error),
    #[error("MCP writer task stopped: {0}")]
    Writer(String),
}

#[derive(Debug)]
pub struct McpServer {
    dispatcher: ToolDispatcher,
}

impl McpServer {
    pub fn new(dispatcher: ToolDispatcher) -> Self {
        Self { dispatcher }
    }

    /// Fails when the config carries no usable API key, so a server without
    /// credentials is never started.
    pub fn from_config(config: &RuntimeConfig) -> Result<Self, ConfigError> {
        let api_key = config.require_api_key()?;
        let client = CarapaceClient::with_base_url(api_key, &config.api_url)?;
        Ok(Self::new(ToolDispatcher::new(client)))
    }

    pub fn dispatcher(&self) -> &ToolDispatcher {
        &self.dispatcher
    }

    pub async fn serve_stdio(self: Arc<Self>) -> Result<(), ServeError> {
        self.serve_io(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Reads requests until EOF. Each request runs on its own task; replies
    /// go through a single writer so frames never interleave. Returns once
    /// every in-flight request has been answered.
    pub async fn serve_io<R, W>(self: Arc<Self>, reader: R, writer: W) -> Result<(), ServeError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        info!(
            server = MCP_SERVER_NAME,
            version = env!("CARGO_PKG_VERSION"),
            base_url = self.dispatcher.client().base_url(),
            "mcp server ready"
        );

        let (tx, mut rx) = mpsc::unbounded_channel::<(Framing, Value)>();
        let writer_task = tokio::spawn(async move {
            let mut writer = writer;
            while let Some((framing, response)) = rx.recv().await {
                write_frame(&mut writer, framing, &response).await?;
            }
            Ok::<(), std::io::Error>(())
        });

        let mut reader = BufReader::new(reader);
        let read_result = loop {
            match read_frame(&mut reader).await {
                Ok(Some(frame)) => {
                    let server = Arc::clone(&self);
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        for response in server.handle_raw_message(&frame.body).await {
                            if tx.send((frame.framing, response)).is_err() {
                                break;
                            }
                        }
                    });
                }
                Ok(None) => break Ok(()),
                Err(err) => break Err(ServeError::Read(err)),
            }
        };
        drop(tx);

        let write_result = writer_task.await;
        read_result?;
        match write_result {
            Ok(Ok(())) => {
                info!("stdin closed, mcp server stopping");
                Ok(())
            }
            Ok(Err(err)) => Err(ServeError::Write(err)),
            Err(err) => Err(ServeError::Writer(err.to_string())),
        }
    }

    pub async fn handle_raw_message(&self, body: &[u8]) -> Vec<Value> {
        match serde_json::from_slice::<Value>(body) {
            Ok(incoming) => self.handle_incoming_message(incoming).await,
            Err(err) => vec![error_response(
                Value::Null,
                RpcError::parse_error(format!("Invalid JSON payload: {err}")),
            )],
        }
    }

    pub async fn handle_incoming_message(&self, incoming: Value) -> Vec<Value> {
        let mut responses = Vec::new();

        if let Some(batch) = incoming.as_array() {
            if batch.is_empty() {
                responses.push(error_response(
                    Value::Null,
                    RpcError::invalid_request("Batch request must not be empty"),
                ));
                return responses;
            }
            for item in batch {
                if let Some(response) = self.handle_single_message(item.clone()).await {
                    responses.push(response);
                }
            }
            return responses;
        }

        if let Some(response) = self.handle_single_message(incoming).await {
            responses.push(response);
        }
        responses
    }

    async fn handle_single_message(&self, incoming: Value) -> Option<Value> {
        let Some(obj) = incoming.as_object() else {
            return Some(error_response(
                Value::Null,
                RpcError::invalid_request("Request must be a JSON object"),
            ));
        };

        if obj.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
            let id = obj.get("id").cloned().unwrap_or(Value::Null);
            return Some(error_response(
                id,
                RpcError::invalid_request("jsonrpc must be '2.0'"),
            ));
        }

        let Some(method) = obj.get("method").and_then(Value::as_str) else {
            // A response to something we never sent; nothing to answer.
            return None;
        };

        let params = obj.get("params").cloned().unwrap_or(Value::Null);
        match obj.get("id").cloned() {
            Some(id) => Some(match self.handle_request(method, params).await {
                Ok(result) => success_response(id, result),
                Err(err) => error_response(id, err),
            }),
            None => {
                debug!(method, "notification received");
                None
            }
        }
    }

    async fn handle_request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            "initialize" => Ok(self.initialize_payload(&params)),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(self.tools_list_payload()),
            "tools/call" => self.handle_tools_call(params).await,
            _ => Err(RpcError::method_not_found(method)),
        }
    }

    fn initialize_payload(&self, params: &Value) -> Value {
        let requested = params.get("protocolVersion").and_then(Value::as_str);
        let protocol_version = requested
            .filter(|version| SUPPORTED_PROTOCOL_VERSIONS.contains(version))
            .unwrap_or(SUPPORTED_PROTOCOL_VERSIONS[0]);
        json!({
            "protocolVersion": protocol_version,
            "capabilities": {
                "tools": { "listChanged": false }
            },
            "serverInfo": {
                "name": MCP_SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION")
            },
            "instructions": "Use carapace_query before solving a problem from scratch, and carapace_contribute to share what you learned. carapace_get, carapace_update and carapace_delete work on a single contribution by id."
        })
    }

    fn tools_list_payload(&self) -> Value {
        let tools: Vec<Value> = tool_definitions()
            .iter()
            .map(|tool| tool.to_value())
            .collect();
        json!({ "tools": tools })
    }

    async fn handle_tools_call(&self, params: Value) -> Result<Value, RpcError> {
        let params = params
            .as_object()
            .ok_or_else(|| RpcError::invalid_params("tools/call params must be an object"))?;

        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::invalid_params("tools/call requires string field 'name'"))?;

        let args = match params.get("arguments") {
            Some(Value::Object(map)) => map.clone(),
            Some(Value::Null) | None => Map::new(),
            Some(_) => {
                return Err(RpcError::invalid_params(
                    "tools/call 'arguments' must be an object",
                ));
            }
        };

        let result = self.dispatcher.call(name, &args).await;
        Ok(result.to_value())
    }
}

#[derive(Debug)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcError {
    fn parse_error(message: impl Into<String>) -> Self {
        Self {
            code: -32700,
            message: message.into(),
        }
    }

    fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            code: -32600,
            message: message.into(),
        }
    }

    fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: format!("Method not found: {method}"),
        }
    }

    fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: -32602,
            message: message.into(),
        }
    }
}

fn success_response(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result
    })
}

fn error_response(id: Value, error: RpcError) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": error.code,
            "message": error.message
        }
    })
}
