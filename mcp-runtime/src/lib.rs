//! MCP runtime for the Carapace knowledge base.
//!
//! Exposes five tools (`carapace_query`, `carapace_contribute`,
//! `carapace_get`, `carapace_update`, `carapace_delete`) over stdio and
//! forwards each call to the Carapace HTTP API.

use std::sync::Arc;

use clap::Subcommand;
use serde_json::json;
use tracing::error;

pub mod args;
pub mod client;
pub mod config;
pub mod framing;
pub mod server;
pub mod tools;

pub use client::{CarapaceClient, ClientError};
pub use config::{API_KEY_ENV, API_URL_ENV, ConfigError, DEFAULT_API_URL, RuntimeConfig};
pub use server::{McpServer, ServeError};
pub use tools::{CarapaceTool, ToolDispatcher, ToolResult, tool_definitions};

#[derive(Subcommand, Clone, Debug)]
pub enum McpCommands {
    /// Run the Carapace MCP server over stdio (default)
    Serve,
    /// Print the tool catalog with input schemas as JSON
    Tools,
}

/// Runs a command and returns the process exit code.
pub async fn run(config: RuntimeConfig, command: McpCommands) -> i32 {
    match command {
        McpCommands::Serve => {
            let server = match McpServer::from_config(&config) {
                Ok(server) => Arc::new(server),
                Err(ConfigError::MissingApiKey) => {
                    eprintln!(
                        "Error: {API_KEY_ENV} environment variable is required.\n\
                         Get your API key at https://carapaceai.com"
                    );
                    return 1;
                }
                Err(err) => {
                    eprintln!("Error: {err}");
                    return 1;
                }
            };
            match server.serve_stdio().await {
                Ok(()) => 0,
                Err(err) => {
                    error!(error = %err, "mcp server stopped");
                    1
                }
            }
        }
        McpCommands::Tools => {
            let tools: Vec<_> = tool_definitions().iter().map(|tool| tool.to_value()).collect();
            println!("{}", tools::to_pretty_json(&json!({ "tools": tools })));
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn serve_without_key_exits_non_zero() {
        let code = run(RuntimeConfig::new(DEFAULT_API_URL, None), McpCommands::Serve).await;
        assert_eq!(code, 1);
    }

    #[tokio::test]
    async fn tools_listing_needs_no_key() {
        let code = run(RuntimeConfig::new(DEFAULT_API_URL, None), McpCommands::Tools).await;
        assert_eq!(code, 0);
    }
}
