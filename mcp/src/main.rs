use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use carapace_mcp_runtime::{DEFAULT_API_URL, McpCommands, RuntimeConfig, run};

#[derive(Parser)]
#[command(
    name = "carapace-mcp",
    version,
    about = "Carapace MCP server: query and contribute to the Carapace AI knowledge base over stdio"
)]
struct Cli {
    /// API base URL
    #[arg(long, env = "CARAPACE_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Carapace API key (get one at https://carapaceai.com)
    #[arg(long, env = "CARAPACE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Option<McpCommands>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let _ = dotenvy::dotenv();

    // stdout carries the protocol, so logs go to stderr as JSON.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "carapace_mcp=info,carapace_mcp_runtime=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();
    let config = RuntimeConfig::new(cli.api_url, cli.api_key);
    let code = run(config, cli.command.unwrap_or(McpCommands::Serve)).await;
    std::process::exit(code);
}
