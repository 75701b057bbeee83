use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{stdin, BufReader};
use tracing::info;

use toolgate_lib::bridge::{mcp_binary_path, start_bridge_server, write_mcp_config, DEFAULT_CHANNEL};
use toolgate_lib::config::load_config;
use toolgate_lib::prompt::run_prompt_loop;
use toolgate_lib::PermissionRegistry;

#[derive(Parser, Debug)]
#[command(name = "toolgate")]
#[command(version, about = "Answer agent permission prompts from the terminal")]
struct Args {
    /// Port for the bridge server (overrides config; 0 picks a free port).
    #[arg(long)]
    port: Option<u16>,

    /// Write `.toolgate-mcp.json` into this directory once the server is up.
    #[arg(long)]
    write_mcp_config: Option<PathBuf>,

    /// Channel id the MCP server should report.
    #[arg(long, default_value = DEFAULT_CHANNEL)]
    channel: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr, stdout belongs to the prompt
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("toolgate_lib=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config();
    let registry = Arc::new(PermissionRegistry::from_config(&config));
    let events = registry.subscribe();

    let (port, server) =
        start_bridge_server(registry.clone(), args.port.unwrap_or(config.port())).await?;
    println!("toolgate listening on 127.0.0.1:{port}");

    if let Some(dir) = args.write_mcp_config {
        let binary = mcp_binary_path()?;
        let path = write_mcp_config(&dir, port, &binary.to_string_lossy(), &args.channel)?;
        println!("MCP config written to {}", path.display());
    }

    run_prompt_loop(registry, events, BufReader::new(stdin())).await?;

    info!("Prompt closed, shutting down");
    server.abort();
    Ok(())
}
