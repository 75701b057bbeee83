//! Loopback HTTP bridge between the MCP server and the permission registry.

pub mod server;
pub mod types;

pub use server::{router, start_bridge_server};
pub use types::{PermissionCallback, RespondBody, DEFAULT_CHANNEL};

use crate::error::{PermissionError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name of the MCP config written into the working directory
pub const MCP_CONFIG_FILE: &str = ".toolgate-mcp.json";

/// Write MCP server configuration to the working directory.
/// The agent CLI uses it to spawn `toolgate-mcp` as its permission prompt tool.
pub fn write_mcp_config(
    working_dir: &Path,
    port: u16,
    mcp_binary_path: &str,
    channel_id: &str,
) -> Result<PathBuf> {
    let config_path = working_dir.join(MCP_CONFIG_FILE);

    let config = serde_json::json!({
        "mcpServers": {
            "toolgate": {
                "command": mcp_binary_path,
                "args": [],
                "env": {
                    "TOOLGATE_CALLBACK_PORT": port.to_string(),
                    "TOOLGATE_CHANNEL_ID": channel_id
                }
            }
        }
    });

    fs::write(&config_path, serde_json::to_string_pretty(&config)?)?;

    debug!(path = ?config_path, "Wrote MCP config");

    Ok(config_path)
}

/// Locate the `toolgate-mcp` binary: next to the running executable first,
/// then the workspace target directory.
pub fn mcp_binary_path() -> Result<PathBuf> {
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(parent) = exe_path.parent() {
            let sibling = parent.join("toolgate-mcp");
            if sibling.exists() {
                return Ok(sibling);
            }
        }
    }

    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    let workspace_root = Path::new(manifest_dir)
        .parent()
        .ok_or_else(|| PermissionError::Config("Could not find workspace root".to_string()))?;

    for profile in ["release", "debug"] {
        let candidate = workspace_root.join("target").join(profile).join("toolgate-mcp");
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    Err(PermissionError::Config(
        "toolgate-mcp binary not found. Run `cargo build -p toolgate-mcp` first.".to_string(),
    ))
}
