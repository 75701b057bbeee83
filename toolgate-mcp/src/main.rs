//! toolgate MCP server
//!
//! Handles permission prompts for the agent CLI. When the agent needs
//! permission for a tool, it calls our `request_permission` tool, which POSTs
//! to the toolgate bridge and waits for the user's decision.
//!
//! Environment variables:
//! - TOOLGATE_CALLBACK_PORT: Port where the bridge is listening
//! - TOOLGATE_CHANNEL_ID: Channel reported with every request (optional)

use rmcp::{
    ServerHandler,
    ServiceExt,
    handler::server::{
        router::tool::ToolRouter,
        wrapper::Parameters,
    },
    model::{ServerCapabilities, ServerInfo},
    schemars, tool, tool_handler, tool_router,
};
use serde::Deserialize;
use std::env;
use std::sync::Arc;
use tokio::io::{stdin, stdout};
use toolgate_lib::bridge::PermissionCallback;
use toolgate_lib::PermissionResult;
use tracing::{debug, error, info};

/// Input schema matching what the agent sends to its permission prompt tool
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RequestPermissionInput {
    #[schemars(description = "Unique identifier for this tool use request")]
    pub tool_use_id: String,

    /// The tool that needs permission (e.g., "Edit", "Bash", "Write")
    #[schemars(description = "Name of the tool requesting permission")]
    pub tool_name: String,

    #[schemars(description = "The input parameters for the tool")]
    pub input: serde_json::Value,

    /// Suggested permission updates to grant alongside an allow
    #[serde(default)]
    #[schemars(description = "Suggested permission updates for this tool")]
    pub permission_suggestions: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct ToolgateMcp {
    /// Port where the bridge server is running
    callback_port: u16,
    channel_id: Option<String>,
    client: Arc<reqwest::Client>,
    tool_router: ToolRouter<Self>,
}

impl ToolgateMcp {
    pub fn new(callback_port: u16, channel_id: Option<String>) -> Self {
        Self {
            callback_port,
            channel_id,
            client: Arc::new(reqwest::Client::new()),
            tool_router: Self::tool_router(),
        }
    }

    /// Call back to the bridge and wait for the permission decision
    async fn request_permission_from_bridge(
        &self,
        callback: &PermissionCallback,
    ) -> Result<PermissionResult, String> {
        let url = format!("http://127.0.0.1:{}/permission", self.callback_port);

        debug!("Sending permission request to bridge: {:?}", callback);

        let response = self
            .client
            .post(&url)
            .json(callback)
            // Slightly longer than the bridge's own decision timeout
            .timeout(std::time::Duration::from_secs(175))
            .send()
            .await
            .map_err(|e| format!("Failed to send request to bridge: {}", e))?;

        if !response.status().is_success() {
            return Err(format!("Bridge returned error status: {}", response.status()));
        }

        response
            .json::<PermissionResult>()
            .await
            .map_err(|e| format!("Failed to parse response: {}", e))
    }
}

#[tool_router]
impl ToolgateMcp {
    /// Handle permission prompt from the agent.
    #[tool(description = "Handle permission prompt for tool execution. Returns allow/deny decision.")]
    async fn request_permission(
        &self,
        Parameters(input): Parameters<RequestPermissionInput>,
    ) -> String {
        info!(
            "Permission request for tool '{}' (id: {})",
            input.tool_name, input.tool_use_id
        );

        let callback = PermissionCallback {
            tool_use_id: input.tool_use_id,
            tool_name: input.tool_name,
            input: input.input,
            channel_id: self.channel_id.clone(),
            suggestions: input.permission_suggestions,
            project_path: env::current_dir().ok(),
        };

        match self.request_permission_from_bridge(&callback).await {
            Ok(result) => {
                info!(
                    "Permission for '{}': {:?}",
                    callback.tool_name,
                    result.behavior()
                );
                serde_json::to_string(&result).unwrap_or_else(|e| {
                    error!("Failed to serialize permission result: {}", e);
                    deny_json(&format!("Failed to serialize permission result: {}", e))
                })
            }
            Err(e) => {
                error!("Permission request failed: {}", e);
                // On error, deny by default
                deny_json(&format!("Permission request failed: {}", e))
            }
        }
    }
}

fn deny_json(message: &str) -> String {
    serde_json::json!({
        "behavior": "deny",
        "message": message
    })
    .to_string()
}

#[tool_handler]
impl ServerHandler for ToolgateMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "toolgate permission server. Forwards permission prompts to the user.".into()
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr - stdout is the MCP protocol
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("toolgate_mcp=debug".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let callback_port: u16 = env::var("TOOLGATE_CALLBACK_PORT")
        .map_err(|_| "TOOLGATE_CALLBACK_PORT environment variable not set")?
        .parse()
        .map_err(|_| "TOOLGATE_CALLBACK_PORT must be a valid port number")?;
    let channel_id = env::var("TOOLGATE_CHANNEL_ID").ok().filter(|c| !c.is_empty());

    info!(
        "Starting toolgate MCP server, callback port: {}, channel: {:?}",
        callback_port, channel_id
    );

    let server = ToolgateMcp::new(callback_port, channel_id);
    let transport = (stdin(), stdout());

    let service = server.serve(transport).await?;
    let _ = service.waiting().await?;

    info!("MCP server shutting down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deny_json_has_wire_shape() {
        let value: serde_json::Value = serde_json::from_str(&deny_json("boom")).unwrap();
        assert_eq!(value["behavior"], "deny");
        assert_eq!(value["message"], "boom");
    }

    #[test]
    fn input_accepts_missing_suggestions() {
        let input: RequestPermissionInput = serde_json::from_value(serde_json::json!({
            "tool_use_id": "toolu_1",
            "tool_name": "Bash",
            "input": {"command": "ls"}
        }))
        .unwrap();

        assert!(input.permission_suggestions.is_none());
        assert_eq!(input.tool_name, "Bash");
    }
}
