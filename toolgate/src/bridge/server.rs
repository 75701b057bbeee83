use super::types::{PermissionCallback, RespondBody};
use crate::error::{PermissionError, Result};
use crate::permission::{PendingSummary, PermissionRegistry, PermissionResult};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

pub fn router(registry: Arc<PermissionRegistry>) -> Router {
    Router::new()
        .route("/permission", post(handle_permission))
        .route("/respond", post(handle_respond))
        .route("/pending", get(list_pending))
        .with_state(registry)
}

/// Start the permission bridge on `127.0.0.1:port` (0 for a dynamic port).
/// Returns the bound port for MCP config generation.
pub async fn start_bridge_server(
    registry: Arc<PermissionRegistry>,
    port: u16,
) -> Result<(u16, JoinHandle<()>)> {
    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    let port = listener.local_addr()?.port();

    info!(port, "Permission bridge starting");

    let app = router(registry);
    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "Permission bridge error");
        }
    });

    Ok((port, handle))
}

/// Handle permission request from the MCP server.
/// Blocks until the user responds or the decision times out.
async fn handle_permission(
    State(registry): State<Arc<PermissionRegistry>>,
    Json(callback): Json<PermissionCallback>,
) -> Json<PermissionResult> {
    debug!(
        tool_use_id = %callback.tool_use_id,
        tool_name = %callback.tool_name,
        "Received permission request"
    );

    let (request_id, request) = registry.submit(callback.into_request()).await;
    Json(registry.await_decision(&request_id, &request).await)
}

/// Respond to a pending permission request. Called by the UI.
async fn handle_respond(
    State(registry): State<Arc<PermissionRegistry>>,
    Json(body): Json<RespondBody>,
) -> std::result::Result<StatusCode, (StatusCode, String)> {
    let request_id = body.request_id.clone();
    match registry.respond(&request_id, body.decision()).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e @ PermissionError::RequestNotFound { .. }) => {
            debug!(request_id = %request_id, "Response for unknown request");
            Err((StatusCode::NOT_FOUND, e.to_string()))
        }
        Err(e) => Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

async fn list_pending(State(registry): State<Arc<PermissionRegistry>>) -> Json<Vec<PendingSummary>> {
    Json(registry.pending().await)
}
