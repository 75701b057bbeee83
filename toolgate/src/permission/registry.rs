//! Pending permission request tracking.
//!
//! Requests wait here between the moment the pipeline asks and the moment the
//! UI answers. Tools approved "for this session" are remembered per channel
//! and auto-allowed afterwards.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::request::{PermissionRequest, ToolInput};
use super::result::PermissionResult;
use crate::config::ToolgateConfig;
use crate::error::{PermissionError, Result};
use crate::events::BridgeEvent;

const EVENT_CAPACITY: usize = 64;

/// Answer from the UI for one pending request.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Allow {
        updated_input: Option<ToolInput>,
        updated_permissions: Option<Value>,
        /// Auto-allow this tool on the same channel from now on
        remember_for_session: bool,
    },
    Deny {
        message: Option<String>,
        interrupt: bool,
    },
}

impl Decision {
    pub fn allow() -> Self {
        Decision::Allow {
            updated_input: None,
            updated_permissions: None,
            remember_for_session: false,
        }
    }

    pub fn deny() -> Self {
        Decision::Deny {
            message: None,
            interrupt: true,
        }
    }
}

/// Snapshot of a pending request, for listing in the UI.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingSummary {
    pub request_id: String,
    pub channel_id: String,
    pub tool_name: String,
    pub tool_input: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Value>,
}

type PendingMap = HashMap<String, Arc<PermissionRequest>>;

pub struct PermissionRegistry {
    /// Pending requests: request_id -> request. A std mutex, never held
    /// across an await, so abandoned waits can clean up from `Drop`.
    pending: std::sync::Mutex<PendingMap>,
    /// Tools approved per channel (auto-approve without UI)
    session_approved: Mutex<HashMap<String, HashSet<String>>>,
    /// Tools approved on every channel, from config
    auto_approve: HashSet<String>,
    decision_timeout: Duration,
    events: broadcast::Sender<BridgeEvent>,
}

impl PermissionRegistry {
    pub fn new(decision_timeout: Duration, auto_approve: impl IntoIterator<Item = String>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            pending: std::sync::Mutex::new(HashMap::new()),
            session_approved: Mutex::new(HashMap::new()),
            auto_approve: auto_approve.into_iter().collect(),
            decision_timeout,
            events,
        }
    }

    pub fn from_config(config: &ToolgateConfig) -> Self {
        Self::new(config.decision_timeout(), config.auto_approve())
    }

    fn pending_requests(&self) -> MutexGuard<'_, PendingMap> {
        // The map stays consistent even if a holder panicked
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take_pending(&self, request_id: &str) -> Option<Arc<PermissionRequest>> {
        self.pending_requests().remove(request_id)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: BridgeEvent) {
        // No listeners is fine; the request still waits for a decision
        let _ = self.events.send(event);
    }

    /// Register a request and announce it to the UI.
    ///
    /// Session-approved tools are accepted on the spot and never stored; the
    /// UI only sees a `permission.resolved` event for them.
    pub async fn submit(&self, request: PermissionRequest) -> (String, Arc<PermissionRequest>) {
        let request = Arc::new(request);
        let request_id = Uuid::new_v4().to_string();

        if self
            .is_session_approved(request.channel_id(), request.tool_name())
            .await
        {
            debug!(
                request_id = %request_id,
                tool_name = request.tool_name(),
                "Tool is session-approved, auto-allowing"
            );
            request.accept();
            self.announce_resolved(&request_id, &request);
            return (request_id, request);
        }

        self.pending_requests()
            .insert(request_id.clone(), request.clone());

        info!(
            request_id = %request_id,
            channel_id = request.channel_id(),
            tool_name = request.tool_name(),
            "Permission request pending"
        );

        self.emit(BridgeEvent::PermissionRequested {
            request_id: request_id.clone(),
            channel_id: request.channel_id().to_string(),
            tool_name: request.tool_name().to_string(),
            tool_input: Value::Object(request.inputs().clone()),
            suggestions: request.suggestions().cloned(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        });

        (request_id, request)
    }

    /// Apply the UI's decision to a pending request.
    pub async fn respond(&self, request_id: &str, decision: Decision) -> Result<()> {
        let request = self
            .take_pending(request_id)
            .ok_or_else(|| PermissionError::RequestNotFound {
                request_id: request_id.to_string(),
            })?;

        match decision {
            Decision::Allow {
                updated_input,
                updated_permissions,
                remember_for_session,
            } => {
                if remember_for_session {
                    self.approve_for_session(request.channel_id(), request.tool_name())
                        .await;
                }
                request.accept_with(updated_input, updated_permissions);
            }
            Decision::Deny { message, interrupt } => request.reject_with(message, interrupt),
        }

        self.announce_resolved(request_id, &request);
        Ok(())
    }

    fn announce_resolved(&self, request_id: &str, request: &PermissionRequest) {
        if let Some(result) = request.result() {
            info!(
                request_id,
                tool_name = request.tool_name(),
                behavior = ?result.behavior(),
                "Permission resolved"
            );
            self.emit(BridgeEvent::PermissionResolved {
                request_id: request_id.to_string(),
                behavior: result.behavior(),
            });
        }
    }

    /// Wait for a decision, denying the request if none comes in time.
    ///
    /// If the returned future is dropped first (the caller went away), the
    /// request is removed and rejected with `"Request cancelled"`.
    pub async fn await_decision(
        &self,
        request_id: &str,
        request: &PermissionRequest,
    ) -> PermissionResult {
        let _abandon = AbandonGuard {
            registry: self,
            request_id,
            request,
        };

        match tokio::time::timeout(self.decision_timeout, request.decision().wait()).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => {
                debug!(request_id, "Permission channel dropped");
                PermissionResult::deny(Some("Request cancelled".to_string()), false)
            }
            Err(_) => {
                warn!(request_id, tool_name = request.tool_name(), "Permission timed out");
                let removed = self.take_pending(request_id);
                request.reject_with(Some("Timed out waiting for approval".to_string()), false);
                // A missing entry means `respond` got there first and already announced
                if removed.is_some() {
                    self.announce_resolved(request_id, request);
                }
                // The UI may have answered between the timeout and the reject
                request.result().unwrap_or_else(|| {
                    PermissionResult::deny(Some("Timed out waiting for approval".to_string()), false)
                })
            }
        }
    }

    /// Reject everything still pending on a channel, e.g. when its session ends.
    pub async fn cancel_channel(&self, channel_id: &str) -> Vec<String> {
        let cancelled: Vec<(String, Arc<PermissionRequest>)> = {
            let mut pending = self.pending_requests();
            let ids: Vec<String> = pending
                .iter()
                .filter(|(_, r)| r.channel_id() == channel_id)
                .map(|(id, _)| id.clone())
                .collect();
            ids.into_iter()
                .filter_map(|id| pending.remove(&id).map(|r| (id, r)))
                .collect()
        };

        for (request_id, request) in &cancelled {
            request.reject_with(Some("Session closed".to_string()), true);
            self.announce_resolved(request_id, request);
        }

        self.session_approved.lock().await.remove(channel_id);

        cancelled.into_iter().map(|(id, _)| id).collect()
    }

    pub async fn approve_for_session(&self, channel_id: &str, tool_name: &str) {
        self.session_approved
            .lock()
            .await
            .entry(channel_id.to_string())
            .or_default()
            .insert(tool_name.to_string());
        debug!(channel_id, tool_name, "Added session-approved tool");
    }

    pub async fn is_session_approved(&self, channel_id: &str, tool_name: &str) -> bool {
        if self.auto_approve.contains(tool_name) {
            return true;
        }
        self.session_approved
            .lock()
            .await
            .get(channel_id)
            .is_some_and(|tools| tools.contains(tool_name))
    }

    pub async fn pending(&self) -> Vec<PendingSummary> {
        self.pending_requests()
            .iter()
            .map(|(id, request)| summarize(id, request))
            .collect()
    }

    pub async fn pending_for_channel(&self, channel_id: &str) -> Vec<PendingSummary> {
        self.pending_requests()
            .iter()
            .filter(|(_, request)| request.channel_id() == channel_id)
            .map(|(id, request)| summarize(id, request))
            .collect()
    }

    pub fn decision_timeout(&self) -> Duration {
        self.decision_timeout
    }
}

/// Rejects and unregisters a request whose waiter was dropped mid-wait.
struct AbandonGuard<'a> {
    registry: &'a PermissionRegistry,
    request_id: &'a str,
    request: &'a PermissionRequest,
}

impl Drop for AbandonGuard<'_> {
    fn drop(&mut self) {
        if self.request.is_resolved() {
            return;
        }
        let removed = self.registry.take_pending(self.request_id);
        debug!(request_id = self.request_id, "Permission waiter went away");
        self.request
            .reject_with(Some("Request cancelled".to_string()), true);
        if removed.is_some() {
            self.registry.announce_resolved(self.request_id, self.request);
        }
    }
}

fn summarize(request_id: &str, request: &PermissionRequest) -> PendingSummary {
    PendingSummary {
        request_id: request_id.to_string(),
        channel_id: request.channel_id().to_string(),
        tool_name: request.tool_name().to_string(),
        tool_input: Value::Object(request.inputs().clone()),
        suggestions: request.suggestions().cloned(),
    }
}
