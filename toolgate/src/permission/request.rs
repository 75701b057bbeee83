use serde_json::{Map, Value};
use tokio::sync::watch;

use super::context::ProjectContext;
use super::result::PermissionResult;
use crate::error::{PermissionError, Result};

/// Tool arguments keyed by parameter name
pub type ToolInput = Map<String, Value>;

/// A pending authorization decision for one tool invocation.
///
/// Created by the tool pipeline, handed to whoever decides (UI, auto-policy,
/// timeout handler) and resolved by the first call to one of the
/// `accept*`/`reject*` methods. Later calls are ignored.
#[derive(Debug)]
pub struct PermissionRequest {
    channel_id: String,
    tool_name: String,
    inputs: ToolInput,
    suggestions: Option<Value>,
    context: Option<ProjectContext>,
    /// `None` until resolved. Written at most once.
    outcome: watch::Sender<Option<PermissionResult>>,
}

impl PermissionRequest {
    pub fn new(
        channel_id: impl Into<String>,
        tool_name: impl Into<String>,
        inputs: ToolInput,
        suggestions: Option<Value>,
        context: Option<ProjectContext>,
    ) -> Self {
        let (outcome, _) = watch::channel(None);
        Self {
            channel_id: channel_id.into(),
            tool_name: tool_name.into(),
            inputs,
            suggestions,
            context,
            outcome,
        }
    }

    /// Approve with the original inputs and suggestions.
    pub fn accept(&self) {
        self.accept_with(None, None);
    }

    /// Approve, optionally replacing the tool input and granted permissions.
    pub fn accept_with(&self, updated_input: Option<ToolInput>, updated_permissions: Option<Value>) {
        self.resolve(|| {
            PermissionResult::allow(
                updated_input.unwrap_or_else(|| self.inputs.clone()),
                updated_permissions.or_else(|| self.suggestions.clone()),
            )
        });
    }

    /// Deny with the default message and interrupt the pipeline.
    pub fn reject(&self) {
        self.reject_with(None, true);
    }

    pub fn reject_with(&self, message: Option<String>, interrupt: bool) {
        self.resolve(|| PermissionResult::deny(message, interrupt));
    }

    // Check, set and publish happen under the watch channel's write lock,
    // so two racing callers can never both resolve.
    fn resolve(&self, build: impl FnOnce() -> PermissionResult) {
        self.outcome.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(build());
            true
        });
    }

    /// Future side of the request. Any number of handles may wait on it.
    pub fn decision(&self) -> PendingDecision {
        PendingDecision {
            rx: self.outcome.subscribe(),
        }
    }

    /// The result, if a decision has already been made.
    pub fn result(&self) -> Option<PermissionResult> {
        self.outcome.borrow().clone()
    }

    pub fn is_resolved(&self) -> bool {
        self.outcome.borrow().is_some()
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    pub fn inputs(&self) -> &ToolInput {
        &self.inputs
    }

    pub fn suggestions(&self) -> Option<&Value> {
        self.suggestions.as_ref()
    }

    pub fn context(&self) -> Option<&ProjectContext> {
        self.context.as_ref()
    }
}

/// Awaitable handle on a request's single result.
#[derive(Debug, Clone)]
pub struct PendingDecision {
    rx: watch::Receiver<Option<PermissionResult>>,
}

impl PendingDecision {
    /// Wait until the request is accepted or rejected.
    ///
    /// Fails with [`PermissionError::Cancelled`] if the request is dropped
    /// while still unresolved.
    pub async fn wait(mut self) -> Result<PermissionResult> {
        let outcome = self
            .rx
            .wait_for(Option::is_some)
            .await
            .map_err(|_| PermissionError::Cancelled)?;
        (*outcome).clone().ok_or(PermissionError::Cancelled)
    }

    /// Non-blocking peek at the result.
    pub fn try_result(&self) -> Option<PermissionResult> {
        self.rx.borrow().clone()
    }
}
