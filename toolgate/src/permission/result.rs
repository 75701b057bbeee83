use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::request::ToolInput;

/// Message used when a request is rejected without an explicit reason.
pub const DEFAULT_DENY_MESSAGE: &str = "Denied by user";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Behavior {
    Allow,
    Deny,
}

/// Final outcome of a permission request.
///
/// Serializes to the permission-prompt-tool shape the agent CLI expects:
/// `{"behavior":"allow","updatedInput":{..}}` or
/// `{"behavior":"deny","message":"..","interrupt":true}`.
///
/// Parsing normalizes to the same shape: fields that do not belong to the
/// behavior are dropped, and an allow without `updatedInput` is rejected.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionResult {
    behavior: Behavior,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated_input: Option<ToolInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated_permissions: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "is_false")]
    interrupt: bool,
}

/// Result as it appears on the wire, before normalization
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireResult {
    behavior: Behavior,
    #[serde(default)]
    updated_input: Option<ToolInput>,
    #[serde(default)]
    updated_permissions: Option<Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    interrupt: bool,
}

impl<'de> Deserialize<'de> for PermissionResult {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = WireResult::deserialize(deserializer)?;
        match wire.behavior {
            Behavior::Allow => {
                let updated_input = wire
                    .updated_input
                    .ok_or_else(|| serde::de::Error::missing_field("updatedInput"))?;
                Ok(Self::allow(updated_input, wire.updated_permissions))
            }
            Behavior::Deny => Ok(Self::deny(wire.message, wire.interrupt)),
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl PermissionResult {
    pub(crate) fn allow(updated_input: ToolInput, updated_permissions: Option<Value>) -> Self {
        Self {
            behavior: Behavior::Allow,
            updated_input: Some(updated_input),
            updated_permissions,
            message: None,
            interrupt: false,
        }
    }

    pub(crate) fn deny(message: Option<String>, interrupt: bool) -> Self {
        Self {
            behavior: Behavior::Deny,
            updated_input: None,
            updated_permissions: None,
            message: Some(message.unwrap_or_else(|| DEFAULT_DENY_MESSAGE.to_string())),
            interrupt,
        }
    }

    pub fn behavior(&self) -> Behavior {
        self.behavior
    }

    pub fn is_allowed(&self) -> bool {
        self.behavior == Behavior::Allow
    }

    /// Tool input to run with. Only present when allowed.
    pub fn updated_input(&self) -> Option<&ToolInput> {
        self.updated_input.as_ref()
    }

    /// Permission scope granted alongside an allow.
    pub fn updated_permissions(&self) -> Option<&Value> {
        self.updated_permissions.as_ref()
    }

    /// Denial reason. Only present when denied.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Whether the pipeline should abort instead of continuing.
    pub fn interrupt(&self) -> bool {
        self.interrupt
    }
}
