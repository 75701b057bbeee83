use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

use crate::permission::{Decision, PermissionRequest, ProjectContext, ToolInput};

/// Channel used when the caller does not name one
pub const DEFAULT_CHANNEL: &str = "mcp";

/// Permission request from the MCP server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionCallback {
    pub tool_use_id: String,
    pub tool_name: String,
    pub input: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_path: Option<PathBuf>,
}

impl PermissionCallback {
    pub fn into_request(self) -> PermissionRequest {
        let channel_id = self
            .channel_id
            .unwrap_or_else(|| DEFAULT_CHANNEL.to_string());
        let context = self.project_path.map(ProjectContext::from_path);
        PermissionRequest::new(
            channel_id,
            self.tool_name,
            into_tool_input(self.input),
            self.suggestions,
            context,
        )
    }
}

/// Tool input is expected to be an object; anything else is kept under `input`.
fn into_tool_input(value: Value) -> ToolInput {
    match value {
        Value::Object(map) => map,
        Value::Null => ToolInput::new(),
        other => {
            let mut map = ToolInput::new();
            map.insert("input".to_string(), other);
            map
        }
    }
}

/// Decision posted by the UI
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondBody {
    pub request_id: String,
    pub allow: bool,
    #[serde(default)]
    pub message: Option<String>,
    /// Deny only; defaults to aborting the pipeline
    #[serde(default)]
    pub interrupt: Option<bool>,
    #[serde(default)]
    pub updated_input: Option<ToolInput>,
    #[serde(default)]
    pub updated_permissions: Option<Value>,
    #[serde(default)]
    pub allow_for_session: bool,
}

impl RespondBody {
    pub fn decision(self) -> Decision {
        if self.allow {
            Decision::Allow {
                updated_input: self.updated_input,
                updated_permissions: self.updated_permissions,
                remember_for_session: self.allow_for_session,
            }
        } else {
            Decision::Deny {
                message: self.message,
                interrupt: self.interrupt.unwrap_or(true),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn callback_without_channel_uses_default() {
        let callback: PermissionCallback = serde_json::from_value(json!({
            "toolUseId": "toolu_1",
            "toolName": "Bash",
            "input": {"command": "ls"},
            "projectPath": "/work/app"
        }))
        .unwrap();

        let request = callback.into_request();

        assert_eq!(request.channel_id(), DEFAULT_CHANNEL);
        assert_eq!(request.inputs()["command"], "ls");
        assert_eq!(request.context().map(|c| c.name.as_str()), Some("app"));
        assert!(request.suggestions().is_none());
    }

    #[test]
    fn scalar_input_is_wrapped() {
        let input = into_tool_input(json!("raw"));
        assert_eq!(input["input"], "raw");
        assert!(into_tool_input(Value::Null).is_empty());
    }

    #[test]
    fn deny_body_defaults_to_interrupt() {
        let body: RespondBody =
            serde_json::from_value(json!({"requestId": "r", "allow": false})).unwrap();

        assert_eq!(
            body.decision(),
            Decision::Deny {
                message: None,
                interrupt: true
            }
        );
    }

    #[test]
    fn allow_body_carries_session_flag() {
        let body: RespondBody = serde_json::from_value(json!({
            "requestId": "r",
            "allow": true,
            "allowForSession": true
        }))
        .unwrap();

        assert!(matches!(
            body.decision(),
            Decision::Allow {
                remember_for_session: true,
                ..
            }
        ));
    }
}
