use serde::{Deserialize, Serialize};

use crate::permission::Behavior;

/// Event payload broadcast to UI listeners.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(tag = "type")]
pub enum BridgeEvent {
    #[serde(rename = "permission.requested")]
    PermissionRequested {
        #[serde(rename = "requestId")]
        request_id: String,
        #[serde(rename = "channelId")]
        channel_id: String,
        #[serde(rename = "toolName")]
        tool_name: String,
        #[serde(rename = "toolInput")]
        tool_input: serde_json::Value,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        suggestions: Option<serde_json::Value>,
        timestamp: i64,
    },
    #[serde(rename = "permission.resolved")]
    PermissionResolved {
        #[serde(rename = "requestId")]
        request_id: String,
        behavior: Behavior,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn requested_event_is_tagged() {
        let event = BridgeEvent::PermissionRequested {
            request_id: "req-1".to_string(),
            channel_id: "mcp".to_string(),
            tool_name: "Edit".to_string(),
            tool_input: json!({"file_path": "src/lib.rs"}),
            suggestions: None,
            timestamp: 1_700_000_000_000,
        };

        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "permission.requested");
        assert_eq!(json["requestId"], "req-1");
        assert_eq!(json["toolInput"]["file_path"], "src/lib.rs");
        assert!(json.get("suggestions").is_none());
    }

    #[test]
    fn resolved_event_carries_behavior() {
        let event = BridgeEvent::PermissionResolved {
            request_id: "req-2".to_string(),
            behavior: Behavior::Deny,
        };

        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(
            json,
            json!({"type": "permission.resolved", "requestId": "req-2", "behavior": "deny"})
        );
    }
}
