//! Drives the HTTP bridge end to end: MCP-side request, UI-side answer.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use toolgate_lib::bridge::start_bridge_server;
use toolgate_lib::events::BridgeEvent;
use toolgate_lib::{PermissionRegistry, PermissionResult};

async fn start(timeout: Duration) -> (Arc<PermissionRegistry>, String) {
    let registry = Arc::new(PermissionRegistry::new(timeout, Vec::new()));
    let (port, _server) = start_bridge_server(registry.clone(), 0).await.unwrap();
    (registry, format!("http://127.0.0.1:{port}"))
}

async fn next_request_id(events: &mut tokio::sync::broadcast::Receiver<BridgeEvent>) -> String {
    loop {
        if let BridgeEvent::PermissionRequested { request_id, .. } = events.recv().await.unwrap() {
            return request_id;
        }
    }
}

#[tokio::test]
async fn ui_allow_with_edited_input_reaches_caller() {
    let (registry, base) = start(Duration::from_secs(10)).await;
    let mut events = registry.subscribe();
    let client = reqwest::Client::new();

    let caller = {
        let client = client.clone();
        let base = base.clone();
        tokio::spawn(async move {
            client
                .post(format!("{base}/permission"))
                .json(&json!({
                    "toolUseId": "toolu_1",
                    "toolName": "Bash",
                    "input": {"command": "rm -rf /tmp/x"},
                    "channelId": "session-9",
                    "suggestions": {"rules": ["Bash(rm:*)"]}
                }))
                .send()
                .await
                .unwrap()
                .json::<Value>()
                .await
                .unwrap()
        })
    };

    let request_id = next_request_id(&mut events).await;

    let pending: Value = client
        .get(format!("{base}/pending"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(pending[0]["requestId"], request_id.as_str());
    assert_eq!(pending[0]["channelId"], "session-9");

    let status = client
        .post(format!("{base}/respond"))
        .json(&json!({
            "requestId": request_id,
            "allow": true,
            "updatedInput": {"command": "rm -rf /tmp/x/cache"}
        }))
        .send()
        .await
        .unwrap()
        .status();
    assert!(status.is_success());

    let body = caller.await.unwrap();
    assert_eq!(
        body,
        json!({
            "behavior": "allow",
            "updatedInput": {"command": "rm -rf /tmp/x/cache"},
            "updatedPermissions": {"rules": ["Bash(rm:*)"]}
        })
    );
}

#[tokio::test]
async fn ui_deny_without_message_uses_default() {
    let (registry, base) = start(Duration::from_secs(10)).await;
    let mut events = registry.subscribe();
    let client = reqwest::Client::new();

    let caller = {
        let client = client.clone();
        let base = base.clone();
        tokio::spawn(async move {
            client
                .post(format!("{base}/permission"))
                .json(&json!({"toolUseId": "toolu_2", "toolName": "Write", "input": {}}))
                .send()
                .await
                .unwrap()
                .json::<PermissionResult>()
                .await
                .unwrap()
        })
    };

    let request_id = next_request_id(&mut events).await;
    client
        .post(format!("{base}/respond"))
        .json(&json!({"requestId": request_id, "allow": false}))
        .send()
        .await
        .unwrap();

    let result = caller.await.unwrap();
    assert!(!result.is_allowed());
    assert_eq!(result.message(), Some("Denied by user"));
    assert!(result.interrupt());
}

#[tokio::test]
async fn respond_to_unknown_request_is_not_found() {
    let (_registry, base) = start(Duration::from_secs(10)).await;

    let status = reqwest::Client::new()
        .post(format!("{base}/respond"))
        .json(&json!({"requestId": "nope", "allow": true}))
        .send()
        .await
        .unwrap()
        .status();

    assert_eq!(status, reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unanswered_request_times_out_as_deny() {
    let (registry, base) = start(Duration::from_millis(50)).await;

    let result: PermissionResult = reqwest::Client::new()
        .post(format!("{base}/permission"))
        .json(&json!({"toolUseId": "toolu_3", "toolName": "Bash", "input": {"command": "ls"}}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert!(!result.is_allowed());
    assert_eq!(result.message(), Some("Timed out waiting for approval"));
    assert!(!result.interrupt());
    assert!(registry.pending().await.is_empty());
}

#[tokio::test]
async fn caller_giving_up_clears_pending_request() {
    let (registry, base) = start(Duration::from_secs(600)).await;
    let mut events = registry.subscribe();

    let gave_up = reqwest::Client::new()
        .post(format!("{base}/permission"))
        .json(&json!({"toolUseId": "toolu_4", "toolName": "Bash", "input": {"command": "ls"}}))
        .timeout(Duration::from_millis(200))
        .send()
        .await;
    assert!(gave_up.is_err());

    let request_id = next_request_id(&mut events).await;

    // The server notices the closed connection asynchronously
    for _ in 0..50 {
        if registry.pending().await.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(registry.pending().await.is_empty());

    let status = reqwest::Client::new()
        .post(format!("{base}/respond"))
        .json(&json!({"requestId": request_id, "allow": true}))
        .send()
        .await
        .unwrap()
        .status();
    assert_eq!(status, reqwest::StatusCode::NOT_FOUND);
}
