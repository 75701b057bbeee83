//! Terminal prompt UI.
//!
//! Listens for `permission.requested` events and asks on stdin.

use std::io::Write;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use crate::error::Result;
use crate::events::BridgeEvent;
use crate::permission::{Decision, PermissionRegistry};

/// Map a typed answer to a decision.
///
/// `y` allow, `a` allow and remember for the session, `n` deny and abort,
/// `s` deny but let the agent continue.
pub fn parse_answer(answer: &str) -> Option<Decision> {
    match answer.trim().to_lowercase().as_str() {
        "y" | "yes" => Some(Decision::allow()),
        "a" | "always" => Some(Decision::Allow {
            updated_input: None,
            updated_permissions: None,
            remember_for_session: true,
        }),
        "n" | "no" => Some(Decision::deny()),
        "s" | "skip" => Some(Decision::Deny {
            message: None,
            interrupt: false,
        }),
        _ => None,
    }
}

fn describe(tool_name: &str, channel_id: &str, tool_input: &serde_json::Value) -> String {
    let input = serde_json::to_string_pretty(tool_input).unwrap_or_else(|_| tool_input.to_string());
    format!("[{channel_id}] {tool_name} wants to run with:\n{input}\nAllow? [y]es / [a]lways / [n]o / [s]kip: ")
}

/// Answer permission requests from `input` until it closes or the event
/// stream ends. `events` should be subscribed before requests can arrive.
pub async fn run_prompt_loop<R>(
    registry: Arc<PermissionRegistry>,
    mut events: broadcast::Receiver<BridgeEvent>,
    input: R,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();

    loop {
        let (request_id, prompt) = match events.recv().await {
            Ok(BridgeEvent::PermissionRequested {
                request_id,
                channel_id,
                tool_name,
                tool_input,
                ..
            }) => (request_id, describe(&tool_name, &channel_id, &tool_input)),
            Ok(BridgeEvent::PermissionResolved { .. }) => continue,
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Prompt fell behind, some requests were not shown");
                continue;
            }
            Err(RecvError::Closed) => return Ok(()),
        };

        let decision = loop {
            print!("{prompt}");
            let _ = std::io::stdout().flush();
            let Some(line) = lines.next_line().await? else {
                debug!("Prompt input closed");
                return Ok(());
            };
            if let Some(decision) = parse_answer(&line) {
                break decision;
            }
            println!("Please answer y, a, n or s.");
        };

        // The request may have timed out while we were waiting on the user
        if let Err(e) = registry.respond(&request_id, decision).await {
            warn!(request_id = %request_id, error = %e, "Could not apply answer");
            println!("Request {request_id} is no longer pending.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::{PermissionRequest, ToolInput};
    use std::time::Duration;
    use tokio::io::BufReader;

    #[test]
    fn answers_map_to_decisions() {
        assert_eq!(parse_answer("y"), Some(Decision::allow()));
        assert_eq!(parse_answer(" NO "), Some(Decision::deny()));
        assert!(matches!(
            parse_answer("a"),
            Some(Decision::Allow {
                remember_for_session: true,
                ..
            })
        ));
        assert_eq!(
            parse_answer("s"),
            Some(Decision::Deny {
                message: None,
                interrupt: false
            })
        );
        assert_eq!(parse_answer("maybe"), None);
    }

    #[tokio::test]
    async fn prompt_answers_pending_request() {
        let registry = Arc::new(PermissionRegistry::new(Duration::from_secs(5), Vec::new()));
        // An unparseable line is re-asked before the real answer
        let input = BufReader::new(&b"what\nn\n"[..]);
        let ui = tokio::spawn(run_prompt_loop(registry.clone(), registry.subscribe(), input));

        let request = PermissionRequest::new("chan", "Bash", ToolInput::new(), None, None);
        let (request_id, request) = registry.submit(request).await;
        let result = registry.await_decision(&request_id, &request).await;

        assert!(!result.is_allowed());
        assert!(result.interrupt());
        ui.abort();
    }
}
