//! toolgate
//!
//! Coordinates permission prompts between an agent's tool pipeline and a UI.
//! The pipeline creates a [`permission::PermissionRequest`] and waits on its
//! decision; the UI accepts or rejects it exactly once.

pub mod bridge;
pub mod config;
pub mod error;
pub mod events;
pub mod permission;
pub mod prompt;

pub use error::{PermissionError, Result};
pub use permission::{
    Behavior, Decision, PendingDecision, PermissionRegistry, PermissionRequest, PermissionResult,
    ProjectContext, ToolInput,
};
