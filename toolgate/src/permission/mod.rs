//! Permission requests and their single-assignment results.
//!
//! The tool pipeline builds a [`PermissionRequest`], hands it to the
//! [`PermissionRegistry`] and waits on its [`PendingDecision`]; the UI answers
//! through the registry with a [`Decision`].

mod context;
mod registry;
mod request;
mod result;

pub use context::ProjectContext;
pub use registry::{Decision, PendingSummary, PermissionRegistry};
pub use request::{PendingDecision, PermissionRequest, ToolInput};
pub use result::{Behavior, PermissionResult, DEFAULT_DENY_MESSAGE};
