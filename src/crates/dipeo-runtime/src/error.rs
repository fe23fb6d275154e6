//! Runtime error taxonomy (spec §7). `CoreError` (compile-time) and
//! `RuntimeError` (here) are deliberately distinct enums: nothing a node
//! firing produces at runtime can invalidate a diagram that already
//! compiled.

use thiserror::Error;

use dipeo_core::ids::NodeId;

/// One of the seven error kinds a running execution can raise.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// Compile-time structural/semantic violation; blocks execution.
    /// Reachable here only when a caller runs an engine against a diagram
    /// that was never compiled, or was compiled with warnings promoted.
    #[error("validation: {0}")]
    Validation(String),

    /// A specific node could not build its inputs.
    #[error("node '{node}' could not resolve its inputs: {reason}")]
    InputResolutionFailed { node: NodeId, reason: String },

    /// A handler raised a typed error. `retryable` drives the retry
    /// policy in `retry.rs`.
    #[error("node '{node}' handler failed (attempt {attempt}, retryable={retryable}): {message}")]
    HandlerFailed { node: NodeId, message: String, retryable: bool, attempt: u32 },

    /// A handler exceeded its timeout.
    #[error("node '{node}' timed out after {timeout_ms}ms")]
    HandlerTimeout { node: NodeId, timeout_ms: u64 },

    /// A port adapter surfaced a service error (may be retryable).
    #[error("external service error for node '{node}': {message}")]
    ExternalService { node: NodeId, message: String, retryable: bool },

    /// Cooperative cancellation was honored for this node.
    #[error("node '{node}' cancelled")]
    Cancelled { node: NodeId },

    /// Invariant violation in the engine or token manager; fatal, aborts
    /// the whole execution.
    #[error("internal engine error: {0}")]
    Internal(String),
}

impl RuntimeError {
    /// Stable error code surfaced on `NODE_ERROR`/`EXECUTION_ERROR`
    /// events (spec §7 "every error includes a stable error code").
    pub fn code(&self) -> &'static str {
        match self {
            RuntimeError::Validation(_) => "VALIDATION",
            RuntimeError::InputResolutionFailed { .. } => "INPUT_RESOLUTION_FAILED",
            RuntimeError::HandlerFailed { .. } => "HANDLER_FAILED",
            RuntimeError::HandlerTimeout { .. } => "HANDLER_TIMEOUT",
            RuntimeError::ExternalService { .. } => "EXTERNAL_SERVICE",
            RuntimeError::Cancelled { .. } => "CANCELLED",
            RuntimeError::Internal(_) => "INTERNAL",
        }
    }

    /// Whether the propagation policy (spec §7) retries this failure
    /// before giving up and transitioning the node to FAILED.
    pub fn is_retryable(&self) -> bool {
        match self {
            RuntimeError::HandlerFailed { retryable, .. } => *retryable,
            RuntimeError::ExternalService { retryable, .. } => *retryable,
            _ => false,
        }
    }

    /// Whether this error aborts the entire execution rather than just
    /// failing the one node.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RuntimeError::Internal(_))
    }

    pub fn node_id(&self) -> Option<&NodeId> {
        match self {
            RuntimeError::InputResolutionFailed { node, .. }
            | RuntimeError::HandlerFailed { node, .. }
            | RuntimeError::HandlerTimeout { node, .. }
            | RuntimeError::ExternalService { node, .. }
            | RuntimeError::Cancelled { node, .. } => Some(node),
            RuntimeError::Validation(_) | RuntimeError::Internal(_) => None,
        }
    }

    pub fn handler_failed(node: NodeId, message: impl Into<String>, retryable: bool, attempt: u32) -> Self {
        Self::HandlerFailed { node, message: message.into(), retryable, attempt }
    }

    pub fn input_resolution_failed(node: NodeId, reason: impl Into<String>) -> Self {
        Self::InputResolutionFailed { node, reason: reason.into() }
    }
}
