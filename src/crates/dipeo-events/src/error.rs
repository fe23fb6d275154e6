//! Error taxonomy for the event bus and router.
//!
//! Grounded on the teacher's `api::ws::error::WsError` — narrowed to the
//! handful of failure modes a non-blocking, in-process bus can actually
//! raise (no connection/protocol errors: there is no wire transport here).

use thiserror::Error;

use dipeo_core::ids::ExecutionId;

#[derive(Debug, Error)]
pub enum EventsError {
    /// `interactive_prompt` was awaited but no response arrived before
    /// the execution reached a terminal state.
    #[error("execution '{0}' ended before an interactive response arrived")]
    ExecutionEndedWithoutResponse(ExecutionId),

    /// A caller replied to a prompt that was never issued, or was already
    /// answered.
    #[error("no pending interactive prompt '{0}' on execution '{1}'")]
    UnknownPrompt(String, ExecutionId),

    /// The requested sequence range is invalid (`from_seq > to_seq`).
    #[error("invalid sequence range [{from}, {to}) for execution '{execution_id}'")]
    InvalidRange { execution_id: ExecutionId, from: u64, to: u64 },
}

pub type Result<T> = std::result::Result<T, EventsError>;
