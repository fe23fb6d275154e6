//! # dipeo-runtime — token-driven execution engine
//!
//! Consumes an [`dipeo_core::compiled::ExecutableDiagram`] and drives it to
//! completion: the [`token::TokenManager`] (C3) owns per-edge ordered
//! queues and readiness, [`resolve::InputResolver`] (C4) turns consumed
//! tokens into a node's resolved inputs, and [`engine::Engine`] (C5) runs
//! the main dispatch loop against a [`handler::HandlerRegistry`].
//!
//! ## Module Organization
//!
//! - [`error`] — `RuntimeError`, the seven-kind runtime error taxonomy
//! - [`state`] — `StateTracker`, per-node lifecycle observability
//! - [`token`] — `TokenManager`, the token queues and join policies
//! - [`resolve`] — `InputResolver`, `RuleRegistry`, the transform engine
//! - [`handler`] — the `Handler` trait contract and `ExecutionContext`
//! - [`retry`] — exponential backoff for retryable failures
//! - [`engine`] — the main scheduling loop

pub mod engine;
pub mod error;
pub mod handler;
pub mod resolve;
pub mod retry;
pub mod state;
pub mod token;

pub use engine::{Engine, EngineConfig, Termination};
pub use error::RuntimeError;
pub use handler::{ExecutionContext, Handler, HandlerRegistry, ServiceRegistry};
pub use resolve::{CustomRule, InputResolver, RuleRegistry};
pub use retry::RetryPolicy;
pub use state::{NodeExecutionState, NodeStatus, StateTracker};
pub use token::TokenManager;
