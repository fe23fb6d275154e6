//! Error types for diagram construction and compilation.
//!
//! `CoreError` covers everything that can go wrong before a diagram ever
//! starts executing: malformed input, structural validation failures, and
//! compiler phase failures. Runtime failures (a node handler erroring, a
//! timeout, cancellation) are a distinct taxonomy owned by
//! `dipeo_runtime::error::RuntimeError`.

use thiserror::Error;

use crate::ids::HandleIdParseError;

/// Convenience result type using [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised while building or compiling a [`crate::domain::DomainDiagram`].
#[derive(Error, Debug)]
pub enum CoreError {
    /// A domain invariant (spec §3) was violated.
    #[error("diagram validation failed: {0}")]
    Validation(String),

    /// Two entities of the same kind share an id.
    #[error("duplicate {kind} id: {id}")]
    DuplicateId { kind: &'static str, id: String },

    /// An arrow, handle, or node referenced an id that does not exist.
    #[error("{from} references unknown {to}")]
    UnknownReference { from: String, to: String },

    /// A handle id did not parse back into its structural parts.
    #[error("malformed handle: {0}")]
    MalformedHandle(#[from] HandleIdParseError),

    /// `NODE_FACTORY` could not build a typed config for a node.
    #[error("node '{node}' failed type conversion: {reason}")]
    NodeFactory { node: String, reason: String },

    /// The opaque `data` payload on a node or arrow was not valid JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn duplicate_id(kind: &'static str, id: impl Into<String>) -> Self {
        Self::DuplicateId { kind, id: id.into() }
    }

    pub fn unknown_reference(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::UnknownReference { from: from.into(), to: to.into() }
    }

    pub fn node_factory(node: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NodeFactory { node: node.into(), reason: reason.into() }
    }
}
