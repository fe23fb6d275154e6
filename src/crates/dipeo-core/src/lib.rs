//! # dipeo-core — domain model and compiler
//!
//! `dipeo-core` defines the authoring-time value objects a diagram surface
//! format parses into (the [`domain::DomainDiagram`] and friends) and the
//! [`compiled::Compiler`] that turns one into an [`compiled::ExecutableDiagram`]
//! ready for the scheduler in `dipeo-runtime`.
//!
//! ## Module Organization
//!
//! - [`ids`] — typed string identifiers (`NodeId`, `HandleId`, ...)
//! - [`domain`] — `DomainDiagram`, `DomainNode`, `DomainHandle`, `DomainArrow`, `DomainPerson`
//! - [`node_types`] — typed per-`NodeType` configuration records
//! - [`envelope`] — the universal message container
//! - [`compiled`] — the five-phase compiler and its output types
//! - [`error`] — `CoreError`, the construction/compilation error taxonomy
//!
//! This crate has no async runtime dependency and performs no I/O:
//! compilation is a pure function of its input (spec §4.1).

pub mod compiled;
pub mod domain;
pub mod envelope;
pub mod error;
pub mod ids;
pub mod node_types;
pub mod ports;

pub use compiled::{CompilationResult, Compiler, Diagnostic, ExecutableDiagram, ExecutableEdge, ExecutableNode};
pub use domain::{
    ContentType, DataType, DiagramMetadata, DomainArrow, DomainDiagram, DomainHandle, DomainNode, DomainPerson,
    HandleLabel, JoinPolicyKind, NodeType, Position,
};
pub use envelope::Envelope;
pub use error::{CoreError, Result};
pub use ids::{ApiKeyId, ArrowId, DiagramId, Direction, ExecutionId, HandleId, NodeId, PersonId};
pub use node_types::{ConditionType, NodeConfig};
