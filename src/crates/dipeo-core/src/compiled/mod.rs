//! The compiler (component C2): turns a [`crate::domain::DomainDiagram`]
//! into an [`ExecutableDiagram`] through the five fixed-order phases in
//! [`phases`].

pub mod phases;
mod compiler;
mod types;

pub use compiler::Compiler;
pub use types::{
    CompilationResult, Diagnostic, ExecutableDiagram, ExecutableEdge, ExecutableNode, RuntimeHints, Severity,
    TransformRuleKind,
};
