//! Types produced by the compiler: diagnostics and the executable diagram.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{ContentType, DiagramMetadata, NodeType};
use crate::ids::{ArrowId, NodeId};
use crate::node_types::NodeConfig;

/// Severity of a single compiler diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

/// One compiler-produced diagnostic, attributable to a node and/or arrow.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: &'static str,
    pub message: String,
    pub node_id: Option<NodeId>,
    pub arrow_id: Option<ArrowId>,
}

impl Diagnostic {
    pub fn error(code: &'static str, message: impl Into<String>) -> Self {
        Self { severity: Severity::Error, code, message: message.into(), node_id: None, arrow_id: None }
    }

    pub fn warning(code: &'static str, message: impl Into<String>) -> Self {
        Self { severity: Severity::Warning, code, message: message.into(), node_id: None, arrow_id: None }
    }

    pub fn at_node(mut self, node_id: NodeId) -> Self {
        self.node_id = Some(node_id);
        self
    }

    pub fn at_arrow(mut self, arrow_id: ArrowId) -> Self {
        self.arrow_id = Some(arrow_id);
        self
    }
}

/// Accumulated diagnostics plus the validity verdict the compiler returns
/// alongside (or instead of, on fatal failure) an [`ExecutableDiagram`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CompilationResult {
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
}

impl CompilationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub(crate) fn extend(&mut self, diagnostics: Vec<Diagnostic>) {
        for d in diagnostics {
            match d.severity {
                Severity::Error => self.errors.push(d),
                Severity::Warning => self.warnings.push(d),
            }
        }
    }
}

/// One compile-time-resolved transformation step, applied at runtime by
/// the input resolver (`dipeo_runtime`'s transform engine). Parameters are
/// plain serialisable data — no closures cross the compiler/runtime
/// boundary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum TransformRuleKind {
    VariableExtract { key_path: String },
    FormatString { template: String },
    ContentTypeConvert,
    ExtractToolResults,
    /// No-op at runtime; its presence was only meaningful at compile time
    /// to validate that a condition node's branches are well-formed.
    BranchOnCondition,
    /// A rule registered by name in `dipeo_runtime::resolve::RuleRegistry`
    /// rather than one of the five built-ins above (spec §4.4 "custom
    /// rules via plugin").
    Custom { name: String, params: Value },
}

/// Flags precomputed by the compiler so the engine and resolver never
/// need to re-derive them from the domain diagram at runtime.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeHints {
    pub is_conditional_branch: bool,
    pub is_first_only: bool,
    pub is_conversation_state: bool,
}

/// The compile-time-resolved plan for one arrow.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecutableEdge {
    pub id: ArrowId,
    pub source_node: NodeId,
    pub target_node: NodeId,
    pub source_output_port: String,
    pub target_input_port: String,
    pub content_type: ContentType,
    pub transform_rules: Vec<TransformRuleKind>,
    pub runtime_hints: RuntimeHints,
}

/// A node plus its compiler-materialised typed configuration and
/// precomputed scheduling rank.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecutableNode {
    pub id: NodeId,
    pub node_type: NodeType,
    pub config: NodeConfig,
    /// Node ordering policy tie-break 1 (spec §4.5): lower rank first,
    /// cycle members sharing a rank.
    pub topological_rank: u32,
}

/// The immutable output of compilation: an indexed, validated diagram
/// ready for the execution engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecutableDiagram {
    pub nodes: BTreeMap<NodeId, ExecutableNode>,
    pub edges: Vec<ExecutableEdge>,
    /// Indexes into `edges`, keyed by the edge's target node.
    pub incoming_by_node: BTreeMap<NodeId, Vec<usize>>,
    /// Indexes into `edges`, keyed by the edge's source node.
    pub outgoing_by_node: BTreeMap<NodeId, Vec<usize>>,
    pub start_nodes: BTreeSet<NodeId>,
    /// Maps a `CONDITION` node to the node ids it conditionally gates,
    /// used to validate `condtrue`/`condfalse` wiring.
    pub parent_of_condition: BTreeMap<NodeId, NodeId>,
    pub metadata: DiagramMetadata,
}

impl ExecutableDiagram {
    pub fn edges_into(&self, node: &NodeId) -> impl Iterator<Item = &ExecutableEdge> {
        self.incoming_by_node
            .get(node)
            .into_iter()
            .flatten()
            .map(move |&i| &self.edges[i])
    }

    pub fn edges_out_of(&self, node: &NodeId) -> impl Iterator<Item = &ExecutableEdge> {
        self.outgoing_by_node
            .get(node)
            .into_iter()
            .flatten()
            .map(move |&i| &self.edges[i])
    }
}
