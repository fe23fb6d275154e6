//! The authoring-time domain diagram value object (spec §3).
//!
//! A [`DomainDiagram`] is what a surface-format parser (native JSON,
//! readable YAML, light YAML — all out of scope here) produces, and what
//! the [`crate::compiled::Compiler`] consumes. It carries no indexes and no
//! derived data; everything derivable belongs in the executable diagram.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{ArrowId, HandleId, NodeId, PersonId};

/// The kind of computation a node performs.
///
/// New variants are added here as the system grows; `NODE_FACTORY` (see
/// [`crate::compiled::phases::node_factory`]) is the single place that
/// turns a node's opaque `data` into one of these typed configurations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeType {
    Start,
    Endpoint,
    PersonJob,
    Condition,
    CodeJob,
    ApiJob,
    ShellJob,
    DbRead,
    TemplateRender,
    SubDiagram,
    Hook,
}

/// Named slot on a node, either accepting or producing data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleLabel {
    Default,
    First,
    CondTrue,
    CondFalse,
    Success,
    Error,
    Results,
}

impl HandleLabel {
    /// `condtrue`/`condfalse` are the only labels restricted to a node type
    /// (spec §3 invariant 5: only on outputs of `CONDITION` nodes).
    pub fn is_condition_branch(self) -> bool {
        matches!(self, HandleLabel::CondTrue | HandleLabel::CondFalse)
    }
}

/// The declared type of value flowing through a handle. `Any` is the
/// wildcard that is compatible with every other data type (spec §3
/// invariant 2).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Any,
    String,
    Number,
    Boolean,
    Object,
    Array,
}

impl DataType {
    /// Whether a value declared as `self` may flow into a handle declared
    /// as `other` (`any` is a wildcard on either side).
    pub fn compatible_with(self, other: DataType) -> bool {
        self == DataType::Any || other == DataType::Any || self == other
    }
}

/// How an arrow's payload should be interpreted by the resolver (spec §3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    RawText,
    ConversationState,
    Object,
    Empty,
    Generic,
    Variable,
}

/// Which direction an inbound edge to a join policy `ALL`/`ANY`/`FIRST_ONLY`
/// PersonJob node should be attributed to. Set on node data as an optional
/// override; falls back to the type-level default derived from `NodeType`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JoinPolicyKind {
    All,
    Any,
    FirstOnly,
}

impl NodeType {
    /// The join policy a node type uses absent an explicit override on its
    /// `data` (spec §4.2, §9 open question: "treat `join_policy` as an
    /// optional field on node data with a type-level default").
    pub fn default_join_policy(self) -> JoinPolicyKind {
        match self {
            NodeType::PersonJob => JoinPolicyKind::FirstOnly,
            NodeType::Condition => JoinPolicyKind::All,
            _ => JoinPolicyKind::All,
        }
    }
}

/// 2D canvas position, carried through purely for the visual editor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// A node in the authoring-time diagram.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DomainNode {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default)]
    pub position: Position,
    /// Opaque per-type configuration, validated and typed during the
    /// NODE_FACTORY compiler phase.
    #[serde(default)]
    pub data: Value,
}

/// A named input or output slot on a node.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DomainHandle {
    pub id: HandleId,
    pub node_id: NodeId,
    pub label: HandleLabel,
    pub direction: crate::ids::Direction,
    pub data_type: DataType,
    #[serde(default)]
    pub position: Position,
}

/// A directed connection from one output handle to one input handle.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DomainArrow {
    pub id: ArrowId,
    pub source: HandleId,
    pub target: HandleId,
    #[serde(default)]
    pub content_type: Option<ContentType>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub data: Value,
}

/// LLM participant configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DomainPerson {
    pub id: PersonId,
    pub model: String,
    pub service: String,
    #[serde(default)]
    pub api_key_id: Option<crate::ids::ApiKeyId>,
    #[serde(default)]
    pub system_prompt: Option<String>,
}

/// Diagram-level metadata carried through to the executable diagram.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DiagramMetadata {
    pub id: Option<crate::ids::DiagramId>,
    pub name: Option<String>,
    pub version: Option<String>,
}

/// The full authoring-time diagram: a mapping from id to value for every
/// entity kind, plus metadata. Insertion order is irrelevant (spec §3).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DomainDiagram {
    pub nodes: BTreeMap<NodeId, DomainNode>,
    pub arrows: BTreeMap<ArrowId, DomainArrow>,
    pub handles: BTreeMap<HandleId, DomainHandle>,
    #[serde(default)]
    pub persons: BTreeMap<PersonId, DomainPerson>,
    #[serde(default)]
    pub metadata: DiagramMetadata,
}

impl DomainDiagram {
    pub fn new() -> Self {
        Self::default()
    }

    /// All handles belonging to a node, in stable id order.
    pub fn handles_of(&self, node_id: &NodeId) -> impl Iterator<Item = &DomainHandle> {
        self.handles.values().filter(move |h| &h.node_id == node_id)
    }
}
