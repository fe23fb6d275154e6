//! Typed per-[`NodeType`](crate::domain::NodeType) configuration records.
//!
//! `DomainNode::data` is an opaque JSON blob at the domain layer; the
//! `NODE_FACTORY` compiler phase (`compiled::phases::node_factory`) is the
//! single boundary that converts it into one of these typed records,
//! applying defaults and validating required fields.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::JoinPolicyKind;
use crate::ids::NodeId;

/// How a condition node decides when to stop looping its body back to
/// itself (spec §4.5).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "condition_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConditionType {
    DetectMaxIterations { max_iterations: u32 },
    CheckNodesExecuted { nodes: Vec<NodeId> },
    Custom { expression: String },
}

/// Typed configuration for every supported node type.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "node_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeConfig {
    Start,
    Endpoint,
    PersonJob {
        person_id: String,
        #[serde(default)]
        max_iteration: Option<u32>,
        #[serde(default)]
        join_policy: Option<JoinPolicyKind>,
    },
    Condition {
        condition: ConditionType,
    },
    CodeJob {
        language: String,
        code: String,
    },
    ApiJob {
        url: String,
        #[serde(default = "default_method")]
        method: String,
    },
    ShellJob {
        command: String,
    },
    DbRead {
        query: String,
    },
    TemplateRender {
        template: String,
    },
    SubDiagram {
        diagram_id: String,
    },
    Hook {
        event: String,
    },
}

fn default_method() -> String {
    "GET".to_string()
}

impl NodeConfig {
    /// The default timeout (spec §5 "each node type has a default
    /// timeout") absent an override in `DomainNode::data`.
    pub fn default_timeout_ms(&self) -> u64 {
        match self {
            NodeConfig::PersonJob { .. } => 60_000,
            NodeConfig::ApiJob { .. } => 30_000,
            NodeConfig::ShellJob { .. } => 30_000,
            NodeConfig::SubDiagram { .. } => 120_000,
            NodeConfig::DbRead { .. } => 15_000,
            _ => 5_000,
        }
    }
}

/// Convert a node's opaque `data` into a [`NodeConfig`].
///
/// `data` is expected to already carry a `node_type` tag identifying the
/// variant to deserialize into. The caller (the `NODE_FACTORY` compiler
/// phase) cross-checks that tag against the owning `DomainNode`'s
/// declared type before calling this function; a mismatch there is a
/// factory error, not silently coerced.
pub fn from_node_data(data: &Value) -> Result<NodeConfig, serde_json::Error> {
    serde_json::from_value(data.clone())
}
