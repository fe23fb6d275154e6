//! Phase 4 — NODE_FACTORY: materialise each node's typed configuration
//! from its opaque `data` dictionary (spec §4.1, §9 design note).

use crate::compiled::types::Diagnostic;
use crate::domain::DomainDiagram;
use crate::ids::NodeId;
use crate::node_types::{from_node_data, NodeConfig};

/// The `node_type` tag embedded in `data`, if present, as the declaring
/// node would spell it (e.g. `"PERSON_JOB"`).
fn embedded_node_type_tag(data: &serde_json::Value) -> Option<&str> {
    data.get("node_type").and_then(serde_json::Value::as_str)
}

pub fn run(diagram: &DomainDiagram) -> (Vec<(NodeId, NodeConfig)>, Vec<Diagnostic>) {
    let mut configs = Vec::with_capacity(diagram.nodes.len());
    let mut diags = Vec::new();

    for node in diagram.nodes.values() {
        let declared_tag = serde_json::to_value(node.node_type)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();

        if let Some(embedded_tag) = embedded_node_type_tag(&node.data) {
            if embedded_tag != declared_tag {
                diags.push(
                    Diagnostic::error(
                        "E_NODE_FACTORY",
                        format!(
                            "node declared as {declared_tag:?} but data carries node_type {embedded_tag:?}"
                        ),
                    )
                    .at_node(node.id.clone()),
                );
                continue;
            }
        }

        match from_node_data(&node.data) {
            Ok(config) => configs.push((node.id.clone(), config)),
            Err(err) => diags.push(
                Diagnostic::error("E_NODE_FACTORY", format!("failed to build typed config: {err}"))
                    .at_node(node.id.clone()),
            ),
        }
    }

    (configs, diags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DomainNode, NodeType, Position};
    use serde_json::json;

    fn node(node_type: NodeType, data: serde_json::Value) -> DomainNode {
        DomainNode { id: NodeId::from("n1"), node_type, position: Position::default(), data }
    }

    #[test]
    fn mismatched_node_type_tag_is_a_factory_error() {
        let mut diagram = DomainDiagram::new();
        diagram.nodes.insert(
            NodeId::from("n1"),
            node(NodeType::CodeJob, json!({"node_type": "PERSON_JOB", "person_id": "p1"})),
        );

        let (configs, diags) = run(&diagram);
        assert!(configs.is_empty());
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, "E_NODE_FACTORY");
    }

    #[test]
    fn matching_node_type_tag_builds_cleanly() {
        let mut diagram = DomainDiagram::new();
        diagram.nodes.insert(
            NodeId::from("n1"),
            node(NodeType::CodeJob, json!({"node_type": "CODE_JOB", "language": "python", "code": "1"})),
        );

        let (configs, diags) = run(&diagram);
        assert!(diags.is_empty());
        assert_eq!(configs.len(), 1);
    }
}
