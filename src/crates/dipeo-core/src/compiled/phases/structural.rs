//! Phase 1 — STRUCTURAL: unique IDs, handle well-formedness, endpoint/start
//! rules, data-type compatibility. Any error here marks the result invalid
//! and later phases are skipped (spec §4.1).

use crate::compiled::types::Diagnostic;
use crate::domain::{DomainDiagram, HandleLabel, NodeType};
use crate::ids::Direction;

pub fn run(diagram: &DomainDiagram) -> Vec<Diagnostic> {
    let mut out = Vec::new();

    for arrow in diagram.arrows.values() {
        let source = diagram.handles.get(&arrow.source);
        let target = diagram.handles.get(&arrow.target);

        let (Some(source), Some(target)) = (source, target) else {
            out.push(
                Diagnostic::error("E_DANGLING_ARROW", "arrow references a handle that does not exist")
                    .at_arrow(arrow.id.clone()),
            );
            continue;
        };

        if source.direction != Direction::Output || target.direction != Direction::Input {
            out.push(
                Diagnostic::error(
                    "E_BAD_DIRECTION",
                    "arrow must run from an output handle to an input handle",
                )
                .at_arrow(arrow.id.clone()),
            );
        }

        if !source.data_type.compatible_with(target.data_type) {
            out.push(
                Diagnostic::error("E_TYPE_MISMATCH", "source and target handles have incompatible data types")
                    .at_arrow(arrow.id.clone()),
            );
        }
    }

    for node in diagram.nodes.values() {
        let handles: Vec<_> = diagram.handles_of(&node.id).collect();

        if node.node_type == NodeType::Start {
            let has_input = handles.iter().any(|h| h.direction == Direction::Input);
            if has_input {
                out.push(
                    Diagnostic::error("E_START_HAS_INPUT", "START nodes must not declare input handles")
                        .at_node(node.id.clone()),
                );
            }
        }

        if node.node_type == NodeType::Endpoint {
            let has_output = handles.iter().any(|h| h.direction == Direction::Output);
            if has_output {
                out.push(
                    Diagnostic::error("E_ENDPOINT_HAS_OUTPUT", "ENDPOINT nodes must not declare output handles")
                        .at_node(node.id.clone()),
                );
            }
        }

        for handle in &handles {
            let is_branch_label = matches!(handle.label, HandleLabel::CondTrue | HandleLabel::CondFalse);
            if is_branch_label && node.node_type != NodeType::Condition {
                out.push(
                    Diagnostic::error(
                        "E_BRANCH_LABEL_MISPLACED",
                        "condtrue/condfalse handles may only appear on CONDITION nodes",
                    )
                    .at_node(node.id.clone()),
                );
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DataType, DomainArrow, DomainHandle, DomainNode, Position};
    use crate::ids::{ArrowId, HandleId, NodeId};
    use serde_json::json;

    fn handle(id: &str, node: &str, dir: Direction, dt: DataType, label: HandleLabel) -> DomainHandle {
        DomainHandle {
            id: HandleId::from(id),
            node_id: NodeId::from(node),
            label,
            direction: dir,
            data_type: dt,
            position: Position::default(),
        }
    }

    #[test]
    fn dangling_arrow_is_an_error() {
        let mut diagram = DomainDiagram::new();
        diagram.arrows.insert(
            ArrowId::from("a1"),
            DomainArrow {
                id: ArrowId::from("a1"),
                source: HandleId::from("missing_output"),
                target: HandleId::from("also_missing"),
                content_type: None,
                label: None,
                data: json!(null),
            },
        );
        let diags = run(&diagram);
        assert!(diags.iter().any(|d| d.code == "E_DANGLING_ARROW"));
    }

    #[test]
    fn compatible_handles_produce_no_diagnostics() {
        let mut diagram = DomainDiagram::new();
        diagram.nodes.insert(
            NodeId::from("n1"),
            DomainNode { id: NodeId::from("n1"), node_type: NodeType::CodeJob, position: Position::default(), data: json!({}) },
        );
        diagram.nodes.insert(
            NodeId::from("n2"),
            DomainNode { id: NodeId::from("n2"), node_type: NodeType::CodeJob, position: Position::default(), data: json!({}) },
        );
        diagram.handles.insert(
            HandleId::from("h_out"),
            handle("h_out", "n1", Direction::Output, DataType::Any, HandleLabel::Default),
        );
        diagram.handles.insert(
            HandleId::from("h_in"),
            handle("h_in", "n2", Direction::Input, DataType::String, HandleLabel::Default),
        );
        diagram.arrows.insert(
            ArrowId::from("a1"),
            DomainArrow {
                id: ArrowId::from("a1"),
                source: HandleId::from("h_out"),
                target: HandleId::from("h_in"),
                content_type: None,
                label: None,
                data: json!(null),
            },
        );
        assert!(run(&diagram).is_empty());
    }
}
