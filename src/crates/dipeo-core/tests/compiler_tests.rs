//! Behavioral tests for the compiler (spec §8, property 1 and the
//! STRUCTURAL/CONNECTION_RESOLUTION validation rules).

use dipeo_core::domain::{
    ContentType, DataType, DomainArrow, DomainDiagram, DomainHandle, DomainNode, HandleLabel, NodeType, Position,
};
use dipeo_core::ids::{ArrowId, Direction, HandleId, NodeId};
use dipeo_core::Compiler;
use serde_json::json;

fn handle(id: &str, node: &str, label: HandleLabel, dir: Direction, dt: DataType) -> DomainHandle {
    DomainHandle {
        id: HandleId::from(id),
        node_id: NodeId::from(node),
        label,
        direction: dir,
        data_type: dt,
        position: Position::default(),
    }
}

fn node(id: &str, node_type: NodeType, data: serde_json::Value) -> DomainNode {
    DomainNode { id: NodeId::from(id), node_type, position: Position::default(), data }
}

fn arrow(id: &str, source: &str, target: &str) -> DomainArrow {
    DomainArrow {
        id: ArrowId::from(id),
        source: HandleId::from(source),
        target: HandleId::from(target),
        content_type: None,
        label: None,
        data: json!({}),
    }
}

/// `START -> CODE_JOB -> ENDPOINT`, matching scenario S1's shape.
fn s1_diagram() -> DomainDiagram {
    let mut d = DomainDiagram::new();
    d.nodes.insert(NodeId::from("start"), node("start", NodeType::Start, json!({"node_type": "START"})));
    d.nodes.insert(
        NodeId::from("code"),
        node("code", NodeType::CodeJob, json!({"node_type": "CODE_JOB", "language": "python", "code": "x + 1"})),
    );
    d.nodes.insert(NodeId::from("end"), node("end", NodeType::Endpoint, json!({"node_type": "ENDPOINT"})));

    d.handles.insert(
        HandleId::from("start_default_output"),
        handle("start_default_output", "start", HandleLabel::Default, Direction::Output, DataType::Any),
    );
    d.handles.insert(
        HandleId::from("code_default_input"),
        handle("code_default_input", "code", HandleLabel::Default, Direction::Input, DataType::Any),
    );
    d.handles.insert(
        HandleId::from("code_default_output"),
        handle("code_default_output", "code", HandleLabel::Default, Direction::Output, DataType::Any),
    );
    d.handles.insert(
        HandleId::from("end_default_input"),
        handle("end_default_input", "end", HandleLabel::Default, Direction::Input, DataType::Any),
    );

    d.arrows.insert(
        ArrowId::from("a1"),
        arrow("a1", "start_default_output", "code_default_input"),
    );
    d.arrows.insert(ArrowId::from("a2"), arrow("a2", "code_default_output", "end_default_input"));

    d
}

#[test]
fn linear_diagram_compiles_with_correct_adjacency() {
    let diagram = s1_diagram();
    let (executable, result) = Compiler::new().compile(&diagram);
    assert!(result.is_valid(), "errors: {:?}", result.errors);
    let executable = executable.unwrap();

    assert_eq!(executable.start_nodes, std::iter::once(NodeId::from("start")).collect());
    assert_eq!(executable.nodes["start"].topological_rank, 0);
    assert_eq!(executable.nodes["code"].topological_rank, 1);
    assert_eq!(executable.nodes["end"].topological_rank, 2);

    let out_of_start: Vec<_> = executable.edges_out_of(&NodeId::from("start")).collect();
    assert_eq!(out_of_start.len(), 1);
    assert_eq!(out_of_start[0].target_node, NodeId::from("code"));
}

#[test]
fn compilation_is_deterministic_across_repeated_calls() {
    let diagram = s1_diagram();
    let compiler = Compiler::new();
    let (first, _) = compiler.compile(&diagram);
    let (second, _) = compiler.compile(&diagram);
    assert_eq!(
        serde_json::to_value(first.unwrap()).unwrap(),
        serde_json::to_value(second.unwrap()).unwrap(),
    );
}

#[test]
fn start_node_with_input_handle_is_rejected() {
    let mut d = DomainDiagram::new();
    d.nodes.insert(NodeId::from("start"), node("start", NodeType::Start, json!({"node_type": "START"})));
    d.handles.insert(
        HandleId::from("start_bad_input"),
        handle("start_bad_input", "start", HandleLabel::Default, Direction::Input, DataType::Any),
    );

    let (executable, result) = Compiler::new().compile(&d);
    assert!(executable.is_none());
    assert!(result.errors.iter().any(|e| e.code == "E_START_HAS_INPUT"));
}

#[test]
fn condtrue_handle_outside_condition_node_is_rejected() {
    let mut d = DomainDiagram::new();
    d.nodes.insert(NodeId::from("n1"), node("n1", NodeType::CodeJob, json!({"node_type": "CODE_JOB", "language": "python", "code": ""})));
    d.handles.insert(
        HandleId::from("n1_condtrue_output"),
        handle("n1_condtrue_output", "n1", HandleLabel::CondTrue, Direction::Output, DataType::Any),
    );

    let (executable, result) = Compiler::new().compile(&d);
    assert!(executable.is_none());
    assert!(result.errors.iter().any(|e| e.code == "E_BRANCH_LABEL_MISPLACED"));
}

#[test]
fn unreachable_node_is_reported_as_a_warning_not_an_error() {
    let mut d = s1_diagram();
    d.nodes.insert(
        NodeId::from("orphan"),
        node("orphan", NodeType::CodeJob, json!({"node_type": "CODE_JOB", "language": "python", "code": ""})),
    );

    let (executable, result) = Compiler::new().compile(&d);
    assert!(result.is_valid());
    assert!(executable.is_some());
    assert!(result.warnings.iter().any(|w| w.code == "W_UNREACHABLE_NODE"));
}

#[test]
fn incompatible_data_types_across_an_arrow_are_rejected() {
    let mut d = DomainDiagram::new();
    d.nodes.insert(NodeId::from("a"), node("a", NodeType::CodeJob, json!({"node_type": "CODE_JOB", "language": "python", "code": ""})));
    d.nodes.insert(NodeId::from("b"), node("b", NodeType::CodeJob, json!({"node_type": "CODE_JOB", "language": "python", "code": ""})));
    d.handles.insert(
        HandleId::from("a_out"),
        handle("a_out", "a", HandleLabel::Default, Direction::Output, DataType::Number),
    );
    d.handles.insert(
        HandleId::from("b_in"),
        handle("b_in", "b", HandleLabel::Default, Direction::Input, DataType::String),
    );
    d.arrows.insert(ArrowId::from("a1"), arrow("a1", "a_out", "b_in"));

    let (executable, result) = Compiler::new().compile(&d);
    assert!(executable.is_none());
    assert!(result.errors.iter().any(|e| e.code == "E_TYPE_MISMATCH"));
}

#[test]
fn explicit_content_type_on_an_arrow_is_preserved() {
    let mut d = s1_diagram();
    d.arrows.get_mut(&ArrowId::from("a2")).unwrap().content_type = Some(ContentType::ConversationState);

    let (executable, _) = Compiler::new().compile(&d);
    let executable = executable.unwrap();
    let edge = executable.edges.iter().find(|e| e.id == ArrowId::from("a2")).unwrap();
    assert_eq!(edge.content_type, ContentType::ConversationState);
    assert!(edge.runtime_hints.is_conversation_state);
}
