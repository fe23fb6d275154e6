//! Token Manager invariants (spec §8, properties 2/4/6/7).

use std::collections::HashMap;
use std::sync::Arc;

use dipeo_core::compiled::{ExecutableDiagram, ExecutableEdge, ExecutableNode, RuntimeHints};
use dipeo_core::domain::{ContentType, DiagramMetadata, NodeType};
use dipeo_core::envelope::Envelope;
use dipeo_core::ids::{ArrowId, ExecutionId, NodeId};
use dipeo_core::node_types::NodeConfig;
use dipeo_runtime::{StateTracker, TokenManager};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};

fn env(body: serde_json::Value, from: &str) -> Envelope {
    Envelope::new(body, NodeId::from(from), ExecutionId::from("exec"), ContentType::Generic)
}

fn code_job(id: &str, rank: u32) -> ExecutableNode {
    ExecutableNode {
        id: NodeId::from(id),
        node_type: NodeType::CodeJob,
        config: NodeConfig::CodeJob { language: "python".into(), code: "".into() },
        topological_rank: rank,
    }
}

fn edge(id: &str, from: &str, to: &str, source_port: &str, target_port: &str) -> ExecutableEdge {
    ExecutableEdge {
        id: ArrowId::from(id),
        source_node: NodeId::from(from),
        target_node: NodeId::from(to),
        source_output_port: source_port.to_string(),
        target_input_port: target_port.to_string(),
        content_type: ContentType::Generic,
        transform_rules: vec![],
        runtime_hints: RuntimeHints::default(),
    }
}

/// A-from-B-to-C diagram with two independent inbound edges into `c`, used
/// to exercise condition XOR and ALL-join conservation.
fn condition_diagram() -> Arc<ExecutableDiagram> {
    let mut nodes = BTreeMap::new();
    nodes.insert(NodeId::from("cond"), ExecutableNode {
        id: NodeId::from("cond"),
        node_type: NodeType::Condition,
        config: NodeConfig::Condition { condition: dipeo_core::node_types::ConditionType::Custom { expression: "x > 5".into() } },
        topological_rank: 0,
    });
    nodes.insert(NodeId::from("t"), code_job("t", 1));
    nodes.insert(NodeId::from("f"), code_job("f", 1));

    let edges = vec![
        edge("e_true", "cond", "t", "condtrue", "default"),
        edge("e_false", "cond", "f", "condfalse", "default"),
    ];

    let mut outgoing = BTreeMap::new();
    outgoing.insert(NodeId::from("cond"), vec![0, 1]);
    let mut incoming = BTreeMap::new();
    incoming.insert(NodeId::from("t"), vec![0]);
    incoming.insert(NodeId::from("f"), vec![1]);

    Arc::new(ExecutableDiagram {
        nodes,
        edges,
        incoming_by_node: incoming,
        outgoing_by_node: outgoing,
        start_nodes: BTreeSet::new(),
        parent_of_condition: BTreeMap::new(),
        metadata: DiagramMetadata::default(),
    })
}

#[test]
fn condition_emits_on_exactly_one_branch() {
    let diagram = condition_diagram();
    let state = StateTracker::new();
    let tm = TokenManager::new(diagram, state);

    let mut outputs = HashMap::new();
    outputs.insert("condtrue".to_string(), env(json!(true), "cond"));
    tm.emit_outputs(&NodeId::from("cond"), &outputs, 0);

    assert!(tm.has_new_inputs(&NodeId::from("t"), None));
    assert!(!tm.has_new_inputs(&NodeId::from("f"), None));
    assert_eq!(tm.tokens_remaining(&ArrowId::from("e_true")), 1);
    assert_eq!(tm.tokens_remaining(&ArrowId::from("e_false")), 0);
}

#[test]
fn token_conservation_holds_across_emit_and_consume() {
    let diagram = condition_diagram();
    let state = StateTracker::new();
    let tm = TokenManager::new(diagram, state.clone());

    let mut outputs = HashMap::new();
    outputs.insert("condtrue".to_string(), env(json!(1), "cond"));
    tm.emit_outputs(&NodeId::from("cond"), &outputs, 0);
    assert_eq!(tm.tokens_remaining(&ArrowId::from("e_true")), 1);

    state.transition_to_running(&NodeId::from("t"), 0);
    let consumed = tm.consume_inbound(&NodeId::from("t"));
    assert_eq!(consumed.len(), 1);
    assert_eq!(tm.tokens_remaining(&ArrowId::from("e_true")), 0);
}

#[test]
fn epoch_is_monotonically_non_decreasing() {
    let diagram = condition_diagram();
    let tm = TokenManager::new(diagram, StateTracker::new());
    let e0 = tm.current_epoch();
    let e1 = tm.begin_epoch();
    let e2 = tm.begin_epoch();
    assert!(e1 > e0);
    assert!(e2 > e1);
}

/// S3 — PersonJob first-vs-default edge processing.
#[test]
fn person_job_processes_first_edge_only_on_first_firing() {
    let mut nodes = BTreeMap::new();
    nodes.insert(NodeId::from("p"), ExecutableNode {
        id: NodeId::from("p"),
        node_type: NodeType::PersonJob,
        config: NodeConfig::PersonJob { person_id: "assistant".into(), max_iteration: None, join_policy: None },
        topological_rank: 0,
    });
    nodes.insert(NodeId::from("src_first"), code_job("src_first", 0));
    nodes.insert(NodeId::from("src_default"), code_job("src_default", 0));

    let mut first_edge = edge("e_first", "src_first", "p", "default", "first");
    first_edge.runtime_hints.is_first_only = true;
    let default_edge = edge("e_default", "src_default", "p", "default", "default");

    let edges = vec![first_edge, default_edge];
    let mut incoming = BTreeMap::new();
    incoming.insert(NodeId::from("p"), vec![0, 1]);

    let diagram = Arc::new(ExecutableDiagram {
        nodes,
        edges,
        incoming_by_node: incoming,
        outgoing_by_node: BTreeMap::new(),
        start_nodes: BTreeSet::new(),
        parent_of_condition: BTreeMap::new(),
        metadata: DiagramMetadata::default(),
    });

    let state = StateTracker::new();
    let tm = TokenManager::new(diagram, state.clone());

    let mut a = HashMap::new();
    a.insert("default".to_string(), env(json!("A"), "src_first"));
    tm.emit_outputs(&NodeId::from("src_first"), &a, 0);
    let mut b = HashMap::new();
    b.insert("default".to_string(), env(json!("B"), "src_default"));
    tm.emit_outputs(&NodeId::from("src_default"), &b, 0);

    // `consume_inbound` reads `execution_count` to decide "first firing";
    // the engine always resolves inputs before transitioning to RUNNING
    // (see `dipeo_runtime::engine::Engine::dispatch_one`), so the test
    // mirrors that ordering rather than bumping the count first.
    let first_firing = tm.consume_inbound(&NodeId::from("p"));
    state.transition_to_running(&NodeId::from("p"), 0);
    assert_eq!(first_firing.get("first").unwrap().body, json!("A"));
    assert!(!first_firing.contains_key("default"));

    // second firing: feed "default" again, "first" queue stays empty.
    let mut b2 = HashMap::new();
    b2.insert("default".to_string(), env(json!("C"), "src_default"));
    tm.emit_outputs(&NodeId::from("src_default"), &b2, 1);
    let second_firing = tm.consume_inbound(&NodeId::from("p"));
    state.transition_to_running(&NodeId::from("p"), 1);
    assert_eq!(second_firing.get("default").unwrap().body, json!("C"));
    assert!(!second_firing.contains_key("first"));
}
