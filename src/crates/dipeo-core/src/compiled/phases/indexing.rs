//! Phase 5 — INDEXING: build adjacency maps, the start-node set, the
//! parent-of-condition map, and topological ranks for the ordering policy
//! (spec §4.1, §4.5).

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::compiled::phases::connection_resolution::ResolvedEdge;
use crate::compiled::types::Diagnostic;
use crate::domain::{DomainDiagram, NodeType};
use crate::ids::NodeId;

pub struct IndexingOutput {
    pub incoming_by_node: BTreeMap<NodeId, Vec<usize>>,
    pub outgoing_by_node: BTreeMap<NodeId, Vec<usize>>,
    pub start_nodes: BTreeSet<NodeId>,
    pub parent_of_condition: BTreeMap<NodeId, NodeId>,
    pub topological_rank: BTreeMap<NodeId, u32>,
}

pub fn run(diagram: &DomainDiagram, edges: &[ResolvedEdge]) -> (IndexingOutput, Vec<Diagnostic>) {
    let mut incoming_by_node: BTreeMap<NodeId, Vec<usize>> = BTreeMap::new();
    let mut outgoing_by_node: BTreeMap<NodeId, Vec<usize>> = BTreeMap::new();

    for (i, edge) in edges.iter().enumerate() {
        incoming_by_node.entry(edge.target_node.clone()).or_default().push(i);
        outgoing_by_node.entry(edge.source_node.clone()).or_default().push(i);
    }

    let start_nodes: BTreeSet<NodeId> = diagram
        .nodes
        .values()
        .filter(|n| n.node_type == NodeType::Start)
        .map(|n| n.id.clone())
        .collect();

    let mut parent_of_condition = BTreeMap::new();
    for node in diagram.nodes.values().filter(|n| n.node_type == NodeType::Condition) {
        for &idx in outgoing_by_node.get(&node.id).into_iter().flatten() {
            parent_of_condition.insert(edges[idx].target_node.clone(), node.id.clone());
        }
    }

    let mut topological_rank = breadth_first_ranks(&outgoing_by_node, &start_nodes, edges);

    let mut diags = Vec::new();
    for node in diagram.nodes.values() {
        if node.node_type != NodeType::Start && !topological_rank.contains_key(&node.id) {
            diags.push(
                Diagnostic::warning("W_UNREACHABLE_NODE", "node is not reachable from any START node")
                    .at_node(node.id.clone()),
            );
        }
    }

    // Pure cycle islands with no start-reachable entry still need a rank
    // so the ordering policy has something to compare.
    let fallback = topological_rank.values().copied().max().unwrap_or(0) + 1;
    for node in diagram.nodes.values() {
        topological_rank.entry(node.id.clone()).or_insert(fallback);
    }

    (
        IndexingOutput { incoming_by_node, outgoing_by_node, start_nodes, parent_of_condition, topological_rank },
        diags,
    )
}

fn breadth_first_ranks(
    outgoing_by_node: &BTreeMap<NodeId, Vec<usize>>,
    start_nodes: &BTreeSet<NodeId>,
    edges: &[ResolvedEdge],
) -> BTreeMap<NodeId, u32> {
    let mut rank: BTreeMap<NodeId, u32> = BTreeMap::new();
    let mut queue: VecDeque<NodeId> = VecDeque::new();

    for id in start_nodes {
        rank.insert(id.clone(), 0);
        queue.push_back(id.clone());
    }

    while let Some(current) = queue.pop_front() {
        let current_rank = rank[&current];
        for &idx in outgoing_by_node.get(&current).into_iter().flatten() {
            let target = &edges[idx].target_node;
            if !rank.contains_key(target) {
                rank.insert(target.clone(), current_rank + 1);
                queue.push_back(target.clone());
            }
        }
    }

    rank
}
