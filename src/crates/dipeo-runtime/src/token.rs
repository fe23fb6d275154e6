//! Token Manager (C3, spec §4.2): the only mechanism by which readiness
//! is determined and values are transferred between nodes.
//!
//! Grounded on the teacher's `pregel::channel` (per-channel buffering) and
//! `pregel::algo` (readiness computed from multiple inbound triggers),
//! generalized from LangGraph's binary "channel has a value" readiness to
//! DiPeO's ordered-queue-with-epoch-tag readiness and pluggable join
//! policies.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dipeo_core::compiled::ExecutableDiagram;
use dipeo_core::domain::JoinPolicyKind;
use dipeo_core::envelope::Envelope;
use dipeo_core::ids::{ArrowId, NodeId};
use dipeo_core::node_types::NodeConfig;
use parking_lot::Mutex;

use crate::state::StateTracker;

/// An envelope placed on an edge, tagged with the epoch it was emitted in.
#[derive(Clone, Debug)]
pub struct Token {
    pub envelope: Envelope,
    pub epoch: u64,
}

#[derive(Default)]
struct EdgeQueue {
    tokens: VecDeque<Token>,
}

/// Owns every edge's token queue for one execution. Never shared across
/// executions (spec §5).
pub struct TokenManager {
    diagram: Arc<ExecutableDiagram>,
    queues: Vec<Mutex<EdgeQueue>>,
    current_epoch: AtomicU64,
    state: StateTracker,
}

impl TokenManager {
    pub fn new(diagram: Arc<ExecutableDiagram>, state: StateTracker) -> Self {
        let queues = diagram.edges.iter().map(|_| Mutex::new(EdgeQueue::default())).collect();
        Self { diagram, queues, current_epoch: AtomicU64::new(0), state }
    }

    pub fn current_epoch(&self) -> u64 {
        self.current_epoch.load(Ordering::SeqCst)
    }

    /// Begin a new loop iteration. Called by a loop-controlling condition
    /// node before re-seeding its body (spec §4.2).
    pub fn begin_epoch(&self) -> u64 {
        self.current_epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn join_policy(&self, node: &NodeId) -> JoinPolicyKind {
        match self.diagram.nodes.get(node).map(|n| &n.config) {
            Some(NodeConfig::PersonJob { join_policy: Some(p), .. }) => *p,
            Some(_) => self.diagram.nodes[node].node_type.default_join_policy(),
            None => JoinPolicyKind::All,
        }
    }

    /// Whether `node` is ready to fire. Nodes with no inbound edges
    /// (`START` nodes) are ready exactly once, on their first firing — the
    /// engine seeds their effective input directly rather than through a
    /// token queue (spec §4.5 "seed tokens on every outbound edge of every
    /// start node" presupposes the start node itself has already fired).
    pub fn has_new_inputs(&self, node: &NodeId, epoch_floor: Option<u64>) -> bool {
        let incoming = self.diagram.incoming_by_node.get(node);
        let Some(incoming) = incoming.filter(|e| !e.is_empty()) else {
            return self.state.execution_count(node) == 0;
        };

        let floor = epoch_floor.unwrap_or(0);
        let at_epoch = |idx: usize| -> bool {
            self.queues[idx].lock().tokens.iter().any(|t| t.epoch >= floor)
        };

        match self.join_policy(node) {
            JoinPolicyKind::All => incoming.iter().all(|&idx| at_epoch(idx)),
            JoinPolicyKind::Any | JoinPolicyKind::FirstOnly => incoming.iter().any(|&idx| at_epoch(idx)),
        }
    }

    /// Atomically remove exactly one token from every inbound edge whose
    /// join predicate is satisfied, keyed by target input port. Returns an
    /// empty map if the node was not actually ready.
    pub fn consume_inbound(&self, node: &NodeId) -> HashMap<String, Envelope> {
        let mut out = HashMap::new();
        let Some(incoming) = self.diagram.incoming_by_node.get(node) else { return out };

        let is_first_firing = self.state.execution_count(node) == 0;
        // The first-vs-default distinction only exists for a PersonJob
        // that actually has a `first`/`*_first`-labeled inbound edge; a
        // PersonJob wired with only `default` edges fires normally every
        // time (there is nothing to distinguish the first firing from).
        let applies_first_vs_default = matches!(
            self.diagram.nodes.get(node).map(|n| &n.config),
            Some(NodeConfig::PersonJob { .. })
        ) && incoming.iter().any(|&idx| self.diagram.edges[idx].runtime_hints.is_first_only);

        let ready_indices: Vec<usize> = match self.join_policy(node) {
            JoinPolicyKind::All => {
                if incoming.iter().all(|&idx| !self.queues[idx].lock().tokens.is_empty()) {
                    incoming.clone()
                } else {
                    Vec::new()
                }
            }
            JoinPolicyKind::Any => {
                if incoming.iter().any(|&idx| !self.queues[idx].lock().tokens.is_empty()) {
                    incoming.clone()
                } else {
                    Vec::new()
                }
            }
            JoinPolicyKind::FirstOnly => incoming.clone(),
        };

        if ready_indices.is_empty() {
            return out;
        }

        for idx in ready_indices {
            let edge = &self.diagram.edges[idx];

            // PersonJob's first-vs-default strategy (spec §4.4 layer 1):
            // the first firing processes only `first`/`*_first` edges;
            // later firings ignore those. Conversation-state edges are
            // always processed regardless of firing number. Every other
            // node type processes all ready edges on every firing.
            let skip = applies_first_vs_default
                && !edge.runtime_hints.is_conversation_state
                && edge.runtime_hints.is_first_only != is_first_firing;
            if skip {
                continue;
            }

            let mut queue = self.queues[idx].lock();
            if let Some(token) = queue.tokens.pop_front() {
                out.insert(edge.target_input_port.clone(), token.envelope);
            }
        }

        out
    }

    /// Push one token per outgoing edge whose source port matches an entry
    /// in `outputs`. Condition nodes emit on exactly one of
    /// `condtrue`/`condfalse` by only including that key in `outputs`.
    pub fn emit_outputs(&self, node: &NodeId, outputs: &HashMap<String, Envelope>, epoch: u64) {
        let Some(outgoing) = self.diagram.outgoing_by_node.get(node) else { return };

        for &idx in outgoing {
            let edge = &self.diagram.edges[idx];
            let envelope = outputs
                .get(&edge.source_output_port)
                .or_else(|| outputs.get("default"))
                .or_else(|| outputs.get("value"));
            if let Some(envelope) = envelope {
                self.queues[idx].lock().tokens.push_back(Token { envelope: envelope.clone(), epoch });
            }
        }
    }

    /// Total tokens currently buffered on one edge, keyed by [`ArrowId`]
    /// for diagnostics/tests (spec §8 property 2, token conservation).
    pub fn tokens_remaining(&self, arrow_id: &ArrowId) -> usize {
        self.diagram
            .edges
            .iter()
            .position(|e| &e.id == arrow_id)
            .map(|idx| self.queues[idx].lock().tokens.len())
            .unwrap_or(0)
    }
}
