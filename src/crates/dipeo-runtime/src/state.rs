//! State Tracker (part of C5, spec §4.3): observes per-node transitions
//! for the UI. Never gates scheduling — only token presence does that.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dipeo_core::envelope::Envelope;
use dipeo_core::ids::NodeId;

use crate::error::RuntimeError;

/// Lifecycle status of one node within one execution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
    MaxiterReached,
    Paused,
    Aborted,
}

/// Per-node, per-execution observability record.
#[derive(Clone, Debug)]
pub struct NodeExecutionState {
    pub status: NodeStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub execution_count: u32,
    pub last_output: Option<Envelope>,
    pub error: Option<RuntimeError>,
    pub epoch: u64,
}

impl Default for NodeExecutionState {
    fn default() -> Self {
        Self {
            status: NodeStatus::Pending,
            started_at: None,
            ended_at: None,
            execution_count: 0,
            last_output: None,
            error: None,
            epoch: 0,
        }
    }
}

/// Tracks [`NodeExecutionState`] for every node in one execution. Cheap
/// to clone (shares the underlying map) so it can be handed to the event
/// bus layer alongside the engine without copying history.
#[derive(Clone, Default)]
pub struct StateTracker {
    nodes: std::sync::Arc<DashMap<NodeId, NodeExecutionState>>,
}

impl StateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, node: &NodeId) -> NodeExecutionState {
        self.nodes.get(node).map(|s| s.clone()).unwrap_or_default()
    }

    pub fn transition_to_running(&self, node: &NodeId, epoch: u64) {
        let mut entry = self.nodes.entry(node.clone()).or_default();
        entry.status = NodeStatus::Running;
        entry.started_at = Some(Utc::now());
        entry.execution_count += 1;
        entry.epoch = epoch;
    }

    pub fn transition_to_completed(&self, node: &NodeId, output: Option<Envelope>) {
        let mut entry = self.nodes.entry(node.clone()).or_default();
        entry.status = NodeStatus::Completed;
        entry.ended_at = Some(Utc::now());
        entry.last_output = output;
        entry.error = None;
    }

    pub fn transition_to_failed(&self, node: &NodeId, error: RuntimeError) {
        let mut entry = self.nodes.entry(node.clone()).or_default();
        entry.status = NodeStatus::Failed;
        entry.ended_at = Some(Utc::now());
        entry.error = Some(error);
    }

    pub fn transition_to_skipped(&self, node: &NodeId, _reason: &str) {
        let mut entry = self.nodes.entry(node.clone()).or_default();
        entry.status = NodeStatus::Skipped;
        entry.ended_at = Some(Utc::now());
    }

    pub fn transition_to_maxiter(&self, node: &NodeId) {
        let mut entry = self.nodes.entry(node.clone()).or_default();
        entry.status = NodeStatus::MaxiterReached;
        entry.ended_at = Some(Utc::now());
    }

    pub fn transition_to_aborted(&self, node: &NodeId) {
        let mut entry = self.nodes.entry(node.clone()).or_default();
        entry.status = NodeStatus::Aborted;
        entry.ended_at = Some(Utc::now());
    }

    pub fn execution_count(&self, node: &NodeId) -> u32 {
        self.nodes.get(node).map(|s| s.execution_count).unwrap_or(0)
    }

    pub fn failed_nodes(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|e| e.value().status == NodeStatus::Failed)
            .map(|e| e.key().clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_node_defaults_to_pending() {
        let tracker = StateTracker::new();
        assert_eq!(tracker.get(&NodeId::from("n1")).status, NodeStatus::Pending);
    }

    #[test]
    fn running_then_completed_clears_any_prior_error() {
        let tracker = StateTracker::new();
        let node = NodeId::from("n1");
        tracker.transition_to_running(&node, 0);
        tracker.transition_to_failed(&node, RuntimeError::Internal("boom".into()));
        tracker.transition_to_running(&node, 0);
        tracker.transition_to_completed(&node, None);
        let state = tracker.get(&node);
        assert_eq!(state.status, NodeStatus::Completed);
        assert!(state.error.is_none());
        assert_eq!(state.execution_count, 2);
    }

    #[test]
    fn failed_nodes_lists_only_failed_status() {
        let tracker = StateTracker::new();
        tracker.transition_to_running(&NodeId::from("ok"), 0);
        tracker.transition_to_completed(&NodeId::from("ok"), None);
        tracker.transition_to_running(&NodeId::from("bad"), 0);
        tracker.transition_to_failed(&NodeId::from("bad"), RuntimeError::Internal("x".into()));
        assert_eq!(tracker.failed_nodes(), vec![NodeId::from("bad")]);
    }
}
