//! Event taxonomy (C6, spec §4.6): the wire shape every subscriber sees,
//! independent of transport.
//!
//! Grounded on the teacher's `api::ws::events::RealtimeEvent`/`EventPriority`
//! — generalized from a per-variant payload enum (one Rust shape per wire
//! message) to a single flat struct carrying an [`EventType`] tag plus a
//! generic `payload`, since the event taxonomy here names the payload's
//! *meaning* but deliberately leaves its schema to the node/error types that
//! already exist in `dipeo-core`/`dipeo-runtime` rather than re-typing them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use dipeo_core::ids::{ExecutionId, NodeId};

/// The kind of occurrence an [`Event`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "EXECUTION_STARTED")]
    ExecutionStarted,
    #[serde(rename = "EXECUTION_COMPLETED")]
    ExecutionCompleted,
    #[serde(rename = "EXECUTION_ERROR")]
    ExecutionError,
    #[serde(rename = "EXECUTION_ABORTED")]
    ExecutionAborted,
    #[serde(rename = "NODE_STARTED")]
    NodeStarted,
    #[serde(rename = "NODE_COMPLETED")]
    NodeCompleted,
    #[serde(rename = "NODE_ERROR")]
    NodeError,
    #[serde(rename = "NODE_OUTPUT")]
    NodeOutput,
    #[serde(rename = "EXECUTION_LOG")]
    ExecutionLog,
    #[serde(rename = "INTERACTIVE_PROMPT")]
    InteractivePrompt,
    #[serde(rename = "INTERACTIVE_RESPONSE")]
    InteractiveResponse,
    /// Diagnostic raised by the bus itself when a subscriber falls behind
    /// its high-water mark and is detached (spec §4.6, never part of a
    /// node's own lifecycle).
    #[serde(rename = "SUBSCRIBER_DROPPED")]
    SubscriberDropped,
}

impl EventType {
    /// Whether this event type terminates an execution's event stream —
    /// used by the router to know when a replay window can stop growing.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EventType::ExecutionCompleted | EventType::ExecutionError | EventType::ExecutionAborted)
    }
}

/// One event on an execution's stream (spec §4.6): `{type, execution_id,
/// node_id?, timestamp, payload, sequence_no}`. `sequence_no` is strictly
/// increasing per `execution_id` — the bus, not the caller, assigns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub execution_id: ExecutionId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,
    pub timestamp: DateTime<Utc>,
    pub payload: Value,
    pub sequence_no: u64,
}

impl Event {
    /// Construct an event with `sequence_no` left at `0`; [`crate::bus::EventBus::emit`]
    /// overwrites it with the next value for the execution before delivery.
    pub fn new(event_type: EventType, execution_id: ExecutionId, node_id: Option<NodeId>, payload: Value) -> Self {
        Self { event_type, execution_id, node_id, timestamp: Utc::now(), payload, sequence_no: 0 }
    }

    pub fn execution_started(execution_id: ExecutionId, payload: Value) -> Self {
        Self::new(EventType::ExecutionStarted, execution_id, None, payload)
    }

    pub fn execution_completed(execution_id: ExecutionId, payload: Value) -> Self {
        Self::new(EventType::ExecutionCompleted, execution_id, None, payload)
    }

    pub fn execution_error(execution_id: ExecutionId, payload: Value) -> Self {
        Self::new(EventType::ExecutionError, execution_id, None, payload)
    }

    pub fn execution_aborted(execution_id: ExecutionId, payload: Value) -> Self {
        Self::new(EventType::ExecutionAborted, execution_id, None, payload)
    }

    pub fn node_started(execution_id: ExecutionId, node_id: NodeId, payload: Value) -> Self {
        Self::new(EventType::NodeStarted, execution_id, Some(node_id), payload)
    }

    pub fn node_completed(execution_id: ExecutionId, node_id: NodeId, payload: Value) -> Self {
        Self::new(EventType::NodeCompleted, execution_id, Some(node_id), payload)
    }

    pub fn node_error(execution_id: ExecutionId, node_id: NodeId, payload: Value) -> Self {
        Self::new(EventType::NodeError, execution_id, Some(node_id), payload)
    }

    pub fn node_output(execution_id: ExecutionId, node_id: NodeId, payload: Value) -> Self {
        Self::new(EventType::NodeOutput, execution_id, Some(node_id), payload)
    }

    pub fn execution_log(execution_id: ExecutionId, payload: Value) -> Self {
        Self::new(EventType::ExecutionLog, execution_id, None, payload)
    }

    pub fn subscriber_dropped(execution_id: ExecutionId, reason: impl Into<String>) -> Self {
        Self::new(EventType::SubscriberDropped, execution_id, None, serde_json::json!({ "reason": reason.into() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_round_trips_through_json() {
        let json = serde_json::to_value(EventType::ExecutionCompleted).unwrap();
        assert_eq!(json, serde_json::json!("EXECUTION_COMPLETED"));
        let back: EventType = serde_json::from_value(json).unwrap();
        assert_eq!(back, EventType::ExecutionCompleted);
    }

    #[test]
    fn only_the_three_terminal_execution_events_are_terminal() {
        assert!(EventType::ExecutionCompleted.is_terminal());
        assert!(EventType::ExecutionError.is_terminal());
        assert!(EventType::ExecutionAborted.is_terminal());
        assert!(!EventType::NodeCompleted.is_terminal());
        assert!(!EventType::ExecutionStarted.is_terminal());
    }

    #[test]
    fn node_id_is_omitted_for_execution_scoped_events() {
        let event = Event::execution_started(ExecutionId::from("exec-1"), serde_json::json!({}));
        let json = serde_json::to_value(&event).unwrap();
        assert!(json.get("node_id").is_none());
    }
}
