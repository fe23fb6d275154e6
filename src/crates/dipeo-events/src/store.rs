//! The optional append-only `MessageStore` persistence layer (spec §4.6):
//! `(execution_id, sequence_no)`-keyed, queryable by range.
//!
//! Implements [`dipeo_core::ports::MessageStore`] — that trait lives in
//! `dipeo-core` rather than here specifically so this crate does not need
//! to depend back on `dipeo-core`'s callers; see that trait's doc comment.
//! Grounded on the teacher's `api::ws::replay::EventHistory`, generalized
//! from a capped rolling `VecDeque` to an unbounded `BTreeMap` keyed by
//! sequence number, since persistence (unlike the bus's replay window) has
//! no reason to forget old events.

use std::collections::BTreeMap;

use async_trait::async_trait;
use dipeo_core::error::CoreError;
use dipeo_core::ids::ExecutionId;
use dipeo_core::ports::MessageStore;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;

/// In-memory `MessageStore`. A durable implementation (sqlite, the
/// teacher's `sqlx` dependency, or similar) would satisfy the same trait;
/// this one exists so the engine can run end to end without a database.
#[derive(Default)]
pub struct InMemoryMessageStore {
    by_execution: DashMap<ExecutionId, Mutex<BTreeMap<u64, Value>>>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn append(&self, execution_id: &ExecutionId, sequence_no: u64, event_json: Value) -> Result<(), CoreError> {
        let entry = self.by_execution.entry(execution_id.clone()).or_insert_with(|| Mutex::new(BTreeMap::new()));
        entry.lock().insert(sequence_no, event_json);
        Ok(())
    }

    async fn query(&self, execution_id: &ExecutionId, from_seq: u64, to_seq: u64) -> Result<Vec<Value>, CoreError> {
        let Some(entry) = self.by_execution.get(execution_id) else { return Ok(Vec::new()) };
        let events = entry
            .lock()
            .range(from_seq..to_seq)
            .map(|(_, v)| v.clone())
            .collect();
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exec(id: &str) -> ExecutionId {
        ExecutionId::from(id)
    }

    #[tokio::test]
    async fn appended_events_are_queryable_by_range() {
        let store = InMemoryMessageStore::new();
        for seq in 1..=5u64 {
            store.append(&exec("e1"), seq, serde_json::json!({ "seq": seq })).await.unwrap();
        }

        let page = store.query(&exec("e1"), 2, 4).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0]["seq"], 2);
        assert_eq!(page[1]["seq"], 3);
    }

    #[tokio::test]
    async fn querying_an_unknown_execution_returns_empty() {
        let store = InMemoryMessageStore::new();
        let page = store.query(&exec("missing"), 0, 100).await.unwrap();
        assert!(page.is_empty());
    }

    #[tokio::test]
    async fn executions_do_not_share_sequence_space() {
        let store = InMemoryMessageStore::new();
        store.append(&exec("e1"), 1, serde_json::json!({ "e": "1" })).await.unwrap();
        store.append(&exec("e2"), 1, serde_json::json!({ "e": "2" })).await.unwrap();

        let e1 = store.query(&exec("e1"), 0, 10).await.unwrap();
        assert_eq!(e1.len(), 1);
        assert_eq!(e1[0]["e"], "1");
    }
}
