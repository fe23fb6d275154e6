//! The Router (C6, spec §4.6): the subscription API surface applications
//! use in front of the [`EventBus`] — replay-on-subscribe and the
//! request/response correlation `interactive_prompt` needs.
//!
//! Grounded on the teacher's `api::ws::replay::{EventHistory, ReplayCriteria}`
//! (the rolling per-client history buffer) and `api::ws::filters::FilterManager`
//! (subscription scoping), generalized from per-client WebSocket bookkeeping
//! to a per-execution rolling window shared by every subscriber of that
//! execution.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use dipeo_core::ids::{ExecutionId, NodeId};
use futures::stream::{self, Stream, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::bus::EventBus;
use crate::error::{EventsError, Result};
use crate::event::{Event, EventType};

/// One execution's rolling replay window, guarded by a single lock so
/// `emit` (append) and `subscribe` (snapshot-then-attach) never interleave
/// for that execution — a late subscriber sees every event exactly once.
struct History {
    window: Mutex<VecDeque<Event>>,
    capacity: usize,
}

impl History {
    fn new(capacity: usize) -> Self {
        Self { window: Mutex::new(VecDeque::with_capacity(capacity)), capacity }
    }
}

/// Fronts an [`EventBus`] with replay-on-subscribe and interactive
/// prompt/response correlation. This is the surface spec §4.6 names:
/// `subscribe`, `execution_logs`, `interactive_prompt`.
pub struct Router {
    bus: Arc<EventBus>,
    history: DashMap<ExecutionId, Arc<History>>,
    replay_window: usize,
    pending_prompts: DashMap<(ExecutionId, String), oneshot::Sender<Value>>,
    next_prompt_id: AtomicU64,
}

impl Router {
    pub fn new(bus: Arc<EventBus>, replay_window: usize) -> Self {
        Self {
            bus,
            history: DashMap::new(),
            replay_window: replay_window.max(1),
            pending_prompts: DashMap::new(),
            next_prompt_id: AtomicU64::new(1),
        }
    }

    fn history_for(&self, execution_id: &ExecutionId) -> Arc<History> {
        self.history.entry(execution_id.clone()).or_insert_with(|| Arc::new(History::new(self.replay_window))).clone()
    }

    /// Assign the event its sequence number, deliver it to live
    /// subscribers, and append it to its execution's replay window.
    pub fn emit(&self, event: Event) -> Event {
        let history = self.history_for(&event.execution_id);
        let mut window = history.window.lock();
        let stamped = self.bus.emit(event);
        window.push_back(stamped.clone());
        if window.len() > history.capacity {
            window.pop_front();
        }
        stamped
    }

    /// Subscribe to one execution (replaying its buffered window first) or
    /// to every execution (no replay — spec's rolling window is scoped per
    /// execution, not global).
    pub fn subscribe(&self, execution_id: Option<ExecutionId>) -> impl Stream<Item = Event> {
        match execution_id {
            Some(id) => {
                let history = self.history_for(&id);
                let window = history.window.lock();
                let replay: Vec<Event> = window.iter().cloned().collect();
                let (_subscriber_id, live) = self.bus.subscribe(Some(id));
                drop(window);
                stream::iter(replay).chain(live).boxed()
            }
            None => {
                let (_subscriber_id, live) = self.bus.subscribe(None);
                live.boxed()
            }
        }
    }

    /// The `EXECUTION_LOG` subset of one execution's stream.
    pub fn execution_logs(&self, execution_id: ExecutionId) -> impl Stream<Item = Event> {
        self.subscribe(Some(execution_id)).filter(|e| futures::future::ready(e.event_type == EventType::ExecutionLog))
    }

    /// Emit an `INTERACTIVE_PROMPT` event and await the matching
    /// `INTERACTIVE_RESPONSE` (spec §4.6). The prompt id correlating the
    /// two is opaque to callers — they only see the resolved payload.
    pub async fn interactive_prompt(&self, execution_id: ExecutionId, node_id: NodeId, prompt: Value) -> Result<Value> {
        let prompt_id = self.next_prompt_id.fetch_add(1, Ordering::SeqCst).to_string();
        let (tx, rx) = oneshot::channel();
        self.pending_prompts.insert((execution_id.clone(), prompt_id.clone()), tx);

        self.emit(Event::new(
            EventType::InteractivePrompt,
            execution_id.clone(),
            Some(node_id),
            serde_json::json!({ "prompt_id": prompt_id, "prompt": prompt }),
        ));

        rx.await.map_err(|_| EventsError::ExecutionEndedWithoutResponse(execution_id))
    }

    /// Deliver a caller's answer to a pending [`Router::interactive_prompt`]
    /// and emit the matching `INTERACTIVE_RESPONSE` event.
    pub fn respond_to_prompt(&self, execution_id: ExecutionId, prompt_id: String, response: Value) -> Result<()> {
        let key = (execution_id.clone(), prompt_id.clone());
        let Some((_, sender)) = self.pending_prompts.remove(&key) else {
            return Err(EventsError::UnknownPrompt(prompt_id, execution_id));
        };

        self.emit(Event::new(
            EventType::InteractiveResponse,
            execution_id,
            None,
            serde_json::json!({ "prompt_id": prompt_id, "response": response.clone() }),
        ));

        let _ = sender.send(response);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::StreamExt as TokioStreamExt;

    fn exec(id: &str) -> ExecutionId {
        ExecutionId::from(id)
    }

    #[tokio::test]
    async fn late_subscriber_replays_the_buffered_window() {
        let router = Router::new(Arc::new(EventBus::new(16)), 10);
        router.emit(Event::execution_started(exec("e1"), serde_json::json!({})));
        router.emit(Event::execution_log(exec("e1"), serde_json::json!({"line": 1})));

        let mut stream = Box::pin(router.subscribe(Some(exec("e1"))));
        let first = TokioStreamExt::next(&mut stream).await.unwrap();
        let second = TokioStreamExt::next(&mut stream).await.unwrap();
        assert_eq!(first.event_type, EventType::ExecutionStarted);
        assert_eq!(second.event_type, EventType::ExecutionLog);
    }

    #[tokio::test]
    async fn replay_window_is_bounded() {
        let router = Router::new(Arc::new(EventBus::new(64)), 2);
        for i in 0..5 {
            router.emit(Event::execution_log(exec("e1"), serde_json::json!({ "i": i })));
        }

        let mut stream = Box::pin(router.subscribe(Some(exec("e1"))));
        let first = TokioStreamExt::next(&mut stream).await.unwrap();
        assert_eq!(first.payload["i"], 3);
    }

    #[tokio::test]
    async fn execution_logs_filters_out_other_event_types() {
        let router = Router::new(Arc::new(EventBus::new(16)), 10);
        router.emit(Event::execution_started(exec("e1"), serde_json::json!({})));
        router.emit(Event::execution_log(exec("e1"), serde_json::json!({"line": 1})));

        let mut logs = Box::pin(router.execution_logs(exec("e1")));
        let only = TokioStreamExt::next(&mut logs).await.unwrap();
        assert_eq!(only.event_type, EventType::ExecutionLog);
    }

    #[tokio::test]
    async fn interactive_prompt_resolves_once_answered() {
        let router = Arc::new(Router::new(Arc::new(EventBus::new(16)), 10));
        let mut prompts = Box::pin(router.subscribe(Some(exec("e1"))));

        let waiting = {
            let router = router.clone();
            tokio::spawn(async move { router.interactive_prompt(exec("e1"), NodeId::from("n1"), serde_json::json!("pick one")).await })
        };

        let prompt_event = TokioStreamExt::next(&mut prompts).await.unwrap();
        assert_eq!(prompt_event.event_type, EventType::InteractivePrompt);
        let prompt_id = prompt_event.payload["prompt_id"].as_str().unwrap().to_string();

        router.respond_to_prompt(exec("e1"), prompt_id, serde_json::json!("b")).unwrap();
        let resolved = waiting.await.unwrap().unwrap();
        assert_eq!(resolved, serde_json::json!("b"));
    }

    #[tokio::test]
    async fn responding_to_an_unknown_prompt_errors() {
        let router = Router::new(Arc::new(EventBus::new(16)), 10);
        let err = router.respond_to_prompt(exec("e1"), "nope".into(), serde_json::json!(null));
        assert!(err.is_err());
    }
}
