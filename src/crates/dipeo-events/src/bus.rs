//! The Event Bus (C6, spec §4.6): assigns each event a per-execution
//! sequence number and fans it out to every matching subscriber without
//! ever blocking the producer.
//!
//! Grounded on the teacher's `api::ws::backpressure::{ClientBackpressure,
//! BackpressureManager}` — a bounded per-client queue with drop-on-full
//! semantics. Generalized two ways: the hand-rolled `VecDeque` + atomic
//! counters become a `tokio::sync::mpsc` bounded channel (its `try_send`
//! is already the non-blocking bounded-queue primitive the teacher built
//! by hand), and "drop the oldest queued message" becomes "detach the
//! whole subscriber" — spec §4.6 calls for slowest-subscriber detachment,
//! not silent message loss within an otherwise-live subscription.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use dipeo_core::ids::ExecutionId;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::warn;

use crate::event::{Event, EventType};

/// Opaque handle identifying one subscriber across `subscribe`/`unsubscribe`.
pub type SubscriberId = u64;

struct Subscriber {
    /// `None` subscribes to every execution (spec §4.6 "wildcard").
    execution_filter: Option<ExecutionId>,
    sender: mpsc::Sender<Event>,
}

/// Non-blocking, in-process fan-out of [`Event`]s to bounded per-subscriber
/// queues. Never shared across processes — a transport binding (SSE,
/// WebSocket, GraphQL subscriptions) would sit in front of this and is
/// deliberately out of scope here (spec §9 open question).
pub struct EventBus {
    subscribers: DashMap<SubscriberId, Subscriber>,
    next_subscriber_id: AtomicU64,
    sequence: DashMap<ExecutionId, AtomicU64>,
    /// Per-subscriber channel capacity; the high-water mark spec §4.6
    /// requires before a subscriber is detached.
    high_water_mark: usize,
}

impl EventBus {
    pub fn new(high_water_mark: usize) -> Self {
        Self {
            subscribers: DashMap::new(),
            next_subscriber_id: AtomicU64::new(1),
            sequence: DashMap::new(),
            high_water_mark: high_water_mark.max(1),
        }
    }

    /// Subscribe to one execution's events, or every execution if
    /// `execution_id` is `None`.
    pub fn subscribe(&self, execution_id: Option<ExecutionId>) -> (SubscriberId, ReceiverStream<Event>) {
        let id = self.next_subscriber_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(self.high_water_mark);
        self.subscribers.insert(id, Subscriber { execution_filter: execution_id, sender: tx });
        (id, ReceiverStream::new(rx))
    }

    pub fn unsubscribe(&self, subscriber_id: SubscriberId) {
        self.subscribers.remove(&subscriber_id);
    }

    fn next_sequence(&self, execution_id: &ExecutionId) -> u64 {
        self.sequence
            .entry(execution_id.clone())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::SeqCst)
            + 1
    }

    /// Stamp `event` with the next sequence number for its execution and
    /// deliver it to every matching, live subscriber. Never blocks: a
    /// subscriber whose queue is already at `high_water_mark` is detached
    /// instead of stalling every other subscriber or the caller.
    pub fn emit(&self, mut event: Event) -> Event {
        event.sequence_no = self.next_sequence(&event.execution_id);
        self.deliver(&event);
        event
    }

    fn deliver(&self, event: &Event) {
        let mut dropped = Vec::new();
        for entry in self.subscribers.iter() {
            let matches = match &entry.execution_filter {
                None => true,
                Some(filter) => filter == &event.execution_id,
            };
            if !matches {
                continue;
            }
            if entry.sender.try_send(event.clone()).is_err() {
                dropped.push(*entry.key());
            }
        }

        for id in dropped {
            self.subscribers.remove(&id);
            warn!(subscriber_id = id, execution_id = %event.execution_id, "subscriber exceeded high-water mark, detaching");
            if event.event_type != EventType::SubscriberDropped {
                let diagnostic = Event::subscriber_dropped(event.execution_id.clone(), "high-water mark exceeded");
                self.emit(diagnostic);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::StreamExt;

    fn exec(id: &str) -> ExecutionId {
        ExecutionId::from(id)
    }

    #[tokio::test]
    async fn subscriber_receives_events_for_its_execution_only() {
        let bus = EventBus::new(8);
        let (_id, mut stream) = bus.subscribe(Some(exec("e1")));

        bus.emit(Event::execution_started(exec("e1"), serde_json::json!({})));
        bus.emit(Event::execution_started(exec("e2"), serde_json::json!({})));

        let received = stream.next().await.unwrap();
        assert_eq!(received.execution_id, exec("e1"));
        assert!(tokio::time::timeout(std::time::Duration::from_millis(20), stream.next()).await.is_err());
    }

    #[tokio::test]
    async fn wildcard_subscriber_receives_every_execution() {
        let bus = EventBus::new(8);
        let (_id, mut stream) = bus.subscribe(None);

        bus.emit(Event::execution_started(exec("e1"), serde_json::json!({})));
        bus.emit(Event::execution_started(exec("e2"), serde_json::json!({})));

        assert_eq!(stream.next().await.unwrap().execution_id, exec("e1"));
        assert_eq!(stream.next().await.unwrap().execution_id, exec("e2"));
    }

    #[tokio::test]
    async fn sequence_numbers_are_strictly_increasing_per_execution() {
        let bus = EventBus::new(8);
        let (_id, mut stream) = bus.subscribe(Some(exec("e1")));

        for _ in 0..5 {
            bus.emit(Event::execution_log(exec("e1"), serde_json::json!({})));
        }

        let mut last = 0;
        for _ in 0..5 {
            let event = stream.next().await.unwrap();
            assert!(event.sequence_no > last);
            last = event.sequence_no;
        }
    }

    #[tokio::test]
    async fn a_subscriber_past_its_high_water_mark_is_detached_not_blocking() {
        let bus = EventBus::new(2);
        let (id, _stream) = bus.subscribe(Some(exec("e1")));

        // Fill the subscriber's queue past capacity; emit() must never
        // block or panic, even though nothing is reading `_stream`.
        for _ in 0..10 {
            bus.emit(Event::execution_log(exec("e1"), serde_json::json!({})));
        }

        assert!(!bus.subscribers.contains_key(&id));
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery() {
        let bus = EventBus::new(8);
        let (id, mut stream) = bus.subscribe(Some(exec("e1")));
        bus.unsubscribe(id);

        bus.emit(Event::execution_log(exec("e1"), serde_json::json!({})));
        assert!(tokio::time::timeout(std::time::Duration::from_millis(20), stream.next()).await.is_err());
    }
}
