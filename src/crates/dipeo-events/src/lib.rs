//! # dipeo-events — Event Bus & Router (C6, spec §4.6)
//!
//! Every node transition and execution-level lifecycle change the engine
//! in `dipeo-runtime` produces is turned into an [`event::Event`] and
//! handed to the [`bus::EventBus`], which fans it out to subscribers
//! without ever blocking the engine. [`router::Router`] sits in front of
//! the bus with the application-facing surface: subscribe by execution id
//! or wildcard, replay a rolling window for a subscriber that attaches
//! late, and correlate `INTERACTIVE_PROMPT`/`INTERACTIVE_RESPONSE` pairs.
//! [`store::InMemoryMessageStore`] is an optional append-only persistence
//! layer for the same events, keyed by `(execution_id, sequence_no)`.
//!
//! This crate defines no transport (no WebSocket/SSE/GraphQL binding) —
//! that is left to whatever composes the `dipeo` binary with a concrete
//! I/O layer (spec §9 open question).
//!
//! ## Module Organization
//!
//! - [`event`] — `Event`, `EventType`, the wire shape every subscriber sees
//! - [`bus`] — `EventBus`, non-blocking fan-out with high-water-mark detach
//! - [`router`] — `Router`, subscription/replay/interactive-prompt surface
//! - [`store`] — `InMemoryMessageStore`, the optional persistence layer
//! - [`error`] — `EventsError`

pub mod bus;
pub mod error;
pub mod event;
pub mod router;
pub mod store;
pub mod version;

pub use bus::{EventBus, SubscriberId};
pub use error::{EventsError, Result};
pub use event::{Event, EventType};
pub use router::Router;
pub use store::InMemoryMessageStore;
