//! The universal message container passed between nodes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::ContentType;
use crate::ids::{ExecutionId, NodeId};

/// An immutable message produced by a node firing (or seeded at a start
/// node). Once constructed an envelope is never mutated; alternate
/// representations are added via [`Envelope::with_representation`], which
/// returns a new value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub body: Value,
    pub produced_by: NodeId,
    pub trace_id: ExecutionId,
    pub content_type: ContentType,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub representations: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, Value>,
}

impl Envelope {
    pub fn new(body: Value, produced_by: NodeId, trace_id: ExecutionId, content_type: ContentType) -> Self {
        Self {
            body,
            produced_by,
            trace_id,
            content_type,
            representations: BTreeMap::new(),
            meta: BTreeMap::new(),
        }
    }

    /// Return a copy with `key` bound to `value` among the alternate
    /// representations. Re-adding a representation already present under
    /// the same key with the same value is a no-op clone (idempotent, per
    /// spec's round-trip law on representations).
    pub fn with_representation(&self, key: impl Into<String>, value: Value) -> Self {
        let mut next = self.clone();
        next.representations.insert(key.into(), value);
        next
    }

    /// Look up an alternate representation by key, falling back to `body`
    /// when the key is absent.
    pub fn representation(&self, key: &str) -> &Value {
        self.representations.get(key).unwrap_or(&self.body)
    }

    pub fn with_meta(&self, key: impl Into<String>, value: Value) -> Self {
        let mut next = self.clone();
        next.meta.insert(key.into(), value);
        next
    }

    /// Return a copy with `body` replaced by `value`. Used when an input
    /// resolver's transform pipeline produces a new value that downstream
    /// handlers must observe as the envelope's body, not merely as an
    /// alternate representation.
    pub fn with_body(&self, value: Value) -> Self {
        let mut next = self.clone();
        next.body = value;
        next
    }
}
