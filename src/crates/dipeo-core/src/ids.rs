//! Typed string identifiers for every entity in a diagram.
//!
//! All identifiers are cheap-to-clone `Arc<str>` newtypes rather than bare
//! `String`s: the same id is copied into token buffers, adjacency indexes,
//! and event payloads many times over the life of one execution, and it is
//! never mutated in place.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Arc<str>);

        impl $name {
            /// Build an id from any string-like value.
            pub fn new(value: impl Into<Arc<str>>) -> Self {
                Self(value.into())
            }

            /// Borrow the id as a plain string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(Arc::from(value))
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(Arc::from(value.as_str()))
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        /// Lets a `BTreeMap<$name, _>`/`HashMap<$name, _>` be indexed or
        /// looked up with a bare `&str`.
        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(NodeId, "Identifier of a node within a diagram.");
string_id!(ArrowId, "Identifier of an arrow (edge) within a diagram.");
string_id!(HandleId, "Identifier of a handle; parseable into its parts, see [`HandleId::parse`].");
string_id!(PersonId, "Identifier of an LLM participant configuration.");
string_id!(ApiKeyId, "Identifier of a stored API key.");
string_id!(ExecutionId, "Identifier of a single diagram execution.");
string_id!(DiagramId, "Identifier of a diagram.");

/// Which side of a handle it sits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Input,
    Output,
}

/// Error parsing a [`HandleId`] back into its structural parts.
#[derive(Debug, thiserror::Error)]
#[error("malformed handle id '{0}': expected '<node_id>_<label>_<direction>'")]
pub struct HandleIdParseError(pub String);

/// The parsed structure of a [`HandleId`]: `"<NodeId>_<HandleLabel>_<Direction>"`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandleParts {
    pub node_id: NodeId,
    pub label: String,
    pub direction: Direction,
}

impl HandleId {
    /// Build the canonical handle id for a `(node, label, direction)` triple.
    pub fn build(node_id: &NodeId, label: &str, direction: Direction) -> Self {
        let dir = match direction {
            Direction::Input => "input",
            Direction::Output => "output",
        };
        Self::new(format!("{}_{}_{}", node_id.as_str(), label, dir))
    }

    /// Parse the id back into `(node_id, label, direction)`.
    ///
    /// The direction is always the final `_`-delimited segment and the node
    /// id is always the first; everything in between is the label (labels
    /// themselves may contain underscores, e.g. `condtrue`/`condfalse` never
    /// do, but custom labels might).
    pub fn parse(&self) -> Result<HandleParts, HandleIdParseError> {
        let raw = self.as_str();
        let (head, dir_str) = raw
            .rsplit_once('_')
            .ok_or_else(|| HandleIdParseError(raw.to_string()))?;
        let direction = match dir_str {
            "input" => Direction::Input,
            "output" => Direction::Output,
            _ => return Err(HandleIdParseError(raw.to_string())),
        };
        let (node_part, label) = head
            .split_once('_')
            .ok_or_else(|| HandleIdParseError(raw.to_string()))?;
        Ok(HandleParts {
            node_id: NodeId::from(node_part),
            label: label.to_string(),
            direction,
        })
    }
}
