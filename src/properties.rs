//! Core value types for the document graph.
//!
//! A [`Node`] is backed 1:1 by a text document in the vault. Its identity is
//! the document's relative path ([`NodeId`]), its outgoing [`Edge`]s are the
//! cross-references extracted from the document body, and its [`NodeMeta`]
//! carries the typed header fields plus an opaque passthrough map for
//! everything the header block contains that we do not interpret.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::codec::strip_doc_extension;

/// Relative path of a document within the vault, used as stable node identity.
///
/// Always stored with `/` separators and including the document extension,
/// e.g. `notes/topic.md`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        NodeId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path segments of this id, with the managed extension stripped from the
    /// final segment. Used by suffix matching.
    pub fn segments(&self) -> Vec<&str> {
        let mut segments: Vec<&str> = self.0.split('/').filter(|s| !s.is_empty()).collect();
        if let Some(last) = segments.last_mut() {
            *last = strip_doc_extension(last);
        }
        segments
    }

    /// Derive a NodeId from a filesystem path relative to the vault root.
    pub fn from_relative_path(path: &Path) -> Self {
        let joined = path
            .components()
            .filter_map(|c| c.as_os_str().to_str())
            .collect::<Vec<&str>>()
            .join("/");
        NodeId(joined)
    }

    /// The final path segment without the managed extension, e.g. `topic` for
    /// `notes/topic.md`.
    pub fn stem(&self) -> &str {
        let tail = self.0.rsplit('/').next().unwrap_or(&self.0);
        strip_doc_extension(tail)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        NodeId(s.to_string())
    }
}

/// Current resolution state of an edge's reference.
///
/// The raw reference text is always retained on the [`Edge`] so resolution
/// can be re-attempted whenever the id set changes; this variant only records
/// the current outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum EdgeTarget {
    Resolved(NodeId),
    #[default]
    Unresolved,
}

impl EdgeTarget {
    pub fn resolved_id(&self) -> Option<&NodeId> {
        match self {
            EdgeTarget::Resolved(id) => Some(id),
            EdgeTarget::Unresolved => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, EdgeTarget::Resolved(_))
    }
}

/// A directed, labeled edge extracted from a document cross-reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// The reference text as written in the document, stored verbatim.
    pub reference: String,
    /// Current resolution of `reference` against the graph's id set.
    pub target: EdgeTarget,
    /// Plain text preceding the reference on the same line, trimmed. Empty
    /// when the reference stood alone.
    pub label: String,
}

impl Edge {
    pub fn unresolved(reference: impl Into<String>, label: impl Into<String>) -> Self {
        Edge {
            reference: reference.into(),
            target: EdgeTarget::Unresolved,
            label: label.into(),
        }
    }

    pub fn resolved(target: NodeId, label: impl Into<String>) -> Self {
        Edge {
            reference: target.0.clone(),
            target: EdgeTarget::Resolved(target),
            label: label.into(),
        }
    }

    pub fn points_to(&self, id: &NodeId) -> bool {
        self.target.resolved_id() == Some(id)
    }
}

/// 2D canvas position carried through from the header block.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Typed header metadata plus an opaque passthrough map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct NodeMeta {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default)]
    pub is_context_node: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contained_node_ids: Option<Vec<NodeId>>,
    /// Unrecognized header fields, values serialized to their string form.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

/// A graph vertex backed by one text document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    /// Body text with cross-reference markup rewritten to the display-safe
    /// form; never re-scanned for references.
    pub content: String,
    /// Ordered outgoing edges. Order is meaningful and preserved.
    pub edges: Vec<Edge>,
    pub meta: NodeMeta,
}

impl Node {
    pub fn new(id: NodeId, title: impl Into<String>, content: impl Into<String>) -> Self {
        Node {
            id,
            content: content.into(),
            edges: Vec::new(),
            meta: NodeMeta {
                title: title.into(),
                ..Default::default()
            },
        }
    }

    /// Resolved outgoing edge targets, in edge order.
    pub fn resolved_targets(&self) -> impl Iterator<Item = &NodeId> {
        self.edges.iter().filter_map(|e| e.target.resolved_id())
    }

    pub fn has_unresolved_edges(&self) -> bool {
        self.edges.iter().any(|e| !e.target.is_resolved())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_segments_strip_extension() {
        let id = NodeId::new("notes/deep/topic.md");
        assert_eq!(id.segments(), vec!["notes", "deep", "topic"]);
        assert_eq!(id.stem(), "topic");
    }

    #[test]
    fn node_id_from_relative_path_uses_forward_slashes() {
        let id = NodeId::from_relative_path(Path::new("a/b/c.md"));
        assert_eq!(id.as_str(), "a/b/c.md");
    }

    #[test]
    fn edge_resolution_state() {
        let e = Edge::unresolved("topic", "extends");
        assert!(!e.target.is_resolved());
        let r = Edge::resolved(NodeId::new("notes/topic.md"), "extends");
        assert!(r.points_to(&NodeId::new("notes/topic.md")));
    }
}
