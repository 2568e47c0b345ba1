//! Graph deltas: ordered operation lists with structural reversal.

use serde::{Deserialize, Serialize};

use crate::properties::{Node, NodeId};

/// One graph mutation. Snapshot fields (`previous`, `removed`) exist solely
/// to make the operation reversible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DeltaOp {
    Upsert {
        node: Node,
        previous: Option<Node>,
    },
    Delete {
        id: NodeId,
        removed: Option<Node>,
    },
}

impl DeltaOp {
    /// Structural reverse of a single operation.
    ///
    /// Upsert/previous roles swap so repeated undo/redo toggling is stable.
    /// A `Delete` without a snapshot cannot be reversed; it is logged and
    /// dropped rather than failing the whole delta.
    pub fn reverse(&self) -> Option<DeltaOp> {
        match self {
            DeltaOp::Upsert {
                node,
                previous: None,
            } => Some(DeltaOp::Delete {
                id: node.id.clone(),
                removed: Some(node.clone()),
            }),
            DeltaOp::Upsert {
                node,
                previous: Some(previous),
            } => Some(DeltaOp::Upsert {
                node: previous.clone(),
                previous: Some(node.clone()),
            }),
            DeltaOp::Delete {
                id: _,
                removed: Some(removed),
            } => Some(DeltaOp::Upsert {
                node: removed.clone(),
                previous: None,
            }),
            DeltaOp::Delete { id, removed: None } => {
                tracing::warn!("Delete of {} carries no snapshot, dropping from reversal", id);
                None
            }
        }
    }

    /// The node id this operation touches.
    pub fn node_id(&self) -> &NodeId {
        match self {
            DeltaOp::Upsert { node, .. } => &node.id,
            DeltaOp::Delete { id, .. } => id,
        }
    }
}

/// An ordered list of operations describing one graph transition. Consumers
/// must apply operations in list order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GraphDelta(pub Vec<DeltaOp>);

impl GraphDelta {
    pub fn new() -> Self {
        GraphDelta(Vec::new())
    }

    pub fn push(&mut self, op: DeltaOp) {
        self.0.push(op);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn ops(&self) -> &[DeltaOp] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DeltaOp> {
        self.0.iter()
    }

    /// Reverse the delta as a unit: operations are reversed individually and
    /// emitted in reverse list order, so multi-operation actions undo through
    /// consistent intermediate states.
    pub fn reverse(&self) -> GraphDelta {
        GraphDelta(self.0.iter().rev().filter_map(DeltaOp::reverse).collect())
    }
}

impl IntoIterator for GraphDelta {
    type Item = DeltaOp;
    type IntoIter = std::vec::IntoIter<DeltaOp>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<DeltaOp> for GraphDelta {
    fn from_iter<T: IntoIterator<Item = DeltaOp>>(iter: T) -> Self {
        GraphDelta(iter.into_iter().collect())
    }
}
