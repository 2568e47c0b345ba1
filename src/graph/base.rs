//! The immutable-value graph and the store that swaps it atomically.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::{
    graph::{DeltaOp, GraphDelta},
    properties::{Node, NodeId},
};

/// A mapping `id → Node` with a maintained reverse index of resolved edges.
///
/// The graph is treated as a value: [`DocGraph::apply`] clones and returns a
/// new graph, it never mutates in place. The reverse index maps edge targets
/// (present in the graph or not) to the set of source ids holding a resolved
/// edge to them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocGraph {
    nodes: BTreeMap<NodeId, Node>,
    incoming: BTreeMap<NodeId, BTreeSet<NodeId>>,
}

impl DocGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_nodes<I: IntoIterator<Item = Node>>(nodes: I) -> Self {
        let mut graph = DocGraph::new();
        for node in nodes {
            graph.insert(node);
        }
        graph
    }

    pub fn get(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node ids in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.keys()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Source ids holding a resolved edge to `id`. O(k) via the reverse
    /// index; includes sources pointing at ids not present in the graph.
    pub fn incoming(&self, id: &NodeId) -> BTreeSet<NodeId> {
        self.incoming.get(id).cloned().unwrap_or_default()
    }

    /// Apply a delta in operation order, producing a new graph value.
    ///
    /// An `Upsert` whose `previous.id` differs from `node.id` removes the old
    /// key first (rename-by-replacement). Applying the same delta twice from
    /// the same starting graph yields the same result.
    pub fn apply(&self, delta: &GraphDelta) -> DocGraph {
        let mut next = self.clone();
        for op in delta.iter() {
            match op {
                DeltaOp::Upsert { node, previous } => {
                    if let Some(previous) = previous {
                        if previous.id != node.id {
                            next.remove(&previous.id);
                        }
                    }
                    next.insert(node.clone());
                }
                DeltaOp::Delete { id, .. } => {
                    next.remove(id);
                }
            }
        }
        next
    }

    fn insert(&mut self, node: Node) {
        if let Some(old) = self.nodes.get(&node.id) {
            let old_id = old.id.clone();
            let old_targets: Vec<NodeId> = old.resolved_targets().cloned().collect();
            for target in old_targets {
                self.unindex_edge(&old_id, &target);
            }
        }
        for target in node.resolved_targets() {
            self.incoming
                .entry(target.clone())
                .or_default()
                .insert(node.id.clone());
        }
        self.nodes.insert(node.id.clone(), node);
    }

    fn remove(&mut self, id: &NodeId) -> Option<Node> {
        let node = self.nodes.remove(id)?;
        let targets: Vec<NodeId> = node.resolved_targets().cloned().collect();
        for target in targets {
            self.unindex_edge(id, &target);
        }
        Some(node)
    }

    fn unindex_edge(&mut self, source: &NodeId, target: &NodeId) {
        if let Some(sources) = self.incoming.get_mut(target) {
            sources.remove(source);
            if sources.is_empty() {
                self.incoming.remove(target);
            }
        }
    }
}

impl PartialEq for DocGraph {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes
    }
}

/// Single owned holder of the current graph value.
///
/// Delta application computes an entirely new graph before the reference is
/// swapped, so observers never see partial-delta state. All mutation funnels
/// through [`GraphStore::apply`]; there is no ambient global state.
#[derive(Debug, Default)]
pub struct GraphStore {
    current: RwLock<Arc<DocGraph>>,
}

impl GraphStore {
    pub fn new(graph: DocGraph) -> Self {
        GraphStore {
            current: RwLock::new(Arc::new(graph)),
        }
    }

    /// The current graph value.
    pub fn graph(&self) -> Arc<DocGraph> {
        self.current.read().clone()
    }

    /// Apply a delta and swap in the resulting graph, returning it.
    pub fn apply(&self, delta: &GraphDelta) -> Arc<DocGraph> {
        let mut guard = self.current.write();
        let next = Arc::new(guard.apply(delta));
        *guard = next.clone();
        next
    }
}
