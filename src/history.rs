//! Linear undo/redo over graph deltas.
//!
//! The manager stores applied deltas; undoing reverses them structurally, so
//! there is no separate inverse-command bookkeeping. History is linear:
//! recording a new action discards any redoable future.

use crate::graph::GraphDelta;

#[derive(Debug, Default)]
pub struct History {
    undo_stack: Vec<GraphDelta>,
    redo_stack: Vec<GraphDelta>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a delta that was just applied. Clears the redo stack.
    pub fn record(&mut self, delta: GraphDelta) {
        if delta.is_empty() {
            return;
        }
        self.undo_stack.push(delta);
        self.redo_stack.clear();
    }

    /// Pop the most recent action and return the delta that undoes it.
    ///
    /// The caller applies the returned delta. An empty history returns an
    /// empty delta.
    pub fn undo(&mut self) -> GraphDelta {
        match self.undo_stack.pop() {
            Some(delta) => {
                let reversed = delta.reverse();
                self.redo_stack.push(delta);
                reversed
            }
            None => {
                tracing::warn!("Undo requested with empty history");
                GraphDelta::new()
            }
        }
    }

    /// Re-apply the most recently undone action, returning its forward delta.
    pub fn redo(&mut self) -> GraphDelta {
        match self.redo_stack.pop() {
            Some(delta) => {
                self.undo_stack.push(delta.clone());
                delta
            }
            None => {
                tracing::warn!("Redo requested with empty redo stack");
                GraphDelta::new()
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{upsert_node, DocGraph};
    use crate::properties::{Node, NodeId};

    fn doc(id: &str, content: &str) -> Node {
        Node::new(NodeId::new(id), id, content)
    }

    #[test]
    fn undo_then_redo_restores_both_states() {
        let mut history = History::new();
        let empty = DocGraph::new();

        let delta = upsert_node(&empty, doc("a.md", "first"));
        let after = empty.apply(&delta);
        history.record(delta);

        let undone = after.apply(&history.undo());
        assert_eq!(undone, empty);

        let redone = undone.apply(&history.redo());
        assert_eq!(redone, after);
    }

    #[test]
    fn record_clears_redo() {
        let mut history = History::new();
        let empty = DocGraph::new();

        let first = upsert_node(&empty, doc("a.md", "first"));
        let graph = empty.apply(&first);
        history.record(first);
        history.undo();
        assert!(history.can_redo());

        history.record(upsert_node(&graph, doc("b.md", "second")));
        assert!(history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn empty_stacks_yield_empty_deltas() {
        let mut history = History::new();
        assert!(history.undo().is_empty());
        assert!(history.redo().is_empty());
    }

    #[test]
    fn empty_deltas_are_not_recorded() {
        let mut history = History::new();
        history.record(GraphDelta::new());
        assert!(!history.can_undo());
    }

    #[test]
    fn repeated_toggling_is_stable() {
        let mut history = History::new();
        let empty = DocGraph::new();
        let delta = upsert_node(&empty, doc("a.md", "first"));
        let after = empty.apply(&delta);
        history.record(delta);

        let mut graph = after.clone();
        for _ in 0..3 {
            graph = graph.apply(&history.undo());
            assert_eq!(graph, empty);
            graph = graph.apply(&history.redo());
            assert_eq!(graph, after);
        }
    }
}
