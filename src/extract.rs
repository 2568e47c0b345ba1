//! Bounded subgraph extraction.
//!
//! Extraction answers "what is near these documents": a breadth-first sweep
//! from the root set, treating edges as bidirectional, bounded by a hop
//! distance. The induced subgraph keeps an edge only when both endpoints made
//! the cut. Rendering walks outgoing edges depth-first from the primary root.

use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::{
    codec::strip_display_markers,
    graph::DocGraph,
    properties::NodeId,
};

/// Rendered outputs of one extraction query.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextSnapshot {
    /// Depth-first tree rendering of the included documents.
    pub ascii_tree: String,
    /// `(id, content)` in rendering order. Context-flagged nodes are skipped
    /// and display link markers are stripped.
    pub contents: Vec<(NodeId, String)>,
}

/// Induced subgraph over a member set, edges restricted to pairs inside it.
#[derive(Debug, Default)]
pub struct DocSubgraph {
    graph: petgraph::Graph<NodeId, String>,
    indices: BTreeMap<NodeId, NodeIndex>,
}

impl DocSubgraph {
    /// Build the induced subgraph for `members` of `base`. Nodes enter in
    /// sorted id order; edges keep each source node's edge order.
    pub fn induced(base: &DocGraph, members: &BTreeSet<NodeId>) -> Self {
        let mut graph = petgraph::Graph::new();
        let mut indices = BTreeMap::new();
        for id in members {
            let index = graph.add_node(id.clone());
            indices.insert(id.clone(), index);
        }
        for id in members {
            let Some(node) = base.get(id) else {
                continue;
            };
            let source = indices[id];
            for edge in &node.edges {
                let Some(target) = edge.target.resolved_id() else {
                    continue;
                };
                let Some(&sink) = indices.get(target) else {
                    continue;
                };
                graph.add_edge(source, sink, edge.label.clone());
            }
        }
        DocSubgraph { graph, indices }
    }

    pub fn as_graph(&self) -> &petgraph::Graph<NodeId, String> {
        &self.graph
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.indices.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Outgoing neighbors of `id` with edge labels, in the source document's
    /// edge order.
    fn children(&self, id: &NodeId) -> Vec<(NodeId, String)> {
        let Some(&index) = self.indices.get(id) else {
            return Vec::new();
        };
        // petgraph iterates edges latest-first; reverse back to edge order.
        let mut out: Vec<(NodeId, String)> = self
            .graph
            .edges_directed(index, Direction::Outgoing)
            .map(|e| (self.graph[e.target()].clone(), e.weight().clone()))
            .collect();
        out.reverse();
        out
    }
}

/// Ids within `max_distance` hops of any root, edges treated as
/// bidirectional. Roots not present in the graph contribute nothing.
pub fn members_within(graph: &DocGraph, roots: &[NodeId], max_distance: usize) -> BTreeSet<NodeId> {
    let mut distance: BTreeMap<NodeId, usize> = BTreeMap::new();
    let mut queue: VecDeque<NodeId> = VecDeque::new();
    for root in roots {
        if graph.contains(root) && !distance.contains_key(root) {
            distance.insert(root.clone(), 0);
            queue.push_back(root.clone());
        } else if !graph.contains(root) {
            tracing::warn!("Extraction root {} not present in graph", root);
        }
    }

    while let Some(id) = queue.pop_front() {
        let hops = distance[&id];
        if hops == max_distance {
            continue;
        }
        let node = match graph.get(&id) {
            Some(node) => node,
            None => continue,
        };
        let mut neighbors: Vec<NodeId> = node
            .resolved_targets()
            .filter(|t| graph.contains(t))
            .cloned()
            .collect();
        neighbors.extend(graph.incoming(&id));
        for neighbor in neighbors {
            if !distance.contains_key(&neighbor) {
                distance.insert(neighbor.clone(), hops + 1);
                queue.push_back(neighbor);
            }
        }
    }
    distance.into_keys().collect()
}

/// Run an extraction query and render its outputs.
pub fn extract(graph: &DocGraph, roots: &[NodeId], max_distance: usize) -> ContextSnapshot {
    let members = members_within(graph, roots, max_distance);
    let subgraph = DocSubgraph::induced(graph, &members);

    let mut tree = String::new();
    let mut contents = Vec::new();
    let mut visited = BTreeSet::new();

    let mut tops: Vec<&NodeId> = roots.iter().filter(|r| members.contains(*r)).collect();
    // Members unreachable along outgoing edges (parents of a root, separate
    // components of the bound) render as additional top-level trees.
    let remaining: Vec<&NodeId> = members
        .iter()
        .filter(|id| !tops.contains(id))
        .collect();
    tops.extend(remaining);

    for top in tops {
        if visited.contains(top) {
            continue;
        }
        render_root(graph, &subgraph, top, &mut tree, &mut contents, &mut visited);
    }

    ContextSnapshot {
        ascii_tree: tree,
        contents,
    }
}

fn render_root(
    graph: &DocGraph,
    subgraph: &DocSubgraph,
    id: &NodeId,
    tree: &mut String,
    contents: &mut Vec<(NodeId, String)>,
    visited: &mut BTreeSet<NodeId>,
) {
    tree.push_str(&node_line(graph, id, ""));
    tree.push('\n');
    visit(graph, id, contents, visited);
    let children = subgraph.children(id);
    let count = children.len();
    for (i, (child, label)) in children.into_iter().enumerate() {
        render_child(
            graph,
            subgraph,
            &child,
            &label,
            "",
            i + 1 == count,
            tree,
            contents,
            visited,
        );
    }
}

#[allow(clippy::too_many_arguments)]
fn render_child(
    graph: &DocGraph,
    subgraph: &DocSubgraph,
    id: &NodeId,
    label: &str,
    prefix: &str,
    last: bool,
    tree: &mut String,
    contents: &mut Vec<(NodeId, String)>,
    visited: &mut BTreeSet<NodeId>,
) {
    let connector = if last { "└── " } else { "├── " };
    tree.push_str(prefix);
    tree.push_str(connector);
    tree.push_str(&node_line(graph, id, label));
    if visited.contains(id) {
        // Already rendered elsewhere; reference only, no re-descent.
        tree.push_str(" (…)");
        tree.push('\n');
        return;
    }
    tree.push('\n');
    visit(graph, id, contents, visited);

    let child_prefix = format!("{}{}", prefix, if last { "    " } else { "│   " });
    let children = subgraph.children(id);
    let count = children.len();
    for (i, (child, child_label)) in children.into_iter().enumerate() {
        render_child(
            graph,
            subgraph,
            &child,
            &child_label,
            &child_prefix,
            i + 1 == count,
            tree,
            contents,
            visited,
        );
    }
}

fn visit(
    graph: &DocGraph,
    id: &NodeId,
    contents: &mut Vec<(NodeId, String)>,
    visited: &mut BTreeSet<NodeId>,
) {
    visited.insert(id.clone());
    let Some(node) = graph.get(id) else {
        return;
    };
    if node.meta.is_context_node {
        return;
    }
    contents.push((id.clone(), strip_display_markers(&node.content)));
}

fn node_line(graph: &DocGraph, id: &NodeId, label: &str) -> String {
    let title = graph
        .get(id)
        .map(|n| n.meta.title.as_str())
        .unwrap_or_else(|| id.stem());
    if label.is_empty() {
        format!("{title} ({id})")
    } else {
        format!("{label} → {title} ({id})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::upsert_node;
    use crate::properties::{Edge, Node};

    fn id(s: &str) -> NodeId {
        NodeId::new(s)
    }

    fn load(docs: Vec<(&str, Vec<(&str, &str)>)>) -> DocGraph {
        let mut graph = DocGraph::new();
        for (node_id, refs) in docs {
            let mut node = Node::new(id(node_id), node_id, format!("body of {node_id}"));
            node.edges = refs
                .into_iter()
                .map(|(t, label)| Edge::unresolved(t, label))
                .collect();
            let delta = upsert_node(&graph, node);
            graph = graph.apply(&delta);
        }
        graph
    }

    /// root → a → b → c as a chain, plus p → root.
    fn chain() -> DocGraph {
        load(vec![
            ("root.md", vec![("a", "first")]),
            ("a.md", vec![("b", "second")]),
            ("b.md", vec![("c", "third")]),
            ("c.md", vec![]),
            ("p.md", vec![("root", "parent")]),
        ])
    }

    #[test]
    fn distance_bound_is_respected_bidirectionally() {
        let graph = chain();
        let members = members_within(&graph, &[id("root.md")], 1);
        // One hop out (a) and one hop in (p); b and c are beyond the bound.
        assert!(members.contains(&id("root.md")));
        assert!(members.contains(&id("a.md")));
        assert!(members.contains(&id("p.md")));
        assert!(!members.contains(&id("b.md")));
        assert!(!members.contains(&id("c.md")));
    }

    #[test]
    fn zero_distance_is_roots_only() {
        let graph = chain();
        let members = members_within(&graph, &[id("a.md")], 0);
        assert_eq!(members.len(), 1);
        assert!(members.contains(&id("a.md")));
    }

    #[test]
    fn multi_root_distance_is_minimum_over_roots() {
        let graph = chain();
        let members = members_within(&graph, &[id("root.md"), id("c.md")], 1);
        // b is 2 hops from root but 1 from c.
        assert!(members.contains(&id("b.md")));
    }

    #[test]
    fn induced_subgraph_drops_edges_crossing_the_boundary() {
        let graph = chain();
        let members = members_within(&graph, &[id("root.md")], 1);
        let subgraph = DocSubgraph::induced(&graph, &members);
        // a's edge to b leaves the member set.
        assert!(subgraph.children(&id("a.md")).is_empty());
        assert_eq!(subgraph.children(&id("root.md")).len(), 1);
    }

    #[test]
    fn unknown_roots_yield_empty_snapshot() {
        let graph = chain();
        let snapshot = extract(&graph, &[id("missing.md")], 3);
        assert!(snapshot.ascii_tree.is_empty());
        assert!(snapshot.contents.is_empty());
    }

    #[test]
    fn tree_renders_labels_and_nesting() {
        let graph = chain();
        let snapshot = extract(&graph, &[id("root.md")], 3);
        assert!(snapshot.ascii_tree.contains("root.md (root.md)"));
        assert!(snapshot.ascii_tree.contains("first → a.md (a.md)"));
        assert!(snapshot.ascii_tree.contains("└── "));
        // p reaches root through an incoming edge; it renders as its own top
        // with root as an already-visited reference.
        assert!(snapshot.ascii_tree.contains("parent → root.md (root.md) (…)"));
    }

    #[test]
    fn contents_follow_render_order_and_skip_context_nodes() {
        let mut graph = load(vec![
            ("root.md", vec![("ctx", "see"), ("plain", "also")]),
            ("ctx.md", vec![]),
            ("plain.md", vec![]),
        ]);
        let mut ctx = graph.get(&id("ctx.md")).unwrap().clone();
        ctx.meta.is_context_node = true;
        let delta = upsert_node(&graph, ctx);
        graph = graph.apply(&delta);

        let snapshot = extract(&graph, &[id("root.md")], 2);
        let ids: Vec<&str> = snapshot.contents.iter().map(|(i, _)| i.as_str()).collect();
        assert_eq!(ids, vec!["root.md", "plain.md"]);
        // Context node still shows in the tree.
        assert!(snapshot.ascii_tree.contains("ctx.md"));
    }

    #[test]
    fn contents_strip_display_markers() {
        let mut graph = load(vec![("root.md", vec![])]);
        let mut node = graph.get(&id("root.md")).unwrap().clone();
        node.content = "see ⟦other.md⟧ here".to_string();
        let delta = upsert_node(&graph, node);
        graph = graph.apply(&delta);

        let snapshot = extract(&graph, &[id("root.md")], 0);
        assert_eq!(snapshot.contents[0].1, "see other.md here");
    }
}
