//! Pure structural operations: `(graph, params) → GraphDelta`.
//!
//! Nothing here mutates a graph. Every operation returns a delta carrying
//! the snapshots needed for structural reversal, and an invalid target
//! (nonexistent id, degenerate member set) yields an empty delta with a
//! warning — callers treat empty as nothing-to-do, never as failure.

use std::collections::BTreeSet;
use uuid::Uuid;

use crate::{
    codec::{DISPLAY_CLOSE, DISPLAY_OPEN},
    graph::{DeltaOp, DocGraph, GraphDelta},
    paths::SuffixIndex,
    properties::{Edge, EdgeTarget, Node, NodeId},
};

/// Insert or update a node, healing cross-references in both directions.
///
/// The inserted node's references are resolved against the graph including
/// itself; existing nodes whose references now resolve to the inserted id
/// get their edges re-resolved (content untouched), each healed node
/// carrying its pre-healing snapshot. Loading any permutation of the same
/// documents through this function converges to an identical graph.
pub fn upsert_node(graph: &DocGraph, node: Node) -> GraphDelta {
    let mut ids: Vec<NodeId> = graph.ids().cloned().collect();
    if !graph.contains(&node.id) {
        ids.push(node.id.clone());
    }
    let index = SuffixIndex::from_ids(ids.iter());

    let mut inserted = node;
    for edge in inserted.edges.iter_mut() {
        edge.target = match index.resolve(&edge.reference) {
            Some(id) => EdgeTarget::Resolved(id),
            None => EdgeTarget::Unresolved,
        };
    }

    let mut delta = GraphDelta::new();
    let previous = graph.get(&inserted.id).cloned();
    delta.push(DeltaOp::Upsert {
        node: inserted.clone(),
        previous,
    });

    // An added id can only change a reference's winner to that id, so only
    // edges now resolving to the inserted node need healing.
    for existing in graph.nodes() {
        if existing.id == inserted.id {
            continue;
        }
        let mut healed = existing.clone();
        let mut changed = false;
        for edge in healed.edges.iter_mut() {
            if edge.target.resolved_id() == Some(&inserted.id) {
                continue;
            }
            if index.resolve(&edge.reference).as_ref() == Some(&inserted.id) {
                edge.target = EdgeTarget::Resolved(inserted.id.clone());
                changed = true;
            }
        }
        if changed {
            tracing::debug!("Healed references in {} toward {}", existing.id, inserted.id);
            delta.push(DeltaOp::Upsert {
                node: healed,
                previous: Some(existing.clone()),
            });
        }
    }
    delta
}

/// Remove a node while preserving reachability across the gap.
///
/// Each parent of the removed node inherits one edge per child, labeled with
/// that parent's own edge label into the removed node. Parents are
/// additionally connected to each other. Duplicate target edges are
/// suppressed: an existing edge wins and keeps its label.
pub fn delete_with_reconnect(graph: &DocGraph, id: &NodeId) -> GraphDelta {
    let Some(node) = graph.get(id) else {
        tracing::warn!("Cannot delete {}: not present in graph", id);
        return GraphDelta::new();
    };

    let children: Vec<NodeId> = node
        .resolved_targets()
        .filter(|t| *t != id && graph.contains(t))
        .cloned()
        .collect();
    let parents: Vec<NodeId> = graph
        .incoming(id)
        .into_iter()
        .filter(|p| p != id && graph.contains(p))
        .collect();

    let mut delta = GraphDelta::new();
    for parent_id in &parents {
        let Some(parent) = graph.get(parent_id) else {
            continue;
        };
        let label = parent
            .edges
            .iter()
            .find(|e| e.points_to(id))
            .map(|e| e.label.clone())
            .unwrap_or_default();

        let mut updated = parent.clone();
        updated.edges.retain(|e| !e.points_to(id));

        let mut reconnect_targets: Vec<&NodeId> = children.iter().collect();
        reconnect_targets.extend(parents.iter().filter(|p| *p != parent_id));
        for target in reconnect_targets {
            if target == parent_id {
                continue;
            }
            if updated.edges.iter().any(|e| e.points_to(target)) {
                continue;
            }
            updated
                .edges
                .push(Edge::resolved(target.clone(), label.clone()));
        }

        delta.push(DeltaOp::Upsert {
            node: updated,
            previous: Some(parent.clone()),
        });
    }

    delta.push(DeltaOp::Delete {
        id: id.clone(),
        removed: Some(node.clone()),
    });
    delta
}

/// Collapse a node set into one synthetic node.
///
/// The synthetic node gets a fresh namespaced id, the members' contents
/// concatenated in argument order, the centroid of their positions, and no
/// outgoing edges (edges among members are discarded). Every external edge
/// into any member is redirected to the synthetic id with its label kept,
/// one redirected edge per original edge. Members are deleted.
pub fn merge_nodes(graph: &DocGraph, ids: &[NodeId]) -> GraphDelta {
    let member_set: BTreeSet<&NodeId> = ids.iter().collect();
    if member_set.len() != ids.len() {
        tracing::warn!("Merge target set contains duplicate ids: {:?}", ids);
        return GraphDelta::new();
    }
    let members: Vec<&Node> = ids.iter().filter_map(|id| graph.get(id)).collect();
    if members.len() != ids.len() {
        tracing::warn!("Merge target set contains ids not present in graph: {:?}", ids);
        return GraphDelta::new();
    }
    if members.len() < 2 {
        tracing::warn!("Merge requires at least two nodes, got {}", members.len());
        return GraphDelta::new();
    }

    let merged_id = NodeId::new(format!("merged/{}.md", Uuid::new_v4()));
    let content = members
        .iter()
        .map(|n| n.content.as_str())
        .collect::<Vec<&str>>()
        .join("\n\n");
    let title = members
        .iter()
        .map(|n| n.meta.title.as_str())
        .collect::<Vec<&str>>()
        .join(" + ");

    let positions: Vec<_> = members.iter().filter_map(|n| n.meta.position).collect();
    let position = if positions.is_empty() {
        None
    } else {
        let count = positions.len() as f64;
        Some(crate::properties::Position {
            x: positions.iter().map(|p| p.x).sum::<f64>() / count,
            y: positions.iter().map(|p| p.y).sum::<f64>() / count,
        })
    };

    let mut merged = Node::new(merged_id.clone(), title, content);
    merged.meta.position = position;

    let mut delta = GraphDelta::new();
    delta.push(DeltaOp::Upsert {
        node: merged,
        previous: None,
    });

    for external in graph.nodes() {
        if member_set.contains(&external.id) {
            continue;
        }
        let mut updated = external.clone();
        let mut changed = false;
        for edge in updated.edges.iter_mut() {
            let into_member = edge
                .target
                .resolved_id()
                .map(|t| member_set.contains(t))
                .unwrap_or(false);
            if into_member {
                edge.reference = merged_id.as_str().to_string();
                edge.target = EdgeTarget::Resolved(merged_id.clone());
                changed = true;
            }
        }
        if changed {
            delta.push(DeltaOp::Upsert {
                node: updated,
                previous: Some(external.clone()),
            });
        }
    }

    for member in members {
        delta.push(DeltaOp::Delete {
            id: member.id.clone(),
            removed: Some(member.clone()),
        });
    }
    delta
}

/// Change a node's id.
///
/// Emits an upsert for the node under the new id with the old-id node as
/// `previous` (delta application removes the old key), plus an upsert per
/// referrer with the edge target rewritten and the old id's display tokens
/// in the referrer's content replaced. Only whole delimited tokens are
/// rewritten, so ids that merely contain the old id as a substring are
/// untouched.
pub fn rename_node(graph: &DocGraph, old_id: &NodeId, new_id: &NodeId) -> GraphDelta {
    let Some(node) = graph.get(old_id) else {
        tracing::warn!("Cannot rename {}: not present in graph", old_id);
        return GraphDelta::new();
    };
    if old_id == new_id {
        tracing::warn!("Rename of {} to itself is a no-op", old_id);
        return GraphDelta::new();
    }
    if graph.contains(new_id) {
        tracing::warn!("Cannot rename {} to {}: target id already exists", old_id, new_id);
        return GraphDelta::new();
    }

    let mut renamed = node.clone();
    renamed.id = new_id.clone();
    rewrite_edges_toward(&mut renamed, old_id, new_id);

    let mut delta = GraphDelta::new();
    delta.push(DeltaOp::Upsert {
        node: renamed,
        previous: Some(node.clone()),
    });

    for source_id in graph.incoming(old_id) {
        if &source_id == old_id {
            continue;
        }
        let Some(source) = graph.get(&source_id) else {
            continue;
        };
        let mut updated = source.clone();
        for edge in source.edges.iter().filter(|e| e.points_to(old_id)) {
            updated.content = updated.content.replace(
                &display_token(&edge.reference),
                &display_token(new_id.as_str()),
            );
        }
        updated.content = updated.content.replace(
            &display_token(old_id.as_str()),
            &display_token(new_id.as_str()),
        );
        rewrite_edges_toward(&mut updated, old_id, new_id);
        delta.push(DeltaOp::Upsert {
            node: updated,
            previous: Some(source.clone()),
        });
    }
    delta
}

fn display_token(text: &str) -> String {
    format!("{DISPLAY_OPEN}{text}{DISPLAY_CLOSE}")
}

fn rewrite_edges_toward(node: &mut Node, old_id: &NodeId, new_id: &NodeId) {
    for edge in node.edges.iter_mut() {
        if edge.points_to(old_id) {
            edge.reference = new_id.as_str().to_string();
            edge.target = EdgeTarget::Resolved(new_id.clone());
        }
    }
}
