//! Vault loading and graph semantics through the public API:
//! - loading a directory of documents resolves cross-references
//! - loading order does not affect the resulting graph
//! - structural operations and undo compose over the loaded graph
//! - extraction renders the loaded structure

mod common;

use canopy_core::{
    codec::parse_document,
    extract::extract,
    graph::{delete_with_reconnect, upsert_node, DocGraph},
    history::History,
    properties::NodeId,
};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

fn id(s: &str) -> NodeId {
    NodeId::new(s)
}

fn vault_paths(vault: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = WalkDir::new(vault)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().map(|e| e == "md").unwrap_or(false))
        .collect();
    paths.sort();
    paths
}

fn load_in_order(vault: &Path, paths: &[PathBuf]) -> DocGraph {
    let mut graph = DocGraph::new();
    for path in paths {
        let raw = std::fs::read_to_string(path).unwrap();
        let node_id = NodeId::from_relative_path(path.strip_prefix(vault).unwrap());
        let node = parse_document(&raw, &node_id);
        let delta = upsert_node(&graph, node);
        graph = graph.apply(&delta);
    }
    graph
}

#[test]
fn vault_load_resolves_all_references() {
    common::init_logging();
    let temp_dir = TempDir::new().unwrap();
    let vault = common::create_test_vault(&temp_dir);

    let graph = load_in_order(&vault, &vault_paths(&vault));
    assert_eq!(graph.len(), 3);

    let index = graph.get(&id("index.md")).unwrap();
    assert!(index.edges[0].points_to(&id("concepts/graphs.md")));
    let graphs = graph.get(&id("concepts/graphs.md")).unwrap();
    assert!(graphs.edges[0].points_to(&id("concepts/deltas.md")));
    let deltas = graph.get(&id("concepts/deltas.md")).unwrap();
    assert!(deltas.edges[0].points_to(&id("index.md")));
    assert_eq!(deltas.edges[0].label, "motivated by");
}

#[test]
fn vault_load_order_is_irrelevant() {
    common::init_logging();
    let temp_dir = TempDir::new().unwrap();
    let vault = common::create_test_vault(&temp_dir);

    let paths = vault_paths(&vault);
    let forward = load_in_order(&vault, &paths);
    let reversed: Vec<PathBuf> = paths.iter().rev().cloned().collect();
    let backward = load_in_order(&vault, &reversed);

    assert_eq!(forward, backward);
}

#[test]
fn structural_edit_and_undo_over_loaded_vault() {
    common::init_logging();
    let temp_dir = TempDir::new().unwrap();
    let vault = common::create_test_vault(&temp_dir);
    let graph = load_in_order(&vault, &vault_paths(&vault));

    let mut history = History::new();
    let delta = delete_with_reconnect(&graph, &id("concepts/graphs.md"));
    let edited = graph.apply(&delta);
    history.record(delta);

    // index inherits graphs' child, keeping its own label.
    let index = edited.get(&id("index.md")).unwrap();
    assert!(index
        .edges
        .iter()
        .any(|e| e.points_to(&id("concepts/deltas.md")) && e.label == "overview"));
    assert!(!edited.contains(&id("concepts/graphs.md")));

    let restored = edited.apply(&history.undo());
    assert_eq!(restored, graph);
}

#[test]
fn extraction_renders_loaded_vault() {
    common::init_logging();
    let temp_dir = TempDir::new().unwrap();
    let vault = common::create_test_vault(&temp_dir);
    let graph = load_in_order(&vault, &vault_paths(&vault));

    let snapshot = extract(&graph, &[id("index.md")], 2);
    assert!(snapshot.ascii_tree.contains("Index (index.md)"));
    assert!(snapshot
        .ascii_tree
        .contains("overview → Graphs (concepts/graphs.md)"));
    assert_eq!(snapshot.contents.len(), 3);
    assert_eq!(snapshot.contents[0].0, id("index.md"));
    // Display markers are stripped from emitted content.
    assert!(snapshot.contents[0].1.contains("overview graphs"));

    let bounded = extract(&graph, &[id("index.md")], 1);
    // deltas is two hops out along outgoing edges but one hop in via its
    // backlink to index, so the bidirectional bound still includes it.
    assert!(bounded.contents.iter().any(|(i, _)| *i == id("concepts/deltas.md")));
}
