//! # canopy-core
//!
//! A Rust library for keeping a directed graph of markdown documents
//! synchronized between a filesystem vault and an in-memory graph value.
//!
//! ## Overview
//!
//! canopy-core treats a directory of markdown files (a "vault") as the
//! durable form of a document graph: each file is a node, and `[[target]]`
//! references in its body are labeled directed edges. The library maintains
//! **bidirectional synchronization** between the vault and the graph,
//! describing every change as a reversible [`graph::GraphDelta`].
//!
//! ### Key Features
//!
//! - **Reversible deltas**: every mutation carries the snapshots needed to
//!   undo it structurally (`apply(apply(G, D), reverse(D)) == G`)
//! - **Order-independent loading**: documents may arrive in any order;
//!   unresolved references heal as their targets appear
//! - **Echo suppression**: the syncer fingerprints its own writes so
//!   filesystem notifications they trigger are not reprocessed
//! - **Structural operations**: delete-with-reconnect, merge, and rename
//!   expressed as pure `(graph, params) → delta` functions
//! - **Bounded extraction**: bidirectional breadth-first subgraph queries
//!   with an ASCII tree rendering and ordered content list
//!
//! ## Architecture
//!
//! - **[`graph`]**: the [`graph::DocGraph`] value, delta types, and the pure
//!   structural operations
//! - **[`codec`]**: markdown parsing and serialization (YAML header block,
//!   labeled `[[target]]` references, link block)
//! - **[`paths`]**: longest-suffix reference resolution
//! - **[`watch`]**: [`watch::VaultSyncer`], the debounced file watcher and
//!   write path with echo suppression
//! - **[`history`]**: linear undo/redo over delta reversal
//! - **[`extract`]**: bounded subgraph extraction
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use canopy_core::{
//!     config::SyncConfig,
//!     event::Event,
//!     graph::{DocGraph, GraphStore},
//!     watch::VaultSyncer,
//! };
//! use std::{path::Path, sync::mpsc::channel, sync::Arc};
//!
//! let (tx, rx) = channel::<Event>();
//! let store = Arc::new(GraphStore::new(DocGraph::new()));
//! let syncer = VaultSyncer::new(store.clone(), tx, SyncConfig::default())?;
//!
//! // Load the vault and begin watching for changes.
//! syncer.start(Path::new("/path/to/vault"))?;
//!
//! for event in rx {
//!     if let Event::Delta(delta, origin) = event {
//!         println!("{} operations ({origin:?})", delta.len());
//!     }
//! }
//! # Ok::<(), canopy_core::CanopyError>(())
//! ```
//!
//! ## Structural Edits
//!
//! Structural operations are pure functions producing deltas; apply them
//! through the store and record them for undo:
//!
//! ```rust
//! use canopy_core::{
//!     graph::{delete_with_reconnect, DocGraph, GraphStore},
//!     history::History,
//!     properties::NodeId,
//! };
//!
//! let store = GraphStore::new(DocGraph::new());
//! let mut history = History::new();
//!
//! let delta = delete_with_reconnect(&store.graph(), &NodeId::new("notes/old.md"));
//! store.apply(&delta);
//! history.record(delta);
//!
//! // Later:
//! store.apply(&history.undo());
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod event;
pub mod extract;
pub mod graph;
pub mod history;
pub mod paths;
pub mod properties;
pub mod watch;

pub use error::*;
