//! The document graph: immutable-value store, reversible deltas, and the
//! pure structural operations that produce them.

mod base;
mod delta;
mod ops;

pub use base::{DocGraph, GraphStore};
pub use delta::{DeltaOp, GraphDelta};
pub use ops::{delete_with_reconnect, merge_nodes, rename_node, upsert_node};
