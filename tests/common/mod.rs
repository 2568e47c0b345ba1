//! Shared test utilities for integration tests.
//!
//! Import from integration test files as:
//! ```ignore
//! mod common;
//! ```

use std::path::PathBuf;
use tempfile::TempDir;

/// Initialize tracing for tests, respecting RUST_LOG env var.
///
/// Safe to call multiple times — subsequent calls are no-ops.
#[allow(dead_code)]
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// Create a small vault: three linked documents plus a nested one.
///
/// Returns the vault directory path (`<temp_dir>/vault/`). The link
/// structure is `index → concepts/graphs → concepts/deltas` with `index`
/// also referenced back from `concepts/deltas`.
#[allow(dead_code)]
pub fn create_test_vault(temp_dir: &TempDir) -> PathBuf {
    let vault = temp_dir.path().join("vault");
    std::fs::create_dir_all(vault.join("concepts")).unwrap();

    let index = r#"---
title: Index
---

# Index

starting point
overview [[graphs]]
"#;
    std::fs::write(vault.join("index.md"), index).unwrap();

    let graphs = r#"---
title: Graphs
position:
  x: 10.0
  y: 20.0
---

# Graphs

documents form a graph
builds on [[deltas]]
"#;
    std::fs::write(vault.join("concepts/graphs.md"), graphs).unwrap();

    let deltas = r#"---
title: Deltas
---

# Deltas

every change is a delta
motivated by [[index]]
"#;
    std::fs::write(vault.join("concepts/deltas.md"), deltas).unwrap();

    vault
}
