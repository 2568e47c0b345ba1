//! # Vault Synchronizer - Continuous File Watching and Delta Application
//!
//! [`VaultSyncer`] keeps a vault directory and the in-memory [`DocGraph`]
//! synchronized in both directions:
//! - **Inbound**: filesystem notifications are debounced, filtered to managed
//!   documents, parsed, and applied to the graph store; the resulting delta is
//!   broadcast with [`EventOrigin::Remote`].
//! - **Outbound**: [`VaultSyncer::apply_local`] serializes a delta's nodes to
//!   disk, applies it to the store, and broadcasts it with
//!   [`EventOrigin::Local`].
//!
//! The write path records a fingerprint of everything it writes in a TTL
//! ledger; when a filesystem notification for a path matches an unexpired
//! fingerprint, it is the echo of our own write and is discarded without
//! reprocessing. Fingerprints are not consumed on match, since one write can
//! surface as several coalesced notifications.
//!
//! ## Threading Model
//!
//! The syncer owns a tokio runtime. The debouncer callback runs on the notify
//! thread and only filters and forwards paths; parsing, retrying reads, and
//! store application happen in a worker task on the runtime. Per-path event
//! order is preserved by the single worker; no cross-path ordering is
//! assumed. Stopping a session drops its debouncer handle before a new
//! session may open.

use crate::{
    codec::{normalize_for_echo, parse_document, serialize_node},
    config::SyncConfig,
    error::CanopyError,
    event::{Event, EventOrigin},
    graph::{upsert_node, DeltaOp, DocGraph, GraphDelta, GraphStore},
    properties::NodeId,
};

use notify_debouncer_full::{
    new_debouncer,
    notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher},
    DebounceEventResult, Debouncer, FileIdMap,
};
use parking_lot::Mutex;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    result::Result,
    sync::{mpsc::Sender, Arc},
    time::{Duration, Instant},
};
use tokio::{
    runtime::Runtime,
    sync::mpsc::{unbounded_channel, UnboundedSender},
    task::JoinHandle,
    time::sleep,
};
use walkdir::WalkDir;

/// What a write to `path` will look like when its notification comes back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EchoFingerprint {
    /// Normalized content of a written document.
    Content(String),
    /// The path was deleted.
    Delete,
}

impl EchoFingerprint {
    fn of_content(text: &str) -> Self {
        EchoFingerprint::Content(normalize_for_echo(text))
    }
}

/// TTL ledger of recent writes, keyed by absolute path.
///
/// Matching never consumes a record; records expire on their own. Expired
/// records are pruned opportunistically on both insert and lookup.
#[derive(Debug)]
pub struct WriteLedger {
    records: Mutex<HashMap<PathBuf, Vec<(Instant, EchoFingerprint)>>>,
    ttl: Duration,
}

impl WriteLedger {
    pub fn new(ttl: Duration) -> Self {
        WriteLedger {
            records: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn record(&self, path: PathBuf, fingerprint: EchoFingerprint) {
        let mut records = self.records.lock();
        let now = Instant::now();
        let entry = records.entry(path).or_default();
        entry.retain(|(at, _)| now.duration_since(*at) < self.ttl);
        entry.push((now, fingerprint));
    }

    /// Whether `fingerprint` matches an unexpired record for `path`.
    pub fn matches(&self, path: &Path, fingerprint: &EchoFingerprint) -> bool {
        let mut records = self.records.lock();
        let now = Instant::now();
        let Some(entry) = records.get_mut(path) else {
            return false;
        };
        entry.retain(|(at, _)| now.duration_since(*at) < self.ttl);
        if entry.is_empty() {
            records.remove(path);
            return false;
        }
        entry.iter().any(|(_, recorded)| recorded == fingerprint)
    }
}

#[derive(Debug)]
enum PathEvent {
    Changed(PathBuf),
    Removed(PathBuf),
}

struct WatchSession {
    root: PathBuf,
    debouncer: Debouncer<RecommendedWatcher, FileIdMap>,
    worker_handle: JoinHandle<()>,
}

pub struct VaultSyncer {
    store: Arc<GraphStore>,
    event_tx: Sender<Event>,
    runtime: Runtime,
    config: SyncConfig,
    ledger: Arc<WriteLedger>,
    session: Mutex<Option<WatchSession>>,
}

impl VaultSyncer {
    pub fn new(
        store: Arc<GraphStore>,
        event_tx: Sender<Event>,
        config: SyncConfig,
    ) -> Result<Self, CanopyError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()?;
        let ledger = Arc::new(WriteLedger::new(Duration::from_millis(config.echo_ttl_ms)));
        Ok(VaultSyncer {
            store,
            event_tx,
            runtime,
            config,
            ledger,
            session: Mutex::new(None),
        })
    }

    pub fn graph(&self) -> Arc<DocGraph> {
        self.store.graph()
    }

    pub fn is_watching(&self) -> bool {
        self.session.lock().is_some()
    }

    pub fn watched_directory(&self) -> Option<PathBuf> {
        self.session.lock().as_ref().map(|s| s.root.clone())
    }

    /// Begin watching `root`, replacing any active session.
    ///
    /// Validation and the initial vault load happen synchronously; a bad root
    /// fails here, before any session state changes. The previous session's
    /// debouncer is released before the new one opens.
    pub fn start(&self, root: &Path) -> Result<(), CanopyError> {
        if !root.is_dir() {
            return Err(CanopyError::NotFound(format!(
                "Vault directory not available: {root:?}"
            )));
        }
        let root = root.canonicalize()?;
        self.stop()?;

        let load_delta = self.load_vault(&root)?;
        if !load_delta.is_empty() {
            self.store.apply(&load_delta);
            self.event_tx
                .send(Event::Delta(load_delta, EventOrigin::Remote))?;
        }

        let (path_tx, mut path_rx) = unbounded_channel::<PathEvent>();
        let worker = SyncWorker {
            store: self.store.clone(),
            event_tx: self.event_tx.clone(),
            ledger: self.ledger.clone(),
            root: root.clone(),
            read_retry_attempts: self.config.read_retry_attempts,
            read_retry_base_ms: self.config.read_retry_base_ms,
        };
        let worker_handle = self.runtime.spawn(async move {
            while let Some(event) = path_rx.recv().await {
                if let Err(e) = worker.handle(event).await {
                    tracing::warn!("[Syncer] Error handling file event: {e}");
                }
            }
        });

        let mut debouncer = self.spawn_debouncer(path_tx)?;
        debouncer
            .watcher()
            .watch(&root, RecursiveMode::Recursive)?;
        let mut session = self.session.lock();
        *session = Some(WatchSession {
            root,
            debouncer,
            worker_handle,
        });
        Ok(())
    }

    /// Stop the active session, if any. Idempotent.
    pub fn stop(&self) -> Result<(), CanopyError> {
        let mut session = self.session.lock();
        if let Some(mut active) = session.take() {
            let unwatch_res = active.debouncer.watcher().unwatch(&active.root);
            active.worker_handle.abort();
            tracing::debug!("Unwatch_res(path: {:?}) = {:?}", active.root, unwatch_res);
            unwatch_res?;
        }
        Ok(())
    }

    /// Apply a locally-originated delta: write its documents to the vault,
    /// swap the store, and broadcast with [`EventOrigin::Local`].
    ///
    /// Every write is fingerprinted before it lands so the notification it
    /// triggers is recognized as an echo. Writes never auto-retry; a failed
    /// write fails the call.
    pub fn apply_local(&self, delta: &GraphDelta) -> Result<Arc<DocGraph>, CanopyError> {
        let root = self.watched_directory().ok_or_else(|| {
            CanopyError::Custom("Cannot apply local delta without an active vault session".into())
        })?;

        for op in delta.iter() {
            match op {
                DeltaOp::Upsert { node, previous } => {
                    if let Some(previous) = previous {
                        if previous.id != node.id {
                            let old_path = root.join(previous.id.as_str());
                            self.ledger.record(old_path.clone(), EchoFingerprint::Delete);
                            std::fs::remove_file(&old_path)?;
                        }
                    }
                    let path = root.join(node.id.as_str());
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    let text = serialize_node(node);
                    self.ledger
                        .record(path.clone(), EchoFingerprint::of_content(&text));
                    std::fs::write(&path, text)?;
                }
                DeltaOp::Delete { id, .. } => {
                    let path = root.join(id.as_str());
                    self.ledger.record(path.clone(), EchoFingerprint::Delete);
                    match std::fs::remove_file(&path) {
                        Ok(()) => {}
                        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                            tracing::debug!("Delete of {} found no file at {:?}", id, path);
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
            }
        }

        let graph = self.store.apply(delta);
        self.event_tx
            .send(Event::Delta(delta.clone(), EventOrigin::Local))?;
        Ok(graph)
    }

    /// Parse every managed document under `root`, in sorted path order, into
    /// one cumulative delta against the current store graph.
    fn load_vault(&self, root: &Path) -> Result<GraphDelta, CanopyError> {
        let mut paths: Vec<PathBuf> = WalkDir::new(root)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| is_managed(path, &self.config.managed_extension))
            .collect();
        paths.sort();

        let mut graph = (*self.store.graph()).clone();
        let mut delta = GraphDelta::new();
        for path in paths {
            let raw = std::fs::read_to_string(&path)?;
            let id = NodeId::from_relative_path(path.strip_prefix(root)?);
            let node = parse_document(&raw, &id);
            let step = upsert_node(&graph, node);
            graph = graph.apply(&step);
            for op in step {
                delta.push(op);
            }
        }
        tracing::info!(
            "[Syncer] Initial load of {:?}: {} operations",
            root,
            delta.len()
        );
        Ok(delta)
    }

    fn spawn_debouncer(
        &self,
        path_tx: UnboundedSender<PathEvent>,
    ) -> Result<Debouncer<RecommendedWatcher, FileIdMap>, CanopyError> {
        let extension = self.config.managed_extension.clone();
        let debouncer = new_debouncer(
            Duration::from_millis(self.config.debounce_ms),
            None,
            move |result: DebounceEventResult| match result {
                Ok(events) => {
                    for event in events.iter() {
                        let removed = matches!(event.event.kind, EventKind::Remove(_));
                        if !matches!(
                            event.event.kind,
                            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                        ) {
                            continue;
                        }
                        for path in event.paths.iter().filter(|p| is_managed(p, &extension)) {
                            tracing::debug!("[Debouncer] Forwarding change: {:?}", path);
                            let path_event = if removed {
                                PathEvent::Removed(path.clone())
                            } else {
                                PathEvent::Changed(path.clone())
                            };
                            if path_tx.send(path_event).is_err() {
                                tracing::debug!("[Debouncer] Worker gone, dropping event");
                                return;
                            }
                        }
                    }
                }
                Err(errors) => {
                    tracing::error!("Notify debouncer returned errors: {:?}", errors);
                }
            },
        )?;
        Ok(debouncer)
    }
}

impl Drop for VaultSyncer {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            tracing::debug!("Error stopping vault session on drop: {e}");
        }
    }
}

/// Dotfiles and foreign extensions are not managed.
fn is_managed(path: &Path, extension: &str) -> bool {
    let hidden = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(true);
    let managed_ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e == extension)
        .unwrap_or(false);
    !hidden && managed_ext
}

struct SyncWorker {
    store: Arc<GraphStore>,
    event_tx: Sender<Event>,
    ledger: Arc<WriteLedger>,
    root: PathBuf,
    read_retry_attempts: u32,
    read_retry_base_ms: u64,
}

impl SyncWorker {
    async fn handle(&self, event: PathEvent) -> Result<(), CanopyError> {
        match event {
            PathEvent::Changed(path) => self.handle_changed(&path).await,
            PathEvent::Removed(path) => self.handle_removed(&path),
        }
    }

    async fn handle_changed(&self, path: &Path) -> Result<(), CanopyError> {
        let raw = match self.read_with_retry(path).await {
            Some(raw) => raw,
            None => {
                tracing::error!("[Syncer] Giving up reading {:?} after retries", path);
                return Ok(());
            }
        };

        let fingerprint = EchoFingerprint::of_content(&raw);
        if self.ledger.matches(path, &fingerprint) {
            tracing::debug!("[Syncer] Echo suppressed for {:?}", path);
            return Ok(());
        }

        let id = NodeId::from_relative_path(path.strip_prefix(&self.root)?);
        let node = parse_document(&raw, &id);
        let graph = self.store.graph();
        let delta = upsert_node(&graph, node);
        if delta.is_empty() {
            return Ok(());
        }
        self.store.apply(&delta);
        self.event_tx
            .send(Event::Delta(delta, EventOrigin::Remote))?;
        Ok(())
    }

    fn handle_removed(&self, path: &Path) -> Result<(), CanopyError> {
        if self.ledger.matches(path, &EchoFingerprint::Delete) {
            tracing::debug!("[Syncer] Delete echo suppressed for {:?}", path);
            return Ok(());
        }
        let id = NodeId::from_relative_path(path.strip_prefix(&self.root)?);
        let graph = self.store.graph();
        let Some(node) = graph.get(&id) else {
            tracing::debug!("[Syncer] Removal of unknown document {:?}", path);
            return Ok(());
        };
        let mut delta = GraphDelta::new();
        delta.push(DeltaOp::Delete {
            id: id.clone(),
            removed: Some(node.clone()),
        });
        self.store.apply(&delta);
        self.event_tx
            .send(Event::Delta(delta, EventOrigin::Remote))?;
        Ok(())
    }

    /// Read a file, retrying with doubling backoff. Editors replace files
    /// non-atomically often enough that the first read can catch a missing or
    /// half-written path.
    async fn read_with_retry(&self, path: &Path) -> Option<String> {
        let mut backoff = Duration::from_millis(self.read_retry_base_ms);
        for attempt in 1..=self.read_retry_attempts {
            match tokio::fs::read_to_string(path).await {
                Ok(raw) => return Some(raw),
                Err(e) => {
                    tracing::debug!(
                        "[Syncer] Read attempt {}/{} for {:?} failed: {}",
                        attempt,
                        self.read_retry_attempts,
                        path,
                        e
                    );
                    if attempt < self.read_retry_attempts {
                        sleep(backoff).await;
                        backoff *= 2;
                    }
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::DOC_EXTENSION;

    #[test_log::test]
    fn ledger_matches_within_ttl_without_consuming() {
        let ledger = WriteLedger::new(Duration::from_millis(300));
        let path = PathBuf::from("/vault/a.md");
        let fp = EchoFingerprint::of_content("---\ntitle: a\n---\nbody");
        ledger.record(path.clone(), fp.clone());

        assert!(ledger.matches(&path, &fp));
        // Not consumed: a second coalesced notification still matches.
        assert!(ledger.matches(&path, &fp));
        assert!(!ledger.matches(&path, &EchoFingerprint::Delete));
        assert!(!ledger.matches(Path::new("/vault/b.md"), &fp));
    }

    #[test_log::test]
    fn ledger_expires_records() {
        let ledger = WriteLedger::new(Duration::from_millis(10));
        let path = PathBuf::from("/vault/a.md");
        ledger.record(path.clone(), EchoFingerprint::Delete);
        std::thread::sleep(Duration::from_millis(25));
        assert!(!ledger.matches(&path, &EchoFingerprint::Delete));
    }

    #[test_log::test]
    fn fingerprint_tolerates_link_markup_differences() {
        let written = "body with ⟦notes/topic⟧ inline";
        let reread = "body with [[notes/topic]] inline";
        assert_eq!(
            EchoFingerprint::of_content(written),
            EchoFingerprint::of_content(reread)
        );
    }

    #[test_log::test]
    fn managed_filter_skips_dotfiles_and_foreign_extensions() {
        assert!(is_managed(Path::new("/v/notes/topic.md"), DOC_EXTENSION));
        assert!(!is_managed(Path::new("/v/.hidden.md"), DOC_EXTENSION));
        assert!(!is_managed(Path::new("/v/image.png"), DOC_EXTENSION));
        assert!(!is_managed(Path::new("/v/no_extension"), DOC_EXTENSION));
    }
}
