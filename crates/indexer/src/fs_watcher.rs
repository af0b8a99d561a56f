//! Debounced filesystem watcher (spec.md §4.5): coalesces a burst of
//! raw notify events into two sets, `pending_update`/`pending_delete`,
//! and re-indexes them once the burst goes quiet.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use context_extract::ExtractionRouter;
use notify::{Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::sleep;

use crate::error::{IndexerError, Result};
use crate::fingerprint::resolve_path;
use crate::semantic_indexer::SemanticIndexer;

#[derive(Debug, Default)]
struct PendingChanges {
    update: HashSet<PathBuf>,
    delete: HashSet<PathBuf>,
}

pub struct FsWatcher {
    _watcher: RecommendedWatcher,
    handle: tokio::task::JoinHandle<()>,
}

impl FsWatcher {
    /// Starts watching `root` and applying debounced changes to `indexer`.
    /// `debounce` is the quiet period required before a burst is flushed.
    pub fn start(
        root: impl AsRef<Path>,
        extraction_router: Arc<ExtractionRouter>,
        allowed_list: Vec<String>,
        block_list: Vec<String>,
        indexer: Arc<SemanticIndexer>,
        debounce: Duration,
    ) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let (tx, mut rx) = mpsc::channel::<notify::Result<Event>>(1024);

        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.blocking_send(res);
            },
            NotifyConfig::default(),
        )
        .map_err(|e| IndexerError::Other(format!("watcher init failed: {e}")))?;

        watcher
            .watch(&root, RecursiveMode::Recursive)
            .map_err(|e| IndexerError::Other(format!("watch({}) failed: {e}", root.display())))?;

        let pending = Arc::new(Mutex::new(PendingChanges::default()));
        let flush_pending = pending.clone();
        let flush_indexer = indexer;
        let flush_router = extraction_router;

        let handle = tokio::spawn(async move {
            loop {
                let Some(event) = rx.recv().await else {
                    break;
                };
                let Ok(event) = event else {
                    continue;
                };

                record_event(&pending, &event, &root, &flush_router, &allowed_list, &block_list);

                // Re-arm: drain any further events that arrive within the
                // debounce window before acting, so a burst of saves
                // collapses into one flush.
                loop {
                    match tokio::time::timeout(debounce, rx.recv()).await {
                        Ok(Some(Ok(event))) => {
                            record_event(&pending, &event, &root, &flush_router, &allowed_list, &block_list);
                        }
                        Ok(Some(Err(_))) => continue,
                        Ok(None) => return,
                        Err(_) => break, // quiet period elapsed
                    }
                }

                let (updates, deletes) = {
                    let mut guard = flush_pending.lock().unwrap_or_else(|e| e.into_inner());
                    let updates: Vec<PathBuf> = guard.update.drain().collect();
                    let deletes: Vec<PathBuf> = guard.delete.drain().collect();
                    (updates, deletes)
                };

                // Canonicalize before touching the indexer: `base_metadata`
                // stores whatever path string it's given as-is, and a full
                // sync() always resolves paths first. Using the raw notify
                // path here would let the same file end up stored under two
                // different path strings, producing a spurious delete+add
                // pair on the next sync.
                for path in &deletes {
                    let resolved = resolve_path(path);
                    if let Err(e) = flush_indexer.delete_file(&resolved).await {
                        log::warn!("watcher delete failed for {}: {e}", resolved.display());
                    }
                }
                for path in &updates {
                    let resolved = resolve_path(path);
                    if let Err(e) = flush_indexer.index_file(&resolved).await {
                        log::warn!("watcher index failed for {}: {e}", resolved.display());
                    }
                }

                if !updates.is_empty() || !deletes.is_empty() {
                    if let Err(e) = flush_indexer.save().await {
                        log::warn!("watcher save failed: {e}");
                    }
                }

                sleep(Duration::from_millis(0)).await;
            }
        });

        Ok(Self {
            _watcher: watcher,
            handle,
        })
    }

    pub fn stop(self) {
        self.handle.abort();
    }
}

/// Folds one raw notify event into the pending sets. Update wins over
/// delete within the same debounce window (spec.md §4.5): a create
/// racing a stale delete from the same burst must leave the file indexed.
///
/// Rename events decompose into delete(src) + create(dst), per spec.md
/// §4.5. `notify` reports a rename either as one `RenameMode::Both` event
/// carrying `[from, to]`, or as a separate `From`/`To` pair that this
/// function's own admit-as-delete/admit-as-create handling reassembles the
/// same way without needing to correlate the two events.
fn record_event(
    pending: &Arc<Mutex<PendingChanges>>,
    event: &Event,
    root: &Path,
    extraction_router: &ExtractionRouter,
    allowed_list: &[String],
    block_list: &[String],
) {
    let admit = |path: &Path| -> bool {
        if path.is_dir() {
            return false;
        }
        if !extraction_router.supports(path) {
            return false;
        }
        context_protocol::policy::admitted(&path.to_string_lossy(), allowed_list, block_list)
    };
    let _ = root;

    if let EventKind::Modify(notify::event::ModifyKind::Name(notify::event::RenameMode::Both)) = event.kind {
        if event.paths.len() >= 2 {
            let from = &event.paths[0];
            let to = &event.paths[1];
            let mut guard = pending.lock().unwrap_or_else(|e| e.into_inner());
            // delete(src) admits unconditionally (spec.md §4.5: "cannot
            // re-check a vanished file").
            guard.delete.insert(from.clone());
            guard.update.remove(from);
            if admit(to) {
                guard.update.insert(to.clone());
                guard.delete.remove(to);
            }
            return;
        }
    }

    for path in &event.paths {
        let mut guard = pending.lock().unwrap_or_else(|e| e.into_inner());
        match event.kind {
            EventKind::Remove(_) | EventKind::Modify(notify::event::ModifyKind::Name(notify::event::RenameMode::From)) => {
                guard.delete.insert(path.clone());
                guard.update.remove(path);
            }
            EventKind::Create(_) | EventKind::Modify(notify::event::ModifyKind::Name(notify::event::RenameMode::To)) => {
                if admit(path) {
                    guard.update.insert(path.clone());
                    guard.delete.remove(path);
                }
            }
            EventKind::Modify(_) => {
                if admit(path) {
                    guard.update.insert(path.clone());
                    guard.delete.remove(path);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_wins_over_delete_in_same_window() {
        let pending = Arc::new(Mutex::new(PendingChanges::default()));
        let router = ExtractionRouter::new().register(context_extract::TextExtractor::new(
            vec![".txt".to_string()],
            vec![],
        ));
        let path = PathBuf::from("/tmp/does-not-exist-for-watcher-test.txt");

        let delete_event = Event {
            kind: EventKind::Remove(notify::event::RemoveKind::File),
            paths: vec![path.clone()],
            attrs: Default::default(),
        };
        let create_event = Event {
            kind: EventKind::Create(notify::event::CreateKind::File),
            paths: vec![path.clone()],
            attrs: Default::default(),
        };

        record_event(&pending, &delete_event, Path::new("/tmp"), &router, &[], &[]);
        record_event(&pending, &create_event, Path::new("/tmp"), &router, &[], &[]);

        let guard = pending.lock().unwrap();
        assert!(guard.update.contains(&path));
        assert!(!guard.delete.contains(&path));
    }

    #[test]
    fn unsupported_extension_is_ignored() {
        let pending = Arc::new(Mutex::new(PendingChanges::default()));
        let router = ExtractionRouter::new().register(context_extract::TextExtractor::new(
            vec![".txt".to_string()],
            vec![],
        ));
        let path = PathBuf::from("/tmp/image.png");
        let event = Event {
            kind: EventKind::Create(notify::event::CreateKind::File),
            paths: vec![path],
            attrs: Default::default(),
        };

        record_event(&pending, &event, Path::new("/tmp"), &router, &[], &[]);

        let guard = pending.lock().unwrap();
        assert!(guard.update.is_empty());
    }
}
