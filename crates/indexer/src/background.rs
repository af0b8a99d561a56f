//! Runs an initial full sync, then hands off to the filesystem watcher
//! (spec.md §2 item 8): a caller gets one object to poll for progress or
//! cancel, without needing to sequence sync-then-watch itself.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use context_extract::ExtractionRouter;
use context_protocol::Config;
use context_vector_store::VectorStore;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::fs_watcher::FsWatcher;
use crate::semantic_indexer::SemanticIndexer;
use crate::synchronizer::{CancelToken, DirectorySynchronizer, SyncReport};

#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    pub processed: usize,
    pub total: usize,
    pub message: String,
}

struct Shared {
    processed: AtomicUsize,
    total: AtomicUsize,
    message: Mutex<String>,
}

pub struct BackgroundIndexer {
    shared: Arc<Shared>,
    cancel: CancelToken,
    handle: Mutex<Option<JoinHandle<Result<SyncReport>>>>,
    watcher: Mutex<Option<FsWatcher>>,
}

impl BackgroundIndexer {
    /// Kicks off the initial sync in the background and returns immediately.
    /// Once the sync completes it starts the watcher when
    /// `config.index.enable_watcher` is set, unless the caller cancelled.
    pub fn start(
        config: Config,
        extraction_router: Arc<ExtractionRouter>,
        store: Arc<dyn VectorStore>,
        indexer: Arc<SemanticIndexer>,
        force_rebuild: bool,
    ) -> Arc<Self> {
        let shared = Arc::new(Shared {
            processed: AtomicUsize::new(0),
            total: AtomicUsize::new(0),
            message: Mutex::new("starting".to_string()),
        });
        let cancel = CancelToken::new();

        let this = Arc::new(Self {
            shared: shared.clone(),
            cancel: cancel.clone(),
            handle: Mutex::new(None),
            watcher: Mutex::new(None),
        });

        let task_shared = shared.clone();
        let task_cancel = cancel.clone();
        let task_config = config.clone();
        let task_router = extraction_router.clone();
        let task_store = store.clone();
        let task_indexer = indexer.clone();
        let this_for_watcher = this.clone();

        let handle = tokio::spawn(async move {
            let sync = DirectorySynchronizer::new(task_router.clone(), task_store, task_indexer.clone());
            let progress = move |processed: usize, total: usize, message: &str| {
                task_shared.processed.store(processed, Ordering::SeqCst);
                task_shared.total.store(total, Ordering::SeqCst);
                if let Ok(mut guard) = task_shared.message.lock() {
                    *guard = message.to_string();
                }
            };

            let report = sync
                .sync(
                    &task_config.root,
                    true,
                    &task_config.allowed_list,
                    &task_config.block_list,
                    64,
                    force_rebuild,
                    Some(&progress),
                    Some(&task_cancel),
                )
                .await?;

            if !report.cancelled && task_config.index.enable_watcher {
                match FsWatcher::start(
                    &task_config.root,
                    task_router,
                    task_config.allowed_list.clone(),
                    task_config.block_list.clone(),
                    task_indexer,
                    Duration::from_millis(task_config.index.debounce_ms),
                ) {
                    Ok(watcher) => {
                        if let Ok(mut guard) = this_for_watcher.watcher.lock() {
                            *guard = Some(watcher);
                        }
                    }
                    Err(e) => log::warn!("failed to start filesystem watcher: {e}"),
                }
            }

            Ok(report)
        });

        *this.handle.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
        this
    }

    pub fn progress(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            processed: self.shared.processed.load(Ordering::SeqCst),
            total: self.shared.total.load(Ordering::SeqCst),
            message: self
                .shared
                .message
                .lock()
                .map(|m| m.clone())
                .unwrap_or_default(),
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn stop_watcher(&self) {
        if let Ok(mut guard) = self.watcher.lock() {
            if let Some(watcher) = guard.take() {
                watcher.stop();
            }
        }
    }
}

/// Convenience constructor assembled from a loaded config, mirroring the
/// wiring a thin CLI front-end performs (spec.md §6).
pub fn db_path_for(config: &Config) -> PathBuf {
    if config.index.db_path.is_absolute() {
        config.index.db_path.clone()
    } else {
        config.root.join(&config.index.db_path)
    }
}
