//! Bounded background file removal
//!
//! Evictions can arrive in bursts. Each removal runs as a detached task, and
//! a semaphore caps how many of them touch the filesystem at once so a burst
//! cannot exhaust threads or file descriptors.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::fs;
use tokio::runtime::Handle;
use tokio::sync::{Notify, Semaphore};

/// Default cap on concurrent removals
#[cfg(target_os = "macos")]
pub const DEFAULT_MAX_CONCURRENT_REMOVALS: usize = 3000;

/// Default cap on concurrent removals
#[cfg(not(target_os = "macos"))]
pub const DEFAULT_MAX_CONCURRENT_REMOVALS: usize = 5000;

struct RemoverInner {
    permits: Semaphore,
    max_concurrent: usize,
    pending: AtomicUsize,
    idle: Notify,
}

/// Deletes evicted files in the background with bounded concurrency
#[derive(Clone)]
pub struct FileRemover {
    inner: Arc<RemoverInner>,
    runtime: Handle,
}

impl FileRemover {
    /// Create a remover that spawns its tasks on `runtime`
    pub fn new(max_concurrent: usize, runtime: Handle) -> Self {
        let max_concurrent = max_concurrent.max(1);
        tracing::info!(max_concurrent, "limiting concurrent file removals");
        Self {
            inner: Arc::new(RemoverInner {
                permits: Semaphore::new(max_concurrent),
                max_concurrent,
                pending: AtomicUsize::new(0),
                idle: Notify::new(),
            }),
            runtime,
        }
    }

    /// Queue `path` for removal and return immediately
    ///
    /// Safe to call from any thread, including while a lock is held: the
    /// caller never waits for a permit, the spawned task does.
    pub fn remove(&self, path: PathBuf) {
        self.inner.pending.fetch_add(1, Ordering::AcqRel);
        let inner = Arc::clone(&self.inner);
        self.runtime.spawn(async move {
            match inner.permits.acquire().await {
                Ok(_permit) => remove_file_logged(&path).await,
                Err(_) => tracing::warn!(
                    path = %path.display(),
                    "removal semaphore closed, leaving file on disk"
                ),
            }
            if inner.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
                inner.idle.notify_waiters();
            }
        });
    }

    /// Removals queued or in flight
    pub fn pending(&self) -> usize {
        self.inner.pending.load(Ordering::Acquire)
    }

    pub fn max_concurrent(&self) -> usize {
        self.inner.max_concurrent
    }

    /// Wait until every queued removal has finished
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl std::fmt::Debug for FileRemover {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileRemover")
            .field("max_concurrent", &self.inner.max_concurrent)
            .field("pending", &self.pending())
            .finish()
    }
}

/// Remove a file, logging failures; a missing file is not an error
async fn remove_file_logged(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => tracing::trace!(path = %path.display(), "removed evicted file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to remove evicted file"
            );
        }
    }
}
