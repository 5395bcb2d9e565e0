//! Reference-counted scratch-directory handles.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};
use walkdir::WalkDir;

/// Deletion callback fired when the last handle on a scratch directory is
/// released.
pub type CleanupFn = Arc<dyn Fn(&Path) + Send + Sync>;

/// A shared capability over one materialized repository's backing storage.
///
/// Clones share one reference count; the cleanup callback runs exactly once,
/// when the final clone is dropped. The `Arc` strong count is the counter and
/// taking the callback out of its `Option` inside `Drop` is the fire-once
/// gate — `Drop` on the inner value cannot run twice.
pub struct ScratchDir {
    inner: Arc<ScratchInner>,
}

struct ScratchInner {
    path: PathBuf,
    cleanup: Option<CleanupFn>,
}

impl ScratchDir {
    /// A handle whose last release force-deletes `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_cleanup(path, Arc::new(remove_scratch))
    }

    /// A handle with a caller-supplied deletion callback.
    pub fn with_cleanup(path: impl Into<PathBuf>, cleanup: CleanupFn) -> Self {
        Self {
            inner: Arc::new(ScratchInner {
                path: path.into(),
                cleanup: Some(cleanup),
            }),
        }
    }

    /// The directory this handle keeps alive.
    pub fn path(&self) -> &Path {
        &self.inner.path
    }
}

impl Clone for ScratchDir {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl std::fmt::Debug for ScratchDir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScratchDir")
            .field("path", &self.inner.path)
            .field("handles", &Arc::strong_count(&self.inner))
            .finish()
    }
}

impl Drop for ScratchInner {
    fn drop(&mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            cleanup(&self.path);
        }
    }
}

/// Force-delete a scratch directory.
///
/// Read-only bits are cleared first — git writes its object files read-only —
/// then the tree is removed recursively. Failures are logged and swallowed:
/// one directory's cleanup must not poison the rest of the run.
pub fn remove_scratch(path: &Path) {
    if !path.exists() {
        return;
    }

    for entry in WalkDir::new(path).into_iter().filter_map(|e| e.ok()) {
        if let Ok(metadata) = entry.metadata() {
            let mut permissions = metadata.permissions();
            if permissions.readonly() {
                #[allow(clippy::permissions_set_readonly_false)]
                permissions.set_readonly(false);
                let _ = std::fs::set_permissions(entry.path(), permissions);
            }
        }
    }

    match std::fs::remove_dir_all(path) {
        Ok(()) => debug!(path = %path.display(), "removed scratch directory"),
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove scratch directory"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    fn temp_scratch(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "joincensus-scratch-{tag}-{}",
            uuid::Uuid::now_v7()
        ));
        std::fs::create_dir_all(&dir).expect("create scratch dir");
        std::fs::write(dir.join("marker.txt"), "marker").expect("write marker");
        dir
    }

    fn counting_cleanup(counter: Arc<AtomicUsize>) -> CleanupFn {
        Arc::new(move |path: &Path| {
            counter.fetch_add(1, Ordering::SeqCst);
            remove_scratch(path);
        })
    }

    #[test]
    fn deletion_fires_once_after_last_release_in_any_order() {
        const ORDERS: [[usize; 3]; 6] = [
            [0, 1, 2],
            [0, 2, 1],
            [1, 0, 2],
            [1, 2, 0],
            [2, 0, 1],
            [2, 1, 0],
        ];

        for order in ORDERS {
            let dir = temp_scratch("perm");
            let deletions = Arc::new(AtomicUsize::new(0));

            let first = ScratchDir::with_cleanup(&dir, counting_cleanup(deletions.clone()));
            let mut handles: Vec<Option<ScratchDir>> =
                vec![Some(first.clone()), Some(first.clone()), Some(first)];

            for (released, index) in order.iter().enumerate() {
                assert_eq!(
                    deletions.load(Ordering::SeqCst),
                    0,
                    "deleted after only {released} of 3 releases (order {order:?})"
                );
                assert!(dir.exists());
                handles[*index] = None;
            }

            assert_eq!(deletions.load(Ordering::SeqCst), 1, "order {order:?}");
            assert!(!dir.exists(), "order {order:?}");
        }
    }

    #[test]
    fn no_premature_deletion_with_concurrent_readers() {
        let dir = temp_scratch("readers");
        let deletions = Arc::new(AtomicUsize::new(0));
        let scratch = ScratchDir::with_cleanup(&dir, counting_cleanup(deletions.clone()));

        let readers: Vec<_> = (0..4)
            .map(|i| {
                let handle = scratch.clone();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        let content = std::fs::read_to_string(handle.path().join("marker.txt"))
                            .expect("marker readable while handle is held");
                        assert_eq!(content, "marker");
                    }
                    i
                })
            })
            .collect();

        drop(scratch);
        for reader in readers {
            reader.join().expect("reader thread");
        }

        assert_eq!(deletions.load(Ordering::SeqCst), 1);
        assert!(!dir.exists());
    }

    #[test]
    fn remove_scratch_clears_readonly_entries() {
        let dir = temp_scratch("readonly");
        let file = dir.join("object");
        std::fs::write(&file, "data").expect("write file");
        let mut permissions = std::fs::metadata(&file).expect("metadata").permissions();
        permissions.set_readonly(true);
        std::fs::set_permissions(&file, permissions).expect("set readonly");

        remove_scratch(&dir);

        assert!(!dir.exists());
    }

    #[test]
    fn remove_scratch_tolerates_missing_path() {
        let ghost = std::env::temp_dir().join(format!("joincensus-ghost-{}", uuid::Uuid::now_v7()));
        remove_scratch(&ghost);
    }
}
