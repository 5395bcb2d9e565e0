//! Repository materialization: shallow-clone each identifier into the
//! working root.
//!
//! The fetch itself sits behind the [`Fetcher`] seam so tests (and other
//! transports) can stand in for the git subprocess. Materialization is
//! idempotent over the destination directory: whatever is already on disk —
//! including partial state from a prior run — counts as materialized.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use joincensus_shared::{JoincensusError, RepoId, Result};

/// Transport for bringing a repository's contents onto local disk.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Populate `dest` with the repository's contents. Success means the
    /// destination directory exists and is populated; on failure the
    /// destination is expected to be absent.
    async fn fetch(&self, repo: &RepoId, dest: &Path) -> Result<()>;
}

/// Shallow-clones repositories with the system `git`.
pub struct GitFetcher;

#[async_trait]
impl Fetcher for GitFetcher {
    async fn fetch(&self, repo: &RepoId, dest: &Path) -> Result<()> {
        let status = tokio::process::Command::new("git")
            .arg("clone")
            .arg("--depth")
            .arg("1")
            .arg("--quiet")
            .arg(repo.clone_url())
            .arg(dest)
            .status()
            .await
            .map_err(|e| JoincensusError::Fetch(format!("failed to launch git: {e}")))?;

        if status.success() {
            info!(repo = %repo, path = %dest.display(), "cloned repository");
            Ok(())
        } else {
            Err(JoincensusError::Fetch(format!(
                "git clone {repo} exited with {status}"
            )))
        }
    }
}

/// Materialize one repository under `working_dir`.
///
/// Returns the local path, or `None` when the fetch failed and left nothing
/// behind — a valid terminal state for that identifier: logged, not retried,
/// and never fatal to the run.
pub async fn materialize(
    fetcher: &dyn Fetcher,
    repo: &RepoId,
    working_dir: &Path,
) -> Option<PathBuf> {
    let dest = working_dir.join(repo.dir_name());

    if dest.exists() {
        debug!(repo = %repo, path = %dest.display(), "already materialized, skipping fetch");
        return Some(dest);
    }

    match fetcher.fetch(repo, &dest).await {
        Ok(()) if dest.exists() => Some(dest),
        Ok(()) => {
            warn!(repo = %repo, "fetch reported success but left no directory");
            None
        }
        Err(e) => {
            if dest.exists() {
                warn!(repo = %repo, error = %e, "fetch failed but destination exists, keeping it");
                Some(dest)
            } else {
                warn!(repo = %repo, error = %e, "fetch failed, skipping repository");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubFetcher {
        calls: AtomicUsize,
        outcome: StubOutcome,
    }

    enum StubOutcome {
        CreateDir,
        FailAbsent,
        FailButLeaveDir,
    }

    impl StubFetcher {
        fn new(outcome: StubOutcome) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                outcome,
            }
        }
    }

    #[async_trait]
    impl Fetcher for StubFetcher {
        async fn fetch(&self, _repo: &RepoId, dest: &Path) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.outcome {
                StubOutcome::CreateDir => {
                    std::fs::create_dir_all(dest).map_err(|e| JoincensusError::io(dest, e))
                }
                StubOutcome::FailAbsent => {
                    Err(JoincensusError::Fetch("simulated clone failure".into()))
                }
                StubOutcome::FailButLeaveDir => {
                    std::fs::create_dir_all(dest).map_err(|e| JoincensusError::io(dest, e))?;
                    Err(JoincensusError::Fetch("interrupted mid-clone".into()))
                }
            }
        }
    }

    fn temp_working_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("joincensus-fetch-{tag}-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).expect("create working dir");
        dir
    }

    fn repo(name: &str) -> RepoId {
        name.parse().expect("repo id")
    }

    #[tokio::test]
    async fn materialize_invokes_fetcher_and_returns_path() {
        let working = temp_working_dir("ok");
        let fetcher = StubFetcher::new(StubOutcome::CreateDir);

        let path = materialize(&fetcher, &repo("alice/alpha"), &working).await;

        assert_eq!(path, Some(working.join("alice__alpha")));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);

        let _ = std::fs::remove_dir_all(&working);
    }

    #[tokio::test]
    async fn materialize_skips_existing_destination() {
        let working = temp_working_dir("existing");
        std::fs::create_dir_all(working.join("alice__alpha")).expect("pre-create dest");
        let fetcher = StubFetcher::new(StubOutcome::CreateDir);

        let path = materialize(&fetcher, &repo("alice/alpha"), &working).await;

        assert!(path.is_some());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0, "must not re-fetch");

        let _ = std::fs::remove_dir_all(&working);
    }

    #[tokio::test]
    async fn failed_fetch_with_absent_directory_yields_none() {
        let working = temp_working_dir("fail");
        let fetcher = StubFetcher::new(StubOutcome::FailAbsent);

        let path = materialize(&fetcher, &repo("bob/beta"), &working).await;

        assert_eq!(path, None);

        let _ = std::fs::remove_dir_all(&working);
    }

    #[tokio::test]
    async fn failed_fetch_with_leftover_directory_counts_as_materialized() {
        let working = temp_working_dir("leftover");
        let fetcher = StubFetcher::new(StubOutcome::FailButLeaveDir);

        let path = materialize(&fetcher, &repo("carol/gamma"), &working).await;

        assert_eq!(path, Some(working.join("carol__gamma")));

        let _ = std::fs::remove_dir_all(&working);
    }
}
