//! Bounded multi-stage pipeline: identifiers → clones → files → statistics.
//!
//! Stage layout is the classic bounded-buffer chain: a capped forwarder
//! feeds N unordered clone workers; enumeration, analysis, and aggregation
//! each run with a single in-flight item. Completion propagates by dropping
//! senders — a stage closes its output only once its upstream closed and its
//! own in-flight work finished — so the final fold returning is a barrier on
//! the entire pipeline.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, instrument};

use joincensus_analyze::Analyzer;
use joincensus_fetch::{Fetcher, materialize};
use joincensus_scan::{CleanupFn, SourceFile, enumerate, remove_scratch};
use joincensus_shared::{RepoId, Stats};

/// Configuration for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Working root for materialized clones.
    pub working_dir: PathBuf,
    /// Identifiers admitted from the paginator before the run winds down.
    pub max_repos: usize,
    /// Concurrent clone workers.
    pub clone_concurrency: usize,
    /// File extensions handed to the analyzer.
    pub extensions: Vec<String>,
}

/// Summary of a completed pipeline run.
#[derive(Debug)]
pub struct PipelineSummary {
    /// The aggregate census tally.
    pub stats: Stats,
    /// Identifiers admitted from the paginator.
    pub repos_seen: usize,
    /// Repositories materialized on disk.
    pub repos_materialized: usize,
    /// Repositories whose fetch failed and was skipped.
    pub repos_failed: usize,
    /// Total wall-clock duration.
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// An identifier was admitted into the pipeline.
    fn repo_started(&self, repo: &RepoId, admitted: usize);
    /// A repository landed on disk.
    fn repo_materialized(&self, repo: &RepoId);
    /// One file's analysis finished.
    fn file_analyzed(&self, path: &Path);
    /// The pipeline drained.
    fn done(&self, summary: &PipelineSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn repo_started(&self, _repo: &RepoId, _admitted: usize) {}
    fn repo_materialized(&self, _repo: &RepoId) {}
    fn file_analyzed(&self, _path: &Path) {}
    fn done(&self, _summary: &PipelineSummary) {}
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Run the pipeline over an identifier stream until it drains or the
/// repository cap is reached.
pub async fn run_pipeline(
    ids: mpsc::Receiver<RepoId>,
    fetcher: Arc<dyn Fetcher>,
    analyzer: Arc<dyn Analyzer>,
    config: &PipelineConfig,
    progress: Arc<dyn ProgressReporter>,
) -> PipelineSummary {
    run_stages(ids, fetcher, analyzer, config, progress, Arc::new(remove_scratch)).await
}

#[instrument(skip_all, fields(max_repos = config.max_repos, clone_concurrency = config.clone_concurrency))]
async fn run_stages(
    mut ids: mpsc::Receiver<RepoId>,
    fetcher: Arc<dyn Fetcher>,
    analyzer: Arc<dyn Analyzer>,
    config: &PipelineConfig,
    progress: Arc<dyn ProgressReporter>,
    cleanup: CleanupFn,
) -> PipelineSummary {
    let start = Instant::now();
    let clone_concurrency = config.clone_concurrency.max(1);

    info!(
        working_dir = %config.working_dir.display(),
        max_repos = config.max_repos,
        clone_concurrency,
        "starting pipeline"
    );

    // Cap stage: admit at most `max_repos` identifiers, then drop both
    // channel ends — the paginator observes the closed channel and stops.
    let (repo_tx, repo_rx) = mpsc::channel::<RepoId>(clone_concurrency * 2);
    let max_repos = config.max_repos;
    let cap_progress = progress.clone();
    let cap_task = tokio::spawn(async move {
        let mut admitted = 0usize;
        while admitted < max_repos {
            let Some(repo) = ids.recv().await else { break };
            admitted += 1;
            cap_progress.repo_started(&repo, admitted);
            if repo_tx.send(repo).await.is_err() {
                break;
            }
        }
        debug!(admitted, "identifier stream capped");
        admitted
    });

    // Materialize stage: N workers pull from a shared receiver. Completion
    // order is unordered by design; downstream keys off the path.
    let repo_rx = Arc::new(Mutex::new(repo_rx));
    let (path_tx, path_rx) = mpsc::channel::<PathBuf>(1);
    let materialized = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let mut clone_workers = Vec::with_capacity(clone_concurrency);
    for _ in 0..clone_concurrency {
        let repo_rx = repo_rx.clone();
        let path_tx = path_tx.clone();
        let fetcher = fetcher.clone();
        let working_dir = config.working_dir.clone();
        let materialized = materialized.clone();
        let failed = failed.clone();
        let progress = progress.clone();
        clone_workers.push(tokio::spawn(async move {
            loop {
                // The lock is held only while waiting for the next
                // identifier, never across the fetch.
                let next = { repo_rx.lock().await.recv().await };
                let Some(repo) = next else { break };
                match materialize(fetcher.as_ref(), &repo, &working_dir).await {
                    Some(path) => {
                        materialized.fetch_add(1, Ordering::Relaxed);
                        progress.repo_materialized(&repo);
                        if path_tx.send(path).await.is_err() {
                            break;
                        }
                    }
                    None => {
                        failed.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
        }));
    }
    // The workers hold the only remaining senders; the path channel closes
    // when the last worker exits.
    drop(path_tx);

    // Enumerate stage: capacity 1. Each repository's handle group is fully
    // built before its first file is dispatched, and a repository's files go
    // out back-to-back (FIFO per resource).
    let (file_tx, file_rx) = mpsc::channel::<SourceFile>(1);
    let extensions = config.extensions.clone();
    let enumerate_task = tokio::spawn(async move {
        let mut path_rx = path_rx;
        while let Some(path) = path_rx.recv().await {
            for file in enumerate(&path, &extensions, cleanup.clone()) {
                if file_tx.send(file).await.is_err() {
                    return;
                }
            }
        }
    });

    // Analyze stage: capacity 1. Dropping the pair releases its scratch
    // handle — after analysis, on every path, exactly once.
    let (stats_tx, stats_rx) = mpsc::channel::<Stats>(1);
    let analyze_progress = progress.clone();
    let analyze_task = tokio::spawn(async move {
        let mut file_rx = file_rx;
        while let Some(file) = file_rx.recv().await {
            let partial = analyzer.analyze(&file.path);
            analyze_progress.file_analyzed(&file.path);
            drop(file);
            if stats_tx.send(partial).await.is_err() {
                return;
            }
        }
    });

    // Aggregate stage: a single fold. Arrival order is irrelevant — the
    // tally is a commutative monoid.
    let mut total = Stats::default();
    let mut stats_rx = stats_rx;
    while let Some(partial) = stats_rx.recv().await {
        total.merge(partial);
    }

    // The fold only returns once every sender upstream is gone; joining the
    // tasks here is bookkeeping, not synchronization.
    let repos_seen = cap_task.await.unwrap_or(0);
    for worker in clone_workers {
        let _ = worker.await;
    }
    let _ = enumerate_task.await;
    let _ = analyze_task.await;

    let summary = PipelineSummary {
        stats: total,
        repos_seen,
        repos_materialized: materialized.load(Ordering::Relaxed),
        repos_failed: failed.load(Ordering::Relaxed),
        elapsed: start.elapsed(),
    };

    info!(
        repos_seen = summary.repos_seen,
        repos_materialized = summary.repos_materialized,
        repos_failed = summary.repos_failed,
        files = summary.stats.files_scanned,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "pipeline drained"
    );
    progress.done(&summary);
    summary
}
