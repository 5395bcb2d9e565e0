//! Top-level census orchestration: paginator + pipeline wiring.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{info, instrument};

use joincensus_analyze::SeparatorAnalyzer;
use joincensus_fetch::GitFetcher;
use joincensus_search::{SearchClient, SearchOptions, spawn_paginator};
use joincensus_shared::{CensusConfig, JoincensusError, Result};

use crate::pipeline::{PipelineConfig, PipelineSummary, ProgressReporter, run_pipeline};

/// Result of a full census run.
#[derive(Debug)]
pub struct CensusSummary {
    /// Pipeline totals and the aggregate tally.
    pub pipeline: PipelineSummary,
    /// Where the crawl's cursor ended up, if the paginator wound down cleanly.
    pub final_boundary: Option<DateTime<Utc>>,
}

/// Run one census: crawl the search endpoint, clone and scan repositories,
/// and fold the per-file statistics into one tally.
///
/// `cancel` aborts the paginator's waits; in-flight clone and analysis work
/// drains rather than being killed, so partially fetched clones still get
/// cleaned up. The summary is best-effort by design — a cancelled run yields
/// a lower bound on the true counts.
#[instrument(skip_all, fields(language = %config.language, max_repos = config.max_repos))]
pub async fn run_census(
    config: &CensusConfig,
    cancel: watch::Receiver<bool>,
    progress: Arc<dyn ProgressReporter>,
) -> Result<CensusSummary> {
    std::fs::create_dir_all(&config.working_dir)
        .map_err(|e| JoincensusError::io(&config.working_dir, e))?;

    let client = SearchClient::new(SearchOptions::from_census(config))?;
    let (ids, paginator) = spawn_paginator(client, Utc::now(), cancel);

    let pipeline_config = PipelineConfig {
        working_dir: config.working_dir.clone(),
        max_repos: config.max_repos,
        clone_concurrency: config.clone_concurrency,
        extensions: config.extensions.clone(),
    };

    let summary = run_pipeline(
        ids,
        Arc::new(GitFetcher),
        Arc::new(SeparatorAnalyzer::new()),
        &pipeline_config,
        progress,
    )
    .await;

    // The pipeline dropping its receiver is what winds the paginator down.
    let final_boundary = paginator.await.ok().map(|cursor| cursor.boundary);

    info!(
        repos_seen = summary.repos_seen,
        repos_materialized = summary.repos_materialized,
        repos_failed = summary.repos_failed,
        files = summary.stats.files_scanned,
        separators = summary.stats.total(),
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "census complete"
    );

    Ok(CensusSummary {
        pipeline: summary,
        final_boundary,
    })
}
