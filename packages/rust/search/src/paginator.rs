//! The pagination cursor loop.
//!
//! Turns the windowed search endpoint into a lazy, de-duplicated stream of
//! repository identifiers. Each attempt moves through three steps: fetching
//! a page, backing off when the provider says so, and advancing the cursor
//! once a page is confirmed complete. The boundary timestamp only ever moves
//! backward through time; an "incomplete" page is a non-deterministic sample
//! that cannot prove anything about the window, so it never advances it.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use joincensus_shared::RepoId;

use crate::client::{PageFetch, SearchClient};

/// Identifiers buffered ahead of the consumer.
const CHANNEL_CAPACITY: usize = 32;

/// Pagination state: the crawl's position marker. Owned exclusively by the
/// paginator task; returned once the loop ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    /// Upper bound on last-push time for the current window.
    pub boundary: DateTime<Utc>,
    /// Page index within the current cycle.
    pub page: u32,
}

/// Spawn the paginator task.
///
/// Returns the identifier stream and a handle resolving to the final cursor.
/// The stream ends when `cancel` fires, when the receiver is dropped (the
/// caller's total-item cap), or when the boundary stalls for the configured
/// number of consecutive cycles.
pub fn spawn_paginator(
    client: SearchClient,
    start: DateTime<Utc>,
    cancel: watch::Receiver<bool>,
) -> (mpsc::Receiver<RepoId>, JoinHandle<Cursor>) {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let handle = tokio::spawn(run_paginator(client, start, tx, cancel));
    (rx, handle)
}

async fn run_paginator(
    client: SearchClient,
    start: DateTime<Utc>,
    tx: mpsc::Sender<RepoId>,
    mut cancel: watch::Receiver<bool>,
) -> Cursor {
    let pages_per_cycle = client.opts().pages_per_cycle.max(1);
    let max_stalled_cycles = client.opts().max_stalled_cycles.max(1);

    let mut seen: HashSet<RepoId> = HashSet::new();
    let mut cursor = Cursor {
        boundary: start,
        page: 1,
    };
    let mut stalled_cycles: u32 = 0;

    info!(boundary = %cursor.boundary, pages_per_cycle, "starting pagination");

    'cycles: loop {
        let cycle_boundary = cursor.boundary;

        'pages: for page in 1..=pages_per_cycle {
            cursor.page = page;

            // Fetching → (Backoff →)* page in hand. Retries are capped only
            // by cancellation; the cancel channel's sole transition is to
            // `true`, so a sender drop reads the same as a cancel.
            let page_body = loop {
                if *cancel.borrow() {
                    break 'cycles;
                }
                let fetched = tokio::select! {
                    _ = cancel.changed() => break 'cycles,
                    fetched = client.fetch_page(cursor.boundary, page) => fetched,
                };
                match fetched {
                    Ok(PageFetch::Page(body)) => break body,
                    Ok(PageFetch::RateLimited { reset_at }) => {
                        let wait = (reset_at - Utc::now())
                            .to_std()
                            .unwrap_or(std::time::Duration::ZERO);
                        info!(%reset_at, wait_secs = wait.as_secs(), "rate limited, backing off");
                        tokio::select! {
                            _ = cancel.changed() => break 'cycles,
                            _ = tokio::time::sleep(wait) => {}
                        }
                    }
                    Err(e) => {
                        debug!(page, error = %e, "transient fetch error, retrying");
                    }
                }
            };

            let mut min_pushed: Option<DateTime<Utc>> = None;
            let mut emitted = 0usize;
            for (id, pushed_at) in page_body.records() {
                min_pushed = Some(match min_pushed {
                    Some(min) => min.min(pushed_at),
                    None => pushed_at,
                });
                if seen.insert(id.clone()) {
                    if tx.send(id).await.is_err() {
                        debug!("downstream closed, stopping pagination");
                        break 'cycles;
                    }
                    emitted += 1;
                }
            }

            // AdvancingCursor: only a complete page proves the whole slice
            // below the old boundary was observed.
            if page_body.incomplete_results {
                debug!(page, emitted, "incomplete page, boundary unchanged");
            } else if let Some(min) = min_pushed {
                if min < cursor.boundary {
                    cursor.boundary = min;
                }
                debug!(page, emitted, boundary = %cursor.boundary, "page complete");
            } else {
                debug!(page, "complete empty page, window exhausted for this cycle");
                break 'pages;
            }
        }

        if cursor.boundary < cycle_boundary {
            stalled_cycles = 0;
        } else {
            stalled_cycles += 1;
            if stalled_cycles >= max_stalled_cycles {
                warn!(
                    cycles = stalled_cycles,
                    boundary = %cursor.boundary,
                    "boundary stalled, closing identifier stream"
                );
                break 'cycles;
            }
        }
    }

    info!(
        yielded = seen.len(),
        boundary = %cursor.boundary,
        "pagination finished"
    );
    cursor
}
