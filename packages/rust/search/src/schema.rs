//! Typed decoding of the repository search payload.
//!
//! The fields the census needs are optional at the wire level; records
//! missing any of them are skipped during iteration rather than accessed
//! dynamically.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use joincensus_shared::RepoId;

/// One page of search results.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchPage {
    /// Provider-reported flag: `true` means the page is an approximate
    /// sample, not a stable slice of the query window.
    #[serde(default)]
    pub incomplete_results: bool,

    #[serde(default)]
    pub items: Vec<SearchItem>,
}

/// One search hit.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchItem {
    pub full_name: Option<String>,
    pub pushed_at: Option<DateTime<Utc>>,
}

impl SearchPage {
    /// Well-formed `(identifier, last-push)` pairs, skipping records that
    /// are missing either field or carry a malformed identifier.
    pub fn records(&self) -> impl Iterator<Item = (RepoId, DateTime<Utc>)> + '_ {
        self.items.iter().filter_map(|item| {
            let name = item.full_name.as_deref()?;
            let pushed_at = item.pushed_at?;
            match name.parse::<RepoId>() {
                Ok(id) => Some((id, pushed_at)),
                Err(e) => {
                    tracing::debug!(name, error = %e, "skipping malformed search record");
                    None
                }
            }
        })
    }
}
