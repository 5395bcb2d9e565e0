//! Core domain types for the joincensus crawl.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::JoincensusError;

// ---------------------------------------------------------------------------
// RepoId
// ---------------------------------------------------------------------------

/// A repository identifier in `owner/name` form, as reported by the search
/// endpoint. Opaque downstream: the pipeline only ever compares, displays,
/// and derives paths from it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepoId(String);

impl RepoId {
    /// The raw `owner/name` string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The HTTPS clone URL for this repository.
    pub fn clone_url(&self) -> String {
        format!("https://github.com/{}.git", self.0)
    }

    /// Deterministic, filesystem-safe directory name under the working root.
    pub fn dir_name(&self) -> String {
        self.0.replace('/', "__")
    }
}

impl std::fmt::Display for RepoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RepoId {
    type Err = JoincensusError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((owner, name))
                if !owner.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok(Self(s.to_string()))
            }
            _ => Err(JoincensusError::validation(format!(
                "identifier '{s}' is not of the form owner/name"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Per-file and aggregate census tally.
///
/// Forms a commutative monoid under [`Stats::merge`] with [`Stats::default`]
/// as the identity, so partial results may be folded in whatever order they
/// arrive from the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    /// Occurrence count per join-separator literal.
    #[serde(default)]
    pub separators: HashMap<String, u64>,

    /// Files the analyzer inspected.
    #[serde(default)]
    pub files_scanned: u64,

    /// Files that could not be read; counted, never fatal.
    #[serde(default)]
    pub unreadable_files: u64,
}

impl Stats {
    /// Count one occurrence of `separator`.
    pub fn record(&mut self, separator: impl Into<String>) {
        *self.separators.entry(separator.into()).or_insert(0) += 1;
    }

    /// Fold `other` into this tally, point-wise.
    pub fn merge(&mut self, other: Stats) {
        for (separator, count) in other.separators {
            *self.separators.entry(separator).or_insert(0) += count;
        }
        self.files_scanned += other.files_scanned;
        self.unreadable_files += other.unreadable_files;
    }

    /// Total separator occurrences across all categories.
    pub fn total(&self) -> u64 {
        self.separators.values().sum()
    }
}
