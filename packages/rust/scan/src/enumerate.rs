//! Source-file enumeration over a materialized repository.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::scratch::{CleanupFn, ScratchDir};

/// One file to analyze, holding the handle that keeps its repository's
/// scratch directory alive. Dropping the pair releases the handle.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub scratch: ScratchDir,
}

/// List source files under `path` and wrap each in a shared handle on the
/// backing directory.
///
/// The whole handle group is built before anything is returned: the group's
/// reference count covers every file up front, so a consumer releasing the
/// first dispatched handle can never trigger deletion while siblings are
/// still being created. An absent `path` (failed materialization upstream)
/// yields an empty batch; a repository with no matching files has its
/// scratch directory deleted before this function returns.
pub fn enumerate(path: &Path, extensions: &[String], cleanup: CleanupFn) -> Vec<SourceFile> {
    if !path.exists() {
        return Vec::new();
    }

    let scratch = ScratchDir::with_cleanup(path, cleanup);
    let mut files = Vec::new();

    for entry in WalkDir::new(path) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if matches_extension(entry.path(), extensions) {
            files.push(SourceFile {
                path: entry.into_path(),
                scratch: scratch.clone(),
            });
        }
    }

    debug!(path = %path.display(), files = files.len(), "enumerated repository");
    files
    // the constructor's own handle drops here; with zero matching files the
    // count hits zero immediately and the clone is cleaned up
}

fn matches_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}
