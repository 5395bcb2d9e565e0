//! Clone scanning: source-file enumeration and the scratch-directory
//! lifecycle.
//!
//! Every file discovered under a materialized repository carries a
//! [`ScratchDir`] handle on the backing directory; the directory is
//! force-deleted exactly once, when the last handle is released.

mod enumerate;
mod scratch;

pub use enumerate::{SourceFile, enumerate};
pub use scratch::{CleanupFn, ScratchDir, remove_scratch};
