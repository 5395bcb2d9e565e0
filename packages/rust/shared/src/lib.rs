//! Shared types, error model, and configuration for joincensus.
//!
//! This crate is the foundation depended on by all other joincensus crates.
//! It provides:
//! - [`JoincensusError`] — the unified error type
//! - Domain types ([`RepoId`], [`Stats`])
//! - Configuration ([`AppConfig`], [`CensusConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CensusConfig, DefaultsConfig, ScanConfig, SearchConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use error::{JoincensusError, Result};
pub use types::{RepoId, Stats};
