//! Application configuration for joincensus.
//!
//! User config lives at `~/.joincensus/joincensus.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{JoincensusError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "joincensus.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".joincensus";

// ---------------------------------------------------------------------------
// Config structs (matching joincensus.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Search endpoint settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Clone scanning settings.
    #[serde(default)]
    pub scan: ScanConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Working root under which clones are materialized and later deleted.
    #[serde(default = "default_working_dir")]
    pub working_dir: String,

    /// Total repository cap for a run.
    #[serde(default = "default_max_repos")]
    pub max_repos: usize,

    /// Concurrent clone subprocesses.
    #[serde(default = "default_clone_concurrency")]
    pub clone_concurrency: usize,

    /// Report rows to print.
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            working_dir: default_working_dir(),
            max_repos: default_max_repos(),
            clone_concurrency: default_clone_concurrency(),
            top_n: default_top_n(),
        }
    }
}

fn default_working_dir() -> String {
    std::env::temp_dir()
        .join("joincensus")
        .to_string_lossy()
        .into_owned()
}
fn default_max_repos() -> usize {
    1000
}
fn default_clone_concurrency() -> usize {
    2
}
fn default_top_n() -> usize {
    10
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Base URL of the search API (overridable for tests).
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Language filter for the repository query.
    #[serde(default = "default_language")]
    pub language: String,

    /// Popularity ceiling (`stars:<=N` qualifier).
    #[serde(default = "default_max_stars")]
    pub max_stars: u32,

    /// Results per page.
    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// Pages fetched per pagination cycle before restarting from page 1.
    #[serde(default = "default_pages_per_cycle")]
    pub pages_per_cycle: u32,

    /// Name of the env var holding the API token (never store the token itself).
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// HTTP timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Consecutive cycles the cursor may stall before the crawl gives up.
    #[serde(default = "default_max_stalled_cycles")]
    pub max_stalled_cycles: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            language: default_language(),
            max_stars: default_max_stars(),
            per_page: default_per_page(),
            pages_per_cycle: default_pages_per_cycle(),
            token_env: default_token_env(),
            timeout_secs: default_timeout_secs(),
            max_stalled_cycles: default_max_stalled_cycles(),
        }
    }
}

fn default_api_base() -> String {
    "https://api.github.com".into()
}
fn default_language() -> String {
    "rust".into()
}
fn default_max_stars() -> u32 {
    100
}
fn default_per_page() -> u32 {
    100
}
fn default_pages_per_cycle() -> u32 {
    10
}
fn default_token_env() -> String {
    "GITHUB_TOKEN".into()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_stalled_cycles() -> u32 {
    3
}

/// `[scan]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// File extensions handed to the analyzer.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
        }
    }
}

fn default_extensions() -> Vec<String> {
    vec!["rs".into()]
}

// ---------------------------------------------------------------------------
// Census config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime census configuration — merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct CensusConfig {
    /// Working root for materialized clones.
    pub working_dir: PathBuf,
    /// Total repository cap for the run.
    pub max_repos: usize,
    /// Concurrent clone subprocesses.
    pub clone_concurrency: usize,
    /// Report rows to print.
    pub top_n: usize,
    /// File extensions handed to the analyzer.
    pub extensions: Vec<String>,
    /// Base URL of the search API.
    pub api_base: String,
    /// Language filter.
    pub language: String,
    /// Popularity ceiling.
    pub max_stars: u32,
    /// Results per page.
    pub per_page: u32,
    /// Pages per pagination cycle.
    pub pages_per_cycle: u32,
    /// Env var holding the API token.
    pub token_env: String,
    /// HTTP timeout in seconds.
    pub timeout_secs: u64,
    /// Stalled-cycle cap before the crawl gives up.
    pub max_stalled_cycles: u32,
}

impl From<&AppConfig> for CensusConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            working_dir: PathBuf::from(&config.defaults.working_dir),
            max_repos: config.defaults.max_repos,
            clone_concurrency: config.defaults.clone_concurrency,
            top_n: config.defaults.top_n,
            extensions: config.scan.extensions.clone(),
            api_base: config.search.api_base.clone(),
            language: config.search.language.clone(),
            max_stars: config.search.max_stars,
            per_page: config.search.per_page,
            pages_per_cycle: config.search.pages_per_cycle,
            token_env: config.search.token_env.clone(),
            timeout_secs: config.search.timeout_secs,
            max_stalled_cycles: config.search.max_stalled_cycles,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.joincensus/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| JoincensusError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.joincensus/joincensus.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| JoincensusError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        JoincensusError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| JoincensusError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| JoincensusError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| JoincensusError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
