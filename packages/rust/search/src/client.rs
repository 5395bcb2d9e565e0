//! Rate-limit-aware client for the repository search endpoint.

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, StatusCode, header::HeaderMap};
use tracing::debug;

use joincensus_shared::{CensusConfig, JoincensusError, Result};

use crate::schema::SearchPage;

/// User-Agent string for search requests.
const USER_AGENT: &str = concat!("joincensus/", env!("CARGO_PKG_VERSION"));

/// Backoff applied when a rate-limit response carries no usable reset hint.
const RESET_FALLBACK_SECS: i64 = 60;

// ---------------------------------------------------------------------------
// SearchOptions
// ---------------------------------------------------------------------------

/// Configuration for the search client and pagination loop.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Base URL of the search API (overridable for tests).
    pub api_base: String,
    /// Language filter for the repository query.
    pub language: String,
    /// Popularity ceiling (`stars:<=N` qualifier).
    pub max_stars: u32,
    /// Results per page.
    pub per_page: u32,
    /// Pages fetched per pagination cycle.
    pub pages_per_cycle: u32,
    /// Bearer token, if configured.
    pub token: Option<String>,
    /// HTTP timeout in seconds.
    pub timeout_secs: u64,
    /// Consecutive cycles the cursor may stall before the crawl gives up.
    pub max_stalled_cycles: u32,
}

impl SearchOptions {
    /// Build options from the runtime census config, reading the API token
    /// from the configured environment variable.
    pub fn from_census(config: &CensusConfig) -> Self {
        let token = std::env::var(&config.token_env)
            .ok()
            .filter(|t| !t.is_empty());
        Self {
            api_base: config.api_base.clone(),
            language: config.language.clone(),
            max_stars: config.max_stars,
            per_page: config.per_page,
            pages_per_cycle: config.pages_per_cycle,
            token,
            timeout_secs: config.timeout_secs,
            max_stalled_cycles: config.max_stalled_cycles,
        }
    }
}

// ---------------------------------------------------------------------------
// SearchClient
// ---------------------------------------------------------------------------

/// Outcome of one page fetch.
#[derive(Debug, Clone)]
pub enum PageFetch {
    /// A decoded result page.
    Page(SearchPage),
    /// The provider rejected the request; retry no earlier than `reset_at`.
    RateLimited { reset_at: DateTime<Utc> },
}

/// Typed client for the paginated repository search endpoint.
pub struct SearchClient {
    http: Client,
    opts: SearchOptions,
}

impl SearchClient {
    /// Create a new client with the given options.
    pub fn new(opts: SearchOptions) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(opts.timeout_secs))
            .build()
            .map_err(|e| JoincensusError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, opts })
    }

    /// Options this client was built with.
    pub fn opts(&self) -> &SearchOptions {
        &self.opts
    }

    /// Fetch one page of repositories last pushed strictly before `boundary`.
    ///
    /// Rate-limit rejections are returned as [`PageFetch::RateLimited`];
    /// transport failures and malformed payloads surface as errors for the
    /// caller's retry loop.
    pub async fn fetch_page(&self, boundary: DateTime<Utc>, page: u32) -> Result<PageFetch> {
        let url = format!(
            "{}/search/repositories",
            self.opts.api_base.trim_end_matches('/')
        );
        let query = format!(
            "language:{} stars:<={} pushed:<{}",
            self.opts.language,
            self.opts.max_stars,
            boundary.to_rfc3339_opts(SecondsFormat::Secs, true)
        );

        let per_page = self.opts.per_page.to_string();
        let page_index = page.to_string();
        let mut request = self.http.get(&url).query(&[
            ("q", query.as_str()),
            ("sort", "updated"),
            ("order", "desc"),
            ("per_page", per_page.as_str()),
            ("page", page_index.as_str()),
        ]);
        if let Some(token) = &self.opts.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| JoincensusError::Network(format!("{url} page {page}: {e}")))?;

        let status = response.status();
        if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
            let reset_at = reset_time(response.headers());
            debug!(page, %reset_at, "search request rate limited");
            return Ok(PageFetch::RateLimited { reset_at });
        }
        if !status.is_success() {
            return Err(JoincensusError::Network(format!(
                "{url} page {page}: HTTP {status}"
            )));
        }

        let page_body: SearchPage = response
            .json()
            .await
            .map_err(|e| JoincensusError::decode(format!("page {page}: {e}")))?;

        Ok(PageFetch::Page(page_body))
    }
}

/// Read the provider's reset-time hint (epoch seconds). Absent or malformed
/// headers fall back to a fixed pause rather than an immediate retry.
fn reset_time(headers: &HeaderMap) -> DateTime<Utc> {
    headers
        .get("x-ratelimit-reset")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<i64>().ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .unwrap_or_else(|| Utc::now() + chrono::Duration::seconds(RESET_FALLBACK_SECS))
}
