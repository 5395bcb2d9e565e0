//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::watch;
use tracing::info;

use joincensus_core::pipeline::{PipelineSummary, ProgressReporter};
use joincensus_core::{report, run_census};
use joincensus_shared::{CensusConfig, RepoId, init_config, load_config};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// joincensus — tally join-separator literals across freshly pushed repositories.
#[derive(Parser)]
#[command(
    name = "joincensus",
    version,
    about = "Crawl a repository search API and tally the separators passed to join() calls.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run a census crawl and print the aggregate report.
    Run {
        /// Stop after this many repositories.
        #[arg(long)]
        max_repos: Option<usize>,

        /// Concurrent clone subprocesses.
        #[arg(long)]
        concurrency: Option<usize>,

        /// Working root for scratch clones.
        #[arg(long)]
        working_dir: Option<String>,

        /// Language filter for the search query.
        #[arg(long)]
        language: Option<String>,

        /// Report rows to print.
        #[arg(long)]
        top: Option<usize>,

        /// Also print the report as a Markdown table.
        #[arg(long)]
        markdown: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "joincensus=info",
        1 => "joincensus=debug",
        _ => "joincensus=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run {
            max_repos,
            concurrency,
            working_dir,
            language,
            top,
            markdown,
        } => {
            cmd_run(
                max_repos,
                concurrency,
                working_dir.as_deref(),
                language.as_deref(),
                top,
                markdown,
            )
            .await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(
    max_repos: Option<usize>,
    concurrency: Option<usize>,
    working_dir: Option<&str>,
    language: Option<&str>,
    top: Option<usize>,
    markdown: bool,
) -> Result<()> {
    let config = load_config()?;
    let mut census = CensusConfig::from(&config);

    if let Some(max_repos) = max_repos {
        census.max_repos = max_repos;
    }
    if let Some(concurrency) = concurrency {
        census.clone_concurrency = concurrency;
    }
    if let Some(working_dir) = working_dir {
        census.working_dir = PathBuf::from(working_dir);
    }
    if let Some(language) = language {
        census.language = language.to_string();
    }
    let top_n = top.unwrap_or(census.top_n);

    info!(
        language = %census.language,
        max_repos = census.max_repos,
        working_dir = %census.working_dir.display(),
        "starting census"
    );

    // Ctrl-C flips the cancel signal; in-flight work drains and the partial
    // tally is still printed.
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!();
            eprintln!("  Cancelling — finishing in-flight work...");
            let _ = cancel_tx.send(true);
        }
    });

    let reporter = Arc::new(CliProgress::new());
    let summary = run_census(&census, cancel_rx, reporter).await?;

    println!();
    print!("{}", report::render(&summary.pipeline.stats, top_n));
    if markdown {
        println!();
        print!("{}", report::render_markdown(&summary.pipeline.stats, top_n));
    }

    println!();
    println!("  Census complete!");
    println!("  Repositories: {}", summary.pipeline.repos_seen);
    println!("  Cloned:       {}", summary.pipeline.repos_materialized);
    println!("  Failed:       {}", summary.pipeline.repos_failed);
    println!("  Files:        {}", summary.pipeline.stats.files_scanned);
    println!("  Time:         {:.1}s", summary.pipeline.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Created config file at {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config = load_config()?;
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn repo_started(&self, repo: &RepoId, admitted: usize) {
        self.spinner
            .set_message(format!("[{admitted}] Cloning {repo}"));
    }

    fn repo_materialized(&self, repo: &RepoId) {
        self.spinner.set_message(format!("Scanning {repo}"));
    }

    fn file_analyzed(&self, path: &Path) {
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            self.spinner.set_message(format!("Analyzing {name}"));
        }
    }

    fn done(&self, _summary: &PipelineSummary) {
        self.spinner.finish_and_clear();
    }
}
