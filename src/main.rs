//! `slack-search-export`: export the results of one Slack search
//!
//! Exit status: 0 when every page (or the page cap) was exported, 2 when the
//! export is partial (interrupt or a page timeout), 1 on a fatal error,
//! 130 on a forced abort and 64 for invalid arguments.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use slack_search_export::browser_setup::open_page;
use slack_search_export::utils::{
    DEFAULT_AUTH_FILE, DEFAULT_LOGIN_TIMEOUT_SECS, DEFAULT_PAGE_CAP, DEFAULT_PAGE_TIMEOUT_SECS,
    DEFAULT_WORKSPACE_URL,
};
use slack_search_export::{
    AuthSessionStore, BrowserProfile, ChromiumSurface, ExportFormat, ExportSink, HarvestConfig,
    InterruptController, PaginationWalker, RunReport, RunState, launch_browser,
};

const CONFIG_ERROR_EXIT: u8 = 64;

/// Export Slack search results to a text or JSON file
///
/// Drives the Slack web client in a browser window. The first run asks you to
/// log in; the session is saved and reused afterwards.
#[derive(Parser, Debug)]
#[command(name = "slack-search-export")]
#[command(version)]
#[command(about = "Export Slack search results to text or JSON")]
struct Cli {
    /// Search query, with any Slack search modifiers (e.g. "from:@alice after:2024-01-01")
    query: String,

    /// Slack workspace URL
    #[arg(long, default_value = DEFAULT_WORKSPACE_URL)]
    workspace: String,

    /// Output format (text or json)
    #[arg(long, default_value = "text")]
    format: ExportFormat,

    /// Output file (default: slack_export_<timestamp>.<txt|json>)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Where the login session is saved and loaded
    #[arg(long, default_value = DEFAULT_AUTH_FILE)]
    auth_file: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Maximum number of result pages to visit
    #[arg(long, default_value_t = DEFAULT_PAGE_CAP)]
    page_cap: u32,

    /// Seconds a result page may take to load before it is kept as partial
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_PAGE_TIMEOUT_SECS)]
    page_timeout: u64,

    /// Seconds to wait for an interactive login
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_LOGIN_TIMEOUT_SECS)]
    login_timeout: u64,

    /// Run the browser without a window (only useful with a saved session)
    #[arg(long)]
    headless: bool,
}

fn init_tracing(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_level))
                .add_directive("chromiumoxide::handler=off".parse()?)
                .add_directive("chromiumoxide::conn=off".parse()?),
        )
        .with(fmt::layer().with_target(false))
        .try_init()
        .context("Failed to initialise logging")?;
    Ok(())
}

fn build_config(cli: Cli) -> slack_search_export::HarvestResult<HarvestConfig> {
    HarvestConfig::builder()
        .query(cli.query)
        .workspace_url(cli.workspace)
        .format(cli.format)
        .output_path(cli.output)
        .auth_file(cli.auth_file)
        .verbose(cli.verbose)
        .page_cap(cli.page_cap)
        .page_timeout(Duration::from_secs(cli.page_timeout))
        .login_timeout(Duration::from_secs(cli.login_timeout))
        .headless(cli.headless)
        .build()
}

async fn run(config: &HarvestConfig, controller: &InterruptController) -> Result<RunReport> {
    let profile = BrowserProfile::create()?;
    let (mut browser, handler) = launch_browser(config.headless(), profile.path()).await?;
    let page = open_page(&browser).await?;
    let surface = ChromiumSurface::new(page);

    let store = AuthSessionStore::new(config.auth_file());
    let mut sink = ExportSink::create(config.output_path(), config.format()).await?;
    let mut state = RunState::new(controller.flag());
    let request = config.search_request();

    info!(
        "Searching {} for '{}' (format: {}, page cap: {})",
        request.workspace_url(),
        request.query(),
        config.format(),
        config.page_cap()
    );

    let report = controller
        .supervise(async {
            PaginationWalker::new(&surface, &store, config, &mut sink)
                .run(&request, &mut state)
                .await
        })
        .await;

    if let Err(e) = browser.close().await {
        warn!("Failed to close browser: {}", e);
    }
    handler.abort();
    drop(profile);

    Ok(report)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("{e:#}");
    }

    let config = match build_config(cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(CONFIG_ERROR_EXIT);
        }
    };

    let controller = InterruptController::new();
    match run(&config, &controller).await {
        Ok(report) => {
            println!("\n{report}");
            ExitCode::from(report.status().exit_code() as u8)
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
