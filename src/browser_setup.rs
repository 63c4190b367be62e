//! Locating, downloading and launching Chrome/Chromium

use anyhow::{Context, Result};
use chromiumoxide::browser::{Browser, BrowserConfigBuilder, HeadlessMode};
use chromiumoxide::fetcher::{BrowserFetcher, BrowserFetcherOptions};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use tokio::task::{self, JoinHandle};
use tracing::{debug, error, info, trace, warn};

use crate::utils::constants::CHROME_USER_AGENT;

/// Per-command CDP timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

fn candidate_paths() -> Vec<PathBuf> {
    let home = dirs::home_dir();
    let mut paths: Vec<PathBuf> = if cfg!(target_os = "windows") {
        let mut paths = vec![
            PathBuf::from(r"C:\Program Files\Google\Chrome\Application\chrome.exe"),
            PathBuf::from(r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe"),
            PathBuf::from(r"C:\Program Files\Chromium\Application\chrome.exe"),
        ];
        if let Some(local) = dirs::data_local_dir() {
            paths.push(local.join(r"Google\Chrome\Application\chrome.exe"));
        }
        paths
    } else if cfg!(target_os = "macos") {
        let mut paths = vec![
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"),
            PathBuf::from("/Applications/Chromium.app/Contents/MacOS/Chromium"),
            PathBuf::from("/opt/homebrew/bin/chromium"),
        ];
        if let Some(home) = &home {
            paths.push(home.join("Applications/Google Chrome.app/Contents/MacOS/Google Chrome"));
        }
        paths
    } else {
        [
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
            "/usr/local/bin/chromium",
            "/opt/google/chrome/chrome",
        ]
        .into_iter()
        .map(PathBuf::from)
        .collect()
    };
    paths.dedup();
    paths
}

/// Find an installed Chrome/Chromium
///
/// `CHROMIUM_PATH` wins over everything else, then well-known install
/// locations, then `which` on Unix.
pub fn find_browser_executable() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("CHROMIUM_PATH") {
        let path = PathBuf::from(path);
        if path.exists() {
            info!("Using browser from CHROMIUM_PATH: {}", path.display());
            return Ok(path);
        }
        warn!(
            "CHROMIUM_PATH points to a missing file: {}",
            path.display()
        );
    }

    if let Some(path) = candidate_paths().into_iter().find(|p| p.exists()) {
        info!("Found browser at: {}", path.display());
        return Ok(path);
    }

    if !cfg!(target_os = "windows") {
        for cmd in ["chromium", "chromium-browser", "google-chrome", "chrome"] {
            if let Ok(output) = Command::new("which").arg(cmd).output()
                && output.status.success()
            {
                let found = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !found.is_empty() {
                    info!("Found browser on PATH: {}", found);
                    return Ok(PathBuf::from(found));
                }
            }
        }
    }

    Err(anyhow::anyhow!("Chrome/Chromium executable not found"))
}

/// Download a managed Chromium into the user cache directory
pub async fn download_managed_browser() -> Result<PathBuf> {
    let cache_dir = dirs::cache_dir()
        .unwrap_or_else(|| {
            let fallback = std::env::temp_dir();
            warn!(
                "No user cache directory; downloading the browser under {}",
                fallback.display()
            );
            fallback
        })
        .join("slack_search_export")
        .join("chromium");

    tokio::fs::create_dir_all(&cache_dir)
        .await
        .context("Failed to create browser cache directory")?;

    info!("Downloading Chromium into {}", cache_dir.display());
    let fetcher = BrowserFetcher::new(
        BrowserFetcherOptions::builder()
            .with_path(&cache_dir)
            .build()
            .context("Failed to build fetcher options")?,
    );
    let revision = fetcher.fetch().await.context("Failed to fetch browser")?;
    info!("Downloaded Chromium to {}", revision.folder_path.display());
    Ok(revision.executable_path)
}

/// Launch the browser with `profile_dir` as its user data directory
///
/// The window is visible unless `headless` is set; the interactive login
/// needs it. Returns the browser and the task pumping its CDP handler.
pub async fn launch_browser(headless: bool, profile_dir: &Path) -> Result<(Browser, JoinHandle<()>)> {
    let executable = match find_browser_executable() {
        Ok(path) => path,
        Err(e) => {
            warn!("{}; falling back to a managed download", e);
            download_managed_browser().await?
        }
    };

    let mut builder = BrowserConfigBuilder::default()
        .request_timeout(REQUEST_TIMEOUT)
        .window_size(1440, 1000)
        .user_data_dir(profile_dir)
        .chrome_executable(executable);

    builder = if headless {
        builder.headless_mode(HeadlessMode::default())
    } else {
        builder.with_head().viewport(None)
    };

    let config = builder
        .arg(format!("--user-agent={CHROME_USER_AGENT}"))
        .arg("--disable-blink-features=AutomationControlled")
        .arg("--disable-infobars")
        .arg("--disable-notifications")
        .arg("--no-first-run")
        .arg("--no-default-browser-check")
        .arg("--disable-popup-blocking")
        .arg("--disable-background-timer-throttling")
        .arg("--disable-backgrounding-occluded-windows")
        .arg("--disable-renderer-backgrounding")
        .arg("--password-store=basic")
        .arg("--use-mock-keychain")
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build browser config: {e}"))?;

    debug!("Launching browser with config: {:?}", config);
    let (browser, mut handler) = Browser::launch(config)
        .await
        .context("Failed to launch browser")?;

    let handler_task = task::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                let message = e.to_string();
                // chromiumoxide cannot decode every CDP event newer Chrome sends
                if message.contains("data did not match any variant of untagged enum Message")
                    || message.contains("Failed to deserialize WS response")
                {
                    trace!("Ignored undecodable CDP event: {}", message);
                } else {
                    error!("Browser handler error: {:?}", e);
                }
            }
        }
        debug!("Browser handler task completed");
    });

    Ok((browser, handler_task))
}

/// Open the single tab the harvester drives
pub async fn open_page(browser: &Browser) -> Result<Page> {
    browser
        .new_page("about:blank")
        .await
        .context("Failed to open browser tab")
}
