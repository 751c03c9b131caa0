//! `ytdt dry-run <page-url>` – trigger and cleanup in a simulated browser.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use ytdt_core::cleanup::{CleanupRule, CleanupSubscription};
use ytdt_core::config::YtdtConfig;
use ytdt_core::dispatcher::{DispatchOutcome, Dispatcher};
use ytdt_core::host::memory::MemoryBrowser;
use ytdt_core::request::DownloadOptions;

const CLEANUP_WAIT: Duration = Duration::from_secs(2);

pub async fn run_dry_run(cfg: &YtdtConfig, page_url: &str, options: DownloadOptions) -> Result<()> {
    let browser = Arc::new(MemoryBrowser::with_active_tab(page_url));
    let dispatcher = Dispatcher::new(Arc::clone(&browser), cfg)?;
    let cleanup = CleanupSubscription::spawn(
        Arc::clone(&browser),
        CleanupRule::new(dispatcher.server_base(), cfg.cleanup),
        dispatcher.tracked(),
    )?;

    match dispatcher.trigger(options).await? {
        DispatchOutcome::Skipped(reason) => println!("skipped: {reason}"),
        DispatchOutcome::Dispatched { tab, url } => {
            println!("opened background tab {tab}: {url}");
            browser.finish_loading(tab)?;
            println!("tab {tab} finished loading");
            match tokio::time::timeout(CLEANUP_WAIT, browser.wait_removed(tab)).await {
                Ok(()) => println!("tab {tab} closed by cleanup"),
                Err(_) => println!(
                    "tab {tab} still open after {}s",
                    CLEANUP_WAIT.as_secs()
                ),
            }
        }
    }

    cleanup.shutdown().await;
    Ok(())
}
