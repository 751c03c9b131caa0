//! `ytdt url <page-url>` – print the dispatch URL for a page.

use anyhow::Result;
use ytdt_core::config::YtdtConfig;
use ytdt_core::request::{DownloadOptions, DownloadRequest};
use ytdt_core::video_url::inspect_page;

/// The line `ytdt url` prints: the dispatch URL, or why nothing would be sent.
pub fn describe_page(cfg: &YtdtConfig, page_url: &str, options: DownloadOptions) -> Result<String> {
    let base = cfg.server_base_url()?;
    Ok(match inspect_page(Some(page_url), &cfg.video_host) {
        Ok(video_id) => DownloadRequest::new(video_id, options)
            .dispatch_url(&base)
            .to_string(),
        Err(reason) => format!("nothing to dispatch: {reason}"),
    })
}

pub fn run_url(cfg: &YtdtConfig, page_url: &str, options: DownloadOptions) -> Result<()> {
    println!("{}", describe_page(cfg, page_url, options)?);
    Ok(())
}
