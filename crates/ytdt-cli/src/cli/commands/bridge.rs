//! `ytdt bridge` – native-messaging host on stdin/stdout.
//!
//! Nothing else may write to stdout while this runs.

use anyhow::Result;
use ytdt_core::bridge::{run_bridge, SessionEnd};
use ytdt_core::config::YtdtConfig;

pub async fn run_bridge_stdio(cfg: &YtdtConfig) -> Result<()> {
    let summary = run_bridge(tokio::io::stdin(), tokio::io::stdout(), cfg).await?;
    if summary.end == SessionEnd::ReadError {
        anyhow::bail!("native-messaging input stream broke");
    }
    Ok(())
}
