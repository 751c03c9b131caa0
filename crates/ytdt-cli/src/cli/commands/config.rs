//! `ytdt config` – show where settings live and what is in effect.

use anyhow::Result;
use ytdt_core::config::{self, YtdtConfig};
use ytdt_core::logging;

pub fn run_config(cfg: &YtdtConfig) -> Result<()> {
    println!("{:<12} {}", "config", config::config_path()?.display());
    println!("{:<12} {}", "log", logging::log_file_path()?.display());
    println!("{:<12} {}", "server_base", cfg.server_base);
    println!("{:<12} {}", "video_host", cfg.video_host);
    println!("{:<12} {:?}", "cleanup", cfg.cleanup);
    Ok(())
}
