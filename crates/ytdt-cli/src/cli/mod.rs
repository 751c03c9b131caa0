//! CLI for ytdt.

mod commands;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use ytdt_core::bridge::is_browser_launch;
use ytdt_core::config::{self, YtdtConfig};
use ytdt_core::request::DownloadOptions;

use commands::{
    run_bridge_stdio, run_completions, run_config, run_dry_run, run_man, run_manifest, run_url,
};

/// Top-level CLI for ytdt.
#[derive(Debug, Parser)]
#[command(name = "ytdt", version)]
#[command(about = "ytdt: send the YouTube video in the active tab to a download server", long_about = None)]
pub struct Cli {
    /// Download server address for this run (overrides `server_base` in config.toml).
    #[arg(long, global = true, value_name = "URL")]
    pub server: Option<String>,

    #[command(subcommand)]
    pub command: CliCommand,
}

/// The three download switches, same letters as the URL parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Args)]
pub struct OptionFlags {
    /// Fetch subtitles too.
    #[arg(short = 's', long)]
    pub subtitles: bool,
    /// Produce an audio file.
    #[arg(short = 'a', long)]
    pub audio: bool,
    /// Produce a video file.
    #[arg(short = 'd', long)]
    pub video: bool,
}

impl From<OptionFlags> for DownloadOptions {
    fn from(flags: OptionFlags) -> Self {
        DownloadOptions {
            subtitles: flags.subtitles,
            audio: flags.audio,
            video: flags.video,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Print the download URL a trigger on this page would open.
    Url {
        /// URL of the page (e.g. https://www.youtube.com/watch?v=...).
        page_url: String,
        #[command(flatten)]
        options: OptionFlags,
    },

    /// Run trigger and cleanup against a simulated browser showing `page_url`.
    DryRun {
        /// URL of the simulated active tab.
        page_url: String,
        #[command(flatten)]
        options: OptionFlags,
    },

    /// Serve the browser extension over native messaging on stdin/stdout.
    Bridge,

    /// Print the native-messaging host manifest for an extension.
    Manifest {
        /// Extension id allowed to launch the host.
        #[arg(long)]
        extension_id: String,
        /// Host executable path (default: this binary).
        #[arg(long, value_name = "PATH")]
        path: Option<PathBuf>,
    },

    /// Show config and log file locations and the effective settings.
    Config,

    /// Generate shell completions.
    Completions {
        /// Target shell.
        shell: Shell,
    },

    /// Print the man page (roff).
    Man,
}

/// Applies `--server` on top of the loaded config.
pub fn with_server_override(mut cfg: YtdtConfig, server: Option<&str>) -> Result<YtdtConfig> {
    if let Some(server) = server {
        cfg.server_base = server.to_string();
        cfg.server_base_url().context("--server")?;
    }
    Ok(cfg)
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let args: Vec<std::ffi::OsString> = std::env::args_os().collect();

        // Launched by the browser: the only argument is the caller's origin.
        if let Some(origin) = args.get(1).and_then(|a| a.to_str()) {
            if is_browser_launch(origin) {
                tracing::debug!(origin, "launched as native-messaging host");
                let cfg = config::load_or_init()?;
                return run_bridge_stdio(&cfg).await;
            }
        }

        let cli = Cli::parse_from(args);
        let load = || -> Result<YtdtConfig> {
            let cfg = config::load_or_init()?;
            tracing::debug!("loaded config: {:?}", cfg);
            with_server_override(cfg, cli.server.as_deref())
        };

        match cli.command {
            CliCommand::Url { ref page_url, options } => run_url(&load()?, page_url, options.into())?,
            CliCommand::DryRun { ref page_url, options } => {
                run_dry_run(&load()?, page_url, options.into()).await?
            }
            CliCommand::Bridge => run_bridge_stdio(&load()?).await?,
            CliCommand::Manifest {
                ref extension_id,
                ref path,
            } => run_manifest(extension_id, path.as_deref())?,
            CliCommand::Config => run_config(&load()?)?,
            CliCommand::Completions { shell } => run_completions(shell)?,
            CliCommand::Man => run_man()?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
