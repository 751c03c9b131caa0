//! `ytdt manifest --extension-id <id>` – print the native-messaging host manifest.

use anyhow::{Context, Result};
use std::path::Path;
use ytdt_core::bridge::{is_valid_extension_id, HostManifest};

pub fn run_manifest(extension_id: &str, path: Option<&Path>) -> Result<()> {
    let extension_id = extension_id.trim();
    if !is_valid_extension_id(extension_id) {
        anyhow::bail!("invalid extension id {extension_id:?}: expected 32 letters a-p");
    }
    let exe = match path {
        Some(p) => p.to_path_buf(),
        None => std::env::current_exe().context("locate ytdt executable")?,
    };
    let manifest = HostManifest::for_extension(extension_id, &exe);
    println!("{}", serde_json::to_string_pretty(&manifest)?);
    Ok(())
}
