//! Append command implementation

use anyhow::{Context, Result};
use colored::Colorize;
use mimesync_core::MimeTypes;

/// Register `extensions` under `mime`.
pub fn execute(mime_types: &MimeTypes, mime: &str, extensions: &[String]) -> Result<()> {
    let added = mime_types
        .append(mime, extensions)
        .with_context(|| format!("Failed to register extensions for '{mime}'"))?;

    if added {
        println!("{} {} -> {}", "✓".green(), mime, extensions.join(" "));
    } else {
        println!("{} already registered", mime.bright_black());
    }
    Ok(())
}
