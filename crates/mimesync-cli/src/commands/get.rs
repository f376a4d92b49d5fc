//! Get command implementation

use anyhow::Result;
use colored::Colorize;
use mimesync_core::MimeTypes;
use serde_json::json;

use crate::output::OutputFormat;

/// Print the MIME types registered for each path.
pub fn execute(mime_types: &MimeTypes, paths: &[String], format: OutputFormat) -> Result<()> {
    let results: Vec<(&str, Vec<String>)> = paths
        .iter()
        .map(|path| (path.as_str(), mime_types.get(path)))
        .collect();

    match format {
        OutputFormat::Text => {
            for (path, types) in &results {
                if types.is_empty() {
                    println!("{}: {}", path.bold(), "unknown".bright_black());
                } else {
                    println!("{}: {}", path.bold(), types.join(", "));
                }
            }
        },
        OutputFormat::Json => {
            let entries: Vec<_> = results
                .iter()
                .map(|(path, types)| json!({ "path": path, "types": types }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        },
    }

    Ok(())
}
