//! List command implementation

use anyhow::Result;
use colored::Colorize;
use mimesync_core::MimeTypes;

use crate::output::OutputFormat;

/// Print the whole registry.
pub fn execute(mime_types: &MimeTypes, format: OutputFormat) -> Result<()> {
    let registry = mime_types.list();

    match format {
        OutputFormat::Text => {
            if registry.is_empty() {
                println!("Registry is empty. Run 'mimesync refresh' to populate it.");
                return Ok(());
            }
            for (mime, extensions) in &registry {
                println!("{} {}", mime.green(), extensions.join(" "));
            }
        },
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&registry)?),
    }

    Ok(())
}
