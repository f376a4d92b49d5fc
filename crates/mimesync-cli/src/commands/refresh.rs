//! Refresh command implementation

use anyhow::Result;
use colored::Colorize;
use mimesync_core::{FeedOutcome, MimeTypes, RefreshReport};
use serde_json::{Value, json};

use crate::output::OutputFormat;

/// Run one refresh cycle and summarize it.
///
/// Failed feeds are reported but do not fail the command; the next cycle
/// retries them.
pub async fn execute(mime_types: &MimeTypes, format: OutputFormat) -> Result<()> {
    let report = mime_types.refresh_now().await;

    match format {
        OutputFormat::Text => print_text(&report, mime_types.list().len()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&to_json(&report))?),
    }
    Ok(())
}

fn print_text(report: &RefreshReport, total: usize) {
    for entry in &report.outcomes {
        let source = entry.source.as_str();
        match &entry.outcome {
            FeedOutcome::Merged { changed: true, .. } => {
                println!("{} {}", "updated".green(), source);
            },
            FeedOutcome::Merged { changed: false, .. } => {
                println!("{} {}", "no new types".bright_black(), source);
            },
            FeedOutcome::UpToDate => println!("{} {}", "up to date".bright_black(), source),
            FeedOutcome::Failed(err) => eprintln!("{} {}: {}", "failed".red(), source, err),
        }
    }
    println!("{total} mime types registered");
}

fn to_json(report: &RefreshReport) -> Value {
    let outcomes: Vec<Value> = report
        .outcomes
        .iter()
        .map(|entry| match &entry.outcome {
            FeedOutcome::Merged { changed, version } => json!({
                "source": entry.source,
                "status": "merged",
                "changed": changed,
                "version": version,
            }),
            FeedOutcome::UpToDate => json!({
                "source": entry.source,
                "status": "up_to_date",
            }),
            FeedOutcome::Failed(err) => json!({
                "source": entry.source,
                "status": "failed",
                "category": err.category(),
                "error": err.to_string(),
            }),
        })
        .collect();

    json!({
        "startedAt": report.started_at.to_rfc3339(),
        "persisted": report.persisted,
        "outcomes": outcomes,
    })
}
