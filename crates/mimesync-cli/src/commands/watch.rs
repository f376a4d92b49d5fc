//! Watch command implementation

use anyhow::{Context, Result};
use mimesync_core::{MimeTypes, RefreshInterval};
use tracing::info;

/// Start background refreshing and block until Ctrl-C.
pub async fn execute(mime_types: &MimeTypes, interval_ms: Option<i64>) -> Result<()> {
    if let Some(ms) = interval_ms {
        mime_types.set_update_interval(RefreshInterval::from_millis(ms));
    }

    let interval = mime_types.update_interval();
    if interval.period().is_none() {
        info!("Background refresh disabled, running a single cycle");
        mime_types.refresh_now().await;
        return Ok(());
    }

    mime_types.start();
    info!(
        interval_ms = interval.as_millis(),
        "Watching feeds, press Ctrl-C to stop"
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    mime_types.stop();
    info!("Stopped watching feeds");
    Ok(())
}
