use anyhow::{anyhow, Context, Result};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::events::ImportEvent;
use super::state::AppState;
use crate::processing::{import_hubs, ImportStats};

/// Re-import the configured hubs folder, reporting progress on the event channel.
pub async fn run_import(state: &AppState) -> Result<ImportStats> {
    let settings = state.settings();
    let Some(dir) = settings.hubs_dir() else {
        let _ = state.event_sender.send(ImportEvent::error("No hubs folder configured"));
        return Err(anyhow!("No hubs folder configured"));
    };

    let _ = state.event_sender.send(ImportEvent::started(&dir));

    let store = state.store.clone();
    let import_dir = dir.clone();
    let result = tokio::task::spawn_blocking(move || import_hubs(&store, &import_dir, true))
        .await
        .context("Import task panicked")?;

    match result {
        Ok(stats) => {
            if settings.use_disk_cache {
                let sources = vec![dir.to_string_lossy().to_string()];
                if let Err(e) = state.store.save_to_disk(&state.cache_dir, &sources) {
                    warn!(error = %e, "failed to save hub cache");
                }
            }
            let _ = state.event_sender.send(ImportEvent::complete(&stats));
            Ok(stats)
        }
        Err(e) => {
            let _ = state
                .event_sender
                .send(ImportEvent::error(format!("Import failed for {}: {}", dir.display(), e)));
            Err(e)
        }
    }
}

/// Periodic re-import, the server-side twin of the dashboard's polling cache.
///
/// Returns `None` when polling is disabled. The interval is read once.
pub fn spawn_refresh_loop(state: AppState) -> Option<JoinHandle<()>> {
    let secs = state.settings().refresh_interval_secs;
    if secs == 0 {
        return None;
    }

    info!(interval_secs = secs, "hub refresh loop started");
    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(secs));
        // first tick completes immediately; startup already imported
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) = run_import(&state).await {
                warn!(error = %e, "scheduled hub import failed");
            }
        }
    }))
}
