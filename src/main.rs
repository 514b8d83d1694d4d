use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod connections;
mod constants;
mod database;
mod processing;
mod projection;
mod server;
mod settings;
mod utils;

use database::HubStore;
use processing::import_hubs;
use server::{refresh::spawn_refresh_loop, start_server, AppState};
use settings::Settings;

/// Fill the store from the disk cache when it matches the configured folder,
/// otherwise import the folder.
fn warm_store(store: &HubStore, settings: &Settings) -> Result<()> {
    let Some(hubs_dir) = settings.hubs_dir() else {
        warn!("No hubs folder configured; set hubs_folder in hubmap.ini or via /api/settings");
        return Ok(());
    };

    let sources = vec![hubs_dir.to_string_lossy().to_string()];
    let cache_dir = utils::get_app_data_dir();

    if settings.use_disk_cache && store.load_from_disk(&cache_dir, &sources)? {
        info!(hubs = store.get_hubs_count()?, "hubs restored from cache");
        return Ok(());
    }

    if !hubs_dir.exists() {
        warn!(dir = %hubs_dir.display(), "configured hubs folder not found");
        return Ok(());
    }

    let stats = import_hubs(store, &hubs_dir, true)?;
    info!(
        imported = stats.imported,
        without_coordinates = stats.without_coordinates,
        "hubs imported"
    );

    if settings.use_disk_cache {
        if let Err(e) = store.save_to_disk(&cache_dir, &sources) {
            warn!(error = %e, "failed to save hub cache");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hubmap=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("HubMap v{} starting", env!("CARGO_PKG_VERSION"));

    let settings_path = Settings::config_path();
    let settings = Settings::load().context("Failed to load settings")?;
    info!(config = %settings_path.display(), port = settings.port, "settings loaded");

    let store = HubStore::new();
    warm_store(&store, &settings).context("Failed to load hubs")?;

    let port = settings.port;
    let state = AppState::new(store, settings, settings_path, utils::get_app_data_dir());
    let _refresh = spawn_refresh_loop(state.clone());

    start_server(state, port).await?;

    info!("HubMap stopped");
    Ok(())
}
