use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::broadcast;

use super::events::ImportEvent;
use crate::database::HubStore;
use crate::settings::Settings;

// Application state shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub store: HubStore,
    pub settings: Arc<Mutex<Settings>>,
    pub settings_path: PathBuf,
    pub cache_dir: PathBuf,
    pub event_sender: broadcast::Sender<ImportEvent>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(store: HubStore, settings: Settings, settings_path: PathBuf, cache_dir: PathBuf) -> Self {
        let (event_sender, _) = broadcast::channel(100);
        Self {
            store,
            settings: Arc::new(Mutex::new(settings)),
            settings_path,
            cache_dir,
            event_sender,
            started_at: Instant::now(),
        }
    }

    /// Copy of the current settings
    pub fn settings(&self) -> Settings {
        self.settings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn replace_settings(&self, new_settings: Settings) {
        *self.settings.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = new_settings;
    }
}
