use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::connections::ConnectionParams;
use crate::constants::{
    DEFAULT_CONNECTION_GATE, DEFAULT_CONNECTION_THRESHOLD, DEFAULT_PORT, PORT_ENV_VAR,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub hubs_folder: Option<String>,
    pub port: u16,
    /// Seconds between re-imports of `hubs_folder`; 0 turns polling off
    pub refresh_interval_secs: u64,
    pub connection_threshold: f64,
    pub connection_gate: f64,
    pub use_disk_cache: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            hubs_folder: None,
            port: DEFAULT_PORT,
            refresh_interval_secs: 300,
            connection_threshold: DEFAULT_CONNECTION_THRESHOLD,
            connection_gate: DEFAULT_CONNECTION_GATE,
            use_disk_cache: true,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        let mut settings = Self::load_from(&Self::config_path())?;
        settings.apply_env_overrides();
        Ok(settings)
    }

    /// Read an INI file, keeping defaults for anything missing or unparsable
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            debug!(path = %config_path.display(), "no config file, using defaults");
            return Ok(Settings::default());
        }

        let content = std::fs::read_to_string(config_path).context("Failed to read config file")?;
        Ok(Self::parse(&content))
    }

    pub fn parse(content: &str) -> Self {
        let mut settings = Settings::default();
        let mut config_map = HashMap::new();

        for line in content.lines() {
            let line = line.trim();
            if line.starts_with('#') || line.is_empty() {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                config_map.insert(key.trim().to_string(), value.trim().to_string());
            }
        }

        if let Some(folder) = config_map.get("hubs_folder") {
            let folder = folder.trim_matches('"');
            if !folder.is_empty() {
                settings.hubs_folder = Some(folder.to_string());
            }
        }
        parse_into(&config_map, "port", &mut settings.port);
        parse_into(&config_map, "refresh_interval_secs", &mut settings.refresh_interval_secs);
        parse_into(&config_map, "connection_threshold", &mut settings.connection_threshold);
        parse_into(&config_map, "connection_gate", &mut settings.connection_gate);
        parse_into(&config_map, "use_disk_cache", &mut settings.use_disk_cache);

        settings.sanitized()
    }

    /// Replace non-finite connection tuning with the defaults
    pub fn sanitized(mut self) -> Self {
        if !self.connection_threshold.is_finite() {
            warn!(value = self.connection_threshold, "ignoring non-finite connection_threshold");
            self.connection_threshold = DEFAULT_CONNECTION_THRESHOLD;
        }
        if !self.connection_gate.is_finite() {
            warn!(value = self.connection_gate, "ignoring non-finite connection_gate");
            self.connection_gate = DEFAULT_CONNECTION_GATE;
        }
        self
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(port_str) = std::env::var(PORT_ENV_VAR) {
            match port_str.parse::<u16>() {
                Ok(port) => self.port = port,
                Err(_) => warn!(value = %port_str, "ignoring invalid {}", PORT_ENV_VAR),
            }
        }
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Creating config directory")?;
        }
        std::fs::write(config_path, self.to_ini()).context("Failed to write to config file")?;
        Ok(())
    }

    pub fn to_ini(&self) -> String {
        let mut content = String::new();
        content.push_str("# HubMap Configuration File\n");

        if let Some(ref folder) = self.hubs_folder {
            content.push_str(&format!("hubs_folder = \"{}\"\n", folder));
        }
        content.push_str(&format!("port = {}\n", self.port));
        content.push_str(&format!("refresh_interval_secs = {}\n", self.refresh_interval_secs));
        content.push_str(&format!("connection_threshold = {}\n", self.connection_threshold));
        content.push_str(&format!("connection_gate = {}\n", self.connection_gate));
        content.push_str(&format!("use_disk_cache = {}\n", self.use_disk_cache));
        content
    }

    pub fn connection_params(&self) -> ConnectionParams {
        ConnectionParams {
            threshold: self.connection_threshold,
            gate: self.connection_gate,
        }
    }

    pub fn hubs_dir(&self) -> Option<PathBuf> {
        self.hubs_folder.as_ref().map(PathBuf::from)
    }

    /// `hubmap.ini` next to the executable, or in the app data directory when
    /// running from a cargo target folder
    pub fn config_path() -> PathBuf {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(Path::to_path_buf));

        match exe_dir {
            Some(dir) if !dir.ends_with("target/debug") && !dir.ends_with("target/release") => {
                dir.join("hubmap.ini")
            }
            _ => crate::utils::get_config_path(),
        }
    }
}

fn parse_into<T: std::str::FromStr>(map: &HashMap<String, String>, key: &str, target: &mut T) {
    if let Some(raw) = map.get(key) {
        match raw.parse::<T>() {
            Ok(value) => *target = value,
            Err(_) => warn!(key, value = %raw, "ignoring unparsable setting"),
        }
    }
}
