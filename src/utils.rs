use std::path::PathBuf;

/// Returns the cross-platform directory for application data
pub fn get_app_data_dir() -> PathBuf {
    if cfg!(target_os = "macos") {
        let home_dir = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home_dir)
            .join("Library")
            .join("Application Support")
            .join("HubMap")
    } else if cfg!(target_os = "windows") {
        match std::env::var("APPDATA") {
            Ok(appdata) => PathBuf::from(appdata).join("HubMap"),
            Err(_) => PathBuf::from(".").join("HubMap"),
        }
    } else if let Ok(xdg_data_home) = std::env::var("XDG_DATA_HOME") {
        PathBuf::from(xdg_data_home).join("hubmap")
    } else {
        // Fallback to ~/.local/share/hubmap
        let home_dir = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home_dir).join(".local").join("share").join("hubmap")
    }
}

/// Returns the path to the application configuration file
pub fn get_config_path() -> PathBuf {
    get_app_data_dir().join("hubmap.ini")
}
