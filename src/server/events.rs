use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::processing::ImportStats;

pub const IMPORT_STARTED: &str = "import_started";
pub const IMPORT_COMPLETE: &str = "import_complete";
pub const IMPORT_ERROR: &str = "import_error";
pub const HEARTBEAT: &str = "heartbeat";

// SSE Event types
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportEvent {
    pub event_type: String,
    pub data: ImportData,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ImportData {
    pub total_files: Option<usize>,
    pub imported: Option<usize>,
    pub with_coordinates: Option<usize>,
    pub without_coordinates: Option<usize>,
    pub failed: Option<usize>,
    pub message: Option<String>,
    pub phase: Option<String>,
}

impl ImportEvent {
    pub fn started(dir: &Path) -> Self {
        Self {
            event_type: IMPORT_STARTED.to_string(),
            data: ImportData {
                message: Some(format!("Importing hubs from {}", dir.display())),
                phase: Some("scanning".to_string()),
                ..Default::default()
            },
        }
    }

    pub fn complete(stats: &ImportStats) -> Self {
        Self {
            event_type: IMPORT_COMPLETE.to_string(),
            data: ImportData {
                total_files: Some(stats.total_files),
                imported: Some(stats.imported),
                with_coordinates: Some(stats.with_coordinates),
                without_coordinates: Some(stats.without_coordinates),
                failed: Some(stats.failed),
                message: Some(format!("Imported {} hubs", stats.imported)),
                phase: Some("completed".to_string()),
            },
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            event_type: IMPORT_ERROR.to_string(),
            data: ImportData {
                message: Some(message.into()),
                phase: Some("error".to_string()),
                ..Default::default()
            },
        }
    }

    pub fn heartbeat() -> Self {
        Self {
            event_type: HEARTBEAT.to_string(),
            data: ImportData {
                message: Some("SSE connection alive".to_string()),
                ..Default::default()
            },
        }
    }
}
