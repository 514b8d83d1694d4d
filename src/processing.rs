use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use ignore::WalkBuilder;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::database::{Hub, HubStore};

/// Summary of one import run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportStats {
    pub total_files: usize,
    pub imported: usize,
    pub with_coordinates: usize,
    pub without_coordinates: usize,
    pub failed: usize,
    pub finished_at: DateTime<Utc>,
}

// An export file holds either a single hub or the whole `Hub.list()` array
#[derive(Deserialize)]
#[serde(untagged)]
enum HubExport {
    Many(Vec<Hub>),
    One(Hub),
}

/// JSON files under `dir`, hidden entries skipped, sorted for a stable import order
pub fn scan_hub_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkBuilder::new(dir)
        .hidden(true)
        .build()
        .filter_map(|entry| entry.ok())
        .filter(|e| e.file_type().map_or(false, |ft| ft.is_file()))
        .map(|e| e.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|s| s.to_str())
                .map_or(false, |ext| ext.eq_ignore_ascii_case("json"))
        })
        .collect();
    files.sort();
    files
}

pub fn parse_hub_file(path: &Path) -> Result<Vec<Hub>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    let export: HubExport = serde_json::from_str(&content)
        .with_context(|| format!("Parsing hub export {}", path.display()))?;

    Ok(match export {
        HubExport::Many(hubs) => hubs,
        HubExport::One(hub) => vec![hub],
    })
}

/// Reads every export under `hubs_dir` into the store.
///
/// With `clear_store` the previous contents are replaced in one step. A file that
/// fails to parse counts as failed and does not abort the run.
pub fn import_hubs(store: &HubStore, hubs_dir: &Path, clear_store: bool) -> Result<ImportStats> {
    if !hubs_dir.exists() {
        anyhow::bail!("Hubs directory not found: {}", hubs_dir.display());
    }

    let start_time = std::time::Instant::now();
    let files = scan_hub_files(hubs_dir);
    info!(dir = %hubs_dir.display(), files = files.len(), "importing hub exports");

    let parsed: Vec<Result<Vec<Hub>>> = files.par_iter().map(|path| parse_hub_file(path)).collect();

    let mut hubs = Vec::new();
    let mut failed = 0;
    for (path, result) in files.iter().zip(parsed) {
        match result {
            Ok(mut batch) => hubs.append(&mut batch),
            Err(e) => {
                warn!(file = %path.display(), error = %e, "skipping hub export");
                failed += 1;
            }
        }
    }

    let imported = if clear_store {
        store.replace_all(&hubs)?
    } else {
        store.upsert_hubs_batch(&hubs)?
    };

    let with_coordinates = hubs.iter().filter(|h| h.coordinates.is_some()).count();
    let stats = ImportStats {
        total_files: files.len(),
        imported,
        with_coordinates,
        without_coordinates: imported - with_coordinates,
        failed,
        finished_at: Utc::now(),
    };

    info!(
        imported = stats.imported,
        with_coordinates = stats.with_coordinates,
        failed = stats.failed,
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "hub import finished"
    );
    debug!(?stats);

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_scan_skips_hidden_and_non_json() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.json", "{}");
        write(dir.path(), "nested/b.JSON", "{}");
        write(dir.path(), "notes.txt", "x");
        write(dir.path(), ".hidden/c.json", "{}");

        let files = scan_hub_files(dir.path());
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.json", "b.JSON"]);
    }

    #[test]
    fn test_parse_single_and_list_exports() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "one.json", r#"{"id": "h1", "name": "One"}"#);
        write(
            dir.path(),
            "list.json",
            r#"[{"id": "h2"}, {"id": "h3", "coordinates": {"lat": 1.0, "lng": 2.0}}]"#,
        );

        assert_eq!(parse_hub_file(&dir.path().join("one.json")).unwrap().len(), 1);
        assert_eq!(parse_hub_file(&dir.path().join("list.json")).unwrap().len(), 2);
    }

    #[test]
    fn test_import_counts_and_tolerates_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "hubs.json",
            r#"[
                {"id": "h1", "coordinates": {"lat": 52.5, "lng": 13.4}},
                {"id": "h2"},
                {"id": "h3", "coordinates": {"lat": -33.9, "lng": 18.4}}
            ]"#,
        );
        write(dir.path(), "broken.json", "{ not json");

        let store = HubStore::new();
        store
            .upsert_hubs_batch(&[Hub {
                id: "stale".to_string(),
                name: String::new(),
                location: None,
                coordinates: None,
                member_count: 0,
                resonance_intensity: 0.0,
            }])
            .unwrap();

        let stats = import_hubs(&store, dir.path(), true).unwrap();
        assert_eq!(stats.total_files, 2);
        assert_eq!(stats.imported, 3);
        assert_eq!(stats.with_coordinates, 2);
        assert_eq!(stats.without_coordinates, 1);
        assert_eq!(stats.failed, 1);
        assert!(store.get_hub("stale").unwrap().is_none());
    }

    #[test]
    fn test_import_without_clear_keeps_existing_hubs() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "hub.json", r#"{"id": "new"}"#);

        let store = HubStore::new();
        store
            .upsert_hubs_batch(&[Hub {
                id: "kept".to_string(),
                name: String::new(),
                location: None,
                coordinates: None,
                member_count: 0,
                resonance_intensity: 0.0,
            }])
            .unwrap();

        import_hubs(&store, dir.path(), false).unwrap();
        assert_eq!(store.get_hubs_count().unwrap(), 2);
    }

    #[test]
    fn test_import_missing_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = HubStore::new();
        assert!(import_hubs(&store, &dir.path().join("nope"), true).is_err());
    }
}
