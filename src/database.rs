use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

use crate::constants::{CACHE_FILE_NAME, CACHE_VERSION};
use crate::projection::GeoPoint;

// Hub record as exported by the entity-list API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hub {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub coordinates: Option<GeoPoint>,
    #[serde(default, alias = "memberCount")]
    pub member_count: u32,
    #[serde(default, alias = "resonanceIntensity")]
    pub resonance_intensity: f64,
}

// Structure for disk persistence
#[derive(Serialize, Deserialize)]
pub struct CachedStore {
    pub version: u32,
    pub source_paths: Vec<String>,
    pub saved_at: DateTime<Utc>,
    pub hubs: Vec<Hub>,
}

/// In-memory hub registry shared between the server and the importer
#[derive(Clone, Default)]
pub struct HubStore {
    hubs: Arc<RwLock<Vec<Hub>>>,
}

impl HubStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<Hub>>> {
        self.hubs.read().map_err(|_| anyhow!("hub store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<Hub>>> {
        self.hubs.write().map_err(|_| anyhow!("hub store lock poisoned"))
    }

    /// Swap in a whole new hub list under one write guard, so readers see
    /// either the old list or the new one, never an empty store in between
    pub fn replace_all(&self, new_hubs: &[Hub]) -> Result<usize> {
        let mut fresh = Vec::with_capacity(new_hubs.len());
        for hub in new_hubs {
            upsert(&mut fresh, hub);
        }

        *self.write()? = fresh;
        Ok(new_hubs.len())
    }

    /// Insert or replace by id
    pub fn upsert_hubs_batch(&self, new_hubs: &[Hub]) -> Result<usize> {
        if new_hubs.is_empty() {
            return Ok(0);
        }

        let mut hubs = self.write()?;
        for hub in new_hubs {
            upsert(&mut hubs, hub);
        }
        Ok(new_hubs.len())
    }

    /// All hubs ordered by name, then id, so ring positions stay put between calls
    pub fn get_all_hubs(&self) -> Result<Vec<Hub>> {
        let mut result = self.read()?.clone();
        result.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(result)
    }

    pub fn get_hub(&self, id: &str) -> Result<Option<Hub>> {
        Ok(self.read()?.iter().find(|h| h.id == id).cloned())
    }

    pub fn get_hubs_count(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    /// Save the current hubs to `dir` using bincode
    pub fn save_to_disk(&self, dir: &Path, source_paths: &[String]) -> Result<()> {
        let cache = CachedStore {
            version: CACHE_VERSION,
            source_paths: source_paths.to_vec(),
            saved_at: Utc::now(),
            hubs: self.read()?.clone(),
        };

        std::fs::create_dir_all(dir)
            .with_context(|| format!("Creating cache directory {}", dir.display()))?;
        let cache_path = dir.join(CACHE_FILE_NAME);

        let file = std::fs::File::create(&cache_path)
            .with_context(|| format!("Creating {}", cache_path.display()))?;
        bincode::serialize_into(file, &cache).context("Failed to serialize hub cache")?;

        debug!(path = %cache_path.display(), hubs = cache.hubs.len(), "hub cache saved");
        Ok(())
    }

    /// Load hubs from `dir` if the cache was built from exactly `expected_paths`
    pub fn load_from_disk(&self, dir: &Path, expected_paths: &[String]) -> Result<bool> {
        let cache_path = dir.join(CACHE_FILE_NAME);
        if !cache_path.exists() {
            return Ok(false);
        }

        let file = std::fs::File::open(&cache_path)?;
        let cache: CachedStore = match bincode::deserialize_from(file) {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "hub cache corrupted or incompatible, deleting");
                let _ = std::fs::remove_file(&cache_path);
                return Ok(false);
            }
        };

        if cache.version != CACHE_VERSION {
            warn!(
                found = cache.version,
                expected = CACHE_VERSION,
                "hub cache version mismatch, deleting"
            );
            let _ = std::fs::remove_file(&cache_path);
            return Ok(false);
        }

        if cache.source_paths != expected_paths {
            debug!("hub cache built from other folders, ignoring");
            return Ok(false);
        }

        debug!(saved_at = %cache.saved_at, hubs = cache.hubs.len(), "hub cache loaded");
        *self.write()? = cache.hubs;
        Ok(true)
    }
}

fn upsert(hubs: &mut Vec<Hub>, hub: &Hub) {
    if let Some(existing) = hubs.iter_mut().find(|h| h.id == hub.id) {
        *existing = hub.clone();
    } else {
        hubs.push(hub.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hub(id: &str, name: &str) -> Hub {
        Hub {
            id: id.to_string(),
            name: name.to_string(),
            location: None,
            coordinates: Some(GeoPoint::new(1.0, 2.0)),
            member_count: 3,
            resonance_intensity: 0.5,
        }
    }

    #[test]
    fn test_upsert_replaces_by_id() {
        let store = HubStore::new();
        store.upsert_hubs_batch(&[hub("a", "Alpha")]).unwrap();
        store.upsert_hubs_batch(&[hub("a", "Alpha Prime")]).unwrap();

        assert_eq!(store.get_hubs_count().unwrap(), 1);
        assert_eq!(store.get_hub("a").unwrap().unwrap().name, "Alpha Prime");
        assert!(store.get_hub("missing").unwrap().is_none());
    }

    #[test]
    fn test_replace_all_drops_old_hubs() {
        let store = HubStore::new();
        store.upsert_hubs_batch(&[hub("old", "Old")]).unwrap();

        let replaced = store
            .replace_all(&[hub("a", "Alpha"), hub("a", "Alpha Again"), hub("b", "Beta")])
            .unwrap();
        assert_eq!(replaced, 3);
        assert_eq!(store.get_hubs_count().unwrap(), 2);
        assert!(store.get_hub("old").unwrap().is_none());
        assert_eq!(store.get_hub("a").unwrap().unwrap().name, "Alpha Again");
    }

    #[test]
    fn test_readers_never_see_empty_store_during_replace() {
        use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

        let batch: Vec<Hub> = (0..2000).map(|i| hub(&i.to_string(), "Hub")).collect();
        let store = HubStore::new();
        store.replace_all(&batch).unwrap();

        let done = Arc::new(AtomicBool::new(false));
        let empties = Arc::new(AtomicUsize::new(0));

        let reader = {
            let store = store.clone();
            let done = Arc::clone(&done);
            let empties = Arc::clone(&empties);
            std::thread::spawn(move || {
                while !done.load(Ordering::Relaxed) {
                    if store.get_hubs_count().unwrap() == 0 {
                        empties.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
        };

        for _ in 0..200 {
            store.replace_all(&batch).unwrap();
        }
        done.store(true, Ordering::Relaxed);
        reader.join().unwrap();

        assert_eq!(empties.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_all_hubs_sorted_by_name_then_id() {
        let store = HubStore::new();
        let inserted = store
            .upsert_hubs_batch(&[hub("2", "Zurich"), hub("9", "Accra"), hub("1", "Accra")])
            .unwrap();
        assert_eq!(inserted, 3);

        let ids: Vec<_> = store.get_all_hubs().unwrap().into_iter().map(|h| h.id).collect();
        assert_eq!(ids, vec!["1", "9", "2"]);
    }

    #[test]
    fn test_deserialize_camel_case_export() {
        let json = r#"{
            "id": "h1",
            "name": "Lisbon Commons",
            "coordinates": { "lat": 38.72, "lng": -9.14 },
            "memberCount": 12,
            "resonanceIntensity": 0.8,
            "created_by": "someone"
        }"#;
        let parsed: Hub = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.member_count, 12);
        assert_eq!(parsed.coordinates, Some(GeoPoint::new(38.72, -9.14)));
    }

    #[test]
    fn test_deserialize_without_coordinates() {
        let parsed: Hub = serde_json::from_str(r#"{"id": "h2", "coordinates": null}"#).unwrap();
        assert!(parsed.coordinates.is_none());
        assert_eq!(parsed.member_count, 0);
    }

    #[test]
    fn test_disk_cache_roundtrip_and_source_check() {
        let dir = tempfile::tempdir().unwrap();
        let sources = vec!["/data/hubs".to_string()];

        let store = HubStore::new();
        store.upsert_hubs_batch(&[hub("a", "Alpha"), hub("b", "Beta")]).unwrap();
        store.save_to_disk(dir.path(), &sources).unwrap();

        let restored = HubStore::new();
        assert!(!restored.load_from_disk(dir.path(), &["/elsewhere".to_string()]).unwrap());
        assert_eq!(restored.get_hubs_count().unwrap(), 0);

        assert!(restored.load_from_disk(dir.path(), &sources).unwrap());
        assert_eq!(restored.get_all_hubs().unwrap(), store.get_all_hubs().unwrap());
    }

    #[test]
    fn test_corrupt_cache_is_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let cache_path = dir.path().join(CACHE_FILE_NAME);
        std::fs::write(&cache_path, b"not a cache").unwrap();

        let store = HubStore::new();
        assert!(!store.load_from_disk(dir.path(), &[]).unwrap());
        assert!(!cache_path.exists());
    }
}
