//! Persistence adapter for restart recovery.
//!
//! The record is two string keys holding the numeric state codes. It is read
//! once at startup and written through after every transition.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use garage_traits::{BoxError, StateStore};
use tracing::{debug, warn};

use crate::error::GarageError;
use crate::hw_error::map_store_error;
use crate::state::{DoorState, TargetState};

pub const CURRENT_KEY: &str = "currentDoorState";
pub const TARGET_KEY: &str = "targetDoorState";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistedRecord {
    pub current: DoorState,
    pub target: TargetState,
}

impl Default for PersistedRecord {
    fn default() -> Self {
        Self {
            current: DoorState::Closed,
            target: TargetState::Closed,
        }
    }
}

pub struct Persistence<S: StateStore> {
    store: S,
}

impl<S: StateStore> Persistence<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn read_code(&self, key: &str) -> Option<u8> {
        match self.store.get(key) {
            Ok(Some(raw)) => match raw.trim().parse::<u8>() {
                Ok(code) => Some(code),
                Err(_) => {
                    warn!(key, value = %raw, "ignoring unparsable persisted value");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(key, error = %e, "persisted value unreadable");
                None
            }
        }
    }

    /// Seed state from the store. Current falls back to the stored target,
    /// then to closed; target falls back to closed. Never fails: an unusable
    /// store just means "assume closed".
    pub fn load(&self) -> PersistedRecord {
        let defaults = PersistedRecord::default();
        let target = self
            .read_code(TARGET_KEY)
            .and_then(TargetState::from_code);
        let current = self
            .read_code(CURRENT_KEY)
            .and_then(DoorState::from_code)
            .or(target.map(DoorState::from))
            .unwrap_or(defaults.current);
        let rec = PersistedRecord {
            current,
            target: target.unwrap_or(defaults.target),
        };
        debug!(current = %rec.current, target = %rec.target, "persisted state loaded");
        rec
    }

    pub fn save(&mut self, rec: PersistedRecord) -> Result<(), GarageError> {
        debug!(current = %rec.current, target = %rec.target, "persisting door state");
        self.store
            .set(CURRENT_KEY, &rec.current.code().to_string())
            .map_err(|e| map_store_error(&*e))?;
        self.store
            .set(TARGET_KEY, &rec.target.code().to_string())
            .map_err(|e| map_store_error(&*e))
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

/// One file per key under a directory. Writes go to a temp file that is
/// synced and renamed over the old value.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn open(dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, BoxError> {
        if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            return Err(format!("invalid store key {key:?}").into());
        }
        Ok(self.dir.join(key))
    }
}

impl StateStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, BoxError> {
        match fs::read_to_string(self.path_for(key)?) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), BoxError> {
        let path = self.path_for(key)?;
        let tmp = self.dir.join(format!(".{key}.tmp"));
        {
            let mut f = fs::File::create(&tmp)?;
            f.write_all(value.as_bytes())?;
            f.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// Volatile store for tests and dry runs. Clones share contents; `writes()`
/// counts `set` calls.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: Arc<Mutex<HashMap<String, String>>>,
    writes: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(rec: PersistedRecord) -> Self {
        let s = Self::new();
        if let Ok(mut v) = s.values.lock() {
            v.insert(CURRENT_KEY.to_string(), rec.current.code().to_string());
            v.insert(TARGET_KEY.to_string(), rec.target.code().to_string());
        }
        s
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.values.lock().ok().and_then(|v| v.get(key).cloned())
    }
}

impl StateStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, BoxError> {
        let v = self.values.lock().map_err(|_| "memory store poisoned")?;
        Ok(v.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), BoxError> {
        let mut v = self.values.lock().map_err(|_| "memory store poisoned")?;
        v.insert(key.to_string(), value.to_string());
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_store_loads_closed_closed() {
        let p = Persistence::new(MemoryStore::new());
        assert_eq!(p.load(), PersistedRecord::default());
    }

    #[test]
    fn current_falls_back_to_target() {
        let mut store = MemoryStore::new();
        store.set(TARGET_KEY, "0").unwrap();
        let p = Persistence::new(store);
        assert_eq!(
            p.load(),
            PersistedRecord {
                current: DoorState::Open,
                target: TargetState::Open
            }
        );
    }

    #[test]
    fn open_current_is_not_mistaken_for_missing() {
        // Code 0 is a real value, not an absent one
        let store = MemoryStore::with_record(PersistedRecord {
            current: DoorState::Open,
            target: TargetState::Closed,
        });
        let rec = Persistence::new(store).load();
        assert_eq!(rec.current, DoorState::Open);
        assert_eq!(rec.target, TargetState::Closed);
    }

    #[test]
    fn garbage_values_are_ignored() {
        let mut store = MemoryStore::new();
        store.set(CURRENT_KEY, "ajar").unwrap();
        store.set(TARGET_KEY, "7").unwrap();
        assert_eq!(Persistence::new(store).load(), PersistedRecord::default());
    }

    #[test]
    fn file_store_round_trips_and_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut p = Persistence::new(FileStore::open(dir.path()).unwrap());
            p.save(PersistedRecord {
                current: DoorState::Closing,
                target: TargetState::Closed,
            })
            .unwrap();
        }
        let p = Persistence::new(FileStore::open(dir.path()).unwrap());
        assert_eq!(p.load().current, DoorState::Closing);
        assert_eq!(
            fs::read_to_string(dir.path().join(CURRENT_KEY)).unwrap(),
            "3"
        );
        assert!(!dir.path().join(".currentDoorState.tmp").exists());
    }

    #[test]
    fn file_store_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(dir.path()).unwrap();
        assert!(store.set("../escape", "1").is_err());
        assert!(store.get("").is_err());
    }
}
