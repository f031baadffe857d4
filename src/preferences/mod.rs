//! Persistent default-quality preference.
//!
//! Stored as a small JSON object. Keys this module does not own are kept
//! untouched when the file is rewritten.

use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use webpforge_common::{Error, Quality, Result};

/// Key under which the default quality is stored.
pub const DEFAULT_QUALITY_KEY: &str = "webp-default-quality";

/// Default-quality preference backed by a JSON file, or by memory only.
#[derive(Debug)]
pub struct PreferenceStore {
    path: Option<PathBuf>,
    entries: Mutex<Map<String, Value>>,
}

impl PreferenceStore {
    /// Open the store at `path`. A missing or unreadable file yields an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = read_entries(&path);
        Self {
            path: Some(path),
            entries: Mutex::new(entries),
        }
    }

    /// A store that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: Mutex::new(Map::new()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The stored default quality.
    ///
    /// Falls back to [`Quality::DEFAULT`] when nothing is stored or the stored
    /// value is not a number inside the accepted range.
    pub fn get(&self) -> Quality {
        let entries = self.entries.lock();
        match entries.get(DEFAULT_QUALITY_KEY).and_then(Value::as_f64) {
            Some(raw) if Quality::in_range(raw as f32) => Quality::new(raw as f32),
            Some(raw) => {
                tracing::debug!("Ignoring out-of-range stored quality {}", raw);
                Quality::DEFAULT
            }
            None => Quality::DEFAULT,
        }
    }

    /// Clamp and store a new default quality, returning the stored value.
    pub fn set(&self, value: f32) -> Result<Quality> {
        let quality = Quality::new(value);
        let mut entries = self.entries.lock();
        entries.insert(DEFAULT_QUALITY_KEY.to_string(), Value::from(quality.value()));

        if let Some(path) = &self.path {
            write_entries(path, &entries)?;
        }

        tracing::debug!("Default quality set to {}", quality);
        Ok(quality)
    }
}

fn read_entries(path: &Path) -> Map<String, Value> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Map::new(),
        Err(e) => {
            tracing::warn!("Failed to read preferences from {:?}: {}", path, e);
            return Map::new();
        }
    };

    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Object(map)) => map,
        Ok(_) | Err(_) => {
            tracing::warn!("Ignoring malformed preferences file {:?}", path);
            Map::new()
        }
    }
}

fn write_entries(path: &Path, entries: &Map<String, Value>) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let json = serde_json::to_string_pretty(entries)
        .map_err(|e| Error::Internal(format!("Failed to serialize preferences: {}", e)))?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::open(dir.path().join("prefs.json"));
        assert_eq!(store.get(), Quality::DEFAULT);
    }

    #[test]
    fn test_set_persists_across_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("prefs.json");

        let store = PreferenceStore::open(&path);
        assert_eq!(store.set(0.75).unwrap(), Quality::new(0.75));

        let reopened = PreferenceStore::open(&path);
        assert_eq!(reopened.get(), Quality::new(0.75));
    }

    #[test]
    fn test_set_clamps() {
        let store = PreferenceStore::in_memory();
        assert_eq!(store.set(1.5).unwrap(), Quality::MAX);
        assert_eq!(store.get(), Quality::MAX);
        assert_eq!(store.set(0.01).unwrap(), Quality::MIN);
    }

    #[test]
    fn test_out_of_range_stored_value_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, r#"{"webp-default-quality": 3.0}"#).unwrap();

        assert_eq!(PreferenceStore::open(&path).get(), Quality::DEFAULT);
    }

    #[test]
    fn test_malformed_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, "not json").unwrap();

        assert_eq!(PreferenceStore::open(&path).get(), Quality::DEFAULT);
    }

    #[test]
    fn test_unrelated_keys_survive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, r#"{"theme": "dark"}"#).unwrap();

        let store = PreferenceStore::open(&path);
        store.set(0.3).unwrap();

        let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["theme"], "dark");
        assert!(raw[DEFAULT_QUALITY_KEY].is_number());
    }
}
