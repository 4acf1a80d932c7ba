//! # File-backed Preference Store
//!
//! Preferences live in a flat TOML table:
//!
//! ```toml
//! selected_theme = "dark"
//! ```
//!
//! The file is read once on open and rewritten on every change. Writes use
//! atomic rename (write `.tmp`, then `rename()`) for crash safety. Changes
//! made by other processes are picked up by [`FilePreferenceStore::reload`].

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use log::{debug, info};

use super::store::{Entries, PreferenceStore, StoreError, ValueStream};

#[derive(Debug)]
pub struct FilePreferenceStore {
    path: PathBuf,
    entries: Mutex<Entries>,
}

impl FilePreferenceStore {
    /// Opens the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let values = read_values(&path)?;
        info!(
            "Opened preference store at {} ({} value(s))",
            path.display(),
            values.len()
        );
        Ok(Self {
            path,
            entries: Mutex::new(Entries::from_values(values)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-reads the file and notifies observers of keys that changed on disk.
    /// Returns how many observed keys changed.
    pub fn reload(&self) -> Result<usize, StoreError> {
        let values = read_values(&self.path)?;
        let changed = self.lock().replace_all(values);
        if changed > 0 {
            debug!("Reloaded {}: {} observed key(s) changed", self.path.display(), changed);
        }
        Ok(changed)
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.lock().get(key))
    }

    fn set(&self, key: &str, value: Option<&str>) -> Result<(), StoreError> {
        let mut entries = self.lock();
        let mut values = entries.values().clone();
        match value {
            Some(v) => values.insert(key.to_string(), v.to_string()),
            None => values.remove(key),
        };
        // Persist first so observers never see a value that failed to save.
        write_values(&self.path, &values)?;
        entries.apply(key, value);
        debug!("Stored '{}' = {:?} in {}", key, value, self.path.display());
        Ok(())
    }

    fn observe(&self, key: &str) -> Result<ValueStream, StoreError> {
        Ok(self.lock().observe(key))
    }
}

fn read_values(path: &Path) -> Result<BTreeMap<String, String>, StoreError> {
    match fs::read_to_string(path) {
        Ok(contents) => toml::from_str(&contents).map_err(StoreError::Parse),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(e) => Err(StoreError::Io(e)),
    }
}

/// Atomically writes `values` as TOML to `path` (via `.tmp` + rename).
fn write_values(path: &Path, values: &BTreeMap<String, String>) -> Result<(), StoreError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let contents = toml::to_string(values).map_err(StoreError::Serialize)?;
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, contents)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> FilePreferenceStore {
        FilePreferenceStore::open(dir.path().join("prefs").join("preferences.toml")).unwrap()
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.get("selected_theme").unwrap(), None);
        assert!(!store.path().exists());
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = TempDir::new().unwrap();
        store_in(&dir).set("selected_theme", Some("dark")).unwrap();

        let reopened = store_in(&dir);
        assert_eq!(
            reopened.get("selected_theme").unwrap().as_deref(),
            Some("dark")
        );

        reopened.set("selected_theme", None).unwrap();
        assert_eq!(store_in(&dir).get("selected_theme").unwrap(), None);
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("preferences.toml");
        fs::write(&path, "this is = = not toml").unwrap();
        assert!(matches!(
            FilePreferenceStore::open(&path),
            Err(StoreError::Parse(_))
        ));
    }

    #[test]
    fn test_no_tmp_file_left_behind() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.set("k", Some("v")).unwrap();
        assert!(!store.path().with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn test_reload_notifies_observers_of_external_changes() {
        let dir = TempDir::new().unwrap();
        let watcher = store_in(&dir);
        let writer = store_in(&dir);

        let mut stream = watcher.observe("selected_theme").unwrap();
        assert_eq!(stream.recv().await, Some(None));

        writer.set("selected_theme", Some("light")).unwrap();
        assert_eq!(watcher.reload().unwrap(), 1);

        let next = tokio::time::timeout(Duration::from_millis(250), stream.recv())
            .await
            .expect("timed out");
        assert_eq!(next, Some(Some("light".to_string())));
        assert_eq!(watcher.reload().unwrap(), 0);
    }
}
