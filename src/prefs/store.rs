//! # Preference Store
//!
//! Key-value persistence with change notifications. Every key can be
//! observed; a new observer immediately sees the current value (or `None`)
//! and then every later change, conflated.
//!
//! Store methods may block on I/O. Async callers should go through
//! `tokio::task::spawn_blocking`.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io;
use std::sync::{Mutex, MutexGuard};

use log::trace;

use crate::core::conflated::{ConflatedReceiver, ConflatedSender};

/// Stream of raw values for one key. `None` means the key is absent.
pub type ValueStream = ConflatedReceiver<Option<String>>;

#[derive(Debug)]
pub enum StoreError {
    Io(io::Error),
    Parse(toml::de::Error),
    Serialize(toml::ser::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "preference store I/O error: {e}"),
            StoreError::Parse(e) => write!(f, "preference store parse error: {e}"),
            StoreError::Serialize(e) => write!(f, "preference store serialize error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io(e) => Some(e),
            StoreError::Parse(e) => Some(e),
            StoreError::Serialize(e) => Some(e),
        }
    }
}

impl From<io::Error> for StoreError {
    fn from(e: io::Error) -> Self {
        StoreError::Io(e)
    }
}

pub trait PreferenceStore: Send + Sync {
    /// Current raw value for `key`.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Stores `value` under `key`; `None` removes the key.
    fn set(&self, key: &str, value: Option<&str>) -> Result<(), StoreError>;

    /// Observes `key`. The current value is replayed immediately.
    fn observe(&self, key: &str) -> Result<ValueStream, StoreError>;
}

/// Values plus one conflated sender per observed key.
///
/// Shared by the store implementations; callers hold the lock around both
/// the write and the notification so observers see changes in write order.
#[derive(Debug, Default)]
pub(crate) struct Entries {
    values: BTreeMap<String, String>,
    watchers: HashMap<String, ConflatedSender<Option<String>>>,
}

impl Entries {
    pub(crate) fn from_values(values: BTreeMap<String, String>) -> Self {
        Self {
            values,
            watchers: HashMap::new(),
        }
    }

    pub(crate) fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    pub(crate) fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    /// Applies a change and notifies observers if the value actually changed.
    pub(crate) fn apply(&mut self, key: &str, value: Option<&str>) -> bool {
        let previous = match value {
            Some(v) => self.values.insert(key.to_string(), v.to_string()),
            None => self.values.remove(key),
        };
        let changed = previous.as_deref() != value;
        if changed {
            self.notify(key);
        }
        changed
    }

    /// Replaces all values, notifying observers of every key that changed.
    pub(crate) fn replace_all(&mut self, values: BTreeMap<String, String>) -> usize {
        let old = std::mem::replace(&mut self.values, values);
        let mut changed = 0;
        let keys: Vec<String> = self.watchers.keys().cloned().collect();
        for key in keys {
            if old.get(&key) != self.values.get(&key) {
                self.notify(&key);
                changed += 1;
            }
        }
        changed
    }

    pub(crate) fn observe(&mut self, key: &str) -> ValueStream {
        // Drop senders whose observers are all gone.
        self.watchers.retain(|_, sender| sender.receiver_count() > 0);

        let current = self.get(key);
        let sender = self.watchers.entry(key.to_string()).or_insert_with(|| {
            let sender = ConflatedSender::new();
            sender.offer(current);
            sender
        });
        sender.subscribe()
    }

    fn notify(&mut self, key: &str) {
        if let Some(sender) = self.watchers.get(key) {
            if sender.receiver_count() == 0 {
                self.watchers.remove(key);
                return;
            }
            trace!("Notifying observers of '{}'", key);
            sender.offer(self.values.get(key).cloned());
        }
    }
}

/// Store that keeps everything in memory. Useful for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct InMemoryPreferenceStore {
    entries: Mutex<Entries>,
}

impl InMemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let values = values
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            entries: Mutex::new(Entries::from_values(values)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PreferenceStore for InMemoryPreferenceStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.lock().get(key))
    }

    fn set(&self, key: &str, value: Option<&str>) -> Result<(), StoreError> {
        self.lock().apply(key, value);
        Ok(())
    }

    fn observe(&self, key: &str) -> Result<ValueStream, StoreError> {
        Ok(self.lock().observe(key))
    }
}
