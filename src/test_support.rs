//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::prefs::{
    AppPreferencesStorage, AppPreferencesStorageImpl, InMemoryPreferenceStore, StoreError,
    ValueStream,
};

/// In-memory preferences that count how often the theme is observed.
pub struct FakeAppPreferencesStorage {
    inner: AppPreferencesStorageImpl,
    observe_calls: AtomicUsize,
}

impl FakeAppPreferencesStorage {
    pub fn new() -> Self {
        Self::from_store(InMemoryPreferenceStore::new())
    }

    /// Starts with `storage_key` already selected.
    pub fn with_theme(storage_key: &str) -> Self {
        Self::from_store(InMemoryPreferenceStore::with_values([(
            crate::prefs::KEY_THEME,
            storage_key,
        )]))
    }

    fn from_store(store: InMemoryPreferenceStore) -> Self {
        Self {
            inner: AppPreferencesStorageImpl::new(Arc::new(store)),
            observe_calls: AtomicUsize::new(0),
        }
    }

    /// Number of subscriptions opened on the selected theme.
    pub fn observe_count(&self) -> usize {
        self.observe_calls.load(Ordering::SeqCst)
    }
}

impl AppPreferencesStorage for FakeAppPreferencesStorage {
    fn selected_theme(&self) -> Result<Option<String>, StoreError> {
        self.inner.selected_theme()
    }

    fn set_selected_theme(&self, storage_key: Option<&str>) -> Result<(), StoreError> {
        self.inner.set_selected_theme(storage_key)
    }

    fn observe_selected_theme(&self) -> Result<ValueStream, StoreError> {
        self.observe_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.observe_selected_theme()
    }
}

/// Preferences that fail every call until [`heal`](Self::heal) is called.
pub struct FailingPreferencesStorage {
    broken: AtomicBool,
    inner: FakeAppPreferencesStorage,
}

impl FailingPreferencesStorage {
    pub fn new() -> Self {
        Self {
            broken: AtomicBool::new(true),
            inner: FakeAppPreferencesStorage::new(),
        }
    }

    pub fn heal(&self) {
        self.broken.store(false, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.broken.load(Ordering::SeqCst) {
            Err(StoreError::Io(io::Error::other("storage unavailable")))
        } else {
            Ok(())
        }
    }
}

impl AppPreferencesStorage for FailingPreferencesStorage {
    fn selected_theme(&self) -> Result<Option<String>, StoreError> {
        self.check()?;
        self.inner.selected_theme()
    }

    fn set_selected_theme(&self, storage_key: Option<&str>) -> Result<(), StoreError> {
        self.check()?;
        self.inner.set_selected_theme(storage_key)
    }

    fn observe_selected_theme(&self) -> Result<ValueStream, StoreError> {
        self.check()?;
        self.inner.observe_selected_theme()
    }
}
