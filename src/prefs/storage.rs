//! Typed access to the app's own preferences on top of a [`PreferenceStore`].

use std::sync::Arc;

use super::store::{PreferenceStore, StoreError, ValueStream};

/// Key the selected theme's storage key is kept under.
pub const KEY_THEME: &str = "selected_theme";

/// Storage for app's and user's preferences.
///
/// Every method may block on I/O.
pub trait AppPreferencesStorage: Send + Sync {
    /// Storage key of the currently selected theme.
    fn selected_theme(&self) -> Result<Option<String>, StoreError>;

    fn set_selected_theme(&self, storage_key: Option<&str>) -> Result<(), StoreError>;

    /// Up-to-date storage key of the selected theme, current value first.
    fn observe_selected_theme(&self) -> Result<ValueStream, StoreError>;

    /// Resets every preference to its default.
    fn reset(&self) -> Result<(), StoreError> {
        self.set_selected_theme(None)
    }
}

/// [`AppPreferencesStorage`] backed by any [`PreferenceStore`].
pub struct AppPreferencesStorageImpl {
    store: Arc<dyn PreferenceStore>,
}

impl AppPreferencesStorageImpl {
    pub fn new(store: Arc<dyn PreferenceStore>) -> Self {
        Self { store }
    }
}

impl AppPreferencesStorage for AppPreferencesStorageImpl {
    fn selected_theme(&self) -> Result<Option<String>, StoreError> {
        self.store.get(KEY_THEME)
    }

    fn set_selected_theme(&self, storage_key: Option<&str>) -> Result<(), StoreError> {
        self.store.set(KEY_THEME, storage_key)
    }

    fn observe_selected_theme(&self) -> Result<ValueStream, StoreError> {
        self.store.observe(KEY_THEME)
    }
}
