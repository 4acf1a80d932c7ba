//! # Preferences
//!
//! The theme preference and everything around it:
//!
//! - [`store`]: `PreferenceStore` trait and the in-memory implementation
//! - [`file_store`]: TOML file-backed store
//! - [`storage`]: typed `AppPreferencesStorage` facade
//! - [`theme`]: the `Theme` model and its default rules
//! - [`use_cases`]: get/set/observe use cases built on `crate::core`

pub mod file_store;
pub mod storage;
pub mod store;
pub mod theme;
pub mod use_cases;

pub use file_store::FilePreferenceStore;
pub use storage::{AppPreferencesStorage, AppPreferencesStorageImpl, KEY_THEME};
pub use store::{InMemoryPreferenceStore, PreferenceStore, StoreError, ValueStream};
pub use theme::{Theme, ThemeSupport};
pub use use_cases::{
    GetAvailableThemesUseCase, GetThemeUseCase, ObservableThemeUseCase, ResetPreferencesUseCase,
    SetThemeUseCase,
};
