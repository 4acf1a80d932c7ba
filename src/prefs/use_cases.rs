//! # Theme Use Cases
//!
//! Reading, writing and observing the user's theme preference.
//!
//! All store access goes through `spawn_blocking` since the store may hit
//! the disk.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use log::{debug, trace, warn};
use tokio::task::spawn_blocking;

use crate::core::{BoxError, ObservableUseCase, ResultSender, UseCase, UseCaseResult};

use super::storage::AppPreferencesStorage;
use super::theme::{Theme, ThemeSupport};

/// Observes the user-selected theme. Every published result is a `Success`.
///
/// Holds at most one live storage subscription, however many times it is
/// invoked. Once that subscription ends or its job is cancelled, the next
/// invocation subscribes again.
pub struct ObservableThemeUseCase {
    storage: Arc<dyn AppPreferencesStorage>,
    support: ThemeSupport,
    subscribed: AtomicBool,
}

impl ObservableThemeUseCase {
    pub fn new(storage: Arc<dyn AppPreferencesStorage>, support: ThemeSupport) -> Self {
        Self {
            storage,
            support,
            subscribed: AtomicBool::new(false),
        }
    }

    /// Whether a storage subscription is currently live.
    pub fn is_subscribed(&self) -> bool {
        self.subscribed.load(Ordering::Acquire)
    }
}

/// Clears the subscription flag when the subscribing future finishes or is dropped.
struct SubscriptionGuard<'a>(&'a AtomicBool);

impl Drop for SubscriptionGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[async_trait]
impl ObservableUseCase for ObservableThemeUseCase {
    type Param = ();
    type Output = Theme;

    async fn execute(&self, _param: (), result: &ResultSender<Theme>) -> Result<(), BoxError> {
        if self
            .subscribed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            trace!("Already observing the selected theme");
            return Ok(());
        }
        let _guard = SubscriptionGuard(&self.subscribed);

        let storage = Arc::clone(&self.storage);
        let mut changes = match spawn_blocking(move || storage.observe_selected_theme()).await? {
            Ok(changes) => changes,
            Err(e) => {
                warn!("Failed to observe the selected theme: {}", e);
                return Err(e.into());
            }
        };

        while let Some(storage_key) = changes.recv().await {
            let theme = self.support.resolve(storage_key.as_deref());
            debug!("Selected theme: {:?} -> {}", storage_key, theme);
            result.offer(UseCaseResult::Success(theme));
        }
        debug!("Theme preference stream closed");
        Ok(())
    }
}

/// Persists the given theme as the user's selection.
pub struct SetThemeUseCase {
    storage: Arc<dyn AppPreferencesStorage>,
}

impl SetThemeUseCase {
    pub fn new(storage: Arc<dyn AppPreferencesStorage>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl UseCase for SetThemeUseCase {
    type Param = Theme;
    type Output = ();

    async fn execute(&self, theme: Theme) -> Result<(), BoxError> {
        let storage = Arc::clone(&self.storage);
        spawn_blocking(move || storage.set_selected_theme(Some(theme.storage_key()))).await??;
        Ok(())
    }
}

/// Reads the selected theme once.
pub struct GetThemeUseCase {
    storage: Arc<dyn AppPreferencesStorage>,
    support: ThemeSupport,
}

impl GetThemeUseCase {
    pub fn new(storage: Arc<dyn AppPreferencesStorage>, support: ThemeSupport) -> Self {
        Self { storage, support }
    }
}

#[async_trait]
impl UseCase for GetThemeUseCase {
    type Param = ();
    type Output = Theme;

    async fn execute(&self, _param: ()) -> Result<Theme, BoxError> {
        let storage = Arc::clone(&self.storage);
        let storage_key = spawn_blocking(move || storage.selected_theme()).await??;
        Ok(self.support.resolve(storage_key.as_deref()))
    }
}

/// Removes the stored selection so the default theme applies again.
pub struct ResetPreferencesUseCase {
    storage: Arc<dyn AppPreferencesStorage>,
}

impl ResetPreferencesUseCase {
    pub fn new(storage: Arc<dyn AppPreferencesStorage>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl UseCase for ResetPreferencesUseCase {
    type Param = ();
    type Output = ();

    async fn execute(&self, _param: ()) -> Result<(), BoxError> {
        let storage = Arc::clone(&self.storage);
        spawn_blocking(move || storage.reset()).await??;
        Ok(())
    }
}

/// Themes the user can pick from on this platform.
pub struct GetAvailableThemesUseCase {
    support: ThemeSupport,
}

impl GetAvailableThemesUseCase {
    pub fn new(support: ThemeSupport) -> Self {
        Self { support }
    }
}

#[async_trait]
impl UseCase for GetAvailableThemesUseCase {
    type Param = ();
    type Output = Vec<Theme>;

    async fn execute(&self, _param: ()) -> Result<Vec<Theme>, BoxError> {
        Ok(self.support.available_themes())
    }
}
