//! # App Container
//!
//! Wires the preference store, the typed storage and one executor per use
//! case. Built once at startup and passed to whoever needs it.

use std::io;
use std::sync::Arc;

use log::info;
use tokio::runtime::Handle;
use tokio::task::{JoinError, spawn_blocking};

use crate::core::config::ResolvedConfig;
use crate::core::{ObservableExecutor, UseCaseExecutor};
use crate::prefs::{
    AppPreferencesStorage, AppPreferencesStorageImpl, FilePreferenceStore,
    GetAvailableThemesUseCase, GetThemeUseCase, ObservableThemeUseCase, ResetPreferencesUseCase,
    SetThemeUseCase, StoreError, ThemeSupport,
};

pub struct AppContainer {
    file_store: Option<Arc<FilePreferenceStore>>,
    pub set_theme: UseCaseExecutor<SetThemeUseCase>,
    pub get_theme: UseCaseExecutor<GetThemeUseCase>,
    pub reset_preferences: UseCaseExecutor<ResetPreferencesUseCase>,
    pub available_themes: UseCaseExecutor<GetAvailableThemesUseCase>,
    pub observe_theme: ObservableExecutor<ObservableThemeUseCase>,
}

impl AppContainer {
    /// Opens the preferences file named by `config` on the blocking pool and
    /// builds every executor on `runtime`.
    pub async fn open(config: &ResolvedConfig, runtime: Handle) -> Result<Self, StoreError> {
        let path = config.store_path.clone();
        let file_store = spawn_blocking(move || FilePreferenceStore::open(path))
            .await
            .map_err(join_error)??;
        let file_store = Arc::new(file_store);
        info!("Using preferences at {}", file_store.path().display());

        let storage: Arc<dyn AppPreferencesStorage> =
            Arc::new(AppPreferencesStorageImpl::new(file_store.clone()));
        let mut container = Self::from_storage(storage, config.theme_support, runtime);
        container.file_store = Some(file_store);
        Ok(container)
    }

    pub fn from_storage(
        storage: Arc<dyn AppPreferencesStorage>,
        support: ThemeSupport,
        runtime: Handle,
    ) -> Self {
        Self {
            file_store: None,
            set_theme: UseCaseExecutor::new(SetThemeUseCase::new(storage.clone()), runtime.clone()),
            get_theme: UseCaseExecutor::new(
                GetThemeUseCase::new(storage.clone(), support),
                runtime.clone(),
            ),
            reset_preferences: UseCaseExecutor::new(
                ResetPreferencesUseCase::new(storage.clone()),
                runtime.clone(),
            ),
            available_themes: UseCaseExecutor::new(
                GetAvailableThemesUseCase::new(support),
                runtime.clone(),
            ),
            observe_theme: ObservableExecutor::new(
                ObservableThemeUseCase::new(storage, support),
                runtime,
            ),
        }
    }

    /// Picks up changes other processes made to the preferences file.
    ///
    /// Returns how many observed keys changed; always 0 when not file-backed.
    /// The file is read on the blocking pool.
    pub async fn reload(&self) -> Result<usize, StoreError> {
        let Some(store) = self.file_store.clone() else {
            return Ok(0);
        };
        spawn_blocking(move || store.reload())
            .await
            .map_err(join_error)?
    }

    /// Abandons all in-flight work. Executors stay usable.
    pub fn cancel_all(&self) {
        self.set_theme.cancel_all();
        self.get_theme.cancel_all();
        self.reset_preferences.cancel_all();
        self.available_themes.cancel_all();
        self.observe_theme.cancel_all();
    }
}

fn join_error(e: JoinError) -> StoreError {
    StoreError::Io(io::Error::other(e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::UseCaseResult;
    use crate::prefs::Theme;
    use crate::test_support::FakeAppPreferencesStorage;
    use std::time::Duration;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_container_shares_one_storage() {
        let storage = Arc::new(FakeAppPreferencesStorage::new());
        let app = AppContainer::from_storage(storage, ThemeSupport::FollowSystem, Handle::current());

        app.set_theme.execute_now(Theme::Light).await.unwrap();
        assert_eq!(
            app.get_theme.execute_now_unit().await.unwrap(),
            UseCaseResult::Success(Theme::Light)
        );
        assert_eq!(app.reload().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_open_reads_file_store_and_reloads() {
        let dir = TempDir::new().unwrap();
        let config = ResolvedConfig {
            log_level: log::LevelFilter::Off,
            log_file: dir.path().join("prefcase.log"),
            store_path: dir.path().join("preferences.toml"),
            theme_support: ThemeSupport::BatterySaverOnly,
            reload_interval: Duration::from_millis(10),
        };
        let app = AppContainer::open(&config, Handle::current()).await.unwrap();
        assert_eq!(
            app.get_theme.execute_now_unit().await.unwrap(),
            UseCaseResult::Success(Theme::AutoBattery)
        );

        let mut themes = app.observe_theme.invoke_unit();
        let first = tokio::time::timeout(Duration::from_millis(250), async {
            loop {
                match themes.recv().await {
                    Some(UseCaseResult::Loading) => continue,
                    other => return other,
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(first, Some(UseCaseResult::Success(Theme::AutoBattery)));

        // Another process writes the file.
        std::fs::write(&config.store_path, "selected_theme = \"dark\"\n").unwrap();
        assert_eq!(app.reload().await.unwrap(), 1);
        let next = tokio::time::timeout(Duration::from_millis(250), themes.recv())
            .await
            .unwrap();
        assert_eq!(next, Some(UseCaseResult::Success(Theme::Dark)));
    }
}
