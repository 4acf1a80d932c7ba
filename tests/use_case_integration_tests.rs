use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use prefcase::app::AppContainer;
use prefcase::core::config::ResolvedConfig;
use prefcase::core::{BoxError, ResultStream, UseCase, UseCaseExecutor, UseCaseResult};
use prefcase::prefs::{
    AppPreferencesStorage, AppPreferencesStorageImpl, InMemoryPreferenceStore, KEY_THEME,
    PreferenceStore, Theme, ThemeSupport,
};
use tempfile::TempDir;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

const TIMEOUT: Duration = Duration::from_millis(500);

// ============================================================================
// Helper Functions
// ============================================================================

fn in_memory_app(support: ThemeSupport) -> (Arc<InMemoryPreferenceStore>, AppContainer) {
    let store = Arc::new(InMemoryPreferenceStore::new());
    let storage: Arc<dyn AppPreferencesStorage> =
        Arc::new(AppPreferencesStorageImpl::new(store.clone()));
    let app = AppContainer::from_storage(storage, support, Handle::current());
    (store, app)
}

fn file_config(dir: &TempDir) -> ResolvedConfig {
    ResolvedConfig {
        log_level: log::LevelFilter::Off,
        log_file: dir.path().join("prefcase.log"),
        store_path: dir.path().join("preferences.toml"),
        theme_support: ThemeSupport::FollowSystem,
        reload_interval: Duration::from_millis(10),
    }
}

/// Waits for the next `Success`, skipping `Loading`.
async fn next_theme(stream: &mut ResultStream<Theme>) -> Theme {
    tokio::time::timeout(TIMEOUT, async {
        loop {
            match stream.recv().await {
                Some(UseCaseResult::Loading) => continue,
                Some(UseCaseResult::Success(theme)) => return theme,
                other => panic!("unexpected result: {:?}", other),
            }
        }
    })
    .await
    .expect("timed out waiting for a theme")
}

#[derive(Debug)]
struct NotFound(String);

impl std::fmt::Display for NotFound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} not found", self.0)
    }
}

impl std::error::Error for NotFound {}

/// Looks a name up in a fixed table.
struct Lookup;

#[async_trait]
impl UseCase for Lookup {
    type Param = String;
    type Output = usize;

    async fn execute(&self, name: String) -> Result<usize, BoxError> {
        match name.as_str() {
            "one" => Ok(1),
            "two" => Ok(2),
            _ => Err(NotFound(name).into()),
        }
    }
}

/// Never finishes.
struct Forever;

#[async_trait]
impl UseCase for Forever {
    type Param = ();
    type Output = ();

    async fn execute(&self, _param: ()) -> Result<(), BoxError> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

// ============================================================================
// Command Executor
// ============================================================================

#[tokio::test]
async fn test_custom_use_case_publishes_loading_then_terminal_state() {
    let executor = UseCaseExecutor::new(Lookup, Handle::current());

    let (tx, mut rx) = mpsc::unbounded_channel();
    executor.invoke_with("two".to_string(), tx);
    assert_eq!(rx.recv().await, Some(UseCaseResult::Loading));
    assert_eq!(rx.recv().await, Some(UseCaseResult::Success(2)));
    assert_eq!(rx.recv().await, None);

    let (tx, mut rx) = mpsc::unbounded_channel();
    executor.invoke_with("three".to_string(), tx);
    assert_eq!(rx.recv().await, Some(UseCaseResult::Loading));
    match rx.recv().await {
        Some(UseCaseResult::Error(e)) => {
            let cause = e.downcast_ref::<NotFound>().expect("cause is preserved");
            assert_eq!(cause.0, "three");
        }
        other => panic!("expected an error, got {:?}", other),
    }
    assert_eq!(rx.recv().await, None);
}

#[tokio::test]
async fn test_concurrent_invocations_are_independent() {
    let executor = UseCaseExecutor::new(Lookup, Handle::current());
    let one = executor.invoke("one".to_string());
    let two = executor.invoke("two".to_string());

    let last = |mut stream: ResultStream<usize>| async move {
        let mut last = None;
        while let Some(result) = stream.recv().await {
            last = Some(result);
        }
        last
    };
    let (one, two) = tokio::join!(last(one), last(two));
    assert_eq!(one, Some(UseCaseResult::Success(1)));
    assert_eq!(two, Some(UseCaseResult::Success(2)));
}

#[tokio::test]
async fn test_cancel_all_ends_streams_without_terminal_state() {
    let executor = UseCaseExecutor::new(Forever, Handle::current());
    let mut results = executor.invoke_unit();
    executor.cancel_all();

    let seen = tokio::time::timeout(TIMEOUT, async {
        let mut seen = Vec::new();
        while let Some(result) = results.recv().await {
            seen.push(result);
        }
        seen
    })
    .await
    .expect("stream did not end after cancel_all");
    assert!(seen.iter().all(UseCaseResult::is_loading));
    assert_eq!(executor.active_jobs(), 0);
}

// ============================================================================
// Theme use cases through the container
// ============================================================================

#[tokio::test]
async fn test_set_theme_reaches_every_observer() {
    let (store, app) = in_memory_app(ThemeSupport::FollowSystem);
    let mut first = app.observe_theme.invoke_unit();
    let mut second = app.observe_theme.invoke_unit();
    assert_eq!(next_theme(&mut first).await, Theme::FollowSystem);
    assert_eq!(next_theme(&mut second).await, Theme::FollowSystem);

    for theme in [Theme::Dark, Theme::Light] {
        let result = app.set_theme.execute_now(theme).await.unwrap();
        assert_eq!(result, UseCaseResult::Success(()));
        assert_eq!(next_theme(&mut first).await, theme);
        assert_eq!(next_theme(&mut second).await, theme);
    }
    assert_eq!(store.get(KEY_THEME).unwrap().as_deref(), Some("light"));
}

#[tokio::test]
async fn test_reset_restores_platform_default() {
    let (store, app) = in_memory_app(ThemeSupport::BatterySaverOnly);
    let mut themes = app.observe_theme.invoke_unit();
    assert_eq!(next_theme(&mut themes).await, Theme::AutoBattery);

    app.set_theme.execute_now(Theme::Dark).await.unwrap();
    assert_eq!(next_theme(&mut themes).await, Theme::Dark);

    app.reset_preferences.execute_now_unit().await.unwrap();
    assert_eq!(next_theme(&mut themes).await, Theme::AutoBattery);
    assert_eq!(store.get(KEY_THEME).unwrap(), None);
}

#[tokio::test]
async fn test_garbage_in_store_resolves_to_default() {
    let (store, app) = in_memory_app(ThemeSupport::FollowSystem);
    store.set(KEY_THEME, Some("solarized")).unwrap();

    assert_eq!(
        app.get_theme.execute_now_unit().await.unwrap(),
        UseCaseResult::Success(Theme::FollowSystem)
    );
    let mut themes = app.observe_theme.invoke_unit();
    assert_eq!(next_theme(&mut themes).await, Theme::FollowSystem);
}

#[tokio::test]
async fn test_file_backed_theme_survives_restart() {
    let dir = TempDir::new().unwrap();
    let config = file_config(&dir);

    {
        let app = AppContainer::open(&config, Handle::current()).await.unwrap();
        app.set_theme.execute_now(Theme::Dark).await.unwrap();
    }

    let app = AppContainer::open(&config, Handle::current()).await.unwrap();
    assert_eq!(
        app.get_theme.execute_now_unit().await.unwrap(),
        UseCaseResult::Success(Theme::Dark)
    );
}

#[tokio::test]
async fn test_changes_from_another_container_show_up_after_reload() {
    let dir = TempDir::new().unwrap();
    let config = file_config(&dir);
    let watcher = AppContainer::open(&config, Handle::current()).await.unwrap();
    let writer = AppContainer::open(&config, Handle::current()).await.unwrap();

    let mut themes = watcher.observe_theme.invoke_unit();
    assert_eq!(next_theme(&mut themes).await, Theme::FollowSystem);

    writer.set_theme.execute_now(Theme::Light).await.unwrap();
    assert_eq!(watcher.reload().await.unwrap(), 1);
    assert_eq!(next_theme(&mut themes).await, Theme::Light);
}

#[tokio::test]
async fn test_available_themes_follow_platform_support() {
    let (_, supported) = in_memory_app(ThemeSupport::FollowSystem);
    let (_, unsupported) = in_memory_app(ThemeSupport::BatterySaverOnly);

    let themes = supported
        .available_themes
        .execute_now_unit()
        .await
        .unwrap()
        .into_success()
        .unwrap();
    assert_eq!(themes, vec![Theme::Light, Theme::Dark, Theme::FollowSystem]);

    let themes = unsupported
        .available_themes
        .execute_now_unit()
        .await
        .unwrap()
        .into_success()
        .unwrap();
    assert_eq!(themes, vec![Theme::Light, Theme::Dark, Theme::AutoBattery]);
}
