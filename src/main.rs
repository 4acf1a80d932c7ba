use std::fs::{self, OpenOptions};
use std::process::ExitCode;

use chrono::Local;
use clap::{Parser, Subcommand};
use futures::StreamExt;
use log::{error, info, warn};
use prefcase::app::AppContainer;
use prefcase::core::config::{self, ResolvedConfig};
use prefcase::core::{BoxError, Cancelled, UseCaseResult};
use prefcase::prefs::Theme;
use simplelog::{ConfigBuilder, WriteLogger};
use tokio::runtime::Handle;

#[derive(Parser)]
#[command(name = "prefcase", about = "Inspect and change the app theme preference")]
struct Args {
    /// Preferences file (overrides PREFCASE_STORE and the config file)
    #[arg(long, global = true)]
    store: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Theme preference
    #[command(subcommand)]
    Theme(ThemeCommand),
}

#[derive(Subcommand)]
enum ThemeCommand {
    /// Print the current theme
    Get,
    /// Select a theme
    Set {
        #[arg(value_enum)]
        theme: Theme,
    },
    /// List the themes available on this platform
    List {
        #[arg(long)]
        json: bool,
    },
    /// Print every theme change until Ctrl-C
    Watch {
        /// Stop after this many themes
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        count: Option<u64>,
    },
    /// Remove the stored selection
    Reset,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    dotenv::dotenv().ok();

    let file_config = match config::load_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("prefcase: {e}");
            return ExitCode::FAILURE;
        }
    };
    let resolved = config::resolve(&file_config, args.store.as_deref());
    init_logging(&resolved);
    info!("prefcase starting up, store: {}", resolved.store_path.display());

    match run(args.command, &resolved).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("prefcase: {e}");
            ExitCode::FAILURE
        }
    }
}

/// File logger; stdout stays reserved for command output.
fn init_logging(config: &ResolvedConfig) {
    let log_config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .build();

    if let Some(parent) = config.log_file.parent()
        && !parent.as_os_str().is_empty()
    {
        let _ = fs::create_dir_all(parent);
    }
    if let Ok(log_file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)
    {
        let _ = WriteLogger::init(config.log_level, log_config, log_file);
    }
}

async fn run(command: Command, config: &ResolvedConfig) -> Result<(), BoxError> {
    let app = AppContainer::open(config, Handle::current()).await?;

    match command {
        Command::Theme(ThemeCommand::Get) => {
            let theme = finish(app.get_theme.execute_now_unit().await)?;
            println!("{theme}");
        }
        Command::Theme(ThemeCommand::Set { theme }) => {
            finish(app.set_theme.execute_now(theme).await)?;
            println!("Theme set to {theme}");
        }
        Command::Theme(ThemeCommand::List { json }) => {
            let themes = finish(app.available_themes.execute_now_unit().await)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&themes)?);
            } else {
                for theme in themes {
                    println!("{:<14} {}", theme.storage_key(), theme.title());
                }
            }
        }
        Command::Theme(ThemeCommand::Watch { count }) => watch(&app, config, count).await?,
        Command::Theme(ThemeCommand::Reset) => {
            finish(app.reset_preferences.execute_now_unit().await)?;
            let theme = finish(app.get_theme.execute_now_unit().await)?;
            println!("Theme preference reset, now {theme}");
        }
    }
    Ok(())
}

/// Prints each theme as it changes. The file is re-read on an interval so
/// writes from other processes show up too.
async fn watch(
    app: &AppContainer,
    config: &ResolvedConfig,
    count: Option<u64>,
) -> Result<(), BoxError> {
    let mut themes = app.observe_theme.invoke_unit().into_stream();
    let mut ticker = tokio::time::interval(config.reload_interval);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut printed = 0;

    let outcome = loop {
        tokio::select! {
            _ = &mut ctrl_c => break Ok(()),
            _ = ticker.tick() => {
                if let Err(e) = app.reload().await {
                    warn!("Failed to reload preferences: {}", e);
                }
            }
            next = themes.next() => match next {
                Some(UseCaseResult::Loading) => {}
                Some(UseCaseResult::Success(theme)) => {
                    println!("{} {}", Local::now().format("%Y-%m-%d %H:%M:%S"), theme);
                    printed += 1;
                    if count.is_some_and(|n| printed >= n) {
                        break Ok(());
                    }
                }
                Some(UseCaseResult::Error(e)) => break Err(e.into()),
                None => break Ok(()),
            },
        }
    };
    app.cancel_all();
    outcome
}

fn finish<R>(outcome: Result<UseCaseResult<R>, Cancelled>) -> Result<R, BoxError> {
    match outcome?.into_result() {
        Some(result) => Ok(result?),
        None => Err("use case finished without a result".into()),
    }
}
