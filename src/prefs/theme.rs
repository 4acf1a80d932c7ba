use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A user-selectable app theme.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    Light,
    Dark,
    /// Follow the system-wide dark mode setting.
    FollowSystem,
    /// Dark while battery saver is on.
    AutoBattery,
}

impl Theme {
    pub const ALL: [Theme; 4] = [
        Theme::Light,
        Theme::Dark,
        Theme::FollowSystem,
        Theme::AutoBattery,
    ];

    /// Key this theme is persisted under.
    pub fn storage_key(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::FollowSystem => "follow_system",
            Theme::AutoBattery => "auto_battery",
        }
    }

    /// Looks up a theme by its storage key.
    pub fn from_storage_key(key: &str) -> Option<Theme> {
        Theme::ALL.into_iter().find(|theme| theme.storage_key() == key)
    }

    pub fn title(self) -> &'static str {
        match self {
            Theme::Light => "Light",
            Theme::Dark => "Dark",
            Theme::FollowSystem => "System default",
            Theme::AutoBattery => "Set by Battery Saver",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.storage_key())
    }
}

/// What the host platform can do with dark mode.
///
/// Decides which themes are offered and which one is used when nothing
/// valid is stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ThemeSupport {
    /// The platform has a system-wide dark mode to follow.
    #[default]
    FollowSystem,
    /// No system-wide dark mode; battery saver drives it instead.
    BatterySaverOnly,
}

impl ThemeSupport {
    pub fn from_follow_system_supported(supported: bool) -> Self {
        if supported {
            ThemeSupport::FollowSystem
        } else {
            ThemeSupport::BatterySaverOnly
        }
    }

    pub fn default_theme(self) -> Theme {
        match self {
            ThemeSupport::FollowSystem => Theme::FollowSystem,
            ThemeSupport::BatterySaverOnly => Theme::AutoBattery,
        }
    }

    pub fn available_themes(self) -> Vec<Theme> {
        vec![Theme::Light, Theme::Dark, self.default_theme()]
    }

    /// Maps a raw stored value to a theme. Missing or unknown keys resolve
    /// to [`default_theme`](Self::default_theme), never to an error.
    pub fn resolve(self, storage_key: Option<&str>) -> Theme {
        storage_key
            .and_then(Theme::from_storage_key)
            .unwrap_or_else(|| self.default_theme())
    }
}
