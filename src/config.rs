//! Runtime configuration module.
//!
//! Contains the process-level configuration for trackpaper: where the rule
//! and render files live, which media source and wallpaper sink to use, and
//! the timing knobs. Values come from `TRACKPAPER_*` environment variables,
//! then CLI flags override them.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::sink::SinkKind;
use crate::types::RenderConfig;

/// Minimum poll interval for polling sources.
pub const MIN_POLL_INTERVAL_SECS: f32 = 0.2;

/// Where track metadata comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Poll MPRIS players through the `playerctl` binary.
    #[default]
    Playerctl,
    /// Read one JSON snapshot per line from stdin.
    Stdin,
}

impl SourceKind {
    /// Returns the string representation of the source.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Playerctl => "playerctl",
            SourceKind::Stdin => "stdin",
        }
    }

    /// Parses a source from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "playerctl" | "mpris" => Some(SourceKind::Playerctl),
            "stdin" | "json" => Some(SourceKind::Stdin),
            _ => None,
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Runtime configuration for the watcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the rule file.
    /// If None, uses `rules.json` in the platform config directory.
    pub rules_path: Option<PathBuf>,

    /// Path to the render configuration file.
    /// If None, uses `render.json` in the platform config directory when it
    /// exists, and built-in defaults otherwise.
    pub render_config_path: Option<PathBuf>,

    /// Only react to sessions whose app id contains this text (case-insensitive).
    pub app_filter: Option<String>,

    /// Metadata source.
    pub source: SourceKind,

    /// MPRIS player name for the playerctl source; None polls whichever is active.
    pub player: Option<String>,

    /// Wallpaper sink.
    pub sink: SinkKind,

    /// Command template for `SinkKind::Command`; `{path}` is replaced by the image path.
    pub sink_command: Option<String>,

    /// Seconds between polls for polling sources.
    pub poll_interval_secs: f32,

    /// Seconds to wait for the desktop to apply a wallpaper.
    pub sink_timeout_secs: f32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            rules_path: None,
            render_config_path: None,
            app_filter: None,
            source: SourceKind::default(),
            player: None,
            sink: SinkKind::default(),
            sink_command: None,
            poll_interval_secs: 1.0,
            sink_timeout_secs: 10.0,
        }
    }
}

impl AppConfig {
    /// Creates a new AppConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an AppConfig from environment variables.
    ///
    /// Reads the following environment variables:
    /// - `TRACKPAPER_RULES` - Path to the rule file
    /// - `TRACKPAPER_RENDER_CONFIG` - Path to the render configuration file
    /// - `TRACKPAPER_APP_FILTER` - Only react to this app (substring)
    /// - `TRACKPAPER_SOURCE` - Metadata source (playerctl, stdin)
    /// - `TRACKPAPER_PLAYER` - MPRIS player name for playerctl
    /// - `TRACKPAPER_SINK` - Wallpaper sink (auto, gnome, kde, macos, windows, feh, command)
    /// - `TRACKPAPER_SINK_COMMAND` - Custom sink command template
    /// - `TRACKPAPER_POLL_INTERVAL` - Poll interval in seconds
    /// - `TRACKPAPER_SINK_TIMEOUT` - Sink timeout in seconds
    ///
    /// Falls back to defaults for unset or unparsable variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("TRACKPAPER_RULES") {
            config.rules_path = Some(PathBuf::from(path));
        }

        if let Ok(path) = std::env::var("TRACKPAPER_RENDER_CONFIG") {
            config.render_config_path = Some(PathBuf::from(path));
        }

        if let Ok(filter) = std::env::var("TRACKPAPER_APP_FILTER") {
            if !filter.trim().is_empty() {
                config.app_filter = Some(filter.trim().to_string());
            }
        }

        if let Ok(source_str) = std::env::var("TRACKPAPER_SOURCE") {
            if let Some(source) = SourceKind::parse(&source_str) {
                config.source = source;
            }
        }

        if let Ok(player) = std::env::var("TRACKPAPER_PLAYER") {
            if !player.trim().is_empty() {
                config.player = Some(player.trim().to_string());
            }
        }

        if let Ok(sink_str) = std::env::var("TRACKPAPER_SINK") {
            if let Some(sink) = SinkKind::parse(&sink_str) {
                config.sink = sink;
            }
        }

        if let Ok(command) = std::env::var("TRACKPAPER_SINK_COMMAND") {
            if !command.trim().is_empty() {
                config.sink_command = Some(command);
            }
        }

        if let Ok(interval_str) = std::env::var("TRACKPAPER_POLL_INTERVAL") {
            if let Ok(interval) = interval_str.parse::<f32>() {
                config.poll_interval_secs = interval;
            }
        }

        if let Ok(timeout_str) = std::env::var("TRACKPAPER_SINK_TIMEOUT") {
            if let Ok(timeout) = timeout_str.parse::<f32>() {
                config.sink_timeout_secs = timeout;
            }
        }

        config
    }

    /// Returns the effective rule file path, using platform defaults if not specified.
    pub fn effective_rules_path(&self) -> PathBuf {
        if let Some(ref path) = self.rules_path {
            path.clone()
        } else {
            default_config_dir().join("rules.json")
        }
    }

    /// Returns the effective render configuration path, using platform defaults if not specified.
    pub fn effective_render_config_path(&self) -> PathBuf {
        if let Some(ref path) = self.render_config_path {
            path.clone()
        } else {
            default_config_dir().join("render.json")
        }
    }

    /// Loads the render configuration.
    ///
    /// An explicitly configured file must exist. The default location is
    /// optional; built-in defaults are used when nothing is there.
    pub fn load_render_config(&self) -> Result<RenderConfig> {
        let path = self.effective_render_config_path();
        if self.render_config_path.is_none() && !path.exists() {
            log::info!(
                "No render config at {}; using built-in defaults",
                path.display()
            );
            return Ok(RenderConfig::default());
        }
        RenderConfig::load(&path)
    }

    /// Returns the poll interval, clamped to the minimum.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs_f32(self.poll_interval_secs.max(MIN_POLL_INTERVAL_SECS))
    }

    /// Returns the `playerctl` arguments that select the configured player.
    pub fn playerctl_args(&self) -> Vec<String> {
        self.player
            .iter()
            .map(|player| format!("--player={}", player))
            .collect()
    }

    /// Returns the sink timeout.
    pub fn sink_timeout(&self) -> Duration {
        Duration::from_secs_f32(self.sink_timeout_secs.max(0.1))
    }

    /// Validates the configuration.
    ///
    /// Returns an error message if validation fails, None otherwise.
    pub fn validate(&self) -> Option<String> {
        if !self.poll_interval_secs.is_finite() || self.poll_interval_secs <= 0.0 {
            return Some(format!(
                "poll interval must be > 0, got {}",
                self.poll_interval_secs
            ));
        }

        if !self.sink_timeout_secs.is_finite()
            || !(0.5..=300.0).contains(&self.sink_timeout_secs)
        {
            return Some(format!(
                "sink timeout must be between 0.5 and 300 seconds, got {}",
                self.sink_timeout_secs
            ));
        }

        if self.sink == SinkKind::Command && self.sink_command.is_none() {
            return Some("--sink command requires --sink-command".to_string());
        }

        None
    }
}

/// Resolves a path from a configuration file.
///
/// A leading `~` expands to the home directory; other relative paths are
/// taken relative to `base` (the directory of the file that named them).
pub fn resolve_path(base: &Path, raw: &Path) -> PathBuf {
    if let Ok(rest) = raw.strip_prefix("~") {
        if let Some(dirs) = directories::BaseDirs::new() {
            return dirs.home_dir().join(rest);
        }
    }
    if raw.is_absolute() {
        raw.to_path_buf()
    } else {
        base.join(raw)
    }
}

/// Returns the platform-specific configuration directory.
///
/// Uses the `directories` crate to find appropriate locations:
/// - macOS: ~/Library/Application Support/trackpaper
/// - Linux: ~/.config/trackpaper
/// - Windows: C:\Users\<user>\AppData\Roaming\trackpaper\config
pub fn default_config_dir() -> PathBuf {
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "trackpaper") {
        proj_dirs.config_dir().to_path_buf()
    } else {
        // Fallback to current directory
        PathBuf::from("./config")
    }
}

/// Returns the platform-specific default output image path.
///
/// Uses the `directories` crate to find appropriate locations:
/// - macOS: ~/Library/Caches/trackpaper/current_wallpaper.png
/// - Linux: ~/.cache/trackpaper/current_wallpaper.png
/// - Windows: C:\Users\<user>\AppData\Local\trackpaper\cache\current_wallpaper.png
pub fn default_output_path() -> PathBuf {
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "trackpaper") {
        proj_dirs.cache_dir().join("current_wallpaper.png")
    } else {
        // Fallback to current directory
        PathBuf::from("./.generated/current_wallpaper.png")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_parsing() {
        assert_eq!(SourceKind::parse("playerctl"), Some(SourceKind::Playerctl));
        assert_eq!(SourceKind::parse("MPRIS"), Some(SourceKind::Playerctl));
        assert_eq!(SourceKind::parse("stdin"), Some(SourceKind::Stdin));
        assert_eq!(SourceKind::parse("dbus"), None);
        assert_eq!(SourceKind::Stdin.to_string(), "stdin");
    }

    #[test]
    fn config_validation() {
        let mut config = AppConfig::new();
        assert!(config.validate().is_none());

        config.poll_interval_secs = 0.0;
        assert!(config.validate().is_some());
        config.poll_interval_secs = 1.0;

        config.sink_timeout_secs = 1000.0;
        assert!(config.validate().is_some());
        config.sink_timeout_secs = 5.0;

        config.sink = SinkKind::Command;
        assert!(config.validate().is_some());
        config.sink_command = Some("feh --bg-fill {path}".to_string());
        assert!(config.validate().is_none());
    }

    #[test]
    fn poll_interval_is_clamped() {
        let config = AppConfig {
            poll_interval_secs: 0.01,
            ..AppConfig::default()
        };
        assert_eq!(config.poll_interval(), Duration::from_secs_f32(0.2));
    }

    #[test]
    fn player_becomes_playerctl_argument() {
        assert!(AppConfig::new().playerctl_args().is_empty());
        let config = AppConfig {
            player: Some("spotify".to_string()),
            ..AppConfig::default()
        };
        assert_eq!(config.playerctl_args(), vec!["--player=spotify"]);
    }

    #[test]
    fn effective_paths() {
        let config = AppConfig::new();
        assert!(config.effective_rules_path().ends_with("rules.json"));
        assert!(config.effective_render_config_path().ends_with("render.json"));

        let config = AppConfig {
            rules_path: Some(PathBuf::from("/etc/rules.json")),
            ..AppConfig::default()
        };
        assert_eq!(config.effective_rules_path(), PathBuf::from("/etc/rules.json"));
    }

    #[test]
    fn explicit_render_config_must_exist() {
        let config = AppConfig {
            render_config_path: Some(PathBuf::from("/definitely/not/here/render.json")),
            ..AppConfig::default()
        };
        assert!(config.load_render_config().is_err());
    }

    #[test]
    fn resolve_relative_and_absolute() {
        let base = Path::new("/home/user/.config/trackpaper");
        assert_eq!(
            resolve_path(base, Path::new("walls/a.jpg")),
            base.join("walls/a.jpg")
        );
        let abs = if cfg!(windows) { "C:\\walls\\a.jpg" } else { "/walls/a.jpg" };
        assert_eq!(resolve_path(base, Path::new(abs)), PathBuf::from(abs));
    }

    #[test]
    fn resolve_home() {
        let resolved = resolve_path(Path::new("/base"), Path::new("~/walls/a.jpg"));
        assert!(resolved.ends_with("walls/a.jpg"));
        assert!(!resolved.starts_with("~"));
    }

    #[test]
    fn default_output_is_png() {
        let path = default_output_path();
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("png"));
    }
}
