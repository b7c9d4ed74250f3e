//! Command-line interface.
//!
//! Every flag is optional. Flags override the `TRACKPAPER_*` environment
//! variables, which override the built-in defaults.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::{AppConfig, SourceKind};
use crate::sink::SinkKind;

/// Available metadata sources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum SourceArg {
    /// Poll MPRIS players with playerctl
    #[default]
    Playerctl,
    /// Read JSON snapshots, one per line, from stdin
    Stdin,
}

impl From<SourceArg> for SourceKind {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Playerctl => SourceKind::Playerctl,
            SourceArg::Stdin => SourceKind::Stdin,
        }
    }
}

/// Available wallpaper sinks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum SinkArg {
    /// Detect the desktop environment
    #[default]
    Auto,
    /// GNOME (gsettings)
    Gnome,
    /// KDE Plasma (plasma-apply-wallpaperimage)
    Kde,
    /// macOS (osascript)
    Macos,
    /// Windows (SystemParametersInfo); PNG is converted to BMP
    Windows,
    /// Any X11 window manager (feh)
    Feh,
    /// The template given by --sink-command
    Command,
}

impl From<SinkArg> for SinkKind {
    fn from(arg: SinkArg) -> Self {
        match arg {
            SinkArg::Auto => SinkKind::Auto,
            SinkArg::Gnome => SinkKind::Gnome,
            SinkArg::Kde => SinkKind::Kde,
            SinkArg::Macos => SinkKind::Macos,
            SinkArg::Windows => SinkKind::Windows,
            SinkArg::Feh => SinkKind::Feh,
            SinkArg::Command => SinkKind::Command,
        }
    }
}

/// trackpaper: set the desktop wallpaper from the track that is playing
#[derive(Parser, Debug)]
#[command(name = "trackpaper")]
#[command(about = "Change the desktop wallpaper based on the media track that is playing")]
#[command(version)]
pub struct Cli {
    /// Rule file (JSON); defaults to rules.json in the config directory
    #[arg(long, value_name = "PATH")]
    pub rules: Option<PathBuf>,

    /// Render configuration file (JSON); defaults to render.json in the config directory
    #[arg(long, value_name = "PATH")]
    pub render_config: Option<PathBuf>,

    /// Only respond to media sessions whose app id contains this text
    #[arg(long, value_name = "SUBSTR", conflicts_with = "spotify_only")]
    pub only_app: Option<String>,

    /// Only respond to media sessions from Spotify (same as --only-app spotify)
    #[arg(long)]
    pub spotify_only: bool,

    /// Where track metadata comes from; stdin exits at end of input
    #[arg(long, value_enum)]
    pub source: Option<SourceArg>,

    /// Only poll this MPRIS player (passed to playerctl as --player)
    #[arg(long, value_name = "NAME")]
    pub player: Option<String>,

    /// Seconds between polls (minimum 0.2, default 1.0)
    #[arg(long, value_name = "SECS")]
    pub poll_interval: Option<f32>,

    /// How to set the wallpaper
    #[arg(long, value_enum)]
    pub sink: Option<SinkArg>,

    /// Command that sets the wallpaper; {path} is replaced by the image path
    #[arg(long, value_name = "TEMPLATE")]
    pub sink_command: Option<String>,

    /// Seconds to wait for the wallpaper command (default 10)
    #[arg(long, value_name = "SECS")]
    pub sink_timeout: Option<f32>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Returns the app filter requested on the command line, if any.
    pub fn app_filter(&self) -> Option<String> {
        if self.spotify_only {
            Some("spotify".to_string())
        } else {
            self.only_app.clone()
        }
    }

    /// Returns the default log level for the verbosity flag.
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }

    /// Overrides `config` with every flag that was given.
    pub fn apply_to(&self, config: &mut AppConfig) {
        if let Some(ref path) = self.rules {
            config.rules_path = Some(path.clone());
        }
        if let Some(ref path) = self.render_config {
            config.render_config_path = Some(path.clone());
        }
        if let Some(filter) = self.app_filter() {
            config.app_filter = Some(filter);
        }
        if let Some(source) = self.source {
            config.source = source.into();
        }
        if let Some(ref player) = self.player {
            config.player = Some(player.clone());
        }
        if let Some(interval) = self.poll_interval {
            config.poll_interval_secs = interval;
        }
        if let Some(sink) = self.sink {
            config.sink = sink.into();
        }
        if let Some(ref command) = self.sink_command {
            config.sink_command = Some(command.clone());
        }
        if let Some(timeout) = self.sink_timeout {
            config.sink_timeout_secs = timeout;
        }
    }
}
