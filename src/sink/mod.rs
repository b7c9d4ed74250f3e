//! Wallpaper sinks.
//!
//! A sink takes the path of a finished image and makes it the desktop
//! background. Every built-in sink shells out to a desktop tool; see
//! [`CommandSink`].

use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

mod command;

pub use command::{split_template, CommandSink, PathQuoting, SinkCommand, PATH_PLACEHOLDER};

/// Applies an image file as the desktop wallpaper.
pub trait WallpaperSink {
    /// Sets the wallpaper to the image at `path`.
    fn apply(&mut self, path: &Path) -> Result<()>;

    /// Image formats this sink cannot apply. The renderer converts those to BMP.
    fn rejected_formats(&self) -> &[ImageFormat] {
        &[]
    }
}

/// Which desktop integration to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// Detect from the platform and `XDG_CURRENT_DESKTOP`.
    #[default]
    Auto,
    /// GNOME and derivatives via `gsettings`.
    Gnome,
    /// KDE Plasma via `plasma-apply-wallpaperimage`.
    Kde,
    /// macOS via `osascript`.
    Macos,
    /// Windows via `SystemParametersInfo` in PowerShell.
    Windows,
    /// Generic X11 via `feh`.
    Feh,
    /// A user-supplied command template.
    Command,
}

impl SinkKind {
    /// Returns the string representation of the sink.
    pub fn as_str(&self) -> &'static str {
        match self {
            SinkKind::Auto => "auto",
            SinkKind::Gnome => "gnome",
            SinkKind::Kde => "kde",
            SinkKind::Macos => "macos",
            SinkKind::Windows => "windows",
            SinkKind::Feh => "feh",
            SinkKind::Command => "command",
        }
    }

    /// Parses a sink from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Some(SinkKind::Auto),
            "gnome" => Some(SinkKind::Gnome),
            "kde" | "plasma" => Some(SinkKind::Kde),
            "macos" | "mac" => Some(SinkKind::Macos),
            "windows" | "win" => Some(SinkKind::Windows),
            "feh" | "x11" => Some(SinkKind::Feh),
            "command" | "custom" => Some(SinkKind::Command),
            _ => None,
        }
    }

    /// Resolves `Auto` to a concrete desktop; other kinds are returned as-is.
    pub fn resolve(self) -> Self {
        if self != SinkKind::Auto {
            return self;
        }
        if cfg!(target_os = "windows") {
            return SinkKind::Windows;
        }
        if cfg!(target_os = "macos") {
            return SinkKind::Macos;
        }
        let desktop = std::env::var("XDG_CURRENT_DESKTOP").unwrap_or_default();
        Self::from_desktop_name(&desktop)
    }

    /// Maps an `XDG_CURRENT_DESKTOP` value to a sink.
    fn from_desktop_name(desktop: &str) -> Self {
        let desktop = desktop.to_lowercase();
        if desktop.contains("kde") || desktop.contains("plasma") {
            SinkKind::Kde
        } else if ["gnome", "unity", "cinnamon", "budgie", "pantheon"]
            .iter()
            .any(|name| desktop.contains(name))
        {
            SinkKind::Gnome
        } else {
            SinkKind::Feh
        }
    }
}

impl std::fmt::Display for SinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
