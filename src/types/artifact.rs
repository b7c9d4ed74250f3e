//! Artifact references chosen by the rule engine and the files the renderer produces.

use image::ImageFormat;
use std::fmt;
use std::path::{Path, PathBuf};

use super::track::ArtifactKey;

/// What the rule engine selected for a track.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArtifactReference {
    /// Use this image file as the wallpaper, converting only if the desktop needs it.
    Static(PathBuf),
    /// Draw the track text over a base image.
    ///
    /// `background` overrides the render configuration's background image.
    Overlay { background: Option<PathBuf> },
}

impl ArtifactReference {
    /// Returns the image file this reference points at, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            ArtifactReference::Static(path) => Some(path),
            ArtifactReference::Overlay { background } => background.as_deref(),
        }
    }
}

impl fmt::Display for ArtifactReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactReference::Static(path) => write!(f, "{}", path.display()),
            ArtifactReference::Overlay {
                background: Some(path),
            } => write!(f, "text overlay on {}", path.display()),
            ArtifactReference::Overlay { background: None } => write!(f, "text overlay"),
        }
    }
}

/// A wallpaper image written to disk and ready for the desktop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WallpaperArtifact {
    /// Absolute or config-relative path of the written file.
    pub path: PathBuf,
    /// Encoding of the written file.
    pub format: ImageFormat,
    /// Content key used to skip re-applying identical wallpapers.
    pub key: ArtifactKey,
    /// True when the file was re-encoded to BMP because the desktop rejects
    /// the requested format.
    pub converted: bool,
}
