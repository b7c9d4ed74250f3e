//! Core types for trackpaper.
//!
//! - [`TrackMetadata`]: a snapshot of the currently playing track
//! - [`ArtifactReference`]: what the rule engine selected for a track
//! - [`WallpaperArtifact`]: the image file handed to the desktop
//! - [`RenderConfig`]: parameters for building the wallpaper image

mod artifact;
mod config;
mod track;

pub use artifact::{ArtifactReference, WallpaperArtifact};
pub use config::{output_format_for, RenderConfig, Rgb};
pub use track::{compute_artifact_key, ArtifactKey, TrackMetadata};
