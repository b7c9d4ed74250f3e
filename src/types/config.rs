//! RenderConfig type for wallpaper generation.
//!
//! Loaded once from a JSON file at startup and immutable afterwards. Every
//! field is optional in the file; missing fields take the defaults below.

use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::{default_output_path, resolve_path};
use crate::error::{Result, WallpaperError};

/// An RGB colour, written as `[r, g, b]` in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    pub const BLACK: Rgb = Rgb([0, 0, 0]);
    pub const WHITE: Rgb = Rgb([255, 255, 255]);

    /// Converts to an `image` pixel.
    pub fn to_pixel(self) -> image::Rgb<u8> {
        image::Rgb(self.0)
    }
}

/// Parameters for building the wallpaper image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Base image for overlay mode. Falls back to a solid fill when unset or missing.
    pub background_image: Option<PathBuf>,

    /// Fill colour of the solid canvas.
    /// Default: black
    pub background_color: Rgb,

    /// Where the generated wallpaper is written. The extension selects the
    /// format: png, jpg/jpeg or bmp.
    #[serde(alias = "output_image")]
    pub output_path: PathBuf,

    /// TrueType/OpenType font for the overlay text.
    /// If None or missing, the system fallback fonts are tried, then the
    /// built-in bitmap font.
    pub font_path: Option<PathBuf>,

    /// Font size in pixels.
    /// Default: 48
    pub font_size: u32,

    /// Foreground colour of the overlay text.
    /// Default: white
    pub text_color: Rgb,

    /// Colour of the offset shadow drawn under the text.
    /// Default: black
    pub shadow_color: Rgb,

    /// Distance of the text block from the left and bottom edges.
    /// Default: 40
    pub padding: u32,

    /// Size of the solid canvas when no background image is used.
    /// Default: 1920x1080
    pub canvas_size: [u32; 2],

    /// Shadow offset to the right and down, in pixels.
    pub shadow_offset: u32,

    /// Extra pixels between text lines.
    pub line_spacing: u32,

    /// Draw the artist line under the title.
    pub show_artist: bool,

    /// Draw the album line under the artist.
    pub show_album: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            background_image: None,
            background_color: Rgb::BLACK,
            output_path: default_output_path(),
            font_path: None,
            font_size: 48,
            text_color: Rgb::WHITE,
            shadow_color: Rgb::BLACK,
            padding: 40,
            canvas_size: [1920, 1080],
            shadow_offset: 2,
            line_spacing: 8,
            show_artist: true,
            show_album: false,
        }
    }
}

impl RenderConfig {
    /// Loads a render configuration from a JSON file.
    ///
    /// Relative paths inside the file are resolved against the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(WallpaperError::config_not_found(path));
        }
        let text = std::fs::read_to_string(path).map_err(|e| {
            WallpaperError::config_invalid(format!("cannot read {}: {}", path.display(), e))
        })?;
        let mut config: RenderConfig = serde_json::from_str(&text).map_err(|e| {
            WallpaperError::config_invalid(format!("{}: {}", path.display(), e))
        })?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.background_image = config.background_image.map(|p| resolve_path(base, &p));
        config.font_path = config.font_path.map(|p| resolve_path(base, &p));
        config.output_path = resolve_path(base, &config.output_path);

        config.validate()?;
        Ok(config)
    }

    /// Validates value ranges and the output format.
    pub fn validate(&self) -> Result<()> {
        if self.font_size == 0 {
            return Err(WallpaperError::config_invalid("font_size must be > 0"));
        }
        if self.canvas_size[0] == 0 || self.canvas_size[1] == 0 {
            return Err(WallpaperError::config_invalid(format!(
                "canvas_size must be positive, got {}x{}",
                self.canvas_size[0], self.canvas_size[1]
            )));
        }
        if output_format_for(&self.output_path).is_none() {
            return Err(WallpaperError::config_invalid(format!(
                "output_path {} must end in .png, .jpg, .jpeg or .bmp",
                self.output_path.display()
            )));
        }
        Ok(())
    }

    /// Returns the image format selected by `output_path`'s extension.
    pub fn output_format(&self) -> ImageFormat {
        output_format_for(&self.output_path).unwrap_or(ImageFormat::Png)
    }
}

/// Maps a path's extension to one of the formats the renderer can write.
pub fn output_format_for(path: &Path) -> Option<ImageFormat> {
    match ImageFormat::from_path(path).ok()? {
        format @ (ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Bmp) => Some(format),
        _ => None,
    }
}
