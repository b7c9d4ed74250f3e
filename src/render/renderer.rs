//! Wallpaper renderer.
//!
//! Turns a rule selection into one image file at the configured output path.

use image::{DynamicImage, ImageFormat, RgbImage};
use std::path::{Path, PathBuf};

use crate::error::{Result, WallpaperError};
use crate::types::{
    compute_artifact_key, ArtifactReference, RenderConfig, TrackMetadata, WallpaperArtifact,
};

use super::font::{FontFace, SYSTEM_FONT_CANDIDATES};
use super::output::{copy_atomic, save_atomic, source_fingerprint};
use super::overlay::{draw_text_block, layout, overlay_lines};

/// Produces wallpaper files from rule selections.
///
/// The renderer never decides whether to run; the change controller calls
/// it only when the track changed.
#[derive(Debug, Clone)]
pub struct Renderer {
    config: RenderConfig,
    rejected_formats: Vec<ImageFormat>,
    system_fonts: &'static [&'static str],
}

/// Where and how the next artifact is written.
struct OutputTarget {
    path: PathBuf,
    format: ImageFormat,
    converted: bool,
}

impl Renderer {
    /// Creates a renderer whose sink accepts every format.
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            rejected_formats: Vec::new(),
            system_fonts: SYSTEM_FONT_CANDIDATES,
        }
    }

    /// Marks formats the wallpaper sink cannot apply; those are written as BMP instead.
    pub fn rejecting(mut self, formats: &[ImageFormat]) -> Self {
        self.rejected_formats = formats.to_vec();
        self
    }

    /// Returns the render configuration.
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Renders the selection for a track and writes it to disk.
    pub fn render(
        &self,
        selection: &ArtifactReference,
        metadata: &TrackMetadata,
    ) -> Result<WallpaperArtifact> {
        match selection {
            ArtifactReference::Static(source) => self.render_static(source),
            ArtifactReference::Overlay { background } => {
                self.render_overlay(background.as_deref(), metadata)
            }
        }
    }

    fn output_target(&self) -> OutputTarget {
        let wanted = self.config.output_format();
        if self.rejected_formats.contains(&wanted) {
            OutputTarget {
                path: self.config.output_path.with_extension("bmp"),
                format: ImageFormat::Bmp,
                converted: true,
            }
        } else {
            OutputTarget {
                path: self.config.output_path.clone(),
                format: wanted,
                converted: false,
            }
        }
    }

    fn render_static(&self, source: &Path) -> Result<WallpaperArtifact> {
        if !source.is_file() {
            return Err(WallpaperError::source_image_missing(source));
        }
        let target = self.output_target();
        let key = compute_artifact_key(&[
            "static".to_string(),
            source.display().to_string(),
            source_fingerprint(source),
        ]);

        let source_format = ImageFormat::from_path(source).ok();
        if source_format == Some(target.format) && !target.converted {
            copy_atomic(source, &target.path)?;
        } else {
            let image = image::open(source).map_err(|e| {
                if target.converted {
                    WallpaperError::conversion_failed(source, e.to_string())
                } else {
                    WallpaperError::source_image_unreadable(source, e)
                }
            })?;
            self.write(&image, &target, source)?;
        }

        log::debug!(
            "Rendered {} -> {} ({:?}{})",
            source.display(),
            target.path.display(),
            target.format,
            if target.converted { ", converted" } else { "" }
        );

        Ok(WallpaperArtifact {
            path: target.path,
            format: target.format,
            key,
            converted: target.converted,
        })
    }

    fn render_overlay(
        &self,
        background: Option<&Path>,
        metadata: &TrackMetadata,
    ) -> Result<WallpaperArtifact> {
        let (mut canvas, canvas_id) = self.base_canvas(background)?;
        let lines = overlay_lines(metadata, &self.config);

        let mut key_parts = vec!["overlay".to_string(), canvas_id];
        key_parts.extend(lines.iter().cloned());
        let key = compute_artifact_key(&key_parts);

        let font = FontFace::resolve(self.config.font_path.as_deref(), self.system_fonts)?;
        match layout(&font, &lines, canvas.width(), canvas.height(), &self.config) {
            Some(text) => draw_text_block(&mut canvas, &font, &text, &self.config),
            None if !lines.is_empty() => log::warn!(
                "No room for text on a {}x{} canvas with padding {}",
                canvas.width(),
                canvas.height(),
                self.config.padding
            ),
            None => {}
        }

        let target = self.output_target();
        self.write(
            &DynamicImage::ImageRgb8(canvas),
            &target,
            &self.config.output_path,
        )?;

        log::debug!(
            "Rendered overlay for {} -> {}",
            metadata,
            target.path.display()
        );

        Ok(WallpaperArtifact {
            path: target.path,
            format: target.format,
            key,
            converted: target.converted,
        })
    }

    /// Loads the base canvas and returns it with a string identifying it for the key.
    fn base_canvas(&self, selected: Option<&Path>) -> Result<(RgbImage, String)> {
        if let Some(path) = selected {
            if !path.is_file() {
                return Err(WallpaperError::source_image_missing(path));
            }
            return self.open_background(path);
        }

        if let Some(path) = self.config.background_image.as_deref() {
            if path.is_file() {
                return self.open_background(path);
            }
            log::warn!(
                "Background image not found: {}. Using solid color.",
                path.display()
            );
        }

        let [width, height] = self.config.canvas_size;
        let color = self.config.background_color;
        let canvas = RgbImage::from_pixel(width, height, color.to_pixel());
        let id = format!("solid:{:?}:{}x{}", color.0, width, height);
        Ok((canvas, id))
    }

    fn open_background(&self, path: &Path) -> Result<(RgbImage, String)> {
        let image =
            image::open(path).map_err(|e| WallpaperError::source_image_unreadable(path, e))?;
        let id = format!("{}|{}", path.display(), source_fingerprint(path));
        Ok((image.to_rgb8(), id))
    }

    fn write(&self, image: &DynamicImage, target: &OutputTarget, source: &Path) -> Result<()> {
        save_atomic(image, target.format, &target.path).map_err(|e| {
            if target.converted {
                WallpaperError::conversion_failed(source, e.message)
            } else {
                e
            }
        })
    }
}
