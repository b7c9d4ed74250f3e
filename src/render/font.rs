//! Font loading and glyph drawing for the text overlay.
//!
//! Fonts resolve in this order:
//! 1. `font_path` from the render configuration, when the file exists
//! 2. the first readable font from [`SYSTEM_FONT_CANDIDATES`]
//! 3. the built-in 8x8 bitmap font, scaled to the requested size
//!
//! A configured font that exists but cannot be parsed is an error rather
//! than a silent fallback.

use ab_glyph::{point, Font, FontVec, GlyphId, PxScale, ScaleFont};
use font8x8::{UnicodeFonts, BASIC_FONTS, LATIN_FONTS};
use image::RgbImage;
use std::path::Path;

use crate::error::{Result, WallpaperError};

/// System fonts tried when no usable `font_path` is configured.
pub const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    // Windows
    "C:\\Windows\\Fonts\\arial.ttf",
    "C:\\Windows\\Fonts\\segoeui.ttf",
    // macOS
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    // Linux
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
];

/// Bitmap glyph cell size in font units.
const BITMAP_CELL: u32 = 8;

/// Pixel rectangle that drawing may touch. End coordinates are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clip {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl Clip {
    /// Returns the clip moved by `(dx, dy)`.
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x0: self.x0 + dx,
            y0: self.y0 + dy,
            x1: self.x1 + dx,
            y1: self.y1 + dy,
        }
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }
}

/// A loaded font face.
pub enum FontFace {
    /// A TrueType/OpenType font with anti-aliased outlines.
    Outline(FontVec),
    /// The built-in 8x8 bitmap font.
    Bitmap,
}

impl std::fmt::Debug for FontFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FontFace::Outline(_) => f.write_str("FontFace::Outline"),
            FontFace::Bitmap => f.write_str("FontFace::Bitmap"),
        }
    }
}

impl FontFace {
    /// Resolves the overlay font.
    pub fn load(font_path: Option<&Path>) -> Result<Self> {
        Self::resolve(font_path, SYSTEM_FONT_CANDIDATES)
    }

    /// Resolves the overlay font, trying `system_fonts` after `font_path`.
    pub fn resolve(font_path: Option<&Path>, system_fonts: &[&str]) -> Result<Self> {
        if let Some(path) = font_path {
            if path.is_file() {
                let bytes = std::fs::read(path)
                    .map_err(|e| WallpaperError::font_unreadable(path, e.to_string()))?;
                let font = FontVec::try_from_vec(bytes)
                    .map_err(|e| WallpaperError::font_unreadable(path, e.to_string()))?;
                return Ok(FontFace::Outline(font));
            }
            log::warn!(
                "Font not found at {}; falling back to a system font",
                path.display()
            );
        }

        for candidate in system_fonts {
            let path = Path::new(candidate);
            if !path.is_file() {
                continue;
            }
            match std::fs::read(path).map(FontVec::try_from_vec) {
                Ok(Ok(font)) => {
                    log::debug!("Using system font {}", path.display());
                    return Ok(FontFace::Outline(font));
                }
                _ => log::debug!("Skipping unreadable system font {}", path.display()),
            }
        }

        log::debug!("No TrueType font available; using built-in bitmap font");
        Ok(FontFace::Bitmap)
    }

    /// Height of one line of text at `px`.
    pub fn line_height(&self, px: f32) -> f32 {
        match self {
            FontFace::Outline(font) => font.as_scaled(PxScale::from(px)).height(),
            FontFace::Bitmap => (bitmap_scale(px) * BITMAP_CELL) as f32,
        }
    }

    /// Advance width of `text` at `px`.
    pub fn measure(&self, text: &str, px: f32) -> f32 {
        match self {
            FontFace::Outline(font) => {
                let scaled = font.as_scaled(PxScale::from(px));
                let mut width = 0.0;
                let mut prev: Option<GlyphId> = None;
                for ch in text.chars() {
                    let id = font.glyph_id(ch);
                    if let Some(prev) = prev {
                        width += scaled.kern(prev, id);
                    }
                    width += scaled.h_advance(id);
                    prev = Some(id);
                }
                width
            }
            FontFace::Bitmap => {
                (text.chars().count() as u32 * bitmap_scale(px) * BITMAP_CELL) as f32
            }
        }
    }

    /// Draws one line of text with its top-left corner at `(x, y_top)`.
    ///
    /// Pixels outside `clip` or the image are left untouched.
    pub fn draw(
        &self,
        img: &mut RgbImage,
        text: &str,
        (x, y_top): (f32, f32),
        px: f32,
        color: image::Rgb<u8>,
        clip: Clip,
    ) {
        match self {
            FontFace::Outline(font) => draw_outline(font, img, text, (x, y_top), px, color, clip),
            FontFace::Bitmap => draw_bitmap(img, text, (x as i32, y_top as i32), px, color, clip),
        }
    }
}

/// Integer magnification of the 8x8 cell for a pixel size.
fn bitmap_scale(px: f32) -> u32 {
    ((px / BITMAP_CELL as f32).round() as u32).max(1)
}

fn draw_outline(
    font: &FontVec,
    img: &mut RgbImage,
    text: &str,
    (x, y_top): (f32, f32),
    px: f32,
    color: image::Rgb<u8>,
    clip: Clip,
) {
    let scale = PxScale::from(px);
    let scaled = font.as_scaled(scale);
    let baseline = y_top + scaled.ascent();
    let mut caret = x;
    let mut prev: Option<GlyphId> = None;

    for ch in text.chars() {
        let id = font.glyph_id(ch);
        if let Some(prev) = prev {
            caret += scaled.kern(prev, id);
        }
        let glyph = id.with_scale_and_position(scale, point(caret, baseline));
        caret += scaled.h_advance(id);
        prev = Some(id);

        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            outlined.draw(|gx, gy, coverage| {
                let px_x = bounds.min.x as i32 + gx as i32;
                let px_y = bounds.min.y as i32 + gy as i32;
                blend_pixel(img, px_x, px_y, color, coverage, clip);
            });
        }
    }
}

fn draw_bitmap(
    img: &mut RgbImage,
    text: &str,
    (x, y): (i32, i32),
    px: f32,
    color: image::Rgb<u8>,
    clip: Clip,
) {
    let scale = bitmap_scale(px) as i32;
    let mut cursor_x = x;
    for ch in text.chars() {
        let glyph = BASIC_FONTS
            .get(ch)
            .or_else(|| LATIN_FONTS.get(ch))
            .or_else(|| BASIC_FONTS.get('?'));
        let Some(glyph) = glyph else {
            cursor_x += BITMAP_CELL as i32 * scale;
            continue;
        };
        for (row_idx, row) in glyph.iter().enumerate() {
            for col_idx in 0..BITMAP_CELL as i32 {
                if (*row >> col_idx) & 1 == 0 {
                    continue;
                }
                let px_x = cursor_x + col_idx * scale;
                let px_y = y + row_idx as i32 * scale;
                for sy in 0..scale {
                    for sx in 0..scale {
                        blend_pixel(img, px_x + sx, px_y + sy, color, 1.0, clip);
                    }
                }
            }
        }
        cursor_x += BITMAP_CELL as i32 * scale;
    }
}

fn blend_pixel(img: &mut RgbImage, x: i32, y: i32, color: image::Rgb<u8>, coverage: f32, clip: Clip) {
    if !clip.contains(x, y) || x < 0 || y < 0 || x >= img.width() as i32 || y >= img.height() as i32 {
        return;
    }
    let coverage = coverage.clamp(0.0, 1.0);
    if coverage <= 0.0 {
        return;
    }
    let dst = img.get_pixel_mut(x as u32, y as u32);
    for (d, s) in dst.0.iter_mut().zip(color.0) {
        *d = (*d as f32 + (s as f32 - *d as f32) * coverage).round() as u8;
    }
}
