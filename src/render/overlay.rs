//! Text overlay layout.
//!
//! The text block is anchored `padding` pixels from the bottom-left corner.
//! Lines that do not fit inside the padded area are shrunk first and then
//! truncated, so the text (not counting its shadow offset) never leaves the
//! padded area.

use image::RgbImage;

use crate::types::{RenderConfig, TrackMetadata};

use super::font::{Clip, FontFace};

/// Smallest font size the layout shrinks to before truncating.
const MIN_FONT_PX: f32 = 8.0;

const ELLIPSIS: &str = "...";

/// Returns the overlay lines for a track: title, then optionally artist and album.
pub fn overlay_lines(metadata: &TrackMetadata, config: &RenderConfig) -> Vec<String> {
    let mut lines = vec![metadata.title.clone()];
    if config.show_artist {
        lines.push(metadata.artist.clone());
    }
    if config.show_album {
        lines.push(metadata.album.clone());
    }
    lines.retain(|line| !line.trim().is_empty());
    lines
}

/// A laid-out text block ready to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    /// Lines after truncation.
    pub lines: Vec<String>,
    /// Font size used for every line.
    pub px: f32,
    /// Top-left corner of each line.
    pub origins: Vec<(f32, f32)>,
    /// Area the text itself may touch.
    pub clip: Clip,
}

/// Fits `lines` into the padded area of a `width` x `height` canvas.
///
/// Returns None when the padding leaves no room for text at all.
pub fn layout(
    font: &FontFace,
    lines: &[String],
    width: u32,
    height: u32,
    config: &RenderConfig,
) -> Option<TextLayout> {
    let padding = config.padding as f32;
    let available_w = width as f32 - 2.0 * padding;
    let available_h = height as f32 - 2.0 * padding;
    if lines.is_empty() || available_w < 1.0 || available_h < 1.0 {
        return None;
    }

    let mut px = config.font_size as f32;
    let spacing = config.line_spacing as f32;

    // Shrink uniformly so the widest line fits.
    let widest = lines
        .iter()
        .map(|line| font.measure(line, px))
        .fold(0.0f32, f32::max);
    if widest > available_w {
        px = (px * available_w / widest).max(MIN_FONT_PX);
    }

    // Drop trailing lines, then shrink, until the block fits vertically.
    let mut lines: Vec<String> = lines.to_vec();
    let block_height = |n: usize, px: f32| {
        n as f32 * font.line_height(px) + n.saturating_sub(1) as f32 * spacing
    };
    while lines.len() > 1 && block_height(lines.len(), px) > available_h {
        lines.pop();
    }
    if block_height(1, px) > available_h {
        px = (px * available_h / font.line_height(px)).max(1.0);
    }

    let lines: Vec<String> = lines
        .iter()
        .map(|line| truncate_to_width(font, line, px, available_w))
        .collect();

    let line_height = font.line_height(px);
    let total = block_height(lines.len(), px);
    let top = height as f32 - padding - total;
    let origins = (0..lines.len())
        .map(|i| (padding, top + i as f32 * (line_height + spacing)))
        .collect();

    let clip = Clip {
        x0: config.padding as i32,
        y0: config.padding as i32,
        x1: width as i32 - config.padding as i32,
        y1: height as i32 - config.padding as i32,
    };

    Some(TextLayout {
        lines,
        px,
        origins,
        clip,
    })
}

/// Cuts `line` so it fits in `max_width`, appending "..." when shortened.
fn truncate_to_width(font: &FontFace, line: &str, px: f32, max_width: f32) -> String {
    if font.measure(line, px) <= max_width {
        return line.to_string();
    }
    let mut chars: Vec<char> = line.chars().collect();
    while !chars.is_empty() {
        chars.pop();
        let candidate: String = chars.iter().collect::<String>() + ELLIPSIS;
        if font.measure(&candidate, px) <= max_width {
            return candidate;
        }
    }
    String::new()
}

/// Draws the laid-out text twice: shadow first, then the text itself.
pub fn draw_text_block(img: &mut RgbImage, font: &FontFace, layout: &TextLayout, config: &RenderConfig) {
    let offset = config.shadow_offset as i32;
    let shadow_clip = layout.clip.offset(offset, offset);
    for (line, &(x, y)) in layout.lines.iter().zip(&layout.origins) {
        font.draw(
            img,
            line,
            (x + offset as f32, y + offset as f32),
            layout.px,
            config.shadow_color.to_pixel(),
            shadow_clip,
        );
    }
    for (line, &origin) in layout.lines.iter().zip(&layout.origins) {
        font.draw(
            img,
            line,
            origin,
            layout.px,
            config.text_color.to_pixel(),
            layout.clip,
        );
    }
}
