//! Wallpaper rendering.
//!
//! Static selections are copied or re-encoded; overlay selections draw the
//! track text over a background. Output is always written atomically.

mod font;
mod output;
mod overlay;
mod renderer;

pub use font::{Clip, FontFace, SYSTEM_FONT_CANDIDATES};
pub use output::{copy_atomic, save_atomic, source_fingerprint};
pub use overlay::{draw_text_block, layout, overlay_lines, TextLayout};
pub use renderer::Renderer;
