//! trackpaper: desktop wallpapers that follow the media track that is playing.
//!
//! A metadata source reports track snapshots. The rule engine picks a
//! wallpaper for each one, the renderer writes it (optionally drawing the
//! track text over a background), and a wallpaper sink hands the file to the
//! desktop. The change controller makes sure the same track is never rendered
//! or applied twice.
//!
//! # Modules
//!
//! - [`types`]: Core data types (TrackMetadata, ArtifactReference, RenderConfig)
//! - [`rules`]: Rule engine (RuleSet, MatchRule, Predicate)
//! - [`render`]: Image rendering and atomic output
//! - [`controller`]: Change detection (ChangeController, EventProcessor)
//! - [`source`]: Metadata sources (playerctl, JSON lines)
//! - [`sink`]: Wallpaper sinks (desktop command presets)
//! - [`config`]: Runtime configuration (AppConfig)
//! - [`error`]: Error types and codes (WallpaperError, ErrorCode)
//!
//! # Example
//!
//! ```rust,ignore
//! use trackpaper::{ChangeController, Renderer, RenderConfig, RuleSet, TrackMetadata};
//! use trackpaper::sink::{CommandSink, SinkKind};
//! use std::time::Duration;
//!
//! let rules = RuleSet::load("rules.json".as_ref())?;
//! let sink = CommandSink::preset(SinkKind::Auto, Duration::from_secs(10)).unwrap();
//! let mut controller = ChangeController::new(rules, Renderer::new(RenderConfig::default()), sink);
//!
//! let outcome = controller.handle(TrackMetadata::new("Stronger", "Kanye West", "", "spotify"));
//! println!("{outcome}");
//! ```

pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod process;
pub mod render;
pub mod rules;
pub mod sink;
pub mod source;
pub mod types;

// Re-export commonly used types at crate root for convenience
pub use config::{AppConfig, SourceKind};
pub use controller::{ChangeController, EventProcessor, Outcome};
pub use error::{ErrorCode, Result, WallpaperError};
pub use render::Renderer;
pub use rules::RuleSet;
pub use types::{ArtifactKey, ArtifactReference, RenderConfig, TrackMetadata, WallpaperArtifact};
