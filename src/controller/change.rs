//! Change detection and wallpaper application.
//!
//! The controller remembers the last track it applied and the content key of
//! the image it applied for it. Duplicate events and renders that produce the
//! same image never reach the desktop.

use std::fmt;

use crate::error::{ErrorCategory, WallpaperError};
use crate::render::Renderer;
use crate::rules::RuleSet;
use crate::sink::WallpaperSink;
use crate::types::{ArtifactKey, ArtifactReference, TrackMetadata, WallpaperArtifact};

/// What the controller is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Waiting for the next event.
    #[default]
    Idle,
    /// Selecting and rendering.
    Evaluating,
    /// Waiting for the sink.
    Applying,
}

/// Why an event was discarded before any work was done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The session is paused or stopped.
    NotPlaying,
    /// The reporting app does not match the app filter.
    FilteredApp,
    /// The track is the one already applied.
    Duplicate,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::NotPlaying => "not playing",
            SkipReason::FilteredApp => "filtered app",
            SkipReason::Duplicate => "duplicate",
        }
    }
}

/// Result of handling one event.
#[derive(Debug)]
pub enum Outcome {
    /// Discarded without rendering.
    Skipped(SkipReason),
    /// Rendered, but the image matches what is already applied.
    Unchanged,
    /// Rendered and applied.
    Applied(WallpaperArtifact),
    /// Rendering or applying failed; the previous state is kept.
    Failed(WallpaperError),
}

impl Outcome {
    /// Returns true if the sink was called successfully.
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied(_))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Skipped(reason) => write!(f, "skipped ({})", reason.as_str()),
            Outcome::Unchanged => write!(f, "unchanged"),
            Outcome::Applied(artifact) => write!(f, "applied {}", artifact.path.display()),
            Outcome::Failed(err) => write!(f, "failed: {}", err),
        }
    }
}

/// Turns metadata events into wallpaper changes.
pub struct ChangeController<S: WallpaperSink> {
    rules: RuleSet,
    renderer: Renderer,
    sink: S,
    app_filter: Option<String>,
    phase: Phase,
    last_applied_metadata: Option<TrackMetadata>,
    last_applied_key: Option<ArtifactKey>,
}

impl<S: WallpaperSink> ChangeController<S> {
    /// Creates a controller. The renderer is told which formats the sink rejects.
    pub fn new(rules: RuleSet, renderer: Renderer, sink: S) -> Self {
        let renderer = renderer.rejecting(sink.rejected_formats());
        Self {
            rules,
            renderer,
            sink,
            app_filter: None,
            phase: Phase::Idle,
            last_applied_metadata: None,
            last_applied_key: None,
        }
    }

    /// Only reacts to apps whose id contains `filter` (case-insensitive).
    pub fn with_app_filter(mut self, filter: Option<String>) -> Self {
        self.app_filter = filter
            .map(|f| f.trim().to_lowercase())
            .filter(|f| !f.is_empty());
        self
    }

    /// Returns the current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Returns the last successfully applied track.
    pub fn last_applied(&self) -> Option<&TrackMetadata> {
        self.last_applied_metadata.as_ref()
    }

    /// Returns the content key of the wallpaper currently applied.
    pub fn last_applied_key(&self) -> Option<&ArtifactKey> {
        self.last_applied_key.as_ref()
    }

    /// Returns the sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Handles one metadata event.
    pub fn handle(&mut self, metadata: TrackMetadata) -> Outcome {
        if !metadata.is_playing {
            log::debug!("Ignoring paused session: {}", metadata);
            return Outcome::Skipped(SkipReason::NotPlaying);
        }

        if let Some(filter) = &self.app_filter {
            if !metadata.app_id.to_lowercase().contains(filter.as_str()) {
                log::debug!("Ignoring track from {:?}: {}", metadata.app_id, metadata);
                return Outcome::Skipped(SkipReason::FilteredApp);
            }
        }

        if self.last_applied_metadata.as_ref() == Some(&metadata) {
            log::debug!("Already applied: {}", metadata);
            return Outcome::Skipped(SkipReason::Duplicate);
        }

        let outcome = self.evaluate(metadata);
        self.phase = Phase::Idle;
        outcome
    }

    fn evaluate(&mut self, metadata: TrackMetadata) -> Outcome {
        self.phase = Phase::Evaluating;
        let rule = self.rules.explain(&metadata);
        let selection = self.rules.select(&metadata).clone();
        log::debug!(
            "{} -> {} ({})",
            metadata,
            selection,
            describe_rule(rule)
        );

        let artifact = match self.renderer.render(&selection, &metadata) {
            Ok(artifact) => artifact,
            Err(e) => return Self::failure(e, rule, &selection, &metadata),
        };

        if self.last_applied_key.as_ref() == Some(&artifact.key) {
            log::debug!("Wallpaper unchanged for {}", metadata);
            self.last_applied_metadata = Some(metadata);
            return Outcome::Unchanged;
        }

        self.phase = Phase::Applying;
        if let Err(e) = self.sink.apply(&artifact.path) {
            return Self::failure(e, rule, &selection, &metadata);
        }

        log::info!(
            "Wallpaper updated to {} for {}{}",
            artifact.path.display(),
            metadata,
            if artifact.converted { " (converted to BMP)" } else { "" }
        );
        self.last_applied_key = Some(artifact.key.clone());
        self.last_applied_metadata = Some(metadata);
        Outcome::Applied(artifact)
    }

    fn failure(
        err: WallpaperError,
        rule: Option<usize>,
        selection: &ArtifactReference,
        metadata: &TrackMetadata,
    ) -> Outcome {
        let err = err.context(format!("{} via {} ({})", metadata, describe_rule(rule), selection));
        match err.category() {
            // The desktop may come back; the next event retries.
            ErrorCategory::Sink => log::warn!("Wallpaper not applied: {}", err),
            _ => log::error!("{}", err),
        }
        Outcome::Failed(err)
    }
}

fn describe_rule(rule: Option<usize>) -> String {
    match rule {
        Some(index) => format!("rule #{}", index),
        None => "default wallpaper".to_string(),
    }
}
