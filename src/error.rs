//! Error types for trackpaper.
//!
//! Every failure carries an [`ErrorCode`] that places it in one of three
//! categories: configuration problems (fatal at startup), render problems
//! and sink problems (both reported, the watch loop keeps running).

use std::fmt;
use std::path::Path;

/// Broad class of an error, deciding how the caller reacts to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Bad rule or render configuration. The process exits non-zero.
    Config,
    /// Producing the wallpaper image failed for one event.
    Render,
    /// The desktop refused or timed out applying the image.
    Sink,
}

/// Error codes for every failure the daemon reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// A configuration file does not exist.
    /// Trigger: `--rules` or `--render-config` points at a missing file.
    ConfigNotFound,

    /// A configuration file could not be read or parsed.
    /// Trigger: malformed JSON, wrong field types, invalid values.
    ConfigInvalid,

    /// A match rule is structurally invalid.
    /// Trigger: unknown predicate key, empty pattern, no predicate at all.
    InvalidRule,

    /// A regex predicate does not compile.
    InvalidRegex,

    /// The default wallpaper cannot be resolved to an existing file.
    DefaultWallpaperMissing,

    /// A selected wallpaper or overlay background does not exist.
    SourceImageMissing,

    /// A wallpaper or background exists but cannot be decoded.
    SourceImageUnreadable,

    /// The configured font exists but cannot be loaded.
    FontUnreadable,

    /// Re-encoding into a format the sink accepts failed.
    ConversionFailed,

    /// Writing the output image failed.
    OutputWriteFailed,

    /// The OS reported failure applying the wallpaper.
    SinkRejected,

    /// Applying the wallpaper did not finish in time.
    SinkTimeout,

    /// The wallpaper command could not be started at all.
    SinkUnavailable,
}

impl ErrorCode {
    /// Returns the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigNotFound => "CONFIG_NOT_FOUND",
            ErrorCode::ConfigInvalid => "CONFIG_INVALID",
            ErrorCode::InvalidRule => "INVALID_RULE",
            ErrorCode::InvalidRegex => "INVALID_REGEX",
            ErrorCode::DefaultWallpaperMissing => "DEFAULT_WALLPAPER_MISSING",
            ErrorCode::SourceImageMissing => "SOURCE_IMAGE_MISSING",
            ErrorCode::SourceImageUnreadable => "SOURCE_IMAGE_UNREADABLE",
            ErrorCode::FontUnreadable => "FONT_UNREADABLE",
            ErrorCode::ConversionFailed => "CONVERSION_FAILED",
            ErrorCode::OutputWriteFailed => "OUTPUT_WRITE_FAILED",
            ErrorCode::SinkRejected => "SINK_REJECTED",
            ErrorCode::SinkTimeout => "SINK_TIMEOUT",
            ErrorCode::SinkUnavailable => "SINK_UNAVAILABLE",
        }
    }

    /// Returns the category this code belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ErrorCode::ConfigNotFound
            | ErrorCode::ConfigInvalid
            | ErrorCode::InvalidRule
            | ErrorCode::InvalidRegex
            | ErrorCode::DefaultWallpaperMissing => ErrorCategory::Config,
            ErrorCode::SourceImageMissing
            | ErrorCode::SourceImageUnreadable
            | ErrorCode::FontUnreadable
            | ErrorCode::ConversionFailed
            | ErrorCode::OutputWriteFailed => ErrorCategory::Render,
            ErrorCode::SinkRejected | ErrorCode::SinkTimeout | ErrorCode::SinkUnavailable => {
                ErrorCategory::Sink
            }
        }
    }

    /// Returns a human-readable description of the error.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::ConfigNotFound => "Configuration file not found",
            ErrorCode::ConfigInvalid => "Configuration file is malformed",
            ErrorCode::InvalidRule => "Match rule is invalid",
            ErrorCode::InvalidRegex => "Regex pattern in match rule does not compile",
            ErrorCode::DefaultWallpaperMissing => "Default wallpaper does not exist",
            ErrorCode::SourceImageMissing => "Selected wallpaper image does not exist",
            ErrorCode::SourceImageUnreadable => "Selected wallpaper image cannot be decoded",
            ErrorCode::FontUnreadable => "Configured font cannot be loaded",
            ErrorCode::ConversionFailed => "Converting the wallpaper to a supported format failed",
            ErrorCode::OutputWriteFailed => "Writing the generated wallpaper failed",
            ErrorCode::SinkRejected => "The desktop rejected the wallpaper",
            ErrorCode::SinkTimeout => "Applying the wallpaper timed out",
            ErrorCode::SinkUnavailable => "The wallpaper command could not be started",
        }
    }

    /// Returns a recovery hint suggesting how to resolve this error.
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            ErrorCode::ConfigNotFound => {
                "Create the file or pass its location with --rules / --render-config"
            }
            ErrorCode::ConfigInvalid => "Check the JSON syntax and field types against the README",
            ErrorCode::InvalidRule => {
                "Each rule needs a non-empty pattern for one of: artist_contains, title_contains, \
                 album_contains, app_id_contains, artist_regex, title_regex, album_regex"
            }
            ErrorCode::InvalidRegex => {
                "Fix the regex syntax; use (?i) at the start for case-insensitive matching"
            }
            ErrorCode::DefaultWallpaperMissing => {
                "Point default_wallpaper at an existing image file"
            }
            ErrorCode::SourceImageMissing => "Fix the wallpaper path in the matching rule",
            ErrorCode::SourceImageUnreadable => "Re-save the image as JPEG, PNG or BMP",
            ErrorCode::FontUnreadable => {
                "Point font_path at a valid TrueType/OpenType font or remove it to use the fallback"
            }
            ErrorCode::ConversionFailed => {
                "Supply the wallpaper in a format the desktop accepts directly, such as JPEG or BMP"
            }
            ErrorCode::OutputWriteFailed => {
                "Check that the output_path directory is writable and the disk is not full"
            }
            ErrorCode::SinkRejected => {
                "Check that the desktop environment matches the --sink choice"
            }
            ErrorCode::SinkTimeout => {
                "The desktop may be busy; raise --sink-timeout if this keeps happening"
            }
            ErrorCode::SinkUnavailable => {
                "Install the wallpaper tool for your desktop or pass --sink-command"
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type for trackpaper operations.
#[derive(Debug)]
pub struct WallpaperError {
    /// The error code identifying the type of error.
    pub code: ErrorCode,
    /// Human-readable error message with context.
    pub message: String,
    /// Optional underlying cause of the error.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl WallpaperError {
    /// Creates a new WallpaperError with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new WallpaperError with an underlying cause.
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns the category of this error.
    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }

    /// Creates a CONFIG_NOT_FOUND error.
    pub fn config_not_found(path: &Path) -> Self {
        Self::new(
            ErrorCode::ConfigNotFound,
            format!("Configuration file not found: {}", path.display()),
        )
    }

    /// Creates a CONFIG_INVALID error.
    pub fn config_invalid(reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ConfigInvalid,
            format!("Invalid configuration: {}", reason.into()),
        )
    }

    /// Creates an INVALID_RULE error for the rule at `index`.
    pub fn invalid_rule(index: usize, reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InvalidRule,
            format!("Rule #{}: {}", index, reason.into()),
        )
    }

    /// Creates an INVALID_REGEX error for the rule at `index`.
    pub fn invalid_regex(index: usize, pattern: &str, source: regex::Error) -> Self {
        Self::with_source(
            ErrorCode::InvalidRegex,
            format!("Rule #{}: regex {:?} does not compile", index, pattern),
            source,
        )
    }

    /// Creates a DEFAULT_WALLPAPER_MISSING error.
    pub fn default_wallpaper_missing(path: &Path) -> Self {
        Self::new(
            ErrorCode::DefaultWallpaperMissing,
            format!("Default wallpaper does not exist: {}", path.display()),
        )
    }

    /// Creates a SOURCE_IMAGE_MISSING error.
    pub fn source_image_missing(path: &Path) -> Self {
        Self::new(
            ErrorCode::SourceImageMissing,
            format!("Wallpaper image does not exist: {}", path.display()),
        )
    }

    /// Creates a SOURCE_IMAGE_UNREADABLE error.
    pub fn source_image_unreadable(path: &Path, source: image::ImageError) -> Self {
        Self::with_source(
            ErrorCode::SourceImageUnreadable,
            format!("Cannot decode wallpaper image {}: {}", path.display(), source),
            source,
        )
    }

    /// Creates a FONT_UNREADABLE error.
    pub fn font_unreadable(path: &Path, reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::FontUnreadable,
            format!("Cannot load font {}: {}", path.display(), reason.into()),
        )
    }

    /// Creates a CONVERSION_FAILED error.
    pub fn conversion_failed(path: &Path, reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ConversionFailed,
            format!(
                "Converting {} to BMP failed: {}",
                path.display(),
                reason.into()
            ),
        )
    }

    /// Creates an OUTPUT_WRITE_FAILED error.
    pub fn output_write_failed(path: &Path, reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::OutputWriteFailed,
            format!("Cannot write {}: {}", path.display(), reason.into()),
        )
    }

    /// Creates a SINK_REJECTED error.
    pub fn sink_rejected(path: &Path, reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::SinkRejected,
            format!(
                "Desktop rejected wallpaper {}: {}",
                path.display(),
                reason.into()
            ),
        )
    }

    /// Creates a SINK_TIMEOUT error.
    pub fn sink_timeout(path: &Path, timeout_secs: f32) -> Self {
        Self::new(
            ErrorCode::SinkTimeout,
            format!(
                "Applying wallpaper {} did not finish within {:.1}s",
                path.display(),
                timeout_secs
            ),
        )
    }

    /// Creates a SINK_UNAVAILABLE error.
    pub fn sink_unavailable(program: &str, source: std::io::Error) -> Self {
        Self::with_source(
            ErrorCode::SinkUnavailable,
            format!("Cannot run {:?}: {}", program, source),
            source,
        )
    }

    /// Prefixes the message with extra context, keeping the code and source.
    pub fn context(mut self, context: impl fmt::Display) -> Self {
        self.message = format!("{}: {}", context, self.message);
        self
    }
}

impl fmt::Display for WallpaperError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}. Recovery: {}",
            self.code,
            self.message,
            self.code.recovery_hint()
        )
    }
}

impl std::error::Error for WallpaperError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Result type alias using WallpaperError.
pub type Result<T> = std::result::Result<T, WallpaperError>;
