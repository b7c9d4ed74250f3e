//! Command-line wallpaper sink.
//!
//! Each desktop preset is one or more argv templates. `{path}` in any
//! argument is replaced by the absolute image path; a template without the
//! placeholder gets the path appended as its last argument.

use image::ImageFormat;
use std::path::Path;
use std::process::Command;
use std::time::Duration;

use crate::config::AppConfig;
use crate::error::{Result, WallpaperError};
use crate::process::{failure_reason, run_with_timeout, CommandOutcome};

use super::{SinkKind, WallpaperSink};

/// Placeholder replaced by the image path.
pub const PATH_PLACEHOLDER: &str = "{path}";

// The path arrives as the script's first argument, never inside the source.
const MACOS_SCRIPT: &[&str] = &[
    "on run argv",
    "tell application \"System Events\" to tell every desktop to set picture to (item 1 of argv)",
    "end run",
];

// SPI_SETDESKWALLPAPER = 20, SPIF_UPDATEINIFILE | SPIF_SENDCHANGE = 3
const WINDOWS_SCRIPT: &str = "Add-Type -TypeDefinition 'using System.Runtime.InteropServices; \
public class TrackpaperWallpaper { [DllImport(\"user32.dll\", CharSet = CharSet.Unicode, SetLastError = true)] \
public static extern bool SystemParametersInfo(int action, int param, string path, int flags); }'; \
if (-not [TrackpaperWallpaper]::SystemParametersInfo(20, 0, '{path}', 3)) { exit 1 }";

/// How the image path is written into a command argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathQuoting {
    /// Inserted as is.
    #[default]
    Raw,
    /// Inside a single-quoted PowerShell string: quote characters are doubled.
    PowerShell,
    /// As the path of a `file://` URI: percent-encoded.
    FileUri,
}

impl PathQuoting {
    fn apply(&self, path: &str) -> String {
        match self {
            PathQuoting::Raw => path.to_string(),
            PathQuoting::PowerShell => {
                let mut quoted = String::with_capacity(path.len() + 2);
                for ch in path.chars() {
                    // PowerShell also closes single-quoted strings on typographic quotes.
                    if matches!(ch, '\'' | '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}') {
                        quoted.push(ch);
                    }
                    quoted.push(ch);
                }
                quoted
            }
            PathQuoting::FileUri => percent_encode_path(path),
        }
    }
}

/// One command run on every apply.
#[derive(Debug, Clone)]
pub struct SinkCommand {
    argv: Vec<String>,
    quoting: PathQuoting,
    required: bool,
}

impl SinkCommand {
    pub fn new(argv: Vec<String>) -> Self {
        Self {
            argv,
            quoting: PathQuoting::Raw,
            required: true,
        }
    }

    /// Sets how the path is quoted when substituted.
    pub fn quoted(mut self, quoting: PathQuoting) -> Self {
        self.quoting = quoting;
        self
    }

    /// A failure of this command is logged and does not fail the apply.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Returns false for best-effort commands.
    pub fn is_required(&self) -> bool {
        self.required
    }

    fn argv_for(&self, path: &str) -> Vec<String> {
        let quoted = self.quoting.apply(path);
        let mut argv: Vec<String> = self
            .argv
            .iter()
            .map(|arg| arg.replace(PATH_PLACEHOLDER, &quoted))
            .collect();
        if !self.argv.iter().any(|arg| arg.contains(PATH_PLACEHOLDER)) {
            argv.push(quoted);
        }
        argv
    }
}

/// Runs desktop commands to set the wallpaper.
#[derive(Debug, Clone)]
pub struct CommandSink {
    label: String,
    commands: Vec<SinkCommand>,
    rejected: Vec<ImageFormat>,
    timeout: Duration,
}

impl CommandSink {
    /// Creates a sink from commands run in order for every apply.
    pub fn new(label: impl Into<String>, commands: Vec<SinkCommand>, timeout: Duration) -> Self {
        Self {
            label: label.into(),
            commands,
            rejected: Vec::new(),
            timeout,
        }
    }

    /// Marks formats the desktop cannot display.
    pub fn with_rejected_formats(mut self, formats: &[ImageFormat]) -> Self {
        self.rejected = formats.to_vec();
        self
    }

    /// Returns the built-in preset for a desktop.
    ///
    /// `Auto` is resolved first. Returns None for `Command`, which has no preset.
    pub fn preset(kind: SinkKind, timeout: Duration) -> Option<Self> {
        let sink = match kind.resolve() {
            SinkKind::Gnome => Self::new(
                "gnome",
                vec![
                    SinkCommand::new(argv(&[
                        "gsettings",
                        "set",
                        "org.gnome.desktop.background",
                        "picture-uri",
                        "file://{path}",
                    ]))
                    .quoted(PathQuoting::FileUri),
                    // Only GNOME 42 and later have a separate dark-mode key.
                    SinkCommand::new(argv(&[
                        "gsettings",
                        "set",
                        "org.gnome.desktop.background",
                        "picture-uri-dark",
                        "file://{path}",
                    ]))
                    .quoted(PathQuoting::FileUri)
                    .optional(),
                ],
                timeout,
            ),
            SinkKind::Kde => Self::new(
                "kde",
                vec![SinkCommand::new(argv(&["plasma-apply-wallpaperimage", "{path}"]))],
                timeout,
            ),
            SinkKind::Macos => {
                let mut args = vec!["osascript"];
                for line in MACOS_SCRIPT {
                    args.extend(["-e", *line]);
                }
                args.push("{path}");
                Self::new("macos", vec![SinkCommand::new(argv(&args))], timeout)
            }
            SinkKind::Windows => Self::new(
                "windows",
                vec![SinkCommand::new(argv(&[
                    "powershell",
                    "-NoProfile",
                    "-NonInteractive",
                    "-Command",
                    WINDOWS_SCRIPT,
                ]))
                .quoted(PathQuoting::PowerShell)],
                timeout,
            )
            .with_rejected_formats(&[ImageFormat::Png]),
            SinkKind::Feh => Self::new(
                "feh",
                vec![SinkCommand::new(argv(&["feh", "--bg-fill", "{path}"]))],
                timeout,
            ),
            SinkKind::Command | SinkKind::Auto => return None,
        };
        Some(sink)
    }

    /// Creates a sink from a user command template such as `feh --bg-scale {path}`.
    pub fn custom(template: &str, timeout: Duration) -> Result<Self> {
        let argv = split_template(template)?;
        if argv.is_empty() {
            return Err(WallpaperError::config_invalid("sink command is empty"));
        }
        Ok(Self::new("command", vec![SinkCommand::new(argv)], timeout))
    }

    /// Builds the sink selected by the runtime configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let timeout = config.sink_timeout();
        match config.sink {
            SinkKind::Command => {
                let template = config.sink_command.as_deref().ok_or_else(|| {
                    WallpaperError::config_invalid("--sink command requires --sink-command")
                })?;
                Self::custom(template, timeout)
            }
            kind => match config.sink_command.as_deref() {
                // An explicit template wins over the preset.
                Some(template) if kind == SinkKind::Auto => Self::custom(template, timeout),
                _ => Self::preset(kind, timeout).ok_or_else(|| {
                    WallpaperError::config_invalid(format!("no preset for sink '{}'", kind))
                }),
            },
        }
    }

    /// Returns the preset name, or `command` for custom templates.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the argv lists that `apply` would run for `path`.
    pub fn argv_for(&self, path: &Path) -> Vec<Vec<String>> {
        let path = path.display().to_string();
        self.commands.iter().map(|c| c.argv_for(&path)).collect()
    }

    fn run(&self, argv: &[String], image: &Path) -> Result<()> {
        let Some((program, args)) = argv.split_first() else {
            return Ok(());
        };
        log::debug!("Running {} sink: {}", self.label, argv.join(" "));

        let outcome = run_with_timeout(Command::new(program).args(args), self.timeout)
            .map_err(|e| WallpaperError::sink_unavailable(program, e))?;
        match outcome {
            CommandOutcome::Finished(output) if output.status.success() => Ok(()),
            CommandOutcome::Finished(output) => Err(WallpaperError::sink_rejected(
                image,
                format!("{}: {}", program, failure_reason(&output)),
            )),
            CommandOutcome::TimedOut => Err(WallpaperError::sink_timeout(
                image,
                self.timeout.as_secs_f32(),
            )),
        }
    }
}

impl WallpaperSink for CommandSink {
    fn apply(&mut self, path: &Path) -> Result<()> {
        let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());

        for (command, argv) in self.commands.iter().zip(self.argv_for(&absolute)) {
            match self.run(&argv, &absolute) {
                Ok(()) => {}
                Err(e) if !command.is_required() => {
                    log::warn!("Optional {} sink step failed: {}", self.label, e);
                }
                Err(e) => return Err(e),
            }
        }

        log::info!("Wallpaper set via {}: {}", self.label, absolute.display());
        Ok(())
    }

    fn rejected_formats(&self) -> &[ImageFormat] {
        &self.rejected
    }
}

fn argv(args: &[&str]) -> Vec<String> {
    args.iter().map(|a| a.to_string()).collect()
}

/// Percent-encodes everything but unreserved URI characters and `/`.
fn percent_encode_path(path: &str) -> String {
    let mut encoded = String::with_capacity(path.len());
    for byte in path.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b'/' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

/// Splits a command template into arguments.
///
/// Whitespace separates arguments; single or double quotes group them.
pub fn split_template(template: &str) -> Result<Vec<String>> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_arg = false;
    let mut quote: Option<char> = None;

    for ch in template.chars() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => current.push(ch),
            None if ch == '"' || ch == '\'' => {
                quote = Some(ch);
                in_arg = true;
            }
            None if ch.is_whitespace() => {
                if in_arg {
                    args.push(std::mem::take(&mut current));
                    in_arg = false;
                }
            }
            None => {
                current.push(ch);
                in_arg = true;
            }
        }
    }

    if quote.is_some() {
        return Err(WallpaperError::config_invalid(format!(
            "unterminated quote in sink command: {}",
            template
        )));
    }
    if in_arg {
        args.push(current);
    }
    Ok(args)
}
