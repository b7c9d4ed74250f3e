//! MPRIS metadata through `playerctl`.
//!
//! Polls `playerctl metadata` at a fixed interval and emits a snapshot only
//! when its identity (every field, including the playing flag) changes.

use anyhow::{bail, Context};
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::MIN_POLL_INTERVAL_SECS;
use crate::process::{failure_reason, run_with_timeout, CommandOutcome};
use crate::types::TrackMetadata;

use super::MetadataSource;

/// Output format passed to `playerctl metadata --format`. Fields are tab-separated.
pub const PLAYERCTL_FORMAT: &str =
    "{{status}}\t{{playerName}}\t{{xesam:title}}\t{{xesam:artist}}\t{{xesam:album}}";

/// Longest sleep between shutdown checks.
const SHUTDOWN_CHECK: Duration = Duration::from_millis(100);

/// Polls MPRIS players through the `playerctl` binary.
#[derive(Debug, Clone)]
pub struct PlayerctlSource {
    program: String,
    leading_args: Vec<String>,
    interval: Duration,
    timeout: Duration,
    last: Option<TrackMetadata>,
}

impl PlayerctlSource {
    /// Creates a source polling every `interval` (at least 200 ms).
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            program: "playerctl".to_string(),
            leading_args: Vec::new(),
            interval: interval.max(Duration::from_secs_f32(MIN_POLL_INTERVAL_SECS)),
            timeout,
            last: None,
        }
    }

    /// Uses a different executable in place of `playerctl`.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Passes extra arguments before `metadata`, e.g. `--player=spotify`.
    pub fn with_leading_args(mut self, args: Vec<String>) -> Self {
        self.leading_args = args;
        self
    }

    /// Returns the effective poll interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Queries the current session once. None means no player has a track loaded.
    pub fn poll_once(&self) -> anyhow::Result<Option<TrackMetadata>> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.leading_args)
            .args(["metadata", "--format", PLAYERCTL_FORMAT]);

        let outcome = run_with_timeout(&mut cmd, self.timeout).with_context(|| {
            format!("running {} (is it installed?)", self.program)
        })?;

        match outcome {
            CommandOutcome::Finished(output) if output.status.success() => {
                Ok(parse_snapshot(&String::from_utf8_lossy(&output.stdout)))
            }
            CommandOutcome::Finished(output) => {
                // "No players found" and stopped players land here.
                log::debug!("{}: {}", self.program, failure_reason(&output));
                Ok(None)
            }
            CommandOutcome::TimedOut => {
                log::warn!(
                    "{} did not answer within {:.1}s",
                    self.program,
                    self.timeout.as_secs_f32()
                );
                Ok(None)
            }
        }
    }

    fn sleep_until_next_poll(&self, shutdown: &AtomicBool) {
        let deadline = Instant::now() + self.interval;
        while !shutdown.load(Ordering::SeqCst) {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep((deadline - now).min(SHUTDOWN_CHECK));
        }
    }
}

impl MetadataSource for PlayerctlSource {
    fn run(
        &mut self,
        emit: &mut dyn FnMut(TrackMetadata),
        shutdown: &AtomicBool,
    ) -> anyhow::Result<()> {
        log::info!(
            "Polling {} every {:.1}s",
            self.program,
            self.interval.as_secs_f32()
        );

        let mut consecutive_spawn_failures = 0u32;
        while !shutdown.load(Ordering::SeqCst) {
            match self.poll_once() {
                Ok(snapshot) => {
                    consecutive_spawn_failures = 0;
                    if snapshot != self.last {
                        self.last = snapshot.clone();
                        match snapshot {
                            Some(metadata) => emit(metadata),
                            None => log::debug!("No active media session"),
                        }
                    }
                }
                Err(e) => {
                    consecutive_spawn_failures += 1;
                    if consecutive_spawn_failures >= 3 {
                        bail!("{:#}", e);
                    }
                    log::warn!("Metadata poll failed: {:#}", e);
                }
            }
            self.sleep_until_next_poll(shutdown);
        }
        Ok(())
    }
}

/// Parses one line of [`PLAYERCTL_FORMAT`] output.
///
/// Returns None for empty output and for snapshots with no title, artist or album.
pub fn parse_snapshot(output: &str) -> Option<TrackMetadata> {
    let line = output.lines().find(|l| !l.trim().is_empty())?;
    let mut fields = line.splitn(5, '\t');
    let status = fields.next().unwrap_or_default().trim();
    let player = fields.next().unwrap_or_default();
    let title = fields.next().unwrap_or_default();
    let artist = fields.next().unwrap_or_default();
    let album = fields.next().unwrap_or_default();

    let metadata = TrackMetadata::new(title, artist, album, player)
        .with_playing(status.eq_ignore_ascii_case("playing"));
    metadata.has_content().then_some(metadata)
}
