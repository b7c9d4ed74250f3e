//! Media metadata sources.
//!
//! A source watches the desktop's media session and hands every meaningful
//! snapshot to a callback until asked to stop.

use std::sync::atomic::AtomicBool;

use crate::types::TrackMetadata;

mod json_lines;
mod playerctl;

pub use json_lines::JsonLinesSource;
pub use playerctl::{parse_snapshot, PlayerctlSource, PLAYERCTL_FORMAT};

/// Delivers track metadata snapshots.
pub trait MetadataSource {
    /// Runs until the input ends or `shutdown` is set, calling `emit` per snapshot.
    ///
    /// Errors are reserved for the source itself failing (e.g. the backing tool
    /// is not installed); individual bad snapshots are logged and skipped.
    fn run(
        &mut self,
        emit: &mut dyn FnMut(TrackMetadata),
        shutdown: &AtomicBool,
    ) -> anyhow::Result<()>;
}
