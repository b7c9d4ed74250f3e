//! Change detection loop.
//!
//! [`ChangeController`] decides whether an event needs a new wallpaper and
//! applies it; [`EventProcessor`] runs it on its own thread.

mod change;
mod processor;

pub use change::{ChangeController, Outcome, Phase, SkipReason};
pub use processor::{forward_events, EventProcessor, ProcessorMessage};
