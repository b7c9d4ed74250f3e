//! Background event processor.
//!
//! Owns the change controller on a dedicated thread and feeds it every event
//! in arrival order. Repeated snapshots of the applied track are cheap: the
//! controller skips them before rendering.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::sink::WallpaperSink;
use crate::types::TrackMetadata;

use super::change::{ChangeController, Outcome};

/// Message sent to the processor thread.
#[derive(Debug)]
pub enum ProcessorMessage {
    /// A new metadata snapshot arrived.
    Event(Box<TrackMetadata>),
    /// Finish pending work and stop.
    Shutdown,
}

/// Runs a [`ChangeController`] on a background thread.
pub struct EventProcessor {
    /// Channel to send events to the processor.
    sender: Sender<ProcessorMessage>,
    /// Handle to the processor thread.
    thread_handle: Option<JoinHandle<()>>,
}

impl EventProcessor {
    /// Starts the processor thread.
    pub fn spawn<S>(controller: ChangeController<S>) -> Self
    where
        S: WallpaperSink + Send + 'static,
    {
        Self::start(controller, None)
    }

    /// Starts the processor thread and reports every outcome on the returned channel.
    pub fn spawn_reporting<S>(controller: ChangeController<S>) -> (Self, Receiver<Outcome>)
    where
        S: WallpaperSink + Send + 'static,
    {
        let (outcome_sender, outcome_receiver) = mpsc::channel::<Outcome>();
        (Self::start(controller, Some(outcome_sender)), outcome_receiver)
    }

    fn start<S>(controller: ChangeController<S>, outcomes: Option<Sender<Outcome>>) -> Self
    where
        S: WallpaperSink + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel::<ProcessorMessage>();
        let thread_handle = thread::spawn(move || {
            Self::processor_loop(receiver, outcomes, controller);
        });

        Self {
            sender,
            thread_handle: Some(thread_handle),
        }
    }

    /// Queues an event. Returns false if the processor has stopped.
    pub fn submit(&self, metadata: TrackMetadata) -> bool {
        self.sender
            .send(ProcessorMessage::Event(Box::new(metadata)))
            .is_ok()
    }

    /// Returns a cloneable handle for submitting events from other threads.
    pub fn submitter(&self) -> Sender<ProcessorMessage> {
        self.sender.clone()
    }

    /// Stops the processor after the queued events are handled.
    pub fn shutdown(&mut self) {
        self.sender.send(ProcessorMessage::Shutdown).ok();
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                log::error!("Event processor thread panicked");
            }
        }
    }

    /// The main processing loop running in the background thread.
    fn processor_loop<S: WallpaperSink>(
        receiver: Receiver<ProcessorMessage>,
        outcomes: Option<Sender<Outcome>>,
        mut controller: ChangeController<S>,
    ) {
        while let Ok(ProcessorMessage::Event(metadata)) = receiver.recv() {
            let outcome = controller.handle(*metadata);
            log::debug!("Event {}", outcome);
            if let Some(outcomes) = &outcomes {
                outcomes.send(outcome).ok();
            }
        }
        log::debug!("Event processor stopped");
    }
}

/// Returns an event callback for a metadata source that forwards to `sender`.
///
/// When the processor is gone the callback logs once and sets `stop`, so the
/// source winds down instead of polling into a closed channel.
pub fn forward_events(
    sender: Sender<ProcessorMessage>,
    stop: Arc<AtomicBool>,
) -> impl FnMut(TrackMetadata) + Send {
    move |metadata| {
        if sender
            .send(ProcessorMessage::Event(Box::new(metadata)))
            .is_err()
            && !stop.swap(true, Ordering::SeqCst)
        {
            log::error!("Event processor stopped; no longer watching for track changes");
        }
    }
}

impl Drop for EventProcessor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::render::Renderer;
    use crate::rules::RuleSet;
    use crate::types::RenderConfig;
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};

    /// Shares the list of applied paths with the test thread.
    #[derive(Clone, Default)]
    struct SharedSink {
        applied: Arc<Mutex<Vec<PathBuf>>>,
    }

    impl WallpaperSink for SharedSink {
        fn apply(&mut self, path: &Path) -> Result<()> {
            self.applied.lock().unwrap().push(path.to_path_buf());
            Ok(())
        }
    }

    fn controller(sink: SharedSink) -> (TempDir, ChangeController<SharedSink>) {
        let dir = tempdir().unwrap();
        for (name, color) in [("default.png", [0, 0, 0]), ("a.png", [255, 0, 0])] {
            image::RgbImage::from_pixel(2, 2, image::Rgb(color))
                .save(dir.path().join(name))
                .unwrap();
        }
        let rules = RuleSet::from_json_str(
            r#"{"default_wallpaper": "default.png",
                "rules": [{"match": {"title_contains": "a"}, "wallpaper": "a.png"}]}"#,
            dir.path(),
        )
        .unwrap();
        let config = RenderConfig {
            output_path: dir.path().join("current.png"),
            ..RenderConfig::default()
        };
        (dir, ChangeController::new(rules, Renderer::new(config), sink))
    }

    fn track(title: &str) -> TrackMetadata {
        TrackMetadata::new(title, "", "", "spotify")
    }

    #[test]
    fn processes_events_in_order() {
        let sink = SharedSink::default();
        let (_dir, controller) = controller(sink.clone());
        let (processor, outcomes) = EventProcessor::spawn_reporting(controller);

        assert!(processor.submit(track("a")));
        let first = outcomes.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(first.is_applied());

        assert!(processor.submit(track("a")));
        let second = outcomes.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(second, Outcome::Skipped(_)));

        assert!(processor.submit(track("zzz")));
        let third = outcomes.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(third.is_applied());

        drop(processor);
        assert_eq!(sink.applied.lock().unwrap().len(), 2);
    }

    #[test]
    fn shutdown_finishes_queued_work() {
        let sink = SharedSink::default();
        let (dir, controller) = controller(sink.clone());
        let mut processor = EventProcessor::spawn(controller);

        for title in ["a", "b", "c", "zzz"] {
            processor.submit(track(title));
        }
        processor.shutdown();

        // "a" applies a.png, "b" applies the default; "c" and "zzz" render the
        // same default image and never reach the sink.
        let applied = sink.applied.lock().unwrap();
        assert_eq!(applied.len(), 2);
        assert_eq!(applied.last().unwrap(), &dir.path().join("current.png"));
        let last = image::open(dir.path().join("current.png")).unwrap().to_rgb8();
        assert_eq!(last.get_pixel(0, 0).0, [0, 0, 0]);
    }

    /// Blocks in `apply` until the test drops the release sender.
    struct GatedSink {
        applied: Arc<Mutex<Vec<PathBuf>>>,
        entered: Sender<()>,
        release: Receiver<()>,
    }

    impl WallpaperSink for GatedSink {
        fn apply(&mut self, path: &Path) -> Result<()> {
            self.entered.send(()).ok();
            self.release.recv().ok();
            self.applied.lock().unwrap().push(path.to_path_buf());
            Ok(())
        }
    }

    #[test]
    fn backlog_is_not_collapsed_past_filtered_events() {
        let dir = tempdir().unwrap();
        for (name, color) in [("default.png", [0, 0, 0]), ("a.png", [255, 0, 0])] {
            image::RgbImage::from_pixel(2, 2, image::Rgb(color))
                .save(dir.path().join(name))
                .unwrap();
        }
        let rules = RuleSet::from_json_str(
            r#"{"default_wallpaper": "default.png",
                "rules": [{"match": {"title_contains": "a"}, "wallpaper": "a.png"}]}"#,
            dir.path(),
        )
        .unwrap();
        let config = RenderConfig {
            output_path: dir.path().join("current.png"),
            ..RenderConfig::default()
        };

        let applied = Arc::new(Mutex::new(Vec::new()));
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let sink = GatedSink {
            applied: Arc::clone(&applied),
            entered: entered_tx,
            release: release_rx,
        };
        let controller = ChangeController::new(rules, Renderer::new(config), sink)
            .with_app_filter(Some("spotify".to_string()));
        let (mut processor, outcomes) = EventProcessor::spawn_reporting(controller);

        // Keep the worker busy on the first track while two more queue up.
        assert!(processor.submit(track("alpha")));
        entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(processor.submit(track("Second")));
        assert!(processor.submit(TrackMetadata::new("Ad", "", "", "chrome")));
        drop(release_tx);
        processor.shutdown();

        let outcomes: Vec<String> = outcomes.iter().map(|o| o.to_string()).collect();
        assert_eq!(outcomes.len(), 3, "{:?}", outcomes);
        assert!(outcomes[0].starts_with("applied"));
        assert!(outcomes[1].starts_with("applied"));
        assert_eq!(outcomes[2], "skipped (filtered app)");
        assert_eq!(applied.lock().unwrap().len(), 2);
    }

    #[test]
    fn forwarding_stops_source_when_processor_is_gone() {
        let (sender, receiver) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let mut forward = forward_events(sender, Arc::clone(&stop));

        forward(track("a"));
        assert!(matches!(receiver.try_recv(), Ok(ProcessorMessage::Event(_))));
        assert!(!stop.load(Ordering::SeqCst));

        drop(receiver);
        forward(track("b"));
        assert!(stop.load(Ordering::SeqCst));
    }

    #[test]
    fn submit_after_shutdown_fails() {
        let (_dir, controller) = controller(SharedSink::default());
        let mut processor = EventProcessor::spawn(controller);
        processor.shutdown();
        assert!(!processor.submit(track("a")));
    }
}
