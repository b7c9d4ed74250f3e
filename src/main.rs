//! trackpaper: sets the desktop wallpaper from the media track that is playing.
//!
//! Startup loads and validates every configuration file; any problem there
//! exits with status 1. After that, render and sink failures are logged and
//! the watcher keeps running until the source ends or Ctrl-C.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;

use anyhow::Context;
use env_logger::Env;

use trackpaper::cli::Cli;
use trackpaper::config::{AppConfig, SourceKind};
use trackpaper::controller::{forward_events, ChangeController, EventProcessor, ProcessorMessage};
use trackpaper::error::WallpaperError;
use trackpaper::render::Renderer;
use trackpaper::rules::RuleSet;
use trackpaper::sink::CommandSink;
use trackpaper::source::{JsonLinesSource, MetadataSource, PlayerctlSource};

fn main() {
    let cli = Cli::parse_args();
    env_logger::Builder::from_env(Env::default().default_filter_or(cli.log_level())).init();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let mut config = AppConfig::from_env();
    cli.apply_to(&mut config);
    if let Some(reason) = config.validate() {
        return Err(WallpaperError::config_invalid(reason).into());
    }

    let rules_path = config.effective_rules_path();
    let rules = RuleSet::load(&rules_path)?;
    log::info!("Loaded {} rules from {}", rules.len(), rules_path.display());

    let render_config = config.load_render_config()?;
    log::debug!("Writing wallpapers to {}", render_config.output_path.display());

    let sink = CommandSink::from_config(&config)?;
    log::info!("Using {} wallpaper sink", sink.label());

    let controller = ChangeController::new(rules, Renderer::new(render_config), sink)
        .with_app_filter(config.app_filter.clone());
    if let Some(filter) = &config.app_filter {
        log::info!("Only responding to apps matching {:?}", filter);
    }
    let mut processor = EventProcessor::spawn(controller);

    let source: Box<dyn MetadataSource + Send> = match config.source {
        SourceKind::Playerctl => Box::new(
            PlayerctlSource::new(config.poll_interval(), config.sink_timeout())
                .with_leading_args(config.playerctl_args()),
        ),
        SourceKind::Stdin => Box::new(JsonLinesSource::stdin()),
    };
    log::info!("Watching {} for track changes", config.source);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("starting runtime")?;
    let result = runtime.block_on(watch(source, processor.submitter()));

    processor.shutdown();
    // A stdin read cannot be interrupted; do not wait for it.
    runtime.shutdown_background();
    log::info!("Stopped.");
    result
}

/// Runs the source until it ends or Ctrl-C is pressed.
async fn watch(
    mut source: Box<dyn MetadataSource + Send>,
    submitter: Sender<ProcessorMessage>,
) -> anyhow::Result<()> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let source_shutdown = Arc::clone(&shutdown);

    let mut task = tokio::task::spawn_blocking(move || {
        let mut forward = forward_events(submitter, Arc::clone(&source_shutdown));
        source.run(&mut forward, &source_shutdown)
    });

    tokio::select! {
        joined = &mut task => joined.context("metadata source stopped unexpectedly")?,
        signal = tokio::signal::ctrl_c() => {
            signal.context("listening for Ctrl-C")?;
            log::info!("Shutting down.");
            shutdown.store(true, Ordering::SeqCst);
            Ok(())
        }
    }
}
