//! `adzerk-display <frame-url> [settings-file]`
//!
//! Runs one frame load against the in-memory ad library (house ads) and prints
//! every message sent to the parent page as a JSON line on stdout.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use adzerk_display::infrastructure::logging::init_logging_with_config;
use adzerk_display::infrastructure::{AdServingSettings, BroadcastMessenger, InMemoryAdLibrary};
use adzerk_display::{AdFrameController, AdServingContext, FrameOutcome};

const USAGE: &str = "usage: adzerk-display <frame-url> [settings-file]";

#[tokio::main]
async fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let Some(frame_url) = args.next() else {
        eprintln!("{USAGE}");
        std::process::exit(2);
    };
    let settings_path = args.next().map(PathBuf::from);

    let settings =
        AdServingSettings::load(settings_path.as_deref()).context("Failed to load settings")?;
    init_logging_with_config(&settings.logging)?;

    let library = Arc::new(InMemoryAdLibrary::with_auto_fill(settings.engine_domain.clone()));
    let messenger = Arc::new(BroadcastMessenger::new(64));

    let mut receiver = messenger.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(message) => match serde_json::to_string(&message) {
                    Ok(line) => println!("{line}"),
                    Err(e) => warn!("Cannot serialize {}: {}", message.event_name(), e),
                },
                Err(RecvError::Lagged(skipped)) => warn!("Dropped {} messages", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let ctx = AdServingContext::builder(settings)
        .with_library(library)
        .with_messenger(messenger)
        .build()?;
    let controller = AdFrameController::new(ctx.clone());

    let outcome = tokio::select! {
        outcome = controller.load(&frame_url) => outcome,
        _ = tokio::signal::ctrl_c() => {
            ctx.cancel();
            info!("Interrupted");
            return Ok(());
        }
    }?;

    match &outcome {
        FrameOutcome::Delegated { rendered } => info!(rendered, "Delegated to sibling frame"),
        FrameOutcome::Skipped { image_url } => info!(image = %image_url, "Skipped ad request"),
        FrameOutcome::Served(report) => info!(
            responses = report.responses.len(),
            commands = report.commands.len(),
            "Frame load finished"
        ),
    }

    // the broadcast sender lives in the context; dropping it ends the printer
    drop(controller);
    drop(ctx);
    printer.await.context("Message printer failed")?;

    Ok(())
}
