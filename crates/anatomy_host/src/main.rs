// SPDX-License-Identifier: MIT OR Apache-2.0
//! Anatomy widget host
//!
//! Runs one camera sync session for a scene file. Widget commands are
//! written to stdout as JSON lines; widget events, command completions and
//! owner controls are read from stdin. Every write the session makes to the
//! bound camera is echoed to stdout as a `{"binding": ...}` line.

mod audio;
mod bridge;
mod cli;
mod driver;
mod error;
mod protocol;

use anatomy_sync::{SceneConfig, Session};
use audio::HostAudio;
use bridge::ChannelWidget;
use clap::Parser;
use cli::Cli;
use driver::SessionDriver;
use error::HostError;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn main() {
    // stdout carries the widget channel, so logs go to stderr
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("anatomy_host=debug,anatomy_sync=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting anatomy host v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        tracing::error!("Host failed: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), HostError> {
    let mut scene = SceneConfig::load(&cli.scene)?;
    if cli.hidden {
        scene.hidden = true;
    }
    if let Some(delay_ms) = cli.delay_ms {
        scene.delay_ms = delay_ms;
    }

    let rt = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    let result = rt.block_on(host(scene, cli));
    // The stdin reader may still be parked on a blocking read
    rt.shutdown_background();
    result
}

async fn host(scene: SceneConfig, cli: Cli) -> Result<(), HostError> {
    match scene.widget_url() {
        Ok(url) => tracing::info!(url = %url, poster = %scene.poster_style(), "Scene widget"),
        Err(e) => tracing::warn!("No widget URL: {e}"),
    }

    if !scene.delay().is_zero() {
        tracing::debug!("Delaying widget construction by {:?}", scene.delay());
        tokio::time::sleep(scene.delay()).await;
    }

    let (lines_tx, lines_rx) = mpsc::unbounded_channel();
    let mut session = Session::from_scene(&scene, Box::new(ChannelWidget::new(lines_tx.clone())))?;
    if let Some(sound) = &scene.sound {
        session = session.with_sound(sound.clone(), Box::new(HostAudio::new(cli.assets_dir())));
    }
    tracing::debug!(session = %session.id(), hidden = scene.hidden, "Session configured");

    let (driver, handle) = SessionDriver::new(session);

    let writer = tokio::spawn(bridge::pump_outbound(lines_rx, tokio::io::stdout()));
    let reader = tokio::spawn(bridge::pump_inbound(BufReader::new(tokio::io::stdin()), handle.clone()));

    let mut camera = handle.watch_camera();
    let bindings = tokio::spawn(async move {
        while camera.changed().await.is_ok() {
            let bound = *camera.borrow_and_update();
            tracing::debug!(manual = bound.is_manual(), "Bound camera written");
            match protocol::encode_binding(&bound) {
                Ok(line) => {
                    if lines_tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => tracing::warn!("Failed to encode binding: {e}"),
            }
        }
    });

    driver.run().await;

    // Dropping the handle closes the camera watch, which ends the bindings task
    drop(handle);
    reader.abort();
    if let Err(e) = bindings.await {
        tracing::warn!("Binding task failed: {e}");
    }

    match writer.await {
        Ok(result) => result?,
        Err(e) => tracing::warn!("Writer task failed: {e}"),
    }

    tracing::info!("Host finished");
    Ok(())
}
