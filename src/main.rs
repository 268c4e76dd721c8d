use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::fmt::time::uptime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vcam_feed::pipeline::pattern::fill_bgra_gradient;
use vcam_feed::{
    create_backend, DevicePath, FramePipeline, PipelineOptions, SettingsStore, StatusCode,
};

/// Resolution of the generated test pattern, deliberately different from
/// the default output so the resize path is exercised.
const SOURCE_WIDTH: u32 = 1920;
const SOURCE_HEIGHT: u32 = 1080;

const RESCAN_INTERVAL: Duration = Duration::from_secs(2);

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "vcam_feed=info".into());

    if let Err(err) = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_timer(uptime()))
        .try_init()
    {
        eprintln!("failed to initialize tracing: {err}");
    }
}

/// Settings file: first argument, then `VCAM_FEED_CONFIG`, then `./vcam-feed.json`.
fn config_path() -> PathBuf {
    if let Some(arg) = std::env::args_os().nth(1) {
        return PathBuf::from(arg);
    }
    if let Ok(path) = std::env::var("VCAM_FEED_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from("vcam-feed.json")
}

/// Bind the first listed device if nothing is bound yet.
fn bind_first_available(pipeline: &FramePipeline, store: &SettingsStore) {
    if pipeline.bound_device().is_some() {
        return;
    }
    let devices = match pipeline.list_devices() {
        Ok(devices) => devices,
        Err(e) => {
            tracing::warn!("Device enumeration failed: {e}");
            return;
        }
    };
    if let Some(device) = devices.first() {
        if pipeline.bind(&device.path) == StatusCode::Ok {
            tracing::info!("Virtual camera connected: {}", device.friendly_name);
            store.set_device_path(Some(device.path.to_string()));
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let path = config_path();
    let store = Arc::new(
        SettingsStore::open(path.clone())
            .with_context(|| format!("loading settings from {}", path.display()))?,
    );
    let settings = store.get();
    let _debounce = store.start_debounce_task();

    let pipeline = FramePipeline::new(create_backend(&settings), PipelineOptions::from(&settings));
    let mut status_rx = pipeline.subscribe(16);

    for device in pipeline.list_devices().context("listing virtual cameras")? {
        tracing::info!("Found virtual camera '{}' at {}", device.friendly_name, device.path);
    }

    match &settings.device_path {
        Some(path) => {
            let status = pipeline.bind(&DevicePath::new(path.as_str()));
            if !status.is_ok() {
                tracing::warn!("Configured device {path} unavailable: {}", status.message());
            }
        }
        None => bind_first_available(&pipeline, &store),
    }
    if pipeline.bound_device().is_none() {
        tracing::warn!("No virtual camera bound yet; will keep looking");
    }

    pipeline.start().context("starting pipeline")?;

    let mut frame = vec![0u8; SOURCE_WIDTH as usize * SOURCE_HEIGHT as usize * 4];
    let mut phase = 0u32;
    let frame_interval = Duration::from_secs_f64(1.0 / f64::from(settings.fps));
    let mut ticker = tokio::time::interval(frame_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut rescan = tokio::time::interval(RESCAN_INTERVAL);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    tracing::info!(
        "Feeding {SOURCE_WIDTH}x{SOURCE_HEIGHT} test pattern at {} fps",
        settings.fps
    );
    loop {
        tokio::select! {
            result = &mut shutdown => {
                if let Err(e) = result {
                    tracing::error!("Failed to listen for Ctrl-C: {e}");
                }
                break;
            }
            _ = ticker.tick() => {
                fill_bgra_gradient(&mut frame, SOURCE_WIDTH, SOURCE_HEIGHT, phase);
                phase = phase.wrapping_add(1);
                pipeline.enqueue(&frame, SOURCE_WIDTH, SOURCE_HEIGHT)?;
            }
            _ = rescan.tick() => bind_first_available(&pipeline, &store),
            Some(event) = status_rx.recv() => {
                if event.code.is_ok() {
                    tracing::info!("Virtual camera is receiving frames");
                } else {
                    tracing::warn!("{}", event.message);
                }
            }
        }
    }

    tracing::info!("Shutting down");
    pipeline.stop();
    store.flush().context("saving settings")?;
    println!("{}", serde_json::to_string_pretty(&pipeline.diagnostics())?);
    Ok(())
}
