//! Rocket podule host harness
//!
//! Runs the device without an emulator: services it on the interval it asks
//! for and plays the guest's vsync handler, so an editor can drive playback.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::{self, Instant};
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use rocket_podule::device::address;
use rocket_podule::{DeviceConfig, DeviceController, IoType, PoduleDevice, RUN_INTERVAL_US};

/// Rocket podule - serve GNU Rocket sync tracks to an emulated guest
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "podule.yaml")]
    config: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Also write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Guest vsync rate in Hz
    #[arg(long, default_value = "50")]
    frame_rate: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let _log_guard = init_logging(&args.log_level, args.log_file.as_deref())?;

    info!("Starting Rocket podule...");
    info!("Configuration file: {}", args.config.display());

    let config = DeviceConfig::load(&args.config)?;
    let device = DeviceController::init(&config).context("Failed to initialize podule")?;

    run_host(device, args.frame_rate.max(1), shutdown_signal()).await;

    info!("Rocket podule shutdown complete");
    Ok(())
}

async fn run_host(
    mut device: DeviceController,
    frame_rate: u32,
    shutdown: impl std::future::Future<Output = ()>,
) {
    let mut next_run = Instant::now();
    let mut frames = time::interval(Duration::from_secs(1) / frame_rate);
    tokio::pin!(shutdown);

    info!("Ready, {} vsyncs per second", frame_rate);

    loop {
        tokio::select! {
            _ = time::sleep_until(next_run) => {
                let wait_us = device.run(RUN_INTERVAL_US);
                next_run += Duration::from_micros(u64::from(wait_us));
            }

            _ = frames.tick() => vsync(&mut device),

            _ = &mut shutdown => {
                info!("Shutdown signal received, stopping host loop");
                break;
            }
        }
    }

    device.close();
}

/// What the guest does every frame: bump the counter while playing
fn vsync(device: &mut DeviceController) {
    if device.read_byte(IoType::Memc, address::PLAYING) == 0 {
        return;
    }

    let position = device.read_word(IoType::Memc, address::POSITION_LOW);
    device.write_word(IoType::Memc, address::POSITION_LOW, position.wrapping_add(1));

    let ticks_per_row = device.timeline().ticks_per_row();
    if u32::from(position.wrapping_add(1)) % ticks_per_row == 0 {
        let values: Vec<String> = (0..device.tracks().count())
            .map(|i| {
                let name = device.tracks().name(i).unwrap_or("?");
                format!("{}={:.3}", name, device.sample(i).unwrap_or(0.0))
            })
            .collect();
        debug!("Row {}: {}", device.timeline().row_from_position(), values.join(" "));
    }
}

fn init_logging(level: &str, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let name = path.file_name().context("Log file path has no file name")?;
            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .with(file_layer)
        .init();

    Ok(guard)
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");
}
