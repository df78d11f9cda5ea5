//! TimeTick engine binary.
//!
//! Hosts a [`TickDriver`] on a wall-clock frame loop. It loads the unit
//! hierarchy from configuration, optionally resumes from a saved snapshot,
//! and runs frames until Ctrl-C or the configured tick limit.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `TIMETICK_CONFIG` or `timetick-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Build the tick driver, or restore it from `TIMETICK_SNAPSHOT`
//! 4. Run the frame loop
//! 5. Save the final snapshot and log the result

mod clock_loop;
mod error;

use std::path::{Path, PathBuf};
use std::time::Duration;

use timetick_core::{Snapshot, TickDriver, TimeTickConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::clock_loop::{LogObserver, LoopSettings};
use crate::error::EngineError;

/// Environment variable naming the config file.
const CONFIG_ENV: &str = "TIMETICK_CONFIG";

/// Config file used when [`CONFIG_ENV`] is unset.
const DEFAULT_CONFIG_PATH: &str = "timetick-config.yaml";

/// Environment variable naming the snapshot file to resume from and save to.
const SNAPSHOT_ENV: &str = "TIMETICK_SNAPSHOT";

/// Application entry point for the TimeTick engine.
///
/// # Errors
///
/// Returns an error if configuration, snapshot restore, or snapshot save
/// fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config_path = std::env::var_os(CONFIG_ENV)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let loaded = load_config(&config_path)?;
    let from_file = loaded.is_some();
    let config = loaded.unwrap_or_default();

    // 2. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.engine.log_level)),
        )
        .with_target(true)
        .init();

    info!("timetick-engine starting");
    if from_file {
        info!(path = %config_path.display(), "Configuration loaded");
    } else {
        info!(path = %config_path.display(), "Config file not found, using defaults");
    }

    // 3. Build or restore the driver.
    let snapshot_path = std::env::var_os(SNAPSHOT_ENV).map(PathBuf::from);
    let mut driver = match snapshot_path.as_deref().filter(|path| path.exists()) {
        Some(path) => {
            let driver = restore_driver(path)?;
            info!(
                path = %path.display(),
                tick = driver.current_tick(),
                units = driver.units().len(),
                "Driver restored from snapshot"
            );
            driver
        }
        None => {
            let driver = config.build_driver().map_err(EngineError::from)?;
            info!(
                units = driver.units().len(),
                tick_duration = driver.tick_duration(),
                time_scale = driver.time_scale(),
                paused = driver.is_paused(),
                "Driver built from configuration"
            );
            driver
        }
    };

    // 4. Run the frame loop.
    let settings = LoopSettings {
        frame_interval: Duration::from_millis(config.engine.frame_interval_ms.max(1)),
        max_ticks: config.engine.max_ticks,
    };
    let mut observer = LogObserver {
        template: config.engine.status_template.clone(),
    };
    let result =
        clock_loop::run_frames(&mut driver, settings, &mut observer, shutdown_signal()).await;

    // 5. Save and log results.
    if let Some(path) = snapshot_path.as_deref() {
        save_snapshot(&driver, path)?;
        info!(path = %path.display(), "Snapshot saved");
    }

    info!(
        end_reason = ?result.end_reason,
        frames = result.frames,
        final_tick = result.final_tick,
        "timetick-engine shutdown complete"
    );

    Ok(())
}

/// Load configuration from `path`, or `None` if the file does not exist.
fn load_config(path: &Path) -> Result<Option<TimeTickConfig>, EngineError> {
    if path.exists() {
        Ok(Some(TimeTickConfig::from_file(path)?))
    } else {
        Ok(None)
    }
}

fn restore_driver(path: &Path) -> Result<TickDriver, EngineError> {
    let json = std::fs::read_to_string(path).map_err(|source| EngineError::SnapshotFile {
        path: path.display().to_string(),
        source,
    })?;
    Ok(TickDriver::restore(Snapshot::from_json(&json)?))
}

fn save_snapshot(driver: &TickDriver, path: &Path) -> Result<(), EngineError> {
    let json = driver.snapshot().to_json()?;
    std::fs::write(path, json).map_err(|source| EngineError::SnapshotFile {
        path: path.display().to_string(),
        source,
    })
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C, running until tick limit");
        std::future::pending::<()>().await;
    }
}
