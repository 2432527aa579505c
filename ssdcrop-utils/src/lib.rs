//! Common helpers shared across the ssdcrop crates.

/// Run settings and their JSON persistence.
pub mod config;
/// Image loading, resizing, and tensor layout conversion.
pub mod image_utils;
/// Instrumentation helpers for optional performance tracing.
pub mod telemetry;

use std::path::Path;

use anyhow::Result;
use log::LevelFilter;

pub use config::{AppSettings, DetectionSettings, InputSettings, OutputFormat, OutputSettings};
pub use image_utils::{load_image, resize_image, rgb_to_bgr_chw};
pub use telemetry::{
    TimingGuard, configure as configure_telemetry, telemetry_allows, telemetry_enabled,
    timing_guard, timing_guard_if,
};

/// Initialize logging once.
///
/// `RUST_LOG` takes precedence when set; otherwise `default_filter` applies. The telemetry
/// target is always let through so `--telemetry` works without touching `RUST_LOG`.
pub fn init_logging(default_filter: LevelFilter) -> Result<()> {
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_filter.as_str()),
    );
    builder.filter_module(telemetry::TELEMETRY_TARGET, LevelFilter::Trace);

    if builder.try_init().is_err() {
        // Logger already initialized; nothing to do.
    }
    Ok(())
}

/// Validate that a path exists and resolve it to an absolute path.
pub fn normalize_path<P: AsRef<Path>>(path: P) -> Result<std::path::PathBuf> {
    let path = path.as_ref();
    anyhow::ensure!(path.exists(), "path does not exist: {}", path.display());
    Ok(path.canonicalize()?)
}
