//! Command-line argument definitions for ssdcrop-cli.

use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Crop one detected subject out of every image in a class-labelled dataset.
///
/// Each `<dataset>/<class>/` folder gets a fresh `detected/` subfolder holding square, mirrored
/// crops named by file index. Source images are deleted once processed unless `--keep-source`
/// is given.
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct PrepareArgs {
    /// Dataset root containing one folder per class (defaults to `./Downloads`).
    #[arg(short, long)]
    pub dataset: Option<PathBuf>,

    /// Path to the MobileNet-SSD ONNX model.
    #[arg(short, long)]
    pub model: Option<PathBuf>,

    /// Optional settings JSON. Defaults to `config/ssdcrop.json` when present, otherwise built-in parameters.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Minimum confidence (exclusive) the first detection needs to be cropped.
    #[arg(long, value_name = "SCORE")]
    pub confidence: Option<f32>,

    /// Name of the per-class output folder. It is deleted and recreated on every run.
    #[arg(long, value_name = "NAME")]
    pub output_dir_name: Option<String>,

    /// Output image format: png, jpeg, bmp.
    #[arg(long, value_name = "FORMAT")]
    pub output_format: Option<ssdcrop_utils::config::OutputFormat>,

    /// Keep source images instead of deleting them after processing.
    #[arg(long, action = ArgAction::SetTrue)]
    pub keep_source: bool,

    /// Resize quality mode: `quality` (Triangle) or `speed` (fast Nearest).
    #[arg(long, value_name = "MODE")]
    pub resize_quality: Option<ssdcrop_utils::config::ResizeQuality>,

    /// Write a JSON report of every processed file.
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Enable telemetry timing logs (defaults to settings file).
    #[arg(long, action = ArgAction::SetTrue)]
    pub telemetry: bool,

    /// Override telemetry logging level (error, warn, info, debug, trace).
    #[arg(long, value_name = "LEVEL")]
    pub telemetry_level: Option<String>,
}
