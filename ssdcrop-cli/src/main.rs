mod args;
mod config;
mod dataset;

use std::{
    fs::{self, File},
    path::Path,
};

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use serde::Serialize;
use ssdcrop_core::{PreprocessConfig, SsdDetector};
use ssdcrop_utils::{configure_telemetry, init_logging, normalize_path};

use crate::{
    args::PrepareArgs,
    config::{apply_cli_overrides, load_settings},
    dataset::{ClassSummary, DatasetWalker, WalkOptions},
};

#[derive(Debug, Serialize)]
struct RunReport<'a> {
    dataset: String,
    model: String,
    confidence_threshold: f32,
    classes: &'a [ClassSummary],
}

fn main() -> Result<()> {
    init_logging(log::LevelFilter::Info)?;
    let args = PrepareArgs::parse();

    let mut settings = load_settings(args.config.as_ref())?;
    apply_cli_overrides(&mut settings, &args);
    settings.validate()?;
    configure_telemetry(
        settings.telemetry.enabled,
        settings.telemetry.level_filter(),
    );

    let model_path = normalize_path(settings.resolved_model_path())
        .context("MobileNet-SSD model is required")?;
    let dataset_path = normalize_path(settings.resolved_dataset_path())
        .context("dataset folder is required")?;

    let preprocess = PreprocessConfig::from(&settings);
    info!(
        "Loading model from {} at resolution {}x{}",
        model_path.display(),
        preprocess.input_size.width,
        preprocess.input_size.height
    );
    let detector = SsdDetector::new(&model_path, preprocess)?;

    let options = WalkOptions::from(&settings);
    if options.keep_source {
        info!("Source images will be kept");
    } else {
        warn!(
            "Source images under {} are deleted after processing; pass --keep-source to retain them",
            dataset_path.display()
        );
    }

    let walker = DatasetWalker::new(&detector, options);
    let summaries = walker.run(&dataset_path)?;

    for summary in &summaries {
        info!(
            "{}: {} saved, {} without subject, {} unreadable, {} empty crop(s), {} deleted",
            summary.class,
            summary.saved(),
            summary.no_subject(),
            summary.unreadable(),
            summary.empty_crop(),
            summary.deleted()
        );
    }
    info!("Processed {} class folder(s)", summaries.len());

    if let Some(report_path) = args.report.as_ref() {
        let report = RunReport {
            dataset: dataset_path.display().to_string(),
            model: model_path.display().to_string(),
            confidence_threshold: settings.detection.confidence_threshold,
            classes: &summaries,
        };
        write_report(report_path, &report)?;
        info!("Wrote report to {}", report_path.display());
    }

    Ok(())
}

fn write_report(path: &Path, report: &RunReport<'_>) -> Result<()> {
    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create directory {}", dir.display()))?;
    }
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(file, report)
        .with_context(|| format!("failed to write report JSON to {}", path.display()))
}
