//! Configuration loading and CLI override logic.

use std::path::PathBuf;

use anyhow::{Context, Result};
use log::info;
use ssdcrop_utils::{
    config::{AppSettings, default_settings_path},
    normalize_path,
};

use crate::args::PrepareArgs;

/// Load application settings from a file or use defaults.
pub fn load_settings(config_path: Option<&PathBuf>) -> Result<AppSettings> {
    if let Some(path) = config_path {
        let resolved = normalize_path(path)?;
        let settings = AppSettings::load_from_path(&resolved)?;
        info!("Loaded settings from {}", resolved.display());
        Ok(settings)
    } else {
        let default_path = default_settings_path();
        if default_path.exists() {
            let settings = AppSettings::load_from_path(&default_path).with_context(|| {
                format!(
                    "failed to load default settings from {}",
                    default_path.display()
                )
            })?;
            info!("Loaded settings from {}", default_path.display());
            Ok(settings)
        } else {
            Ok(AppSettings::default())
        }
    }
}

/// Apply command-line arguments on top of loaded or default settings.
pub fn apply_cli_overrides(settings: &mut AppSettings, args: &PrepareArgs) {
    if let Some(dataset) = args.dataset.as_ref() {
        settings.dataset_path = Some(dataset.display().to_string());
    }
    if let Some(model) = args.model.as_ref() {
        settings.model_path = Some(model.display().to_string());
    }
    if let Some(confidence) = args.confidence {
        settings.detection.confidence_threshold = confidence;
    }
    if let Some(name) = args.output_dir_name.as_ref() {
        settings.output.dir_name = name.trim().to_string();
    }
    if let Some(format) = args.output_format {
        settings.output.format = format;
    }
    if args.keep_source {
        settings.output.keep_source = true;
    }
    if let Some(mode) = args.resize_quality {
        settings.input.resize_quality = mode;
    }

    if args.telemetry {
        settings.telemetry.enabled = true;
    }
    if let Some(level) = args.telemetry_level.as_ref() {
        let normalized = level.trim();
        if !normalized.is_empty() {
            let lower = normalized.to_ascii_lowercase();
            if lower == "off" {
                settings.telemetry.enabled = false;
            }
            settings.telemetry.level = lower;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use ssdcrop_utils::config::{OutputFormat, ResizeQuality};

    #[test]
    fn overrides_replace_settings_values() {
        let args = PrepareArgs::parse_from([
            "ssdcrop-cli",
            "--dataset",
            "/data/animals",
            "--model",
            "net.onnx",
            "--confidence",
            "0.65",
            "--output-dir-name",
            "crops",
            "--output-format",
            "jpeg",
            "--keep-source",
            "--resize-quality",
            "speed",
        ]);
        let mut settings = AppSettings::default();
        apply_cli_overrides(&mut settings, &args);

        assert_eq!(settings.dataset_path.as_deref(), Some("/data/animals"));
        assert_eq!(settings.model_path.as_deref(), Some("net.onnx"));
        assert_eq!(settings.detection.confidence_threshold, 0.65);
        assert_eq!(settings.output.dir_name, "crops");
        assert_eq!(settings.output.format, OutputFormat::Jpeg);
        assert!(settings.output.keep_source);
        assert_eq!(settings.input.resize_quality, ResizeQuality::Speed);
    }

    #[test]
    fn absent_flags_leave_settings_alone() {
        let args = PrepareArgs::parse_from(["ssdcrop-cli"]);
        let mut settings = AppSettings::default();
        settings.output.keep_source = true;
        apply_cli_overrides(&mut settings, &args);

        assert!(settings.output.keep_source);
        assert_eq!(settings.detection.confidence_threshold, 0.5);
        assert_eq!(settings.output.dir_name, "detected");
    }

    #[test]
    fn unknown_format_is_rejected() {
        let err = PrepareArgs::try_parse_from(["ssdcrop-cli", "--output-format", "tiff"])
            .expect_err("tiff is not a supported output format");
        assert!(err.to_string().contains("unknown output format 'tiff'"));
    }

    #[test]
    fn telemetry_level_off_disables_telemetry() {
        let args =
            PrepareArgs::parse_from(["ssdcrop-cli", "--telemetry", "--telemetry-level", "OFF"]);
        let mut settings = AppSettings::default();
        apply_cli_overrides(&mut settings, &args);
        assert!(!settings.telemetry.enabled);
        assert_eq!(settings.telemetry.level, "off");
    }
}
