//! Settings shared by the ssdcrop crates.
//!
//! These structures describe inference, selection and output behaviour. They are serialized to
//! JSON so a dataset run can be reproduced from a settings file, with CLI flags layered on top.

use anyhow::{Context, Result};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::{
    env, fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
};

/// Default MobileNet-SSD ONNX export location, relative to the working directory.
pub const DEFAULT_MODEL_PATH: &str = "models/MobileNetSSD_deploy.onnx";

/// Default dataset folder name, resolved under the working directory.
pub const DEFAULT_DATASET_DIR: &str = "Downloads";

/// Resize filter preference used when building the network input.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResizeQuality {
    /// Bilinear resampling, closest to OpenCV's default `INTER_LINEAR`.
    #[default]
    Quality,
    /// Nearest-neighbour resampling.
    Speed,
}

impl fmt::Display for ResizeQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResizeQuality::Quality => "quality",
            ResizeQuality::Speed => "speed",
        })
    }
}

impl FromStr for ResizeQuality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quality" => Ok(ResizeQuality::Quality),
            "speed" => Ok(ResizeQuality::Speed),
            other => Err(format!(
                "invalid resize quality '{other}'; expected 'quality' or 'speed'"
            )),
        }
    }
}

/// A width/height pair in pixels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Network input geometry.
///
/// Frames are first resized to `pre_resize` and then to `blob`, the resolution the network was
/// trained on. Both steps are kept so the sampling matches the reference pipeline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InputSettings {
    pub pre_resize: Dimensions,
    pub blob: Dimensions,
    pub resize_quality: ResizeQuality,
}

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            pre_resize: Dimensions::new(600, 600),
            blob: Dimensions::new(300, 300),
            resize_quality: ResizeQuality::Quality,
        }
    }
}

/// Detection and normalisation parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DetectionSettings {
    /// A detection must score strictly above this value to be selected.
    pub confidence_threshold: f32,
    /// Multiplier applied after mean subtraction.
    pub scale: f32,
    /// Value subtracted from every channel before scaling.
    pub mean: f32,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
            scale: 0.007843,
            mean: 127.5,
        }
    }
}

/// Image format written into the output folder.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Png,
    Jpeg,
    Bmp,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Bmp => "bmp",
        }
    }

    pub fn image_format(self) -> image::ImageFormat {
        match self {
            OutputFormat::Png => image::ImageFormat::Png,
            OutputFormat::Jpeg => image::ImageFormat::Jpeg,
            OutputFormat::Bmp => image::ImageFormat::Bmp,
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "jpg" | "jpeg" => Ok(OutputFormat::Jpeg),
            "bmp" => Ok(OutputFormat::Bmp),
            other => Err(format!(
                "unknown output format '{other}' (supported: png, jpeg, bmp)"
            )),
        }
    }
}

/// Where and how prepared crops are written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputSettings {
    /// Name of the per-class folder that receives crops. Recreated on every run.
    pub dir_name: String,
    pub format: OutputFormat,
    /// Leave source images in place instead of deleting them after processing.
    pub keep_source: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            dir_name: "detected".to_string(),
            format: OutputFormat::Png,
            keep_source: false,
        }
    }
}

/// Settings controlling optional runtime telemetry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    /// Whether telemetry timing logs are enabled.
    pub enabled: bool,
    /// Logging level for telemetry output (error, warn, info, debug, trace).
    pub level: String,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            level: "debug".to_string(),
        }
    }
}

impl TelemetrySettings {
    /// Resolve the configured level string into a `LevelFilter`.
    pub fn level_filter(&self) -> LevelFilter {
        match self.level.trim().to_ascii_lowercase().as_str() {
            "off" => LevelFilter::Off,
            "error" => LevelFilter::Error,
            "warn" | "warning" => LevelFilter::Warn,
            "info" => LevelFilter::Info,
            "trace" => LevelFilter::Trace,
            _ => LevelFilter::Debug,
        }
    }
}

/// Persistent settings for a dataset preparation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Path to the ONNX detector. `None` falls back to [`DEFAULT_MODEL_PATH`].
    pub model_path: Option<String>,
    /// Dataset root holding one folder per class. `None` means `<cwd>/Downloads`.
    pub dataset_path: Option<String>,
    pub input: InputSettings,
    pub detection: DetectionSettings,
    pub output: OutputSettings,
    pub telemetry: TelemetrySettings,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            model_path: Some(DEFAULT_MODEL_PATH.into()),
            dataset_path: None,
            input: InputSettings::default(),
            detection: DetectionSettings::default(),
            output: OutputSettings::default(),
            telemetry: TelemetrySettings::default(),
        }
    }
}

impl AppSettings {
    /// Load settings from a JSON file.
    ///
    /// Missing sections take their defaults; a missing `model_path` falls back to
    /// [`DEFAULT_MODEL_PATH`].
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        let mut settings: AppSettings = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse settings JSON at {}", path.display()))?;

        if settings.model_path.is_none() {
            settings.model_path = Some(DEFAULT_MODEL_PATH.into());
        }
        settings.validate()?;
        Ok(settings)
    }

    /// Serialize settings to disk in pretty-printed JSON, overwriting any existing file.
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let payload =
            serde_json::to_string_pretty(self).context("failed to serialize settings JSON")?;
        fs::write(path, payload)
            .with_context(|| format!("failed to write settings file {}", path.display()))?;
        Ok(())
    }

    /// Reject settings that would make every run fail or write outside the class folder.
    pub fn validate(&self) -> Result<()> {
        let InputSettings {
            pre_resize, blob, ..
        } = self.input;
        anyhow::ensure!(
            pre_resize.width > 0 && pre_resize.height > 0,
            "pre-resize dimensions must be greater than zero"
        );
        anyhow::ensure!(
            blob.width > 0 && blob.height > 0,
            "network input dimensions must be greater than zero"
        );
        anyhow::ensure!(
            self.detection.confidence_threshold.is_finite(),
            "confidence threshold must be a finite number"
        );
        let dir_name = self.output.dir_name.trim();
        anyhow::ensure!(
            !dir_name.is_empty()
                && !dir_name.contains(['/', '\\'])
                && dir_name != "."
                && dir_name != "..",
            "output folder name must be a single path component (got '{}')",
            self.output.dir_name
        );
        Ok(())
    }

    /// Model path with the default applied.
    pub fn resolved_model_path(&self) -> PathBuf {
        PathBuf::from(self.model_path.as_deref().unwrap_or(DEFAULT_MODEL_PATH))
    }

    /// Dataset root, defaulting to `Downloads` under the current directory.
    pub fn resolved_dataset_path(&self) -> PathBuf {
        match self.dataset_path.as_deref() {
            Some(path) => PathBuf::from(path),
            None => env::current_dir()
                .map(|dir| dir.join(DEFAULT_DATASET_DIR))
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATASET_DIR)),
        }
    }
}

/// Returns the default settings location (`config/ssdcrop.json` under the current directory).
pub fn default_settings_path() -> PathBuf {
    env::current_dir()
        .map(|dir| dir.join("config/ssdcrop.json"))
        .unwrap_or_else(|_| PathBuf::from("config/ssdcrop.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn default_settings_round_trip() {
        let file = NamedTempFile::new().expect("tempfile");
        let settings = AppSettings {
            dataset_path: Some("/data/birds".into()),
            ..AppSettings::default()
        };
        settings.save_to_path(file.path()).expect("save");

        let loaded = AppSettings::load_from_path(file.path()).expect("load");
        assert_eq!(loaded.input, settings.input);
        assert_eq!(loaded.detection, settings.detection);
        assert_eq!(loaded.output, settings.output);
        assert_eq!(loaded.model_path, settings.model_path);
        assert_eq!(loaded.dataset_path.as_deref(), Some("/data/birds"));
    }

    #[test]
    fn partial_json_takes_defaults() {
        let file = NamedTempFile::new().expect("tempfile");
        let json = r#"{
            "detection": { "confidence_threshold": 0.7 },
            "output": { "format": "jpeg" }
        }"#;
        fs::write(file.path(), json).expect("write custom settings");

        let loaded = AppSettings::load_from_path(file.path()).expect("load");
        assert_eq!(loaded.detection.confidence_threshold, 0.7);
        assert_eq!(loaded.detection.mean, 127.5);
        assert_eq!(loaded.output.format, OutputFormat::Jpeg);
        assert_eq!(loaded.output.dir_name, "detected");
        assert!(!loaded.output.keep_source);
        assert_eq!(loaded.input.pre_resize, Dimensions::new(600, 600));
        assert_eq!(loaded.input.blob, Dimensions::new(300, 300));
        assert_eq!(loaded.resolved_model_path(), PathBuf::from(DEFAULT_MODEL_PATH));
    }

    #[test]
    fn rejects_nested_output_folder() {
        let mut settings = AppSettings::default();
        settings.output.dir_name = "../escape".into();
        assert!(settings.validate().is_err());

        settings.output.dir_name = "crops".into();
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn rejects_zero_input_size() {
        let mut settings = AppSettings::default();
        settings.input.blob = Dimensions::new(0, 300);
        assert!(settings.validate().is_err());
    }

    #[test]
    fn dataset_defaults_to_downloads() {
        let settings = AppSettings::default();
        assert!(settings.resolved_dataset_path().ends_with(DEFAULT_DATASET_DIR));
    }

    #[test]
    fn parses_format_and_quality_tokens() {
        assert_eq!("JPG".parse::<OutputFormat>(), Ok(OutputFormat::Jpeg));
        assert!("tiff".parse::<OutputFormat>().is_err());
        assert_eq!(" speed ".parse::<ResizeQuality>(), Ok(ResizeQuality::Speed));

        let telemetry = TelemetrySettings {
            level: "Warn".into(),
            ..TelemetrySettings::default()
        };
        assert_eq!(telemetry.level_filter(), LevelFilter::Warn);
    }
}
