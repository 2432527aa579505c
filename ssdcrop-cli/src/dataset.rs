//! Dataset traversal: one pass over every class folder under the dataset root.
//!
//! For each class the output folder is recreated, every regular file is run through
//! decode, detect, select, crop, pad, mirror and write, and the source file is then removed.
//! Removal happens whatever the outcome for that file and cannot be undone.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::Serialize;
use ssdcrop_core::{SubjectDetector, prepare_subject, select_subject};
use ssdcrop_utils::{
    config::{AppSettings, OutputFormat},
    load_image, timing_guard,
};
use walkdir::WalkDir;

/// Behaviour switches for a dataset run.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Per-class output folder name.
    pub output_dir_name: String,
    pub confidence_threshold: f32,
    /// Skip the delete step.
    pub keep_source: bool,
    pub output_format: OutputFormat,
}

impl Default for WalkOptions {
    fn default() -> Self {
        (&AppSettings::default()).into()
    }
}

impl From<&AppSettings> for WalkOptions {
    fn from(settings: &AppSettings) -> Self {
        Self {
            output_dir_name: settings.output.dir_name.clone(),
            confidence_threshold: settings.detection.confidence_threshold,
            keep_source: settings.output.keep_source,
            output_format: settings.output.format,
        }
    }
}

/// What happened to a single source file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    /// A crop was written to `output`.
    Saved {
        output: PathBuf,
        label: &'static str,
        score: f32,
    },
    /// The first detection did not clear the threshold.
    NoSubject,
    /// The selected box did not overlap the frame.
    EmptyCrop,
    /// The file could not be decoded as an image.
    Unreadable { reason: String },
}

/// Per-file entry in a [`ClassSummary`].
#[derive(Debug, Clone, Serialize)]
pub struct FileRecord {
    pub index: usize,
    pub source: PathBuf,
    #[serde(flatten)]
    pub outcome: FileOutcome,
    pub deleted: bool,
}

/// Result of processing one class folder.
#[derive(Debug, Clone, Serialize)]
pub struct ClassSummary {
    pub class: String,
    pub output_dir: PathBuf,
    pub files: Vec<FileRecord>,
}

impl ClassSummary {
    pub fn saved(&self) -> usize {
        self.count(|outcome| matches!(outcome, FileOutcome::Saved { .. }))
    }

    pub fn no_subject(&self) -> usize {
        self.count(|outcome| matches!(outcome, FileOutcome::NoSubject))
    }

    pub fn empty_crop(&self) -> usize {
        self.count(|outcome| matches!(outcome, FileOutcome::EmptyCrop))
    }

    pub fn unreadable(&self) -> usize {
        self.count(|outcome| matches!(outcome, FileOutcome::Unreadable { .. }))
    }

    pub fn deleted(&self) -> usize {
        self.files.iter().filter(|record| record.deleted).count()
    }

    fn count(&self, predicate: impl Fn(&FileOutcome) -> bool) -> usize {
        self.files
            .iter()
            .filter(|record| predicate(&record.outcome))
            .count()
    }
}

/// Drives a [`SubjectDetector`] over a dataset root, strictly one file at a time.
pub struct DatasetWalker<'a, D: SubjectDetector + ?Sized> {
    detector: &'a D,
    options: WalkOptions,
}

impl<'a, D: SubjectDetector + ?Sized> DatasetWalker<'a, D> {
    pub fn new(detector: &'a D, options: WalkOptions) -> Self {
        Self { detector, options }
    }

    /// Process every class folder directly under `root`, in name order.
    ///
    /// Undecodable files and frames without a subject are recorded and skipped. Detector,
    /// write and delete failures abort the run.
    pub fn run(&self, root: &Path) -> Result<Vec<ClassSummary>> {
        anyhow::ensure!(
            root.is_dir(),
            "dataset path is not a directory: {}",
            root.display()
        );

        let mut summaries = Vec::new();
        for entry in WalkDir::new(root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry
                .with_context(|| format!("failed to list dataset folder {}", root.display()))?;
            // Symlinked class folders count as class folders.
            if !entry.path().is_dir() {
                debug!("Skipping non-directory entry {}", entry.path().display());
                continue;
            }
            summaries.push(self.process_class(entry.path())?);
        }
        Ok(summaries)
    }

    /// Recreate the output folder of `class_dir` and process each file in it.
    pub fn process_class(&self, class_dir: &Path) -> Result<ClassSummary> {
        let class = class_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let _guard = timing_guard(format!("ssdcrop_cli::class[{class}]"), log::Level::Info);

        let output_dir = class_dir.join(&self.options.output_dir_name);
        reset_output_dir(&output_dir)?;

        let sources = list_source_files(class_dir)?;
        info!("{class}: {} file(s)", sources.len());

        let mut files = Vec::with_capacity(sources.len());
        for (index, source) in sources.into_iter().enumerate() {
            let outcome = self.process_file(&source, &output_dir, index)?;
            let deleted = self.remove_source(&source)?;
            files.push(FileRecord {
                index,
                source,
                outcome,
                deleted,
            });
        }

        Ok(ClassSummary {
            class,
            output_dir,
            files,
        })
    }

    fn process_file(&self, source: &Path, output_dir: &Path, index: usize) -> Result<FileOutcome> {
        let image = match load_image(source) {
            Ok(image) => image,
            Err(err) => {
                warn!("Cannot read image {}: {err:#}", source.display());
                return Ok(FileOutcome::Unreadable {
                    reason: format!("{err:#}"),
                });
            }
        };

        let detections = self
            .detector
            .detect(&image)
            .with_context(|| format!("detection failed for {}", source.display()))?;
        let Some(subject) = select_subject(&detections, self.options.confidence_threshold) else {
            debug!(
                "{}: no subject above {:.2} ({} detection(s))",
                source.display(),
                self.options.confidence_threshold,
                detections.len()
            );
            return Ok(FileOutcome::NoSubject);
        };

        let Some(prepared) = prepare_subject(&image.to_rgb8(), subject.bbox) else {
            warn!(
                "{}: selected box {:?} lies outside the frame",
                source.display(),
                subject.bbox
            );
            return Ok(FileOutcome::EmptyCrop);
        };

        let format = self.options.output_format;
        let output = output_dir.join(format!("{index}.{}", format.extension()));
        prepared
            .save_with_format(&output, format.image_format())
            .with_context(|| format!("failed to write {}", output.display()))?;
        debug!(
            "{} -> {} ({} {:.2})",
            source.display(),
            output.display(),
            subject.label(),
            subject.score
        );

        Ok(FileOutcome::Saved {
            output,
            label: subject.label(),
            score: subject.score,
        })
    }

    /// Irreversibly delete a processed source image. Returns whether it was removed.
    fn remove_source(&self, source: &Path) -> Result<bool> {
        if self.options.keep_source {
            return Ok(false);
        }
        fs::remove_file(source)
            .with_context(|| format!("failed to delete source image {}", source.display()))?;
        Ok(true)
    }
}

/// Delete any previous output and create an empty folder in its place.
fn reset_output_dir(output_dir: &Path) -> Result<()> {
    if output_dir.exists() {
        fs::remove_dir_all(output_dir).with_context(|| {
            format!("failed to clear previous output {}", output_dir.display())
        })?;
    }
    fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))
}

/// Files directly inside `class_dir`, sorted by name.
///
/// Symlinks are resolved when classifying entries, so a link to an image is processed and the
/// link itself removed. Dangling links are skipped.
fn list_source_files(class_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut sources = Vec::new();
    for entry in WalkDir::new(class_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry
            .with_context(|| format!("failed to list class folder {}", class_dir.display()))?;
        if entry.path().is_file() {
            sources.push(entry.into_path());
        }
    }
    Ok(sources)
}
