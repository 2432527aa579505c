//! Shared helpers for ssdcrop-cli integration tests.
use std::{
    fs,
    path::{Path, PathBuf},
    process::Command,
};

use image::{Rgb, RgbImage};

pub fn find_model_path() -> Option<PathBuf> {
    let candidates = [
        "models/MobileNetSSD_deploy.onnx",
        "../models/MobileNetSSD_deploy.onnx",
    ];
    candidates
        .into_iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

/// Lay out `<root>/<class>/` with one broken file and `images` synthetic frames.
pub fn build_class_dir(root: &Path, class: &str, images: usize) -> PathBuf {
    let class_dir = root.join(class);
    fs::create_dir_all(&class_dir).expect("create class dir");
    fs::write(class_dir.join("broken.jpg"), b"truncated download").expect("write broken file");
    for index in 0..images {
        let frame = RgbImage::from_fn(64, 48, |x, y| {
            Rgb([(x * 4) as u8, (y * 5) as u8, (index * 40) as u8])
        });
        frame
            .save(class_dir.join(format!("frame_{index}.png")))
            .expect("write frame");
    }
    class_dir
}

pub fn files_in(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .expect("read dir")
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    files.sort();
    files
}

/// Command for the compiled binary with logging pinned so stderr is predictable.
pub fn cli() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_ssdcrop-cli"));
    command.env("RUST_LOG", "info");
    command
}

/// Run the CLI and print stderr when the exit status does not match `expect_success`.
#[macro_export]
macro_rules! assert_cli_status {
    ($output:expr, $expect_success:expr, $msg:literal) => {{
        if $output.status.success() != $expect_success {
            eprintln!("CLI stderr: {}", String::from_utf8_lossy(&$output.stderr));
        }
        assert_eq!($output.status.success(), $expect_success, $msg);
    }};
}
