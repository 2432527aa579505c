use image::{DynamicImage, Rgb, RgbImage};
use ssdcrop_core::{
    DEFAULT_CONFIDENCE_THRESHOLD, InputSize, PreprocessConfig, SsdDetector, SubjectDetector,
    decode_detections, prepare_subject, select_subject,
};
use tract_onnx::prelude::Tensor;

const MODEL_CANDIDATES: [&str; 2] = [
    "models/MobileNetSSD_deploy.onnx",
    "../models/MobileNetSSD_deploy.onnx",
];

fn find_model_path() -> Option<std::path::PathBuf> {
    MODEL_CANDIDATES
        .into_iter()
        .map(std::path::PathBuf::from)
        .find(|p| p.exists())
}

/// A 120x80 frame with a bright 30x60 block standing in for the subject.
fn frame_with_subject() -> RgbImage {
    let mut frame = RgbImage::from_pixel(120, 80, Rgb([20, 20, 20]));
    for y in 10..70 {
        for x in 60..90 {
            frame.put_pixel(x, y, Rgb([230, (x - 60) as u8, 40]));
        }
    }
    frame
}

#[test]
fn raw_output_to_prepared_subject() {
    let frame = frame_with_subject();
    // Normalised corners of the block: x 60..90 of 120, y 10..70 of 80.
    let raw = Tensor::from_shape(
        &[1, 1, 2, 7],
        &[
            0.0f32, 3.0, 0.92, 0.5, 0.125, 0.75, 0.875, //
            0.0, 8.0, 0.99, 0.0, 0.0, 1.0, 1.0,
        ],
    )
    .expect("tensor");

    let detections = decode_detections(&raw, frame.dimensions()).expect("decode");
    let subject = select_subject(&detections, DEFAULT_CONFIDENCE_THRESHOLD).expect("subject");
    assert_eq!(subject.label(), "bird");
    assert_eq!(subject.bbox.width(), 30);
    assert_eq!(subject.bbox.height(), 60);

    let prepared = prepare_subject(&frame, subject.bbox).expect("prepared");
    assert_eq!(prepared.dimensions(), (60, 60));
    // 15 px bands on either side; mirroring puts the block's first column at x = 44.
    assert_eq!(prepared.get_pixel(14, 30), &Rgb([0, 0, 0]));
    assert_eq!(prepared.get_pixel(44, 30), &Rgb([230, 0, 40]));
    assert_eq!(prepared.get_pixel(15, 30), &Rgb([230, 29, 40]));
    assert_eq!(prepared.get_pixel(45, 30), &Rgb([0, 0, 0]));
}

#[test]
fn detector_runs_on_real_model_when_available() {
    let Some(model) = find_model_path() else {
        eprintln!("Skipping test: model not found");
        return;
    };

    let config = PreprocessConfig {
        input_size: InputSize::new(300, 300),
        ..Default::default()
    };
    let detector = SsdDetector::new(&model, config).expect("load detector");
    let frame = DynamicImage::ImageRgb8(frame_with_subject());
    let detections = detector.detect(&frame).expect("detect");
    for detection in &detections {
        assert!((0.0..=1.0).contains(&detection.score));
    }
}
