//! End-to-end tests for the processor, gallery and reports.

mod common;

use catsym::gallery;
use catsym::pipeline::Pipeline;
use catsym::processing::build_standard_pipeline;
use common::*;
use image::{DynamicImage, GenericImageView, GrayImage, Luma, Rgb};
use tempfile::TempDir;

fn full_frame_processor() -> CatFaceProcessor {
    CatFaceProcessor::new(Box::new(FullFrameLocator))
}

#[test]
fn test_whole_image_used_without_face() -> anyhow::Result<()> {
    let image = DynamicImage::ImageRgb8(noisy_color(48, 32, 11));
    let processed = full_frame_processor().process(image.clone())?;

    assert_eq!(processed.face_region, None);
    assert_eq!(processed.cat_face.to_rgb8(), image.to_rgb8());
    // Nothing is marked on the detection overlay
    assert_eq!(processed.face_detection.to_rgb8(), image.to_rgb8());
    assert_eq!(processed.symmetry.annotated.dimensions(), (48, 32));
    assert!((0.0..=100.0).contains(&processed.symmetry.score));
    Ok(())
}

#[test]
fn test_face_region_is_cropped_with_margin_and_enlarged() -> anyhow::Result<()> {
    let region = FaceRegion {
        x: 30,
        y: 20,
        width: 20,
        height: 20,
    };
    let mut processor = CatFaceProcessor::new(Box::new(FixedLocator(vec![region])));
    let processed = processor.process(DynamicImage::ImageRgb8(noisy_color(100, 80, 2)))?;

    // 4 px margin on each side, then doubled
    assert_eq!(processed.cat_face.dimensions(), (56, 56));
    assert_eq!(processed.face_region, Some(region));
    for kind in OutputKind::PROCESS {
        assert_eq!(processed.image(kind).dimensions(), (56, 56), "{:?}", kind);
    }
    assert_eq!(processed.original.dimensions(), (100, 80));

    let marked = processed.face_detection.to_rgb8();
    assert_eq!(marked.get_pixel(30, 20), &Rgb([0, 255, 0]));
    assert_eq!(marked.get_pixel(49, 39), &Rgb([0, 255, 0]));
    Ok(())
}

#[test]
fn test_face_near_border_is_clamped() -> anyhow::Result<()> {
    let region = FaceRegion {
        x: 0,
        y: 0,
        width: 10,
        height: 10,
    };
    let mut processor = CatFaceProcessor::new(Box::new(FixedLocator(vec![region])));
    let processed = processor.process(DynamicImage::ImageRgb8(noisy_color(40, 30, 4)))?;

    // Margin of 2 only extends right and down
    assert_eq!(processed.cat_face.dimensions(), (24, 24));
    Ok(())
}

#[test]
fn test_first_of_several_faces_is_used() -> anyhow::Result<()> {
    let first = FaceRegion {
        x: 5,
        y: 5,
        width: 10,
        height: 10,
    };
    let second = FaceRegion {
        x: 40,
        y: 20,
        width: 20,
        height: 20,
    };
    let mut processor = CatFaceProcessor::new(Box::new(FixedLocator(vec![first, second])));
    let processed = processor.process(DynamicImage::ImageRgb8(noisy_color(80, 60, 5)))?;
    assert_eq!(processed.face_region, Some(first));
    Ok(())
}

#[test]
fn test_symmetric_image_scores_100_end_to_end() -> anyhow::Result<()> {
    let image = mirror_symmetric_color(64, 48).into_dynamic();
    let processed = full_frame_processor().process(image)?;
    assert_eq!(processed.symmetry.score, 100.0);
    assert_eq!(processed.symmetry.level(), SymmetryLevel::High);
    Ok(())
}

#[test]
fn test_grayscale_input_stays_grayscale_where_expected() -> anyhow::Result<()> {
    let image = DynamicImage::ImageLuma8(GrayImage::from_fn(30, 20, |x, y| Luma([(x * 8 + y) as u8])));
    let processed = full_frame_processor().process(image)?;

    assert!(!processed.gaussian.color().has_color());
    assert!(!processed.bilateral.color().has_color());
    assert!(processed.high_boost.color().has_color());
    Ok(())
}

#[test]
fn test_empty_image_is_rejected() {
    let result = full_frame_processor().process(DynamicImage::ImageLuma8(GrayImage::new(0, 0)));
    let err = result.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AnalysisError>(),
        Some(AnalysisError::InvalidInput(_))
    ));
}

#[test]
fn test_invalid_settings_fail_processing() {
    let settings = FilterSettings {
        gaussian_kernel: 4,
        ..FilterSettings::default()
    };
    let mut processor = full_frame_processor().with_settings(settings);
    let result = processor.process(DynamicImage::ImageRgb8(noisy_color(20, 20, 1)));
    assert!(result.is_err());
}

#[test]
fn test_process_file_and_missing_file() -> anyhow::Result<()> {
    let file = create_test_image();
    let mut processor = full_frame_processor();

    let processed = processor.process_file(file.path())?;
    assert_eq!(processed.original.dimensions(), (60, 40));

    let dir = TempDir::new()?;
    assert!(processor.process_file(dir.path().join("missing.png")).is_err());

    let garbage = dir.path().join("garbage.png");
    std::fs::write(&garbage, b"not an image")?;
    assert!(processor.process_file(&garbage).is_err());
    Ok(())
}

#[test]
fn test_save_all_writes_every_output() -> anyhow::Result<()> {
    let processed = full_frame_processor().process(DynamicImage::ImageRgb8(noisy_color(32, 24, 6)))?;
    let dir = TempDir::new()?;
    let out = dir.path().join("out");

    let written = processed.save_all(&out)?;
    assert_eq!(written.len(), OutputKind::ALL.len());
    for kind in OutputKind::ALL {
        assert!(out.join(format!("{}.png", kind.key())).is_file(), "{:?}", kind);
    }
    Ok(())
}

#[test]
fn test_standard_pipeline_step_order() {
    let pipeline = build_standard_pipeline(&FilterSettings::default(), false);
    assert_eq!(
        pipeline.step_names(),
        vec![
            "Gaussian Filter",
            "Laplacian Edges",
            "Gradient Analysis",
            "Bilateral Filter",
            "Order Statistic Filter",
            "High Boost Filter",
            "Symmetry Analysis",
        ]
    );
}

#[test]
fn test_debug_dir_must_be_empty() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    std::fs::write(dir.path().join("leftover.txt"), "x")?;
    assert!(Pipeline::new().with_debug(dir.path().to_path_buf()).is_err());

    let fresh = dir.path().join("fresh");
    assert!(Pipeline::new().with_debug(fresh.clone()).is_ok());
    assert!(fresh.is_dir());
    Ok(())
}

#[test]
fn test_debug_dumps_every_step() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let debug_dir = dir.path().join("debug");
    let mut processor = full_frame_processor().with_debug(debug_dir.clone());
    processor.process(DynamicImage::ImageRgb8(noisy_color(24, 16, 8)))?;

    assert!(debug_dir.join("00_input").join("01_original.png").is_file());
    assert!(debug_dir.join("00_input").join("03_cat_face.png").is_file());
    assert!(debug_dir.join("01_gaussian_filter").join("04_gaussian_filter.png").is_file());
    assert!(debug_dir.join("07_symmetry_analysis").is_dir());
    Ok(())
}

#[test]
fn test_report_json() -> anyhow::Result<()> {
    let file = create_test_image();
    let processed = full_frame_processor().process_file(file.path())?;
    let report = processed.report(Some(file.path()));

    let json: serde_json::Value = serde_json::from_str(&report.to_json()?)?;
    assert_eq!(json["width"], 60);
    assert_eq!(json["height"], 40);
    assert_eq!(json["face_detected"], false);
    assert!(json["score"].as_f64().is_some());
    assert!(["high", "medium", "low"].contains(&json["level"].as_str().unwrap_or("")));
    assert!(report.summary().starts_with("Symmetry score: "));
    Ok(())
}

#[test]
fn test_gallery_scans_sorted_images_only() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let img = DynamicImage::ImageRgb8(noisy_color(20, 12, 1));
    img.save(dir.path().join("b.png"))?;
    img.save_with_format(dir.path().join("a.PNG"), image::ImageFormat::Png)?;
    std::fs::write(dir.path().join("notes.txt"), "cats")?;
    std::fs::create_dir(dir.path().join("nested.png"))?;

    let found = gallery::scan_directory(dir.path())?;
    let names: Vec<_> = found
        .iter()
        .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
        .collect();
    assert_eq!(names, vec!["a.PNG", "b.png"]);
    Ok(())
}

#[test]
fn test_gallery_continues_after_failures() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    DynamicImage::ImageRgb8(noisy_color(20, 12, 1)).save(dir.path().join("a.png"))?;
    std::fs::write(dir.path().join("b.jpg"), b"broken")?;
    DynamicImage::ImageRgb8(noisy_color(22, 14, 2)).save(dir.path().join("c.png"))?;

    let mut processor = full_frame_processor();
    let mut calls = 0usize;
    let mut seen = Vec::new();
    let visited = gallery::process_directory(&mut processor, dir.path(), |entry| {
        calls += 1;
        let name = entry.path.file_name().map(|n| n.to_string_lossy().into_owned());
        seen.push((name, entry.outcome.is_ok()));
    })?;

    assert_eq!(visited, 3);
    assert_eq!(calls, 3);
    assert_eq!(
        seen,
        vec![
            (Some("a.png".to_string()), true),
            (Some("b.jpg".to_string()), false),
            (Some("c.png".to_string()), true),
        ]
    );
    Ok(())
}

#[test]
fn test_gallery_on_empty_directory_never_calls_back() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let mut calls = 0usize;
    let visited = gallery::process_directory(&mut full_frame_processor(), dir.path(), |_| calls += 1)?;
    assert_eq!(visited, 0);
    assert_eq!(calls, 0);
    Ok(())
}
