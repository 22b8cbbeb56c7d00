use std::path::Path;

use anyhow::Result;
use image::{DynamicImage, GrayImage, RgbImage, imageops::FilterType};
use rustface::{Detector, ImageData};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::drawing::{self, GREEN};

/// Rectangle around a detected face, in source pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FaceRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Finds faces in a grayscale image.
///
/// Locators are built by the caller and handed to the processor, which
/// keeps them for its whole lifetime. Detection may update internal
/// scratch buffers, hence `&mut self`.
pub trait FaceLocator {
    fn locate(&mut self, gray: &GrayImage) -> Result<Vec<FaceRegion>>;

    /// Human-readable name (used in log output)
    fn name(&self) -> &str;
}

/// Locator that never reports a face, so the whole frame is analyzed.
#[derive(Debug, Default, Clone, Copy)]
pub struct FullFrameLocator;

impl FaceLocator for FullFrameLocator {
    fn locate(&mut self, _gray: &GrayImage) -> Result<Vec<FaceRegion>> {
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "full frame"
    }
}

/// SeetaFace cascade detector
pub struct SeetaFaceLocator {
    detector: Box<dyn Detector>,
}

impl SeetaFaceLocator {
    /// Load a SeetaFace model file and configure the detector.
    pub fn from_model<P: AsRef<Path>>(model_path: P, min_face_size: u32) -> Result<Self> {
        let path = model_path.as_ref();
        let path_str = path
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("Invalid detector path: {}", path.display()))?;
        let mut detector = rustface::create_detector(path_str)
            .map_err(|e| anyhow::anyhow!("Failed to load face detector {}: {}", path.display(), e))?;
        detector.set_min_face_size(min_face_size);
        detector.set_score_thresh(2.0);
        detector.set_pyramid_scale_factor(0.8);
        detector.set_slide_window_step(4, 4);

        info!(model = %path.display(), min_face_size, "Face detector loaded");
        Ok(Self { detector })
    }
}

impl FaceLocator for SeetaFaceLocator {
    fn locate(&mut self, gray: &GrayImage) -> Result<Vec<FaceRegion>> {
        let (img_width, img_height) = gray.dimensions();
        let image_data = ImageData::new(gray.as_raw(), img_width, img_height);
        let faces = self.detector.detect(&image_data);

        // Boxes may extend past the frame; clamp them
        let regions = faces
            .iter()
            .filter_map(|face| {
                let bbox = face.bbox();
                let x = bbox.x().max(0) as u32;
                let y = bbox.y().max(0) as u32;
                if x >= img_width || y >= img_height {
                    return None;
                }
                let right = (bbox.x() as i64 + bbox.width() as i64).min(img_width as i64);
                let bottom = (bbox.y() as i64 + bbox.height() as i64).min(img_height as i64);
                let width = (right - x as i64).max(0) as u32;
                let height = (bottom - y as i64).max(0) as u32;
                (width > 0 && height > 0).then_some(FaceRegion {
                    x,
                    y,
                    width,
                    height,
                })
            })
            .collect::<Vec<_>>();

        debug!(count = regions.len(), "SeetaFace detection finished");
        Ok(regions)
    }

    fn name(&self) -> &str {
        "seetaface"
    }
}

/// Face crop plus an overlay of the source image marking the detection.
#[derive(Debug, Clone)]
pub struct FaceCrop {
    /// Enlarged face region, or the whole image when no face was found
    pub face: DynamicImage,
    /// Color copy of the source with the detection rectangle drawn
    pub marked: RgbImage,
    pub region: Option<FaceRegion>,
}

/// Cut the face out of `image` with a margin of `margin_ratio * max(w, h)`
/// on every side (clamped to the frame) and enlarge it by `scale`.
///
/// Without a region the whole image is returned unchanged.
pub fn extract_face(
    image: &DynamicImage,
    region: Option<FaceRegion>,
    margin_ratio: f32,
    scale: f32,
) -> Result<FaceCrop> {
    let mut marked = image.to_rgb8();

    let Some(region) = region else {
        warn!("No cat face detected, analyzing the whole image");
        return Ok(FaceCrop {
            face: image.clone(),
            marked,
            region: None,
        });
    };

    if !scale.is_finite() || scale <= 0.0 {
        anyhow::bail!("Face scale must be positive, got {}", scale);
    }
    if !margin_ratio.is_finite() || margin_ratio < 0.0 {
        anyhow::bail!("Face margin must not be negative, got {}", margin_ratio);
    }

    drawing::draw_rect_outline(
        &mut marked,
        region.x,
        region.y,
        region.width,
        region.height,
        2,
        GREEN,
    );

    let (img_width, img_height) = (image.width(), image.height());
    let margin = (margin_ratio * region.width.max(region.height) as f32) as u32;
    let x_start = region.x.saturating_sub(margin);
    let y_start = region.y.saturating_sub(margin);
    let x_end = (region.x + region.width + margin).min(img_width);
    let y_end = (region.y + region.height + margin).min(img_height);
    if x_end <= x_start || y_end <= y_start {
        anyhow::bail!("Face region {:?} lies outside the {}x{} image", region, img_width, img_height);
    }

    let cropped = image.crop_imm(x_start, y_start, x_end - x_start, y_end - y_start);
    let scaled_w = ((cropped.width() as f32 * scale) as u32).max(1);
    let scaled_h = ((cropped.height() as f32 * scale) as u32).max(1);
    let face = cropped.resize_exact(scaled_w, scaled_h, FilterType::Triangle);

    debug!(
        x = x_start,
        y = y_start,
        width = x_end - x_start,
        height = y_end - y_start,
        scaled_w,
        scaled_h,
        "Face region extracted"
    );

    Ok(FaceCrop {
        face,
        marked,
        region: Some(region),
    })
}
