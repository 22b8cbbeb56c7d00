//! Bilateral symmetry scoring.
//!
//! The image is split at `floor(width / 2)`, the right half is mirrored and
//! compared pixel by pixel with the left half on the luma channel. The mean
//! absolute difference (0..=255) is rescaled so that identical halves score
//! 100% and maximally different halves score 0%.
//!
//! For odd widths the right half is one column wider. Column `x` of the left
//! half is always compared with its mirror column `width - 1 - x`, so the
//! middle column (the mirror axis itself) takes no part in the score.

use image::{GrayImage, RgbImage, imageops};
use serde::Serialize;
use tracing::debug;

use crate::drawing::{self, GREEN, WHITE};
use crate::error::{AnalysisError, Result};
use crate::raster::{Raster, gray_to_color};

const LINE_THICKNESS: u32 = 2;
const LABEL_X: i64 = 10;
const LABEL_BASELINE: i64 = 30;
const LABEL_SCALE: u32 = 2;

/// Outcome of a symmetry analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct SymmetryResult {
    /// Color copy of the input with the centerline and score label drawn on it
    pub annotated: RgbImage,
    /// Symmetry percentage in `[0, 100]`
    pub score: f64,
    /// Mean absolute difference between the compared halves, in `[0, 255]`
    pub mean_difference: f64,
    /// Column at which the image was split
    pub center: u32,
    /// Left half (columns `[0, center)`) as color
    pub left_half: RgbImage,
    /// Right half (columns `[center, width)`) as color, in original orientation
    pub right_half: RgbImage,
}

impl SymmetryResult {
    pub fn level(&self) -> SymmetryLevel {
        SymmetryLevel::from_score(self.score)
    }

    /// Both halves next to each other on a white background, separated by
    /// `gap` columns.
    pub fn halves_side_by_side(&self, gap: u32) -> RgbImage {
        let (lw, lh) = self.left_half.dimensions();
        let (rw, rh) = self.right_half.dimensions();
        let mut canvas = RgbImage::from_pixel(lw + gap + rw, lh.max(rh), WHITE);
        imageops::overlay(&mut canvas, &self.left_half, 0, 0);
        imageops::overlay(&mut canvas, &self.right_half, (lw + gap) as i64, 0);
        canvas
    }
}

/// Qualitative grading of a symmetry score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SymmetryLevel {
    High,
    Medium,
    Low,
}

impl SymmetryLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            SymmetryLevel::High
        } else if score >= 60.0 {
            SymmetryLevel::Medium
        } else {
            SymmetryLevel::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SymmetryLevel::High => "High symmetry",
            SymmetryLevel::Medium => "Medium symmetry",
            SymmetryLevel::Low => "Low symmetry",
        }
    }

    /// Display color as a hex string.
    pub fn color(&self) -> &'static str {
        match self {
            SymmetryLevel::High => "#28a745",
            SymmetryLevel::Medium => "#ffc107",
            SymmetryLevel::Low => "#dc3545",
        }
    }
}

/// Text drawn onto the annotated image.
pub fn score_label(score: f64) -> String {
    format!("Simetria: {:.1}%", score)
}

/// Map a mean absolute difference in `[0, 255]` to a percentage.
pub fn score_from_difference(mean_difference: f64) -> f64 {
    (100.0 - mean_difference / 2.55).max(0.0)
}

/// Analyze the left-right mirror symmetry of `image`.
///
/// Fails with [`AnalysisError::InvalidInput`] when the image is empty or only
/// one column wide.
pub fn analyze(image: &Raster) -> Result<SymmetryResult> {
    image.ensure_non_empty()?;
    let (width, height) = image.dimensions();
    if width < 2 {
        return Err(AnalysisError::InvalidInput(format!(
            "image must be at least 2 pixels wide to split, got width {}",
            width
        )));
    }

    let gray = image.to_gray();
    let center = width / 2;

    let left = imageops::crop_imm(&gray, 0, 0, center, height).to_image();
    let right = imageops::crop_imm(&gray, center, 0, width - center, height).to_image();
    let right_flipped = imageops::flip_horizontal(&right);

    let mean_difference = mean_abs_difference(&left, &right_flipped);
    let score = score_from_difference(mean_difference);
    debug!(width, height, center, mean_difference, score, "Symmetry computed");

    let mut annotated = image.to_color();
    drawing::draw_vertical_line(&mut annotated, center, LINE_THICKNESS, GREEN);
    drawing::draw_text(
        &mut annotated,
        &score_label(score),
        LABEL_X,
        LABEL_BASELINE,
        LABEL_SCALE,
        GREEN,
    );

    Ok(SymmetryResult {
        annotated,
        score,
        mean_difference,
        center,
        left_half: gray_to_color(&left),
        right_half: gray_to_color(&right),
    })
}

/// Mean of `|a - b|` over the columns both images share, counted from
/// column 0 of each.
fn mean_abs_difference(a: &GrayImage, b: &GrayImage) -> f64 {
    let width = a.width().min(b.width());
    let height = a.height().min(b.height());
    let count = width as u64 * height as u64;
    if count == 0 {
        return 0.0;
    }

    let mut total: u64 = 0;
    for y in 0..height {
        for x in 0..width {
            let pa = a.get_pixel(x, y)[0];
            let pb = b.get_pixel(x, y)[0];
            total += pa.abs_diff(pb) as u64;
        }
    }
    total as f64 / count as f64
}
