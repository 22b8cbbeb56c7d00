//! Presentation outputs that do not need a window: the JSON report and the
//! contact sheet of process images.

use std::path::Path;

use anyhow::{Context, Result};
use image::{DynamicImage, RgbImage, imageops::{self, FilterType}};
use serde::Serialize;

use crate::drawing::{self, BLACK, WHITE};
use crate::processing::ProcessedImages;
use crate::processing::face::FaceRegion;
use crate::symmetry::SymmetryLevel;

const TITLE_SCALE: u32 = 2;
const TILE_PADDING: u32 = 8;

/// Summary of one processed image
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymmetryReport {
    pub image: Option<String>,
    pub width: u32,
    pub height: u32,
    pub face_detected: bool,
    pub face_region: Option<FaceRegion>,
    pub score: f64,
    pub mean_difference: f64,
    pub level: SymmetryLevel,
    pub label: String,
    pub color: String,
}

impl SymmetryReport {
    pub fn new(processed: &ProcessedImages, source: Option<&Path>) -> Self {
        let level = processed.symmetry.level();
        Self {
            image: source.map(|p| p.display().to_string()),
            width: processed.original.width(),
            height: processed.original.height(),
            face_detected: processed.face_region.is_some(),
            face_region: processed.face_region,
            score: processed.symmetry.score,
            mean_difference: processed.symmetry.mean_difference,
            level,
            label: level.label().to_string(),
            color: level.color().to_string(),
        }
    }

    /// Two-line human readable summary
    pub fn summary(&self) -> String {
        format!("Symmetry score: {:.1}%\n{}", self.score, self.label)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)
            .with_context(|| format!("Failed to write report {}", path.display()))
    }
}

/// Lay out titled thumbnails in a grid, `columns` per row, each scaled to
/// `tile_width` pixels wide.
pub fn contact_sheet(tiles: &[(&str, DynamicImage)], columns: u32, tile_width: u32) -> RgbImage {
    let columns = columns.max(1);
    let tile_width = tile_width.max(1);
    if tiles.is_empty() {
        return RgbImage::from_pixel(tile_width, 1, WHITE);
    }

    let title_band = drawing::text_height(TITLE_SCALE) + 2 * TILE_PADDING;
    let thumbs: Vec<(&str, RgbImage)> = tiles
        .iter()
        .map(|(title, img)| {
            let ratio = tile_width as f64 / img.width().max(1) as f64;
            let height = ((img.height() as f64 * ratio) as u32).max(1);
            let thumb = img.resize_exact(tile_width, height, FilterType::Lanczos3).to_rgb8();
            (*title, thumb)
        })
        .collect();

    let row_heights: Vec<u32> = thumbs
        .chunks(columns as usize)
        .map(|row| row.iter().map(|(_, t)| t.height()).max().unwrap_or(0) + title_band)
        .collect();

    let cell_width = tile_width + 2 * TILE_PADDING;
    let sheet_width = cell_width * columns.min(thumbs.len() as u32);
    let sheet_height: u32 = row_heights.iter().sum::<u32>() + TILE_PADDING;
    let mut sheet = RgbImage::from_pixel(sheet_width, sheet_height, WHITE);

    let mut y = 0u32;
    for (row_idx, row) in thumbs.chunks(columns as usize).enumerate() {
        for (col_idx, (title, thumb)) in row.iter().enumerate() {
            let x = col_idx as u32 * cell_width + TILE_PADDING;
            drawing::draw_text(
                &mut sheet,
                title,
                x as i64,
                (y + TILE_PADDING + drawing::text_height(TITLE_SCALE)) as i64,
                TITLE_SCALE,
                BLACK,
            );
            imageops::overlay(&mut sheet, thumb, x as i64, (y + title_band) as i64);
        }
        y += row_heights[row_idx];
    }

    sheet
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_contact_sheet_grid_size() {
        let tile = DynamicImage::ImageRgb8(RgbImage::from_pixel(20, 10, Rgb([9, 9, 9])));
        let tiles: Vec<(&str, DynamicImage)> =
            (0..7).map(|_| ("Tile", tile.clone())).collect();

        let sheet = contact_sheet(&tiles, 3, 40);
        let band = drawing::text_height(TITLE_SCALE) + 2 * TILE_PADDING;
        assert_eq!(sheet.width(), 3 * (40 + 2 * TILE_PADDING));
        assert_eq!(sheet.height(), 3 * (20 + band) + TILE_PADDING);
    }

    #[test]
    fn test_contact_sheet_empty() {
        let sheet = contact_sheet(&[], 3, 40);
        assert_eq!(sheet.width(), 40);
    }
}
