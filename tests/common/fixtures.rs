use catsym::{FaceLocator, FaceRegion, Raster};
use image::{DynamicImage, GrayImage, ImageBuffer, Luma, Rgb, RgbImage};
use tempfile::NamedTempFile;

/// Grayscale raster from explicit rows of pixel values.
pub fn gray_from_rows(rows: &[&[u8]]) -> Raster {
    let height = rows.len() as u32;
    let width = rows.first().map(|r| r.len()).unwrap_or(0) as u32;
    Raster::Grayscale(GrayImage::from_fn(width, height, |x, y| {
        Luma([rows[y as usize][x as usize]])
    }))
}

/// Grayscale image whose value depends only on the distance from the
/// vertical axis, so every column mirrors its counterpart.
pub fn mirror_symmetric_gray(width: u32, height: u32) -> Raster {
    Raster::Grayscale(GrayImage::from_fn(width, height, |x, y| {
        let mirrored = x.min(width - 1 - x);
        Luma([((mirrored * 37 + y * 11) % 256) as u8])
    }))
}

/// Color version of [`mirror_symmetric_gray`].
pub fn mirror_symmetric_color(width: u32, height: u32) -> Raster {
    Raster::Color(RgbImage::from_fn(width, height, |x, y| {
        let m = x.min(width - 1 - x);
        Rgb([(m * 20 % 256) as u8, (y * 30 % 256) as u8, ((m + y) * 7 % 256) as u8])
    }))
}

/// Black left half, white right half.
pub fn black_white_split(width: u32, height: u32) -> Raster {
    Raster::Grayscale(GrayImage::from_fn(width, height, |x, _| {
        if x < width / 2 { Luma([0]) } else { Luma([255]) }
    }))
}

/// Pseudo-random but deterministic color image.
pub fn noisy_color(width: u32, height: u32, seed: u32) -> RgbImage {
    ImageBuffer::from_fn(width, height, |x, y| {
        let v = x.wrapping_mul(73_856_093) ^ y.wrapping_mul(19_349_663) ^ seed.wrapping_mul(83_492_791);
        Rgb([(v % 251) as u8, (v / 7 % 253) as u8, (v / 13 % 255) as u8])
    })
}

/// Saves a 60x40 gradient PNG and returns the temp file.
/// The file will be automatically cleaned up when dropped.
pub fn create_test_image() -> NamedTempFile {
    let img = DynamicImage::ImageRgb8(noisy_color(60, 40, 3));
    let file = tempfile::Builder::new()
        .suffix(".png")
        .tempfile()
        .expect("Failed to create temp image file");
    img.save_with_format(file.path(), image::ImageFormat::Png)
        .expect("Failed to save test image");
    file
}

/// Locator that always reports the same regions.
pub struct FixedLocator(pub Vec<FaceRegion>);

impl FaceLocator for FixedLocator {
    fn locate(&mut self, _gray: &GrayImage) -> anyhow::Result<Vec<FaceRegion>> {
        Ok(self.0.clone())
    }

    fn name(&self) -> &str {
        "fixed"
    }
}
