use image::{DynamicImage, GrayImage, Luma, RgbImage};

use crate::error::{AnalysisError, Result};

/// A decoded image with its channel layout resolved once.
///
/// Everything downstream matches on the variant instead of inspecting
/// channel counts at run time.
#[derive(Debug, Clone, PartialEq)]
pub enum Raster {
    Grayscale(GrayImage),
    Color(RgbImage),
}

impl Raster {
    /// Resolve a decoded image. Images carrying chroma become `Color`,
    /// luma (with or without alpha) becomes `Grayscale`. Alpha is dropped.
    pub fn from_dynamic(image: &DynamicImage) -> Self {
        if image.color().has_color() {
            Raster::Color(image.to_rgb8())
        } else {
            Raster::Grayscale(image.to_luma8())
        }
    }

    pub fn width(&self) -> u32 {
        self.dimensions().0
    }

    pub fn height(&self) -> u32 {
        self.dimensions().1
    }

    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Raster::Grayscale(img) => img.dimensions(),
            Raster::Color(img) => img.dimensions(),
        }
    }

    pub fn is_color(&self) -> bool {
        matches!(self, Raster::Color(_))
    }

    /// Fail with `InvalidInput` if the image has no pixels.
    pub fn ensure_non_empty(&self) -> Result<()> {
        let (width, height) = self.dimensions();
        if width == 0 || height == 0 {
            return Err(AnalysisError::InvalidInput(format!(
                "image must not be empty, got {}x{}",
                width, height
            )));
        }
        Ok(())
    }

    /// Luma view used for numeric comparisons (BT.601 weights).
    pub fn to_gray(&self) -> GrayImage {
        match self {
            Raster::Grayscale(img) => img.clone(),
            Raster::Color(img) => GrayImage::from_fn(img.width(), img.height(), |x, y| {
                let [r, g, b] = img.get_pixel(x, y).0;
                Luma([bt601_luma(r, g, b)])
            }),
        }
    }

    /// Color view; grayscale input has its channel replicated.
    pub fn to_color(&self) -> RgbImage {
        match self {
            Raster::Grayscale(img) => gray_to_color(img),
            Raster::Color(img) => img.clone(),
        }
    }

    pub fn into_dynamic(self) -> DynamicImage {
        match self {
            Raster::Grayscale(img) => DynamicImage::ImageLuma8(img),
            Raster::Color(img) => DynamicImage::ImageRgb8(img),
        }
    }
}

impl From<&DynamicImage> for Raster {
    fn from(image: &DynamicImage) -> Self {
        Raster::from_dynamic(image)
    }
}

// 0.299 R + 0.587 G + 0.114 B in 14-bit fixed point, rounded to nearest
const LUMA_R: u32 = 4899;
const LUMA_G: u32 = 9617;
const LUMA_B: u32 = 1868;
const LUMA_SHIFT: u32 = 14;

pub fn bt601_luma(r: u8, g: u8, b: u8) -> u8 {
    let sum = r as u32 * LUMA_R + g as u32 * LUMA_G + b as u32 * LUMA_B;
    ((sum + (1 << (LUMA_SHIFT - 1))) >> LUMA_SHIFT) as u8
}

/// Replicate a single channel into three.
pub fn gray_to_color(img: &GrayImage) -> RgbImage {
    DynamicImage::ImageLuma8(img.clone()).to_rgb8()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    #[test]
    fn test_resolves_grayscale_and_color() {
        let gray = DynamicImage::ImageLuma8(GrayImage::from_pixel(3, 2, Luma([7])));
        let color = DynamicImage::ImageRgb8(RgbImage::from_pixel(3, 2, Rgb([1, 2, 3])));

        assert!(!Raster::from_dynamic(&gray).is_color());
        assert!(Raster::from_dynamic(&color).is_color());
        assert_eq!(Raster::from_dynamic(&color).dimensions(), (3, 2));
    }

    #[test]
    fn test_grayscale_promotes_by_replication() {
        let raster = Raster::Grayscale(GrayImage::from_pixel(2, 2, Luma([42])));
        let color = raster.to_color();
        assert_eq!(color.get_pixel(1, 1), &Rgb([42, 42, 42]));
    }

    #[test]
    fn test_bt601_luma() {
        assert_eq!(bt601_luma(0, 0, 0), 0);
        assert_eq!(bt601_luma(255, 255, 255), 255);
        assert_eq!(bt601_luma(255, 0, 0), 76);
        assert_eq!(bt601_luma(0, 255, 0), 150);
        assert_eq!(bt601_luma(0, 0, 255), 29);

        let raster = Raster::Color(RgbImage::from_pixel(2, 1, Rgb([0, 255, 0])));
        assert_eq!(raster.to_gray().get_pixel(1, 0), &Luma([150]));
    }

    #[test]
    fn test_empty_image_is_invalid() {
        let raster = Raster::Grayscale(GrayImage::new(0, 5));
        assert!(matches!(
            raster.ensure_non_empty(),
            Err(AnalysisError::InvalidInput(_))
        ));
    }
}
