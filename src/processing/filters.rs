use std::fmt;
use std::str::FromStr;

use image::{GrayImage, ImageBuffer, Luma, Rgb, RgbImage};
use imageproc::filter::{bilateral_filter, filter3x3, gaussian_blur_f32, median_filter};
use imageproc::gradients::{horizontal_sobel, vertical_sobel};
use imageproc::morphology::{Mask, grayscale_dilate, grayscale_erode};
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};
use crate::raster::{Raster, gray_to_color};

/// Laplacian kernel for aperture 1 (4-neighbour)
const LAPLACIAN_K1: [f32; 9] = [0.0, 1.0, 0.0, 1.0, -4.0, 1.0, 0.0, 1.0, 0.0];
/// Laplacian kernel for aperture 3
const LAPLACIAN_K3: [f32; 9] = [2.0, 0.0, 2.0, 0.0, -8.0, 0.0, 2.0, 0.0, 2.0];

/// Gradient magnitude and direction of an image.
pub struct Gradient {
    /// Magnitude normalized to 0..=255
    pub magnitude: GrayImage,
    /// Direction in degrees, in `[0, 360)`
    pub direction: ImageBuffer<Luma<f32>, Vec<f32>>,
}

/// Rank used by the order-statistic filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatistic {
    #[default]
    Median,
    Min,
    Max,
}

impl FromStr for OrderStatistic {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "median" => Ok(OrderStatistic::Median),
            "min" => Ok(OrderStatistic::Min),
            "max" => Ok(OrderStatistic::Max),
            other => Err(AnalysisError::InvalidParameter(format!(
                "unknown order-statistic filter '{}', expected median, min or max",
                other
            ))),
        }
    }
}

impl fmt::Display for OrderStatistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrderStatistic::Median => "median",
            OrderStatistic::Min => "min",
            OrderStatistic::Max => "max",
        };
        f.write_str(name)
    }
}

/// Gaussian sigma implied by a kernel size when none is given.
pub fn sigma_for_kernel(ksize: u32) -> f32 {
    0.3 * ((ksize as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

fn check_kernel(filter: &str, ksize: u32) -> Result<()> {
    if ksize == 0 || ksize % 2 == 0 {
        return Err(AnalysisError::InvalidParameter(format!(
            "{} kernel size must be odd and positive, got {}",
            filter, ksize
        )));
    }
    Ok(())
}

fn check_positive(name: &str, value: f32) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(AnalysisError::InvalidParameter(format!(
            "{} must be a positive number, got {}",
            name, value
        )));
    }
    Ok(())
}

/// Smooth with a Gaussian kernel. A `sigma` of 0 derives it from `ksize`.
pub fn gaussian(image: &Raster, ksize: u32, sigma: f32) -> Result<Raster> {
    image.ensure_non_empty()?;
    check_kernel("gaussian", ksize)?;
    if !sigma.is_finite() || sigma < 0.0 {
        return Err(AnalysisError::InvalidParameter(format!(
            "gaussian sigma must not be negative, got {}",
            sigma
        )));
    }
    let sigma = if sigma > 0.0 { sigma } else { sigma_for_kernel(ksize) };

    Ok(match image {
        Raster::Grayscale(img) => Raster::Grayscale(blur_gray(img, sigma)),
        Raster::Color(img) => Raster::Color(blur_rgb(img, sigma)),
    })
}

/// Edge map from the absolute Laplacian of the lightly blurred luma channel,
/// stretched to the full 0..=255 range. Supported apertures are 1 and 3.
pub fn laplacian_edges(image: &Raster, ksize: u32) -> Result<GrayImage> {
    image.ensure_non_empty()?;
    let kernel = match ksize {
        1 => &LAPLACIAN_K1,
        3 => &LAPLACIAN_K3,
        other => {
            return Err(AnalysisError::InvalidParameter(format!(
                "laplacian kernel size must be 1 or 3, got {}",
                other
            )));
        }
    };

    let gray = image.to_gray();
    let blurred = blur_gray(&gray, sigma_for_kernel(3));
    let response: Vec<f32> = filter3x3::<_, f32, f32>(&blurred, kernel)
        .into_raw()
        .into_iter()
        .map(|v| v.abs().min(255.0))
        .collect();

    normalize_min_max(&response, gray.width(), gray.height())
}

/// Sobel gradient of the luma channel.
pub fn gradient(image: &Raster) -> Result<Gradient> {
    image.ensure_non_empty()?;
    let gray = image.to_gray();
    let (width, height) = gray.dimensions();
    let gx = horizontal_sobel(&gray);
    let gy = vertical_sobel(&gray);

    let mut magnitude = Vec::with_capacity((width * height) as usize);
    let mut direction = ImageBuffer::new(width, height);
    for (x, y, px) in direction.enumerate_pixels_mut() {
        let dx = gx.get_pixel(x, y)[0] as f32;
        let dy = gy.get_pixel(x, y)[0] as f32;
        magnitude.push(dx.hypot(dy));

        let mut angle = dy.atan2(dx).to_degrees();
        if angle < 0.0 {
            angle += 360.0;
        }
        if angle >= 360.0 {
            angle = 0.0;
        }
        *px = Luma([angle]);
    }

    Ok(Gradient {
        magnitude: normalize_min_max(&magnitude, width, height)?,
        direction,
    })
}

/// Edge-preserving smoothing. Neighbours are weighted by spatial distance
/// and by intensity (gray) or summed per-channel color distance.
pub fn bilateral(
    image: &Raster,
    diameter: u32,
    sigma_color: f32,
    sigma_space: f32,
) -> Result<Raster> {
    image.ensure_non_empty()?;
    if diameter == 0 {
        return Err(AnalysisError::InvalidParameter(
            "bilateral diameter must be positive".to_string(),
        ));
    }
    check_positive("bilateral sigma_color", sigma_color)?;
    check_positive("bilateral sigma_space", sigma_space)?;

    Ok(match image {
        Raster::Grayscale(img) => {
            Raster::Grayscale(bilateral_filter(img, diameter, sigma_color, sigma_space))
        }
        Raster::Color(img) => Raster::Color(bilateral_rgb(
            img,
            &BilateralParams {
                radius: (diameter / 2).max(1),
                sigma_color,
                sigma_space,
            },
        )),
    })
}

/// Rank filter over a `ksize x ksize` window: median, erosion (min) or
/// dilation (max).
pub fn order_statistic(image: &Raster, ksize: u32, kind: OrderStatistic) -> Result<Raster> {
    image.ensure_non_empty()?;
    check_kernel("order-statistic", ksize)?;
    let radius = ksize / 2;

    Ok(match image {
        Raster::Grayscale(img) => Raster::Grayscale(match kind {
            OrderStatistic::Median => median_filter(img, radius, radius),
            OrderStatistic::Min => grayscale_erode(img, &square_mask(radius)?),
            OrderStatistic::Max => grayscale_dilate(img, &square_mask(radius)?),
        }),
        Raster::Color(img) => Raster::Color(match kind {
            OrderStatistic::Median => median_filter(img, radius, radius),
            OrderStatistic::Min => window_extreme(img, radius, u8::min, u8::MAX),
            OrderStatistic::Max => window_extreme(img, radius, u8::max, u8::MIN),
        }),
    })
}

fn square_mask(radius: u32) -> Result<Mask> {
    let radius = u8::try_from(radius).map_err(|_| {
        AnalysisError::InvalidParameter(format!(
            "order-statistic kernel radius must be at most 255, got {}",
            radius
        ))
    })?;
    Ok(Mask::square(radius))
}

/// High-boost sharpening: the luma channel plus `k` times its unsharp mask,
/// stretched to 0..=255. Always returns a color image.
pub fn high_boost(image: &Raster, k: f32) -> Result<RgbImage> {
    image.ensure_non_empty()?;
    if !k.is_finite() || k < 0.0 {
        return Err(AnalysisError::InvalidParameter(format!(
            "high-boost factor must be a non-negative number, got {}",
            k
        )));
    }

    let gray = image.to_gray();
    let blurred = blur_gray(&gray, sigma_for_kernel(5));
    let boosted: Vec<f32> = gray
        .as_raw()
        .iter()
        .zip(blurred.as_raw())
        .map(|(&original, &smooth)| {
            let mask = original.saturating_sub(smooth) as f32;
            let scaled = (mask * k).round().clamp(0.0, 255.0) as u8;
            original.saturating_add(scaled) as f32
        })
        .collect();

    let normalized = normalize_min_max(&boosted, gray.width(), gray.height())?;
    Ok(gray_to_color(&normalized))
}

/// Linearly map `values` so the minimum becomes 0 and the maximum 255.
/// A constant input maps to all zeros.
pub fn normalize_min_max(values: &[f32], width: u32, height: u32) -> Result<GrayImage> {
    let (min, max) = values
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = max - min;

    let data: Vec<u8> = values
        .iter()
        .map(|&v| {
            if range > f32::EPSILON {
                ((v - min) * 255.0 / range).round().clamp(0.0, 255.0) as u8
            } else {
                0
            }
        })
        .collect();

    GrayImage::from_raw(width, height, data).ok_or_else(|| buffer_mismatch("normalize"))
}

// Blurs run in f32 and are rounded once at the end, so flat regions stay
// exactly flat.
fn blur_gray(img: &GrayImage, sigma: f32) -> GrayImage {
    let (width, height) = img.dimensions();
    let as_float: ImageBuffer<Luma<f32>, Vec<f32>> =
        ImageBuffer::from_fn(width, height, |x, y| Luma([img.get_pixel(x, y)[0] as f32]));
    let blurred = gaussian_blur_f32(&as_float, sigma);
    GrayImage::from_fn(width, height, |x, y| Luma([round_u8(blurred.get_pixel(x, y)[0])]))
}

fn blur_rgb(img: &RgbImage, sigma: f32) -> RgbImage {
    let (width, height) = img.dimensions();
    let as_float: ImageBuffer<Rgb<f32>, Vec<f32>> = ImageBuffer::from_fn(width, height, |x, y| {
        let [r, g, b] = img.get_pixel(x, y).0;
        Rgb([r as f32, g as f32, b as f32])
    });
    let blurred = gaussian_blur_f32(&as_float, sigma);
    RgbImage::from_fn(width, height, |x, y| {
        let [r, g, b] = blurred.get_pixel(x, y).0;
        Rgb([round_u8(r), round_u8(g), round_u8(b)])
    })
}

fn round_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

fn buffer_mismatch(stage: &str) -> AnalysisError {
    AnalysisError::InvalidInput(format!("{}: pixel buffer does not match dimensions", stage))
}

/// Mirror an out-of-range index back into `[0, n)` without repeating the
/// edge pixel.
fn reflect_101(mut i: i64, n: i64) -> usize {
    if n <= 1 {
        return 0;
    }
    while i < 0 || i >= n {
        if i < 0 {
            i = -i;
        } else {
            i = 2 * (n - 1) - i;
        }
    }
    i as usize
}

struct BilateralParams {
    radius: u32,
    sigma_color: f32,
    sigma_space: f32,
}

// imageproc's bilateral filter is gray only. Color follows OpenCV: circular
// window, reflect-101 borders and the range weight taken on the sum of
// absolute channel differences.
fn bilateral_rgb(img: &RgbImage, params: &BilateralParams) -> RgbImage {
    let r = params.radius as i64;
    let space_coeff = -0.5 / (params.sigma_space * params.sigma_space);
    let color_coeff = -0.5 / (params.sigma_color * params.sigma_color);

    let mut offsets = Vec::new();
    for dy in -r..=r {
        for dx in -r..=r {
            let dist2 = (dx * dx + dy * dy) as f32;
            if dist2 <= (r * r) as f32 {
                offsets.push((dx, dy, (dist2 * space_coeff).exp()));
            }
        }
    }

    let (width, height) = img.dimensions();
    let (w, h) = (width as i64, height as i64);
    RgbImage::from_fn(width, height, |x, y| {
        let center = img.get_pixel(x, y).0;
        let mut sums = [0.0f32; 3];
        let mut weight_sum = 0.0f32;

        for &(dx, dy, space_weight) in &offsets {
            let sx = reflect_101(x as i64 + dx, w) as u32;
            let sy = reflect_101(y as i64 + dy, h) as u32;
            let neighbour = img.get_pixel(sx, sy).0;

            let distance: f32 = center
                .iter()
                .zip(neighbour.iter())
                .map(|(&a, &b)| a.abs_diff(b) as f32)
                .sum();
            let weight = space_weight * (distance * distance * color_coeff).exp();

            for (sum, &value) in sums.iter_mut().zip(neighbour.iter()) {
                *sum += weight * value as f32;
            }
            weight_sum += weight;
        }

        Rgb(sums.map(|sum| round_u8(sum / weight_sum)))
    })
}

/// Per-channel min or max over a square window clipped to the image.
/// imageproc's grayscale morphology has no color counterpart.
fn window_extreme(
    img: &RgbImage,
    radius: u32,
    pick: fn(u8, u8) -> u8,
    identity: u8,
) -> RgbImage {
    let (width, height) = img.dimensions();
    RgbImage::from_fn(width, height, |x, y| {
        let mut acc = [identity; 3];
        let y_end = (y + radius).min(height - 1);
        let x_end = (x + radius).min(width - 1);
        for ny in y.saturating_sub(radius)..=y_end {
            for nx in x.saturating_sub(radius)..=x_end {
                let neighbour = img.get_pixel(nx, ny).0;
                for (value, &channel) in acc.iter_mut().zip(neighbour.iter()) {
                    *value = pick(*value, channel);
                }
            }
        }
        Rgb(acc)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reflect_101() {
        assert_eq!(reflect_101(-1, 5), 1);
        assert_eq!(reflect_101(-2, 5), 2);
        assert_eq!(reflect_101(5, 5), 3);
        assert_eq!(reflect_101(6, 5), 2);
        assert_eq!(reflect_101(3, 5), 3);
        assert_eq!(reflect_101(-3, 1), 0);
        // Radius larger than the image
        assert_eq!(reflect_101(-4, 2), 0);
    }

    #[test]
    fn test_sigma_for_kernel() {
        assert!((sigma_for_kernel(3) - 0.8).abs() < 1e-6);
        assert!((sigma_for_kernel(5) - 1.1).abs() < 1e-6);
    }

    #[test]
    fn test_color_min_max_per_channel() {
        let mut img = RgbImage::from_pixel(5, 5, Rgb([100, 100, 100]));
        img.put_pixel(2, 2, Rgb([250, 10, 100]));

        let dilated = window_extreme(&img, 1, u8::max, u8::MIN);
        assert_eq!(dilated.get_pixel(1, 1), &Rgb([250, 100, 100]));
        assert_eq!(dilated.get_pixel(4, 4), &Rgb([100, 100, 100]));

        let eroded = window_extreme(&img, 1, u8::min, u8::MAX);
        assert_eq!(eroded.get_pixel(3, 3), &Rgb([100, 10, 100]));
        assert_eq!(eroded.get_pixel(0, 0), &Rgb([100, 100, 100]));
    }

    #[test]
    fn test_color_bilateral_keeps_strong_edges() {
        let img = RgbImage::from_fn(12, 6, |x, _| {
            if x < 6 { Rgb([0, 0, 0]) } else { Rgb([255, 255, 255]) }
        });
        let params = BilateralParams {
            radius: 4,
            sigma_color: 30.0,
            sigma_space: 75.0,
        };
        let smoothed = bilateral_rgb(&img, &params);
        assert_eq!(smoothed.get_pixel(5, 3), &Rgb([0, 0, 0]));
        assert_eq!(smoothed.get_pixel(6, 3), &Rgb([255, 255, 255]));
    }

    #[test]
    fn test_square_mask_rejects_huge_radius() {
        assert!(square_mask(255).is_ok());
        assert!(matches!(square_mask(256), Err(AnalysisError::InvalidParameter(_))));
    }

    #[test]
    fn test_order_statistic_parse() {
        assert_eq!("Median".parse::<OrderStatistic>().unwrap(), OrderStatistic::Median);
        assert_eq!("max".parse::<OrderStatistic>().unwrap(), OrderStatistic::Max);
        assert!("mode".parse::<OrderStatistic>().is_err());
        assert_eq!(OrderStatistic::Min.to_string(), "min");
    }
}
