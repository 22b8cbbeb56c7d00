use crate::pipeline::{PipelineData, PipelineStep, PipelineContext, MetadataValue};
use crate::processing::filters::{self, OrderStatistic};
use crate::processing::OutputKind;
use crate::raster::Raster;
use crate::symmetry;
use anyhow::Result;
use image::DynamicImage;
use tracing::debug;

pub const SCORE_KEY: &str = "symmetry_score";
pub const MEAN_DIFFERENCE_KEY: &str = "mean_difference";
pub const CENTER_KEY: &str = "center";

/// Every filter step works on the face crop and appends its result,
/// leaving the items already produced untouched.
fn face_item(data: &[PipelineData]) -> Result<&PipelineData> {
    data.iter()
        .find(|item| item.output() == Some(OutputKind::CatFace.key()))
        .ok_or_else(|| anyhow::anyhow!("Pipeline data holds no cat face item"))
}

fn face_raster(data: &[PipelineData]) -> Result<(&PipelineData, Raster)> {
    let face = face_item(data)?;
    Ok((face, Raster::from_dynamic(&face.image)))
}

/// Gaussian smoothing
pub struct GaussianStep {
    pub kernel: u32,
    pub sigma: f32,
}

impl PipelineStep for GaussianStep {
    fn process(&self, mut data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let (face, raster) = face_raster(&data)?;
        let blurred = filters::gaussian(&raster, self.kernel, self.sigma)?;
        let item = face.derived(blurred.into_dynamic()).with_output(OutputKind::Gaussian.key());
        data.push(item);
        Ok(data)
    }

    fn name(&self) -> &str {
        "Gaussian Filter"
    }
}

/// Laplacian edge map
pub struct LaplacianStep {
    pub kernel: u32,
}

impl PipelineStep for LaplacianStep {
    fn process(&self, mut data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let (face, raster) = face_raster(&data)?;
        let edges = filters::laplacian_edges(&raster, self.kernel)?;
        let item = face
            .derived(DynamicImage::ImageLuma8(edges))
            .with_output(OutputKind::Laplacian.key());
        data.push(item);
        Ok(data)
    }

    fn name(&self) -> &str {
        "Laplacian Edges"
    }
}

/// Sobel gradient magnitude; the mean direction is kept as metadata
pub struct GradientStep;

impl PipelineStep for GradientStep {
    fn process(&self, mut data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let (face, raster) = face_raster(&data)?;
        let gradient = filters::gradient(&raster)?;

        let directions = gradient.direction.as_raw();
        let mean_direction = if directions.is_empty() {
            0.0
        } else {
            directions.iter().map(|&d| d as f64).sum::<f64>() / directions.len() as f64
        };

        let item = face
            .derived(DynamicImage::ImageLuma8(gradient.magnitude))
            .with_output(OutputKind::GradientMagnitude.key())
            .with_metadata("mean_direction", MetadataValue::Float(mean_direction));
        data.push(item);
        Ok(data)
    }

    fn name(&self) -> &str {
        "Gradient Analysis"
    }
}

/// Edge-preserving bilateral smoothing
pub struct BilateralStep {
    pub diameter: u32,
    pub sigma_color: f32,
    pub sigma_space: f32,
}

impl PipelineStep for BilateralStep {
    fn process(&self, mut data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let (face, raster) = face_raster(&data)?;
        let smoothed = filters::bilateral(&raster, self.diameter, self.sigma_color, self.sigma_space)?;
        let item = face.derived(smoothed.into_dynamic()).with_output(OutputKind::Bilateral.key());
        data.push(item);
        Ok(data)
    }

    fn name(&self) -> &str {
        "Bilateral Filter"
    }
}

/// Median / min / max rank filter
pub struct OrderStatisticStep {
    pub kernel: u32,
    pub kind: OrderStatistic,
}

impl PipelineStep for OrderStatisticStep {
    fn process(&self, mut data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let (face, raster) = face_raster(&data)?;
        let filtered = filters::order_statistic(&raster, self.kernel, self.kind)?;
        let item = face
            .derived(filtered.into_dynamic())
            .with_output(OutputKind::OrderStatistic.key())
            .with_metadata("order_kind", MetadataValue::String(self.kind.to_string()));
        data.push(item);
        Ok(data)
    }

    fn name(&self) -> &str {
        "Order Statistic Filter"
    }
}

/// High-boost sharpening
pub struct HighBoostStep {
    pub k: f32,
}

impl PipelineStep for HighBoostStep {
    fn process(&self, mut data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let (face, raster) = face_raster(&data)?;
        let boosted = filters::high_boost(&raster, self.k)?;
        let item = face
            .derived(DynamicImage::ImageRgb8(boosted))
            .with_output(OutputKind::HighBoost.key());
        data.push(item);
        Ok(data)
    }

    fn name(&self) -> &str {
        "High Boost Filter"
    }
}

/// Symmetry analysis - appends the annotated overlay and both halves
pub struct SymmetryStep;

impl PipelineStep for SymmetryStep {
    fn process(&self, mut data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let (face, raster) = face_raster(&data)?;
        let result = symmetry::analyze(&raster)?;
        debug!(score = result.score, level = result.level().label(), "Symmetry step finished");

        let tag = |item: PipelineData, kind: OutputKind| {
            item.with_output(kind.key())
                .with_metadata(SCORE_KEY, MetadataValue::Float(result.score))
                .with_metadata(MEAN_DIFFERENCE_KEY, MetadataValue::Float(result.mean_difference))
                .with_metadata(CENTER_KEY, MetadataValue::Int(result.center as i64))
        };

        let items = vec![
            tag(face.derived(DynamicImage::ImageRgb8(result.annotated.clone())), OutputKind::Symmetry),
            tag(face.derived(DynamicImage::ImageRgb8(result.left_half.clone())), OutputKind::LeftHalf),
            tag(face.derived(DynamicImage::ImageRgb8(result.right_half.clone())), OutputKind::RightHalf),
        ];
        data.extend(items);
        Ok(data)
    }

    fn name(&self) -> &str {
        "Symmetry Analysis"
    }
}
