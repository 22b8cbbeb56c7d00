pub mod face;
pub mod filters;
pub mod steps;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use image::{DynamicImage, ImageReader, RgbImage};
use tracing::{debug, info};

use crate::config::FilterSettings;
use crate::pipeline::{BoundingBox, Pipeline, PipelineData};
use crate::raster::Raster;
use crate::report::SymmetryReport;
use crate::symmetry::SymmetryResult;
use face::{FaceLocator, FaceRegion, extract_face};
use steps::*;

/// Every image the processor produces, by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputKind {
    Original,
    FaceDetection,
    CatFace,
    Gaussian,
    Laplacian,
    GradientMagnitude,
    Bilateral,
    OrderStatistic,
    HighBoost,
    Symmetry,
    LeftHalf,
    RightHalf,
}

impl OutputKind {
    pub const ALL: [OutputKind; 12] = [
        OutputKind::Original,
        OutputKind::FaceDetection,
        OutputKind::CatFace,
        OutputKind::Gaussian,
        OutputKind::Laplacian,
        OutputKind::GradientMagnitude,
        OutputKind::Bilateral,
        OutputKind::OrderStatistic,
        OutputKind::HighBoost,
        OutputKind::Symmetry,
        OutputKind::LeftHalf,
        OutputKind::RightHalf,
    ];

    /// The process images shown side by side in the contact sheet
    pub const PROCESS: [OutputKind; 7] = [
        OutputKind::CatFace,
        OutputKind::Gaussian,
        OutputKind::Laplacian,
        OutputKind::GradientMagnitude,
        OutputKind::Bilateral,
        OutputKind::OrderStatistic,
        OutputKind::HighBoost,
    ];

    /// Stable identifier, used for metadata and file names
    pub fn key(&self) -> &'static str {
        match self {
            OutputKind::Original => "original",
            OutputKind::FaceDetection => "face_detection",
            OutputKind::CatFace => "cat_face",
            OutputKind::Gaussian => "gaussian_filter",
            OutputKind::Laplacian => "laplacian_edges",
            OutputKind::GradientMagnitude => "gradient_magnitude",
            OutputKind::Bilateral => "bilateral_filter",
            OutputKind::OrderStatistic => "order_statistic_filter",
            OutputKind::HighBoost => "high_boost_filter",
            OutputKind::Symmetry => "symmetry",
            OutputKind::LeftHalf => "left_half",
            OutputKind::RightHalf => "right_half",
        }
    }

    /// Display title
    pub fn title(&self) -> &'static str {
        match self {
            OutputKind::Original => "Original",
            OutputKind::FaceDetection => "Face Detection",
            OutputKind::CatFace => "Original",
            OutputKind::Gaussian => "Gaussian Filter",
            OutputKind::Laplacian => "Laplacian Edges",
            OutputKind::GradientMagnitude => "Gradient Magnitude",
            OutputKind::Bilateral => "Bilateral Filter",
            OutputKind::OrderStatistic => "Order-Statistic Filter",
            OutputKind::HighBoost => "High-Boost Filter",
            OutputKind::Symmetry => "Symmetry Line",
            OutputKind::LeftHalf => "Left Half",
            OutputKind::RightHalf => "Right Half",
        }
    }
}

/// Build the standard filter bank + symmetry pipeline
pub fn build_standard_pipeline(settings: &FilterSettings, verbose: bool) -> Pipeline {
    Pipeline::new()
        .with_verbose(verbose)
        .add_step(Arc::new(GaussianStep {
            kernel: settings.gaussian_kernel,
            sigma: settings.gaussian_sigma,
        }))
        .add_step(Arc::new(LaplacianStep {
            kernel: settings.laplacian_kernel,
        }))
        .add_step(Arc::new(GradientStep))
        .add_step(Arc::new(BilateralStep {
            diameter: settings.bilateral_diameter,
            sigma_color: settings.bilateral_sigma_color,
            sigma_space: settings.bilateral_sigma_space,
        }))
        .add_step(Arc::new(OrderStatisticStep {
            kernel: settings.order_kernel,
            kind: settings.order_kind,
        }))
        .add_step(Arc::new(HighBoostStep {
            k: settings.high_boost_k,
        }))
        .add_step(Arc::new(SymmetryStep))
}

/// Everything produced for one input image
#[derive(Debug, Clone)]
pub struct ProcessedImages {
    pub original: DynamicImage,
    pub face_detection: DynamicImage,
    pub cat_face: DynamicImage,
    pub gaussian: DynamicImage,
    pub laplacian: DynamicImage,
    pub gradient_magnitude: DynamicImage,
    pub bilateral: DynamicImage,
    pub order_statistic: DynamicImage,
    pub high_boost: DynamicImage,
    pub symmetry: SymmetryResult,
    pub face_region: Option<FaceRegion>,
}

impl ProcessedImages {
    /// Collect the tagged pipeline outputs
    pub fn from_outputs(outputs: Vec<PipelineData>, face_region: Option<FaceRegion>) -> Result<Self> {
        let mut by_key: HashMap<String, PipelineData> = outputs
            .into_iter()
            .filter_map(|item| {
                let key = item.output()?.to_string();
                Some((key, item))
            })
            .collect();

        let mut take = |kind: OutputKind| {
            by_key
                .remove(kind.key())
                .ok_or_else(|| anyhow::anyhow!("Pipeline produced no '{}' output", kind.key()))
        };

        let annotated = take(OutputKind::Symmetry)?;
        let score = annotated
            .get_float(SCORE_KEY)
            .ok_or_else(|| anyhow::anyhow!("Missing {}", SCORE_KEY))?;
        let mean_difference = annotated
            .get_float(MEAN_DIFFERENCE_KEY)
            .ok_or_else(|| anyhow::anyhow!("Missing {}", MEAN_DIFFERENCE_KEY))?;
        let center = annotated
            .get_int(CENTER_KEY)
            .ok_or_else(|| anyhow::anyhow!("Missing {}", CENTER_KEY))? as u32;

        let symmetry = SymmetryResult {
            annotated: annotated.image.to_rgb8(),
            score,
            mean_difference,
            center,
            left_half: take(OutputKind::LeftHalf)?.image.to_rgb8(),
            right_half: take(OutputKind::RightHalf)?.image.to_rgb8(),
        };

        Ok(Self {
            original: take(OutputKind::Original)?.image,
            face_detection: take(OutputKind::FaceDetection)?.image,
            cat_face: take(OutputKind::CatFace)?.image,
            gaussian: take(OutputKind::Gaussian)?.image,
            laplacian: take(OutputKind::Laplacian)?.image,
            gradient_magnitude: take(OutputKind::GradientMagnitude)?.image,
            bilateral: take(OutputKind::Bilateral)?.image,
            order_statistic: take(OutputKind::OrderStatistic)?.image,
            high_boost: take(OutputKind::HighBoost)?.image,
            symmetry,
            face_region,
        })
    }

    /// Image for `kind`, converted for display where needed
    pub fn image(&self, kind: OutputKind) -> DynamicImage {
        match kind {
            OutputKind::Original => self.original.clone(),
            OutputKind::FaceDetection => self.face_detection.clone(),
            OutputKind::CatFace => self.cat_face.clone(),
            OutputKind::Gaussian => self.gaussian.clone(),
            OutputKind::Laplacian => self.laplacian.clone(),
            OutputKind::GradientMagnitude => self.gradient_magnitude.clone(),
            OutputKind::Bilateral => self.bilateral.clone(),
            OutputKind::OrderStatistic => self.order_statistic.clone(),
            OutputKind::HighBoost => self.high_boost.clone(),
            OutputKind::Symmetry => DynamicImage::ImageRgb8(self.symmetry.annotated.clone()),
            OutputKind::LeftHalf => DynamicImage::ImageRgb8(self.symmetry.left_half.clone()),
            OutputKind::RightHalf => DynamicImage::ImageRgb8(self.symmetry.right_half.clone()),
        }
    }

    /// The seven titled process images, in display order
    pub fn process_images(&self) -> Vec<(&'static str, DynamicImage)> {
        OutputKind::PROCESS
            .iter()
            .map(|kind| (kind.title(), self.image(*kind)))
            .collect()
    }

    /// Left and right halves composed next to each other
    pub fn halves(&self) -> RgbImage {
        self.symmetry.halves_side_by_side(10)
    }

    /// Write every output as `<key>.png` into `dir`
    pub fn save_all(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

        let mut written = Vec::new();
        for kind in OutputKind::ALL {
            let path = dir.join(format!("{}.png", kind.key()));
            self.image(kind)
                .save(&path)
                .map_err(|e| anyhow::anyhow!("Failed to save {}: {}", path.display(), e))?;
            written.push(path);
        }
        Ok(written)
    }

    pub fn report(&self, source: Option<&Path>) -> SymmetryReport {
        SymmetryReport::new(self, source)
    }
}

/// Runs face location, the filter bank and symmetry analysis on images.
///
/// The face locator is owned by the processor and reused for every image.
pub struct CatFaceProcessor {
    locator: Box<dyn FaceLocator>,
    settings: FilterSettings,
    verbose: bool,
    debug_dir: Option<PathBuf>,
}

impl CatFaceProcessor {
    pub fn new(locator: Box<dyn FaceLocator>) -> Self {
        Self {
            locator,
            settings: FilterSettings::default(),
            verbose: false,
            debug_dir: None,
        }
    }

    pub fn with_settings(mut self, settings: FilterSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Dump every pipeline step into `dir`, which must be empty or absent
    /// when the next image is processed
    pub fn with_debug(mut self, dir: PathBuf) -> Self {
        self.debug_dir = Some(dir);
        self
    }

    pub fn settings(&self) -> &FilterSettings {
        &self.settings
    }

    /// Decode `path` and process it
    pub fn process_file<P: AsRef<Path>>(&mut self, path: P) -> Result<ProcessedImages> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading image");
        let img = ImageReader::open(path)
            .with_context(|| format!("Could not open image {}", path.display()))?
            .with_guessed_format()?
            .decode()
            .map_err(|e| anyhow::anyhow!("Failed to decode image {}: {}", path.display(), e))?;
        self.process(img)
    }

    /// Locate the face, run the filter bank and analyze symmetry
    pub fn process(&mut self, image: DynamicImage) -> Result<ProcessedImages> {
        let raster = Raster::from_dynamic(&image);
        raster.ensure_non_empty()?;
        debug!(width = image.width(), height = image.height(), "Processing image");

        let regions = self.locator.locate(&raster.to_gray())?;
        if regions.len() > 1 {
            debug!(count = regions.len(), "Several faces found, using the first");
        }
        let region = regions.first().copied();
        info!(locator = self.locator.name(), found = region.is_some(), "Face location finished");

        let crop = extract_face(&image, region, self.settings.face_margin, self.settings.face_scale)?;

        let source = PipelineData::from_image(image).with_output(OutputKind::Original.key());
        let marked = source
            .derived(DynamicImage::ImageRgb8(crop.marked))
            .with_output(OutputKind::FaceDetection.key());
        let mut face = source.derived(crop.face).with_output(OutputKind::CatFace.key());
        face.bbox = crop.region.map(|r| BoundingBox {
            x: r.x,
            y: r.y,
            width: r.width,
            height: r.height,
        });

        let mut pipeline = build_standard_pipeline(&self.settings, self.verbose);
        if let Some(dir) = &self.debug_dir {
            pipeline = pipeline.with_debug(dir.clone())?;
        }

        let outputs = pipeline.run(vec![source, marked, face])?;
        ProcessedImages::from_outputs(outputs, crop.region)
    }
}
