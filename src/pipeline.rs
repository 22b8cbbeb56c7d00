use image::DynamicImage;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use anyhow::Result;
use tracing::{debug, info};

/// Metadata key naming which output an item represents
pub const OUTPUT_KEY: &str = "output";

/// Bounding box in the source image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Data that flows through the pipeline
/// Each PipelineData is one image produced along the way, tagged with metadata
#[derive(Clone)]
pub struct PipelineData {
    /// The image data (can be grayscale or color)
    pub image: DynamicImage,

    /// Reference to the image the pipeline started from (shared via Arc)
    pub original: Arc<DynamicImage>,

    /// Region of the source photo this item was cut from (None means full image)
    pub bbox: Option<BoundingBox>,

    /// Metadata for tracking properties (e.g., "output", "symmetry_score")
    pub metadata: HashMap<String, MetadataValue>,
}

/// Metadata value types
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    Float(f64),
    String(String),
    Int(i64),
}

impl PipelineData {
    /// Create PipelineData for a full image
    pub fn from_image(image: DynamicImage) -> Self {
        let original = Arc::new(image.clone());
        Self {
            image,
            original,
            bbox: None,
            metadata: HashMap::new(),
        }
    }

    /// Create PipelineData derived from another item, sharing its source image
    pub fn derived(&self, image: DynamicImage) -> Self {
        Self {
            image,
            original: self.original.clone(),
            bbox: self.bbox,
            metadata: HashMap::new(),
        }
    }

    /// Add metadata
    pub fn with_metadata(mut self, key: impl Into<String>, value: MetadataValue) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Tag this item with the name of the output it represents
    pub fn with_output(self, key: &str) -> Self {
        self.with_metadata(OUTPUT_KEY, MetadataValue::String(key.to_string()))
    }

    /// Output name, if the item was tagged
    pub fn output(&self) -> Option<&str> {
        self.get_string(OUTPUT_KEY)
    }

    /// Get metadata as float
    pub fn get_float(&self, key: &str) -> Option<f64> {
        match self.metadata.get(key) {
            Some(MetadataValue::Float(v)) => Some(*v),
            _ => None,
        }
    }

    /// Get metadata as string
    pub fn get_string(&self, key: &str) -> Option<&str> {
        match self.metadata.get(key) {
            Some(MetadataValue::String(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    /// Get metadata as integer
    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.metadata.get(key) {
            Some(MetadataValue::Int(v)) => Some(*v),
            _ => None,
        }
    }
}

/// Debug configuration for pipeline execution
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Root directory for debug outputs
    pub output_dir: PathBuf,
}

/// Context available to all pipeline steps
#[derive(Clone, Debug, Default)]
pub struct PipelineContext {
    pub verbose: bool,
    pub debug: Option<DebugConfig>,
}

impl PipelineContext {
    fn debug_dir(&self) -> Option<&Path> {
        self.debug.as_ref().map(|config| config.output_dir.as_path())
    }
}

/// Trait that all pipeline steps must implement
pub trait PipelineStep: Send + Sync {
    /// Process data and return transformed data
    /// Steps can split data (1 → many), filter (many → fewer), or append (many → more)
    fn process(&self, data: Vec<PipelineData>, context: &PipelineContext) -> Result<Vec<PipelineData>>;

    /// Human-readable name for this step (used in logs and debug directories)
    fn name(&self) -> &str;
}

/// Composable pipeline builder
pub struct Pipeline {
    steps: Vec<Arc<dyn PipelineStep>>,
    context: PipelineContext,
}

impl Pipeline {
    /// Create a new empty pipeline
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            context: PipelineContext::default(),
        }
    }

    /// Enable verbose output
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.context.verbose = verbose;
        self
    }

    /// Enable debug mode with output directory
    /// The directory must be empty or non-existent
    pub fn with_debug(mut self, output_dir: PathBuf) -> Result<Self> {
        if output_dir.exists() {
            let entries = std::fs::read_dir(&output_dir)?;
            if entries.count() > 0 {
                return Err(anyhow::anyhow!(
                    "Debug directory is not empty: {}",
                    output_dir.display()
                ));
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }

        self.context.debug = Some(DebugConfig { output_dir });

        Ok(self)
    }

    /// Add a processing step to the pipeline
    pub fn add_step(mut self, step: Arc<dyn PipelineStep>) -> Self {
        self.steps.push(step);
        self
    }

    /// Helper method to add a step from a Box (for convenience)
    pub fn add_step_boxed(mut self, step: Box<dyn PipelineStep>) -> Self {
        self.steps.push(Arc::from(step));
        self
    }

    /// Names of the configured steps, in order
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|step| step.name()).collect()
    }

    /// Run every step sequentially, starting from `initial`
    pub fn run(&self, initial: Vec<PipelineData>) -> Result<Vec<PipelineData>> {
        self.run_partial(initial, self.steps.len())
    }

    /// Run the pipeline but stop after `num_steps` steps (useful for debugging)
    pub fn run_partial(&self, initial: Vec<PipelineData>, num_steps: usize) -> Result<Vec<PipelineData>> {
        if let Some(dir) = self.context.debug_dir() {
            save_debug_images(&dir.join("00_input"), &initial)?;
            debug!("Debug: saved 00_input/");
        }

        let mut data = initial;

        for (step_idx, step) in self.steps.iter().take(num_steps).enumerate() {
            let step_name = step.name();
            if self.context.verbose {
                info!(step = step_name, items = data.len(), "Running step");
            } else {
                debug!(step = step_name, items = data.len(), "Running step");
            }

            data = step.process(data, &self.context)?;

            if let Some(dir) = self.context.debug_dir() {
                let step_dir_name = format!("{:02}_{}", step_idx + 1,
                    step_name.to_lowercase().replace(' ', "_"));
                save_debug_images(&dir.join(&step_dir_name), &data)?;
                debug!("Debug: saved {} images to {}/", data.len(), step_dir_name);
            }

            debug!(step = step_name, items = data.len(), "Step finished");
        }

        Ok(data)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Write every item as `NN.png`, or `NN_<output>.png` when tagged
fn save_debug_images(dir: &Path, data: &[PipelineData]) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    for (idx, item) in data.iter().enumerate() {
        let filename = match item.output() {
            Some(key) => format!("{:02}_{}.png", idx + 1, key),
            None => format!("{:02}.png", idx + 1),
        };
        item.image.save(dir.join(&filename))
            .map_err(|e| anyhow::anyhow!("Failed to save debug image: {}", e))?;
    }
    Ok(())
}
