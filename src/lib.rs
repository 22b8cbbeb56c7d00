pub mod config;
pub mod drawing;
pub mod error;
pub mod gallery;
pub mod pipeline;
pub mod processing;
pub mod raster;
pub mod report;
pub mod symmetry;

pub use config::FilterSettings;
pub use error::AnalysisError;
pub use pipeline::{
    BoundingBox, DebugConfig, MetadataValue, Pipeline, PipelineContext, PipelineData, PipelineStep,
};
pub use processing::face::{FaceLocator, FaceRegion, FullFrameLocator, SeetaFaceLocator};
pub use processing::{CatFaceProcessor, OutputKind, ProcessedImages};
pub use raster::Raster;
pub use report::SymmetryReport;
pub use symmetry::{SymmetryLevel, SymmetryResult, analyze};
