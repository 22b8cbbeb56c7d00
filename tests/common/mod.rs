mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from catsym for tests
pub use catsym::{
    AnalysisError, CatFaceProcessor, FaceLocator, FaceRegion, FilterSettings, FullFrameLocator,
    OutputKind, ProcessedImages, Raster, SymmetryLevel, SymmetryResult, analyze,
};
