use thiserror::Error;

/// Errors raised by the analysis and filter functions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
