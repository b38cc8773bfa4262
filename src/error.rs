use std::path::PathBuf;
use thiserror::Error;

/// Failure taxonomy for one analysis round trip. All three collapse to
/// the same generic banner in the UI; the detail is for the log only.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("no provider credential configured (set GEMINI_API_KEY)")]
    Configuration,

    #[error("analysis service call failed: {0}")]
    Service(String),

    #[error("analysis response failed validation: {0}")]
    Validation(String),
}

/// Failures while producing an export artifact. These never touch the
/// analysis session state; the UI surfaces them as a blocking alert.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("PDF assembly failed: {0}")]
    Pdf(String),
}
