//! Error taxonomy for the analysis pipeline.
//!
//! Every per-document failure is one of these variants. The batch driver
//! converts them into error outcomes at the task boundary, so none of them
//! aborts a run.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Connection failure, timeout, non-2xx status or an undecodable body
    /// from the inference backend.
    #[error("inference backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The document contains only whitespace.
    #[error("document is empty")]
    EmptyDocument,

    /// A schema-constrained response did not match the expected shape.
    #[error("malformed structured output: {0}")]
    MalformedStructuredOutput(String),

    #[error("I/O error on {}: {source}", path.display())]
    DocumentIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AnalysisError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AnalysisError::DocumentIo {
            path: path.into(),
            source,
        }
    }
}
