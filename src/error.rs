//! Error types for a measurement run

use thiserror::Error;

/// Terminal failure of one analysis run. No partial measurement is ever
/// returned alongside any of these.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The source could not be decoded or cannot be read the way the
    /// selected mode requires
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The source stopped delivering data before the run consumed it
    #[error("Incomplete source at window {window}: {reason}")]
    IncompleteSource { window: u64, reason: String },

    /// The source has zero frames
    #[error("Source contains no audio frames")]
    EmptySource,

    /// The caller cancelled the run between windows
    #[error("Analysis cancelled")]
    Cancelled,

    /// `run` was called on a controller that already finished
    #[error("Controller has already run")]
    AlreadyRun,
}
