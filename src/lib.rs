//! Streaming loudness, peak and stereo measurement for long recordings.
//!
//! Sources below a size threshold are decoded into one buffer; larger ones
//! are read as fixed windows and folded into a running aggregate, so memory
//! stays bounded no matter how long the recording is.

pub mod advice;
pub mod audio;
pub mod config;
pub mod error;
pub mod measure;
pub mod report;
pub mod separate;

pub use error::AnalysisError;
pub use measure::finalize::Measurement;
pub use measure::stream::{
    analyze_file, Analysis, AnalysisMode, AnalysisSettings, CancelToken, ProgressSink, StreamingController,
};
