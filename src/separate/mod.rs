//! Instrument separation as an external capability
//!
//! The measurement engine never depends on this module. A [`Separator`]
//! turns a source file into named stems, which are then measured
//! independently with whole-buffer semantics.

pub mod demucs;

use rayon::prelude::*;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

use crate::audio::block::AudioBlock;
use crate::error::AnalysisError;
use crate::measure::finalize::{measure_block, Measurement};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StemKind {
    Drums,
    Bass,
    Other,
    Vocals,
}

impl StemKind {
    pub const ALL: [StemKind; 4] = [StemKind::Drums, StemKind::Bass, StemKind::Other, StemKind::Vocals];

    pub fn name(&self) -> &'static str {
        match self {
            StemKind::Drums => "drums",
            StemKind::Bass => "bass",
            StemKind::Other => "other",
            StemKind::Vocals => "vocals",
        }
    }
}

pub struct Stem {
    pub kind: StemKind,
    pub block: AudioBlock,
    pub sample_rate: u32,
}

#[derive(Error, Debug)]
pub enum SeparationError {
    #[error("Separation tool '{0}' is not installed")]
    Unavailable(String),

    #[error("Source is {size_mb:.0} MB, separation is limited to {limit_mb} MB")]
    TooLarge { size_mb: f64, limit_mb: u64 },

    #[error("Separation failed: {0}")]
    Failed(String),

    #[error("Failed to decode stem: {0}")]
    Decode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub trait Separator {
    fn separate(&self, path: &Path) -> Result<Vec<Stem>, SeparationError>;
}

/// Measures every stem. Stems are independent, so this runs in parallel.
pub fn measure_stems(stems: &[Stem]) -> Vec<(StemKind, Result<Measurement, AnalysisError>)> {
    stems
        .par_iter()
        .map(|stem| (stem.kind, measure_block(&stem.block, stem.sample_rate)))
        .collect()
}
