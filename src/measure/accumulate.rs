use crate::audio::block::AudioBlock;

use super::finalize::{linear_rms_of, stereo_pct_of};
use super::reduce::reduce_frames;

/// Linear aggregates carried across blocks of one analysis run.
///
/// Everything is accumulated in `f64`: a two hour source at 44.1kHz is
/// around 3e8 frames, far past what an `f32` running sum can resolve.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunningAggregate {
    pub sum_sq_mono: f64,
    pub peak_abs: f64,
    pub sum_sq_mid: f64,
    pub sum_sq_side: f64,
    pub frame_count: u64,
}

impl RunningAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accumulate(&mut self, block: &AudioBlock) {
        let mut sum_sq_mono = 0.0f64;
        let mut sum_sq_mid = 0.0f64;
        let mut sum_sq_side = 0.0f64;
        let mut peak = self.peak_abs;

        for frame in reduce_frames(block) {
            sum_sq_mono += frame.mono * frame.mono;
            sum_sq_mid += frame.mid * frame.mid;
            sum_sq_side += frame.side * frame.side;
            peak = peak.max(frame.mono.abs());
        }

        self.sum_sq_mono += sum_sq_mono;
        self.sum_sq_mid += sum_sq_mid;
        self.sum_sq_side += sum_sq_side;
        self.peak_abs = peak;
        self.frame_count += block.frames() as u64;
    }

    /// Folds another aggregate in, as if its blocks had followed ours.
    pub fn merge(&mut self, other: &RunningAggregate) {
        self.sum_sq_mono += other.sum_sq_mono;
        self.sum_sq_mid += other.sum_sq_mid;
        self.sum_sq_side += other.sum_sq_side;
        self.peak_abs = self.peak_abs.max(other.peak_abs);
        self.frame_count += other.frame_count;
    }
}

/// Per-window tallies for mean-of-window pooling: the average of each
/// window's own linear RMS and stereo percentage, unweighted by length.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChunkMeans {
    pub rms_sum: f64,
    pub stereo_pct_sum: f64,
    pub windows: u64,
}

impl ChunkMeans {
    /// Records one window. Empty windows carry no level and are ignored.
    pub fn record(&mut self, window: &RunningAggregate) {
        if let Some(rms) = linear_rms_of(window) {
            self.rms_sum += rms;
            self.stereo_pct_sum += stereo_pct_of(window);
            self.windows += 1;
        }
    }

    pub fn mean_rms(&self) -> Option<f64> {
        (self.windows > 0).then(|| self.rms_sum / self.windows as f64)
    }

    pub fn mean_stereo_pct(&self) -> Option<f64> {
        (self.windows > 0).then(|| self.stereo_pct_sum / self.windows as f64)
    }
}
