use serde::Serialize;

use crate::audio::block::AudioBlock;
use crate::error::AnalysisError;

use super::accumulate::{ChunkMeans, RunningAggregate};

/// Silence floor added before taking logarithms, so digital silence maps to
/// -200 dB instead of -inf.
pub const EPSILON: f64 = 1e-10;

/// Finalized result of one analysis run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Measurement {
    /// RMS level of the mono mixdown, dBFS
    pub rms_db: f64,
    /// Largest absolute mono sample, dBFS
    pub peak_db: f64,
    /// `peak_db - rms_db`, never negative
    pub crest_db: f64,
    /// Share of side energy in total mid+side energy, 0-100.
    /// 0 means both channels are identical, 100 means R = -L.
    /// This is not a phase-correlation coefficient.
    pub stereo_pct: f64,
    pub duration_s: f64,
}

pub fn to_db(linear: f64) -> f64 {
    20.0 * (linear + EPSILON).log10()
}

/// Frame-weighted RMS of the mono mixdown; `None` for an empty aggregate.
pub fn linear_rms_of(agg: &RunningAggregate) -> Option<f64> {
    (agg.frame_count > 0).then(|| (agg.sum_sq_mono / agg.frame_count as f64).sqrt())
}

pub fn stereo_pct_of(agg: &RunningAggregate) -> f64 {
    100.0 * agg.sum_sq_side / (agg.sum_sq_mid + agg.sum_sq_side + EPSILON)
}

pub fn finalize(agg: RunningAggregate, sample_rate: u32) -> Result<Measurement, AnalysisError> {
    let rms = linear_rms_of(&agg).ok_or(AnalysisError::EmptySource)?;
    Ok(build(rms, stereo_pct_of(&agg), &agg, sample_rate))
}

/// Like [`finalize`], but RMS and stereo share are the unweighted mean of
/// the per-window values in `means`. Peak and duration still come from the
/// pooled aggregate.
pub fn finalize_chunk_means(
    agg: RunningAggregate,
    means: &ChunkMeans,
    sample_rate: u32,
) -> Result<Measurement, AnalysisError> {
    if agg.frame_count == 0 {
        return Err(AnalysisError::EmptySource);
    }
    let rms = means.mean_rms().ok_or(AnalysisError::EmptySource)?;
    let stereo_pct = means.mean_stereo_pct().ok_or(AnalysisError::EmptySource)?;
    Ok(build(rms, stereo_pct, &agg, sample_rate))
}

/// Whole-buffer measurement of a single in-memory block.
pub fn measure_block(block: &AudioBlock, sample_rate: u32) -> Result<Measurement, AnalysisError> {
    let mut agg = RunningAggregate::new();
    agg.accumulate(block);
    finalize(agg, sample_rate)
}

fn build(rms: f64, stereo_pct: f64, agg: &RunningAggregate, sample_rate: u32) -> Measurement {
    let rms_db = to_db(rms);
    let peak_db = to_db(agg.peak_abs);
    Measurement {
        rms_db,
        peak_db,
        crest_db: (peak_db - rms_db).max(0.0),
        stereo_pct: stereo_pct.clamp(0.0, 100.0),
        duration_s: agg.frame_count as f64 / sample_rate as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn sine(freq: f64, amp: f64, sample_rate: u32, frames: usize) -> Vec<f32> {
        (0..frames)
            .map(|i| (amp * (2.0 * PI * freq * i as f64 / sample_rate as f64).sin()) as f32)
            .collect()
    }

    #[test]
    fn in_phase_stereo_sine() {
        let sr = 44100;
        let tone = sine(1000.0, 0.5, sr, 10 * sr as usize);
        let block = AudioBlock::from_planar(&[tone.clone(), tone]);
        let m = measure_block(&block, sr).unwrap();

        assert_eq!(m.stereo_pct, 0.0);
        assert!((m.peak_db - (-6.0206)).abs() < 0.01, "peak {}", m.peak_db);
        assert!((m.rms_db - (-9.0309)).abs() < 0.01, "rms {}", m.rms_db);
        assert!((m.crest_db - 3.0103).abs() < 0.01, "crest {}", m.crest_db);
        assert_eq!(m.duration_s, 10.0);
    }

    #[test]
    fn silence_hits_the_floor() {
        let m = measure_block(&AudioBlock::silence(2, 4410), 44100).unwrap();
        let floor = 20.0 * EPSILON.log10();
        assert!(m.rms_db.is_finite() && m.peak_db.is_finite());
        assert!((m.rms_db - floor).abs() < 1e-9);
        assert!((m.peak_db - floor).abs() < 1e-9);
        assert_eq!(m.crest_db, 0.0);
        assert_eq!(m.stereo_pct, 0.0);
    }

    #[test]
    fn mono_source_is_fully_centered() {
        let block = AudioBlock::new(sine(220.0, 0.8, 8000, 8000), 1);
        let m = measure_block(&block, 8000).unwrap();
        assert_eq!(m.stereo_pct, 0.0);
        assert_eq!(m.duration_s, 1.0);
    }

    #[test]
    fn out_of_phase_is_full_side() {
        // 100% here means all energy is side energy. A correlation meter
        // would read -1 for the same signal.
        let left = sine(440.0, 0.5, 8000, 8000);
        let right: Vec<f32> = left.iter().map(|s| -s).collect();
        let block = AudioBlock::from_planar(&[left, right]);

        let mut agg = RunningAggregate::new();
        agg.accumulate(&block);
        assert_eq!(agg.sum_sq_mid, 0.0);

        let m = finalize(agg, 8000).unwrap();
        assert!((m.stereo_pct - 100.0).abs() < 1e-6);
    }

    #[test]
    fn uncorrelated_channels_sit_near_half() {
        let left = sine(440.0, 0.5, 8000, 8000);
        let right = sine(613.0, 0.5, 8000, 8000);
        let m = measure_block(&AudioBlock::from_planar(&[left, right]), 8000).unwrap();
        assert!((m.stereo_pct - 50.0).abs() < 2.0, "stereo {}", m.stereo_pct);
    }

    #[test]
    fn empty_aggregate_is_an_error() {
        assert!(matches!(
            finalize(RunningAggregate::new(), 44100),
            Err(AnalysisError::EmptySource)
        ));
        assert!(matches!(
            finalize_chunk_means(RunningAggregate::new(), &ChunkMeans::default(), 44100),
            Err(AnalysisError::EmptySource)
        ));
    }

    #[test]
    fn finalize_is_deterministic() {
        let block = AudioBlock::new(sine(100.0, 0.3, 8000, 4000), 1);
        let mut agg = RunningAggregate::new();
        agg.accumulate(&block);
        assert_eq!(finalize(agg.clone(), 8000).unwrap(), finalize(agg, 8000).unwrap());
    }

    #[test]
    fn chunk_means_average_window_levels() {
        let mut agg = RunningAggregate::new();
        let mut means = ChunkMeans::default();
        for level in [0.1f32, 0.4] {
            let mut window = RunningAggregate::new();
            window.accumulate(&AudioBlock::new(vec![level; 100], 1));
            means.record(&window);
            agg.merge(&window);
        }

        let m = finalize_chunk_means(agg, &means, 100).unwrap();
        assert!((m.rms_db - to_db(0.25)).abs() < 1e-6);
        assert!((m.peak_db - to_db(0.4)).abs() < 1e-6);
        assert_eq!(m.duration_s, 2.0);
    }

    #[test]
    fn constant_level_has_zero_crest() {
        for step in 1..1000 {
            let level = step as f32 / 1000.0;
            let m = measure_block(&AudioBlock::new(vec![level; 257], 2), 48000).unwrap();
            assert!(m.crest_db >= 0.0, "level {} gave crest {}", level, m.crest_db);
            assert!(m.crest_db < 1e-9);
        }
    }
}
