use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::path::Path;
use std::sync::Arc;

use crate::audio::decode::FileSource;
use crate::audio::source::{AudioSource, SourceError};
use crate::error::AnalysisError;

use super::accumulate::{ChunkMeans, RunningAggregate};
use super::finalize::{finalize, finalize_chunk_means, Measurement};

/// How a run ingests its source. Fixed for the lifetime of the run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    WholeBuffer,
    Chunked { chunk_frames: usize },
}

impl AnalysisMode {
    /// Sources below `threshold_bytes` of encoded data are read whole.
    pub fn select(byte_len: u64, threshold_bytes: u64, chunk_frames: usize) -> Self {
        if byte_len < threshold_bytes {
            AnalysisMode::WholeBuffer
        } else {
            AnalysisMode::Chunked {
                chunk_frames: chunk_frames.max(1),
            }
        }
    }
}

/// How per-window statistics combine in chunked mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum RmsPooling {
    /// True pooled RMS, `sqrt(total_sum_sq / total_frames)`. Identical to a
    /// whole-buffer read.
    #[default]
    Energy,
    /// Unweighted mean of per-window linear RMS and per-window stereo share.
    /// Matches results produced by earlier versions of the analyzer; drifts
    /// from the pooled value when window levels differ.
    ChunkMean,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisSettings {
    /// Encoded size at which ingestion switches to windows
    pub large_file_bytes: u64,
    pub chunk_seconds: f64,
    pub pooling: RmsPooling,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            large_file_bytes: 100 * 1024 * 1024,
            chunk_seconds: 30.0,
            pooling: RmsPooling::Energy,
        }
    }
}

impl AnalysisSettings {
    pub fn chunk_frames(&self, sample_rate: u32) -> usize {
        ((self.chunk_seconds * sample_rate as f64).round() as usize).max(1)
    }
}

/// Caller-owned cancellation flag, checked between windows.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Observer for run progress. The controller behaves identically with or
/// without one attached.
pub trait ProgressSink {
    /// `fraction` is monotonic within a run and lies in [0, 1].
    fn report(&mut self, fraction: f64, label: &str);

    /// Called once after the last window with `(processed, total)` windows.
    fn complete(&mut self, _processed: u64, _total: u64) {}
}

impl<F: FnMut(f64, &str)> ProgressSink for F {
    fn report(&mut self, fraction: f64, label: &str) {
        self(fraction, label)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Unopened,
    SizeChecked,
    WholeBufferRead,
    ChunkedRead,
    Finalized,
    Done,
    Failed,
}

/// Drives one analysis run: picks the mode, feeds blocks through the
/// accumulator and finalizes.
pub struct StreamingController<'a> {
    settings: AnalysisSettings,
    cancel: CancelToken,
    progress: Option<&'a mut dyn ProgressSink>,
    state: RunState,
    mode: Option<AnalysisMode>,
}

impl<'a> StreamingController<'a> {
    pub fn new(settings: AnalysisSettings, cancel: CancelToken) -> Self {
        Self {
            settings,
            cancel,
            progress: None,
            state: RunState::Unopened,
            mode: None,
        }
    }

    pub fn with_progress(mut self, sink: &'a mut dyn ProgressSink) -> Self {
        self.progress = Some(sink);
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn mode(&self) -> Option<AnalysisMode> {
        self.mode
    }

    /// Consumes `source`; it is dropped before this returns, on success and
    /// on every failure path. A controller runs once; later calls fail with
    /// [`AnalysisError::AlreadyRun`] and leave the state untouched.
    pub fn run<S: AudioSource>(&mut self, mut source: S) -> Result<Measurement, AnalysisError> {
        if self.state != RunState::Unopened {
            return Err(AnalysisError::AlreadyRun);
        }
        let result = self.drive(&mut source);
        drop(source);

        match &result {
            Ok(m) => {
                self.transition(RunState::Done);
                log::info!(
                    "Measured {:.1}s: rms {:.2} dB, peak {:.2} dB, crest {:.2} dB, stereo {:.1}%",
                    m.duration_s,
                    m.rms_db,
                    m.peak_db,
                    m.crest_db,
                    m.stereo_pct
                );
            }
            Err(e) => {
                self.transition(RunState::Failed);
                log::warn!("Analysis failed: {}", e);
            }
        }
        result
    }

    fn drive<S: AudioSource>(&mut self, source: &mut S) -> Result<Measurement, AnalysisError> {
        let sample_rate = source.sample_rate();
        if sample_rate == 0 {
            return Err(AnalysisError::UnsupportedFormat("sample rate is zero".into()));
        }
        if source.channels() == 0 {
            return Err(AnalysisError::UnsupportedFormat("source has no channels".into()));
        }

        let mode = AnalysisMode::select(
            source.byte_len(),
            self.settings.large_file_bytes,
            self.settings.chunk_frames(sample_rate),
        );
        self.mode = Some(mode);
        self.transition(RunState::SizeChecked);

        match mode {
            AnalysisMode::WholeBuffer => {
                log::info!(
                    "Whole-buffer analysis ({:.1} MB, {} channel(s))",
                    source.byte_len() as f64 / (1024.0 * 1024.0),
                    source.channels()
                );
                self.read_whole(source, sample_rate)
            }
            AnalysisMode::Chunked { chunk_frames } => {
                log::info!(
                    "Large source ({:.0} MB, {} channel(s)), analyzing in windows of {} frames",
                    source.byte_len() as f64 / (1024.0 * 1024.0),
                    source.channels(),
                    chunk_frames
                );
                self.read_chunked(source, sample_rate, chunk_frames)
            }
        }
    }

    fn read_whole<S: AudioSource>(
        &mut self,
        source: &mut S,
        sample_rate: u32,
    ) -> Result<Measurement, AnalysisError> {
        self.check_cancelled()?;
        self.transition(RunState::WholeBufferRead);

        let block = source.read_all().map_err(|e| read_failure(0, e))?;
        if block.is_empty() {
            return Err(AnalysisError::EmptySource);
        }

        let mut agg = RunningAggregate::new();
        agg.accumulate(&block);
        drop(block);

        self.report(1.0, "whole buffer");
        self.complete(1, 1);

        let measurement = finalize(agg, sample_rate)?;
        self.transition(RunState::Finalized);
        Ok(measurement)
    }

    fn read_chunked<S: AudioSource>(
        &mut self,
        source: &mut S,
        sample_rate: u32,
        chunk_frames: usize,
    ) -> Result<Measurement, AnalysisError> {
        let total_frames = source.total_frames().ok_or_else(|| {
            AnalysisError::UnsupportedFormat(
                "stream length unknown, cannot read in windows".into(),
            )
        })?;
        if total_frames == 0 {
            return Err(AnalysisError::EmptySource);
        }

        self.transition(RunState::ChunkedRead);

        let chunk = chunk_frames as u64;
        let total_windows = total_frames.div_ceil(chunk);
        let mut agg = RunningAggregate::new();
        let mut means = ChunkMeans::default();

        // Windows inside the reported length must be complete. Containers
        // that underestimate their length keep delivering past it, so reading
        // only stops at the first window shorter than a chunk.
        let mut window = 0u64;
        loop {
            self.check_cancelled()?;

            let start = window * chunk;
            let expected = chunk.min(total_frames.saturating_sub(start));
            let block = source
                .read_window(start, chunk_frames)
                .map_err(|e| read_failure(window, e))?;
            let got = block.frames() as u64;

            if got < expected {
                return Err(AnalysisError::IncompleteSource {
                    window,
                    reason: format!(
                        "expected {} frames at frame {}, got {}",
                        expected, start, got
                    ),
                });
            }
            if block.is_empty() {
                break;
            }

            let mut window_agg = RunningAggregate::new();
            window_agg.accumulate(&block);
            drop(block);

            means.record(&window_agg);
            agg.merge(&window_agg);
            window += 1;

            let shown = total_windows.max(window);
            log::debug!(
                "Window {}/{}: {} frames, peak {:.4}",
                window,
                shown,
                window_agg.frame_count,
                window_agg.peak_abs
            );

            let label = format!("window {}/{}", window, shown);
            self.report(window as f64 / total_windows as f64, &label);

            if got < chunk {
                break;
            }
        }

        if agg.frame_count != total_frames {
            log::warn!(
                "Source reported {} frames but delivered {}",
                total_frames,
                agg.frame_count
            );
        }
        self.complete(window, total_windows.max(window));

        let measurement = match self.settings.pooling {
            RmsPooling::Energy => finalize(agg, sample_rate)?,
            RmsPooling::ChunkMean => finalize_chunk_means(agg, &means, sample_rate)?,
        };
        self.transition(RunState::Finalized);
        Ok(measurement)
    }

    fn check_cancelled(&self) -> Result<(), AnalysisError> {
        if self.cancel.is_cancelled() {
            Err(AnalysisError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn transition(&mut self, next: RunState) {
        log::debug!("Run state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn report(&mut self, fraction: f64, label: &str) {
        if let Some(sink) = self.progress.as_deref_mut() {
            sink.report(fraction.clamp(0.0, 1.0), label);
        }
    }

    fn complete(&mut self, processed: u64, total: u64) {
        if let Some(sink) = self.progress.as_deref_mut() {
            sink.complete(processed, total);
        }
    }
}

/// Result of [`analyze_file`]: the measurement and how the file was read.
#[derive(Clone, Debug, PartialEq)]
pub struct Analysis {
    pub mode: AnalysisMode,
    pub measurement: Measurement,
}

/// Opens `path` with [`FileSource`] and runs one controller over it.
pub fn analyze_file(
    path: &Path,
    settings: AnalysisSettings,
    cancel: CancelToken,
    progress: Option<&mut dyn ProgressSink>,
) -> Result<Analysis, AnalysisError> {
    let source = FileSource::open(path).map_err(|e| {
        log::warn!("Cannot open {}: {}", path.display(), e);
        open_failure(e)
    })?;

    let mut controller = StreamingController::new(settings, cancel);
    if let Some(sink) = progress {
        controller = controller.with_progress(sink);
    }
    let measurement = controller.run(source)?;
    let mode = controller
        .mode()
        .ok_or_else(|| AnalysisError::UnsupportedFormat("no analysis mode was selected".into()))?;
    Ok(Analysis { mode, measurement })
}

fn open_failure(err: SourceError) -> AnalysisError {
    match err {
        SourceError::Io(e) => AnalysisError::IncompleteSource {
            window: 0,
            reason: e.to_string(),
        },
        SourceError::Decode(msg) | SourceError::Unsupported(msg) => AnalysisError::UnsupportedFormat(msg),
    }
}

fn read_failure(window: u64, err: SourceError) -> AnalysisError {
    match err {
        SourceError::Unsupported(msg) => AnalysisError::UnsupportedFormat(msg),
        other => AnalysisError::IncompleteSource {
            window,
            reason: other.to_string(),
        },
    }
}
