/// Interleaved `channels × frames` buffer of samples in [-1.0, 1.0].
///
/// Blocks are transient: a source hands one out, the controller folds it
/// into the running aggregate and drops it.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioBlock {
    samples: Vec<f32>,
    channels: usize,
}

impl AudioBlock {
    /// Wraps interleaved samples. A trailing partial frame is discarded.
    pub fn new(mut samples: Vec<f32>, channels: usize) -> Self {
        let channels = channels.max(1);
        let whole = samples.len() / channels * channels;
        samples.truncate(whole);
        Self { samples, channels }
    }

    pub fn silence(channels: usize, frames: usize) -> Self {
        let channels = channels.max(1);
        Self {
            samples: vec![0.0; channels * frames],
            channels,
        }
    }

    /// Builds a block from one `Vec` per channel. Channels are cut to the
    /// shortest one.
    pub fn from_planar(planes: &[Vec<f32>]) -> Self {
        let channels = planes.len().max(1);
        let frames = planes.iter().map(Vec::len).min().unwrap_or(0);
        let mut samples = Vec::with_capacity(channels * frames);
        for i in 0..frames {
            for plane in planes {
                samples.push(plane[i]);
            }
        }
        Self { samples, channels }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter_frames(&self) -> std::slice::ChunksExact<'_, f32> {
        self.samples.chunks_exact(self.channels)
    }

    /// Copy of frames `start..start + len`, clamped to the block end.
    pub fn slice_frames(&self, start: usize, len: usize) -> AudioBlock {
        let start = start.min(self.frames());
        let end = (start + len).min(self.frames());
        AudioBlock {
            samples: self.samples[start * self.channels..end * self.channels].to_vec(),
            channels: self.channels,
        }
    }
}
