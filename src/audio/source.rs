use thiserror::Error;

use super::block::AudioBlock;

/// Failure reported by an [`AudioSource`] while opening or reading.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Unsupported source: {0}")]
    Unsupported(String),
}

/// Decoded PCM provider consumed by the streaming controller.
///
/// A source supports two access patterns: everything at once, or
/// `read_window(start, max_frames)` which returns at most `max_frames`
/// frames beginning at `start` and fewer once the stream ends.
pub trait AudioSource {
    fn sample_rate(&self) -> u32;

    fn channels(&self) -> usize;

    /// Total frames, when the container reports it.
    fn total_frames(&self) -> Option<u64>;

    /// Size of the encoded data in bytes. Drives the whole-buffer/chunked
    /// decision.
    fn byte_len(&self) -> u64;

    fn read_all(&mut self) -> Result<AudioBlock, SourceError>;

    fn read_window(&mut self, start: u64, max_frames: usize) -> Result<AudioBlock, SourceError>;
}

/// Source over an already decoded block.
pub struct MemorySource {
    block: AudioBlock,
    sample_rate: u32,
}

impl MemorySource {
    pub fn new(block: AudioBlock, sample_rate: u32) -> Self {
        Self { block, sample_rate }
    }
}

impl AudioSource for MemorySource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> usize {
        self.block.channels()
    }

    fn total_frames(&self) -> Option<u64> {
        Some(self.block.frames() as u64)
    }

    fn byte_len(&self) -> u64 {
        (self.block.frames() * self.block.channels() * std::mem::size_of::<f32>()) as u64
    }

    fn read_all(&mut self) -> Result<AudioBlock, SourceError> {
        Ok(self.block.clone())
    }

    fn read_window(&mut self, start: u64, max_frames: usize) -> Result<AudioBlock, SourceError> {
        let start = usize::try_from(start)
            .map_err(|_| SourceError::Unsupported(format!("frame offset {} out of range", start)))?;
        Ok(self.block.slice_frames(start, max_frames))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_cover_block_and_shrink_at_end() {
        let mut source = MemorySource::new(AudioBlock::new((0..10).map(|i| i as f32).collect(), 1), 8000);
        assert_eq!(source.total_frames(), Some(10));
        assert_eq!(source.byte_len(), 40);

        let first = source.read_window(0, 4).unwrap();
        let last = source.read_window(8, 4).unwrap();
        let past = source.read_window(12, 4).unwrap();
        assert_eq!(first.frames(), 4);
        assert_eq!(last.frames(), 2);
        assert!(past.is_empty());
    }
}
