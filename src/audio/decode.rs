use std::path::{Path, PathBuf};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::block::AudioBlock;
use super::source::{AudioSource, SourceError};

/// Symphonia-backed [`AudioSource`] over an encoded file.
///
/// Sequential `read_window` calls continue the decoder where the previous
/// window stopped. A non-sequential start seeks accurately and discards
/// frames up to the requested position.
pub struct FileSource {
    path: PathBuf,
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: u32,
    channels: usize,
    total_frames: Option<u64>,
    byte_len: u64,
    /// Frame index of `pending[0]`
    cursor: u64,
    /// Decoded interleaved samples not yet handed out
    pending: Vec<f32>,
    /// Set after a seek until the next packet tells us where we landed
    resync: bool,
    finished: bool,
    skipped_packets: usize,
}

impl FileSource {
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let file = std::fs::File::open(path)?;
        let byte_len = file.metadata()?.len();

        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(map_symphonia)?;

        let format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| SourceError::Unsupported("no audio tracks found".into()))?;

        let track_id = track.id;
        let params = track.codec_params.clone();
        let channels = params.channels.map_or(1, |c| c.count());
        let sample_rate = params
            .sample_rate
            .ok_or_else(|| SourceError::Unsupported("unknown sample rate".into()))?;

        let decoder = symphonia::default::get_codecs()
            .make(&params, &DecoderOptions::default())
            .map_err(map_symphonia)?;

        log::info!(
            "Opened {}: {}Hz, {} channel(s), {} frames, {:.1} MB",
            path.display(),
            sample_rate,
            channels,
            params
                .n_frames
                .map_or_else(|| "unknown".to_string(), |n| n.to_string()),
            byte_len as f64 / (1024.0 * 1024.0)
        );

        Ok(Self {
            path: path.to_path_buf(),
            format,
            decoder,
            track_id,
            sample_rate,
            channels,
            total_frames: params.n_frames,
            byte_len,
            cursor: 0,
            pending: Vec::new(),
            resync: false,
            finished: false,
            skipped_packets: 0,
        })
    }

    fn pending_frames(&self) -> u64 {
        (self.pending.len() / self.channels) as u64
    }

    /// Decodes the next packet of our track into `pending`.
    /// Returns `false` once the stream is exhausted.
    fn fill(&mut self) -> Result<bool, SourceError> {
        if self.finished {
            return Ok(false);
        }

        loop {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    self.finished = true;
                    return Ok(false);
                }
                Err(e) => return Err(map_symphonia(e)),
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(d) => d,
                Err(SymphoniaError::DecodeError(msg)) => {
                    self.skipped_packets += 1;
                    log::warn!("Skipping corrupt packet at ts {}: {}", packet.ts(), msg);
                    continue;
                }
                Err(e) => return Err(map_symphonia(e)),
            };

            let spec = *decoded.spec();
            if spec.channels.count() != self.channels {
                return Err(SourceError::Decode(format!(
                    "channel count changed mid-stream ({} -> {})",
                    self.channels,
                    spec.channels.count()
                )));
            }

            if self.resync && self.pending.is_empty() {
                self.cursor = packet.ts();
                self.resync = false;
            }

            let num_frames = decoded.frames();
            let mut sample_buf = SampleBuffer::<f32>::new(num_frames as u64, spec);
            sample_buf.copy_interleaved_ref(decoded);
            self.pending.extend_from_slice(sample_buf.samples());
            return Ok(true);
        }
    }

    fn seek_to(&mut self, start: u64) -> Result<(), SourceError> {
        let seeked = self
            .format
            .seek(
                SeekMode::Accurate,
                SeekTo::TimeStamp {
                    ts: start,
                    track_id: self.track_id,
                },
            )
            .map_err(map_symphonia)?;
        self.decoder.reset();
        self.pending.clear();
        self.cursor = seeked.actual_ts;
        self.resync = true;
        self.finished = false;
        log::debug!(
            "Seeked {} to frame {} (landed at {})",
            self.path.display(),
            start,
            seeked.actual_ts
        );
        Ok(())
    }

    /// Positions `cursor` at `start`, seeking only when the frame is not
    /// reachable from what is already decoded.
    fn position_at(&mut self, start: u64) -> Result<(), SourceError> {
        let reachable = start >= self.cursor && start <= self.cursor + self.pending_frames();
        if !reachable {
            self.seek_to(start)?;
        }

        loop {
            if self.resync && !self.fill()? {
                return Ok(());
            }
            let available = self.pending_frames();
            if self.cursor + available > start || (self.cursor >= start && !self.resync) {
                let skip = start.saturating_sub(self.cursor) as usize * self.channels;
                self.pending.drain(..skip);
                self.cursor = self.cursor.max(start);
                return Ok(());
            }
            self.cursor += available;
            self.pending.clear();
            if !self.fill()? {
                return Ok(());
            }
        }
    }

    fn take(&mut self, frames: usize) -> AudioBlock {
        let frames = frames.min(self.pending_frames() as usize);
        let samples: Vec<f32> = self.pending.drain(..frames * self.channels).collect();
        self.cursor += frames as u64;
        AudioBlock::new(samples, self.channels)
    }
}

impl AudioSource for FileSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> usize {
        self.channels
    }

    fn total_frames(&self) -> Option<u64> {
        self.total_frames
    }

    fn byte_len(&self) -> u64 {
        self.byte_len
    }

    fn read_all(&mut self) -> Result<AudioBlock, SourceError> {
        self.position_at(0)?;
        while self.fill()? {}

        let block = self.take(self.pending_frames() as usize);
        if self.skipped_packets > 0 {
            log::warn!(
                "{}: {} corrupt packet(s) skipped",
                self.path.display(),
                self.skipped_packets
            );
        }
        log::info!(
            "Decoded {} frames, {:.1}s",
            block.frames(),
            block.frames() as f64 / self.sample_rate as f64
        );
        Ok(block)
    }

    fn read_window(&mut self, start: u64, max_frames: usize) -> Result<AudioBlock, SourceError> {
        self.position_at(start)?;
        while self.pending_frames() < max_frames as u64 {
            if !self.fill()? {
                break;
            }
        }
        Ok(self.take(max_frames))
    }
}

fn map_symphonia(err: SymphoniaError) -> SourceError {
    match err {
        SymphoniaError::IoError(e) => SourceError::Io(e),
        SymphoniaError::Unsupported(what) => SourceError::Unsupported(what.to_string()),
        other => SourceError::Decode(other.to_string()),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Writes a 16-bit WAV fixture into the temp dir and returns its path.
    pub(crate) fn write_wav(name: &str, sample_rate: u32, planes: &[Vec<f32>]) -> PathBuf {
        let path = std::env::temp_dir().join(format!("pa-meter-{}-{}.wav", std::process::id(), name));
        let spec = hound::WavSpec {
            channels: planes.len() as u16,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        let frames = planes[0].len();
        for i in 0..frames {
            for plane in planes {
                writer
                    .write_sample((plane[i] * i16::MAX as f32).round() as i16)
                    .unwrap();
            }
        }
        writer.finalize().unwrap();
        path
    }

    fn ramp(frames: usize, scale: f32) -> Vec<f32> {
        (0..frames)
            .map(|i| ((i % 200) as f32 / 200.0 - 0.5) * scale)
            .collect()
    }

    #[test]
    fn reports_stream_properties() {
        let path = write_wav("props", 22050, &[ramp(5000, 1.0), ramp(5000, 0.5)]);
        let source = FileSource::open(&path).unwrap();
        assert_eq!(source.sample_rate(), 22050);
        assert_eq!(source.channels(), 2);
        assert_eq!(source.total_frames(), Some(5000));
        assert!(source.byte_len() >= 5000 * 2 * 2);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn sequential_windows_match_whole_read() {
        let path = write_wav("windows", 8000, &[ramp(7001, 1.0), ramp(7001, -0.8)]);

        let whole = FileSource::open(&path).unwrap().read_all().unwrap();
        assert_eq!(whole.frames(), 7001);

        let mut source = FileSource::open(&path).unwrap();
        let mut start = 0u64;
        let mut windows = Vec::new();
        loop {
            let block = source.read_window(start, 1000).unwrap();
            if block.is_empty() {
                break;
            }
            start += block.frames() as u64;
            windows.push(block);
        }

        assert_eq!(windows.len(), 8);
        assert_eq!(windows.last().unwrap().frames(), 1);
        for (i, block) in windows.iter().enumerate() {
            assert_eq!(*block, whole.slice_frames(i * 1000, 1000));
        }
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn non_sequential_window_seeks() {
        let path = write_wav("seek", 8000, &[ramp(6000, 1.0)]);
        let whole = FileSource::open(&path).unwrap().read_all().unwrap();

        let mut source = FileSource::open(&path).unwrap();
        let late = source.read_window(4500, 300).unwrap();
        let early = source.read_window(100, 300).unwrap();
        assert_eq!(late, whole.slice_frames(4500, 300));
        assert_eq!(early, whole.slice_frames(100, 300));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = FileSource::open(Path::new("/nonexistent/pa-meter.wav")).err().unwrap();
        assert!(matches!(err, SourceError::Io(_)));
    }

    #[test]
    fn garbage_is_not_decodable() {
        let path = std::env::temp_dir().join(format!("pa-meter-{}-garbage.wav", std::process::id()));
        std::fs::write(&path, b"definitely not audio data at all").unwrap();
        let err = FileSource::open(&path).err().unwrap();
        assert!(!matches!(err, SourceError::Io(ref e) if e.kind() == std::io::ErrorKind::NotFound));
        std::fs::remove_file(path).ok();
    }
}
