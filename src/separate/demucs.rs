use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use super::{SeparationError, Separator, Stem, StemKind};
use crate::audio::decode::FileSource;
use crate::audio::source::AudioSource;
use crate::config::SeparationConfig;

/// Runs the `demucs` command line tool and decodes the stems it writes to
/// `<out_dir>/<model>/<track>/<stem>.wav`.
pub struct DemucsCli {
    command: String,
    model: String,
    max_bytes: u64,
    long_input_seconds: f64,
    out_dir: PathBuf,
}

impl DemucsCli {
    pub fn new(config: &SeparationConfig, out_dir: PathBuf) -> Self {
        Self {
            command: config.command.clone(),
            model: config.model.clone(),
            max_bytes: config.max_file_mb.saturating_mul(1024 * 1024),
            long_input_seconds: config.long_input_seconds,
            out_dir,
        }
    }

    fn check_preconditions(&self, path: &Path) -> Result<(), SeparationError> {
        let size = std::fs::metadata(path)?.len();
        if size > self.max_bytes {
            return Err(SeparationError::TooLarge {
                size_mb: size as f64 / (1024.0 * 1024.0),
                limit_mb: self.max_bytes / (1024 * 1024),
            });
        }

        let source = FileSource::open(path).map_err(|e| SeparationError::Decode(e.to_string()))?;
        if let Some(frames) = source.total_frames() {
            let duration = frames as f64 / source.sample_rate() as f64;
            if duration > self.long_input_seconds {
                log::warn!(
                    "Source is {:.1} minutes long, separation will take a while",
                    duration / 60.0
                );
            }
        }
        Ok(())
    }

    fn stem_dir(&self, path: &Path) -> Result<PathBuf, SeparationError> {
        let track = path
            .file_stem()
            .ok_or_else(|| SeparationError::Failed(format!("no file name in {}", path.display())))?;
        Ok(self.out_dir.join(&self.model).join(track))
    }
}

impl Separator for DemucsCli {
    fn separate(&self, path: &Path) -> Result<Vec<Stem>, SeparationError> {
        self.check_preconditions(path)?;
        std::fs::create_dir_all(&self.out_dir)?;

        log::info!("Separating {} with {} ({})", path.display(), self.command, self.model);

        let output = Command::new(&self.command)
            .arg("-n")
            .arg(&self.model)
            .arg("-o")
            .arg(&self.out_dir)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => SeparationError::Unavailable(self.command.clone()),
                _ => SeparationError::Io(e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SeparationError::Failed(format!(
                "{} exited with {}:\n{}",
                self.command, output.status, stderr
            )));
        }

        let dir = self.stem_dir(path)?;
        let mut stems = Vec::with_capacity(StemKind::ALL.len());
        for kind in StemKind::ALL {
            let stem_path = dir.join(format!("{}.wav", kind.name()));
            let mut source = FileSource::open(&stem_path)
                .map_err(|e| SeparationError::Decode(format!("{}: {}", stem_path.display(), e)))?;
            let block = source
                .read_all()
                .map_err(|e| SeparationError::Decode(format!("{}: {}", stem_path.display(), e)))?;
            stems.push(Stem {
                kind,
                block,
                sample_rate: source.sample_rate(),
            });
        }

        log::info!("Separation complete: {} stems in {}", stems.len(), dir.display());
        Ok(stems)
    }
}
