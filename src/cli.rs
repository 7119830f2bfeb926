use clap::Parser;
use pa_meter::measure::stream::RmsPooling;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pa-meter", about = "Loudness, peak and stereo measurement for long live recordings")]
pub struct Cli {
    /// Input audio file (WAV, FLAC, MP3, OGG, AAC)
    pub input: PathBuf,

    /// Config file (defaults to ./pa-meter.toml or the user config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Files at or above this size in MB are analyzed in windows
    #[arg(long)]
    pub large_file_mb: Option<u64>,

    /// Window length in seconds for large files
    #[arg(long)]
    pub chunk_seconds: Option<f64>,

    /// How window levels combine for large files
    #[arg(long, value_enum)]
    pub pooling: Option<RmsPooling>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Also separate instruments with demucs and measure each stem
    #[arg(long)]
    pub separate: bool,

    /// Where separated stems are written
    #[arg(long)]
    pub stems_dir: Option<PathBuf>,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,
}
