mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

use cli::Cli;
use pa_meter::advice::{advise, advise_stem};
use pa_meter::config::{self, Config};
use pa_meter::measure::stream::{analyze_file, CancelToken, ProgressSink};
use pa_meter::report::{self, Report, StemReport};
use pa_meter::separate::demucs::DemucsCli;
use pa_meter::separate::{measure_stems, Separator};

const BAR_UNITS: u64 = 1000;

/// Terminal progress bar driven by the controller's fractions.
struct BarProgress {
    pb: ProgressBar,
}

impl BarProgress {
    fn new() -> Result<Self> {
        let pb = ProgressBar::new(BAR_UNITS);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {percent:>3}% {msg}")
                .context("invalid progress template")?
                .progress_chars("=>-"),
        );
        Ok(Self { pb })
    }
}

impl ProgressSink for BarProgress {
    fn report(&mut self, fraction: f64, label: &str) {
        self.pb.set_position((fraction * BAR_UNITS as f64).round() as u64);
        self.pb.set_message(label.to_string());
    }

    fn complete(&mut self, processed: u64, total: u64) {
        self.pb.finish_with_message(format!("{}/{} windows", processed, total));
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    let mut cfg = Config::default();
    if let Some(path) = config::find_config(cli.config.as_deref()) {
        match config::load_config(&path) {
            Some(loaded) => {
                log::info!("Loaded config from {}", path.display());
                cfg = loaded;
            }
            None => log::warn!("Could not read config {}, using defaults", path.display()),
        }
    }

    // CLI flags win over the config file
    if let Some(mb) = cli.large_file_mb {
        cfg.analysis.large_file_mb = mb;
    }
    if let Some(secs) = cli.chunk_seconds {
        cfg.analysis.chunk_seconds = secs;
    }
    if let Some(pooling) = cli.pooling {
        cfg.analysis.pooling = pooling;
    }

    let secs = cfg.analysis.chunk_seconds;
    if !secs.is_finite() || secs <= 0.0 {
        anyhow::bail!("Chunk length must be positive, got {}", secs);
    }
    if !cli.input.exists() {
        anyhow::bail!("Input file not found: {}", cli.input.display());
    }

    let show_progress = !cli.no_progress && !cli.json;
    let mut bar = if show_progress { Some(BarProgress::new()?) } else { None };

    let analysis = analyze_file(
        &cli.input,
        cfg.analysis.settings(),
        CancelToken::new(),
        bar.as_mut().map(|b| b as &mut dyn ProgressSink),
    )
    .with_context(|| format!("Analysis of {} failed", cli.input.display()))?;
    let measurement = analysis.measurement;
    let mode = analysis.mode;

    let verdicts = advise(&measurement, &cfg.advice);

    let mut report = Report {
        source: display_name(&cli.input),
        mode,
        measurement,
        verdicts,
        stems: Vec::new(),
    };

    if cli.separate {
        let out_dir = cli
            .stems_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("pa-meter-stems"));
        let separator = DemucsCli::new(&cfg.separation, out_dir);
        match separator.separate(&cli.input) {
            Ok(stems) => {
                for (kind, result) in measure_stems(&stems) {
                    match result {
                        Ok(m) => {
                            let hint = advise_stem(kind, &m, &cfg.advice);
                            report.stems.push(StemReport::new(kind, &m, hint));
                        }
                        Err(e) => log::warn!("Skipping {} stem: {}", kind.name(), e),
                    }
                }
            }
            Err(e) => log::error!("Separation failed: {}", e),
        }
    }

    if cli.json {
        println!("{}", report::render_json(&report)?);
    } else {
        print!("{}", report::render_text(&report));
    }

    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
