use serde::Serialize;
use std::fmt::Write as _;

use crate::advice::{StemHint, Verdict};
use crate::measure::finalize::Measurement;
use crate::measure::stream::AnalysisMode;
use crate::separate::StemKind;

#[derive(Debug, Serialize)]
pub struct Report {
    pub source: String,
    pub mode: AnalysisMode,
    pub measurement: Measurement,
    pub verdicts: Vec<Verdict>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stems: Vec<StemReport>,
}

#[derive(Debug, Serialize)]
pub struct StemReport {
    pub stem: StemKind,
    pub rms_db: f64,
    pub peak_db: f64,
    pub crest_db: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<StemHint>,
}

impl StemReport {
    pub fn new(stem: StemKind, m: &Measurement, hint: Option<StemHint>) -> Self {
        Self {
            stem,
            rms_db: m.rms_db,
            peak_db: m.peak_db,
            crest_db: m.crest_db,
            hint,
        }
    }
}

/// `3725.4` -> `"1:02:05"`, `65.0` -> `"1:05"`
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    if total >= 3600 {
        format!("{}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
    } else {
        format!("{}:{:02}", total / 60, total % 60)
    }
}

pub fn render_text(report: &Report) -> String {
    let m = &report.measurement;
    let mut out = String::new();

    let mode = match report.mode {
        AnalysisMode::WholeBuffer => "whole buffer".to_string(),
        AnalysisMode::Chunked { chunk_frames } => format!("{}-frame windows", chunk_frames),
    };
    let _ = writeln!(
        out,
        "{}  ({}, {})",
        report.source,
        format_duration(m.duration_s),
        mode
    );
    let _ = writeln!(out, "  {:<8} {:>8.1} dB", "RMS", m.rms_db);
    let _ = writeln!(out, "  {:<8} {:>8.1} dB", "Peak", m.peak_db);
    let _ = writeln!(out, "  {:<8} {:>8.1} dB", "Crest", m.crest_db);
    let _ = writeln!(out, "  {:<8} {:>8.1} %", "Stereo", m.stereo_pct);

    for verdict in &report.verdicts {
        let marker = if verdict.is_warning() { "!" } else { "+" };
        let _ = writeln!(out, "  {} {}", marker, verdict.message());
    }

    if !report.stems.is_empty() {
        let _ = writeln!(out, "Stems:");
        for stem in &report.stems {
            let _ = writeln!(
                out,
                "  {:<8} rms {:>6.1} dB  peak {:>6.1} dB  crest {:>5.1} dB",
                stem.stem.name(),
                stem.rms_db,
                stem.peak_db,
                stem.crest_db
            );
            if let Some(hint) = stem.hint {
                let _ = writeln!(out, "           {}", hint.message());
            }
        }
    }

    out
}

pub fn render_json(report: &Report) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> Report {
        let measurement = Measurement {
            rms_db: -18.04,
            peak_db: -0.52,
            crest_db: 17.52,
            stereo_pct: 12.3,
            duration_s: 3725.4,
        };
        Report {
            source: "live.wav".into(),
            mode: AnalysisMode::Chunked { chunk_frames: 1_323_000 },
            measurement,
            verdicts: vec![Verdict::Acceptable, Verdict::ClippingRisk],
            stems: Vec::new(),
        }
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(65.0), "1:05");
        assert_eq!(format_duration(3725.4), "1:02:05");
        assert_eq!(format_duration(0.4), "0:00");
    }

    #[test]
    fn text_lists_levels_and_verdicts() {
        let text = render_text(&report());
        assert!(text.starts_with("live.wav  (1:02:05, 1323000-frame windows)"));
        assert!(text.contains("RMS         -18.0 dB"));
        assert!(text.contains("Stereo       12.3 %"));
        assert!(text.contains("+ RMS level is in the target range"));
        assert!(text.contains("! Peaks are too hot"));
        assert!(!text.contains("Stems:"));
    }

    #[test]
    fn json_uses_verdict_keys_and_skips_empty_stems() {
        let json = render_json(&report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["measurement"]["stereo_pct"], 12.3);
        assert_eq!(value["mode"]["chunked"]["chunk_frames"], 1_323_000);
        assert_eq!(value["verdicts"][1], "peak.clipping_risk");
        assert!(value.get("stems").is_none());
    }

    #[test]
    fn stems_render_with_hints() {
        let mut r = report();
        let m = r.measurement.clone();
        r.stems.push(StemReport::new(StemKind::Vocals, &m, Some(StemHint::VocalsQuiet)));

        let text = render_text(&r);
        assert!(text.contains("vocals"));
        assert!(text.contains("Vocals sit low in the mix"));

        let value: serde_json::Value = serde_json::from_str(&render_json(&r).unwrap()).unwrap();
        assert_eq!(value["stems"][0]["stem"], "vocals");
        assert_eq!(value["stems"][0]["hint"], "stem.vocals_quiet");
    }
}
