use serde::{Serialize, Serializer};

use crate::config::AdviceConfig;
use crate::measure::finalize::Measurement;
use crate::separate::StemKind;

/// Advisory verdict on a whole mix. Several can apply at once.
/// Serializes as its [`key`](Verdict::key).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    TooQuiet,
    Acceptable,
    ClippingRisk,
}

impl Verdict {
    /// Stable text key for presentation layers.
    pub fn key(&self) -> &'static str {
        match self {
            Verdict::TooQuiet => "rms.too_quiet",
            Verdict::Acceptable => "rms.acceptable",
            Verdict::ClippingRisk => "peak.clipping_risk",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Verdict::TooQuiet => "Level is low, raise the master",
            Verdict::Acceptable => "RMS level is in the target range",
            Verdict::ClippingRisk => "Peaks are too hot, watch for clipping",
        }
    }

    pub fn is_warning(&self) -> bool {
        !matches!(self, Verdict::Acceptable)
    }
}

pub fn advise(m: &Measurement, thresholds: &AdviceConfig) -> Vec<Verdict> {
    let mut verdicts = Vec::new();

    if m.rms_db < thresholds.too_quiet_below_db {
        verdicts.push(Verdict::TooQuiet);
    } else if (thresholds.acceptable_min_db..=thresholds.acceptable_max_db).contains(&m.rms_db) {
        verdicts.push(Verdict::Acceptable);
    }

    if m.peak_db > thresholds.clipping_above_db {
        verdicts.push(Verdict::ClippingRisk);
    }

    verdicts
}

/// Balance hint for one separated stem.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StemHint {
    VocalsQuiet,
    BassQuiet,
}

impl StemHint {
    pub fn key(&self) -> &'static str {
        match self {
            StemHint::VocalsQuiet => "stem.vocals_quiet",
            StemHint::BassQuiet => "stem.bass_quiet",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            StemHint::VocalsQuiet => "Vocals sit low in the mix",
            StemHint::BassQuiet => "Bass could come up a little",
        }
    }
}

impl Serialize for Verdict {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.key())
    }
}

impl Serialize for StemHint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.key())
    }
}

pub fn advise_stem(kind: StemKind, m: &Measurement, thresholds: &AdviceConfig) -> Option<StemHint> {
    match kind {
        StemKind::Vocals if m.rms_db < thresholds.vocals_quiet_below_db => Some(StemHint::VocalsQuiet),
        StemKind::Bass if m.rms_db < thresholds.bass_quiet_below_db => Some(StemHint::BassQuiet),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels(rms_db: f64, peak_db: f64) -> Measurement {
        Measurement {
            rms_db,
            peak_db,
            crest_db: peak_db - rms_db,
            stereo_pct: 0.0,
            duration_s: 1.0,
        }
    }

    #[test]
    fn rms_bands() {
        let t = AdviceConfig::default();
        assert_eq!(advise(&levels(-30.0, -10.0), &t), vec![Verdict::TooQuiet]);
        assert_eq!(advise(&levels(-23.0, -10.0), &t), vec![]);
        assert_eq!(advise(&levels(-21.0, -10.0), &t), vec![]);
        assert_eq!(advise(&levels(-20.0, -10.0), &t), vec![Verdict::Acceptable]);
        assert_eq!(advise(&levels(-18.0, -10.0), &t), vec![Verdict::Acceptable]);
        assert_eq!(advise(&levels(-16.0, -10.0), &t), vec![Verdict::Acceptable]);
        assert_eq!(advise(&levels(-12.0, -10.0), &t), vec![]);
    }

    #[test]
    fn clipping_is_independent_of_level() {
        let t = AdviceConfig::default();
        assert_eq!(advise(&levels(-12.0, -1.0), &t), vec![]);
        assert_eq!(advise(&levels(-12.0, -0.5), &t), vec![Verdict::ClippingRisk]);
        assert_eq!(
            advise(&levels(-17.0, 0.0), &t),
            vec![Verdict::Acceptable, Verdict::ClippingRisk]
        );
        assert_eq!(
            advise(&levels(-40.0, -0.1), &t),
            vec![Verdict::TooQuiet, Verdict::ClippingRisk]
        );
    }

    #[test]
    fn keys_are_stable() {
        assert_eq!(Verdict::TooQuiet.key(), "rms.too_quiet");
        assert_eq!(Verdict::Acceptable.key(), "rms.acceptable");
        assert_eq!(Verdict::ClippingRisk.key(), "peak.clipping_risk");
        assert!(!Verdict::Acceptable.is_warning());
        assert!(Verdict::ClippingRisk.is_warning());
    }

    #[test]
    fn stem_hints() {
        let t = AdviceConfig::default();
        assert_eq!(advise_stem(StemKind::Vocals, &levels(-26.0, -6.0), &t), Some(StemHint::VocalsQuiet));
        assert_eq!(advise_stem(StemKind::Vocals, &levels(-24.0, -6.0), &t), None);
        assert_eq!(advise_stem(StemKind::Bass, &levels(-21.0, -6.0), &t), Some(StemHint::BassQuiet));
        assert_eq!(advise_stem(StemKind::Drums, &levels(-60.0, -6.0), &t), None);
    }

    #[test]
    fn thresholds_are_configurable() {
        let t = AdviceConfig {
            clipping_above_db: -3.0,
            ..Default::default()
        };
        assert_eq!(advise(&levels(-12.0, -2.0), &t), vec![Verdict::ClippingRisk]);
    }
}
