//! Mix parameter record — the settings blob the management app stores per
//! announcement (camelCase JSON on the wire, every field optional).
//!
//! The engine never hard-fails on a bad value: anything non-finite or outside
//! its documented range falls back to the field default at the point of use,
//! so an interactive caller always gets an audible render.

use serde::{Deserialize, Serialize};

/// Full parameter set controlling one mixdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MixingSettings {
    /// Linear gain on the speech track, [0, 10].
    pub tts_gain: f64,
    /// Linear gain on the background-music track, [0, 10].
    pub bgm_gain: f64,
    /// Linear gain on the sound-effect track, [0, 10].
    pub effect_gain: f64,
    /// Linear gain on the summed output, [0, 10].
    pub master_gain: f64,
    /// Music fade-in length in seconds, [0, 60]. 0 disables.
    pub fade_in: f64,
    /// Music fade-out length in seconds, [0, 60]. 0 disables.
    pub fade_out: f64,
    /// Scales the fade-in target gain around `bgm_gain`: 50 reproduces the
    /// nominal gain, 0 approaches silence, 100 approaches double. [0, 100].
    pub fade_in_ratio: f64,
    /// Scales the loudness the fade-out starts from: 100 = nominal. [0, 100].
    pub fade_out_ratio: f64,
    /// Low-shelf EQ gain at 100 Hz in dB, [-40, 40]. Music path only.
    pub low_shelf: f64,
    /// Peaking EQ gain at 1 kHz (Q = 1) in dB, [-40, 40]. Music path only.
    pub mid_peaking: f64,
    /// High-shelf EQ gain at 8 kHz in dB, [-40, 40]. Music path only.
    pub high_shelf: f64,
    /// Lower the music automatically while speech is detected.
    pub ducking_enabled: bool,
    /// Music attenuation while speech is active, in dB (negative), [-80, 0].
    pub duck_db: f64,
    /// Speech level in dBFS above which ducking engages, [-100, 0].
    pub duck_threshold: f64,
    /// Seconds for the music to ramp back toward full after speech stops,
    /// [0, 30].
    pub duck_release: f64,
    /// Seconds the music plays before speech starts, [0, 3600].
    pub bgm_offset: f64,
    /// Seconds of lead-in silence before speech, [0, 3600]. Only used to
    /// align the ducking analysis windows with the speech buffer.
    pub tts_offset: f64,
    /// Seconds the music continues after speech ends, before the fade-out
    /// window, [0, 3600].
    pub bgm_offset_after_tts: f64,
    /// Explicit total music/render length override in seconds. Ignored
    /// unless finite and positive.
    pub trim_end_sec: Option<f64>,
}

impl Default for MixingSettings {
    fn default() -> Self {
        MixingSettings {
            tts_gain: 1.0,
            bgm_gain: 0.5,
            effect_gain: 1.0,
            master_gain: 1.0,
            fade_in: 0.0,
            fade_out: 0.0,
            fade_in_ratio: 100.0,
            fade_out_ratio: 100.0,
            low_shelf: 0.0,
            mid_peaking: 0.0,
            high_shelf: 0.0,
            ducking_enabled: false,
            duck_db: -12.0,
            duck_threshold: -40.0,
            duck_release: 0.1,
            bgm_offset: 0.0,
            tts_offset: 0.0,
            bgm_offset_after_tts: 0.0,
            trim_end_sec: None,
        }
    }
}

/// A value survives only if it is finite and within [min, max]; anything
/// else becomes the field default.
fn valid_or(value: f64, min: f64, max: f64, default: f64) -> f64 {
    if value.is_finite() && value >= min && value <= max {
        value
    } else {
        default
    }
}

impl MixingSettings {
    /// Replace every out-of-range or non-finite field with its default.
    ///
    /// The renderer calls this once on entry; downstream code can then trust
    /// that no NaN/Infinity reaches the output buffer. Idempotent.
    pub fn sanitized(&self) -> MixingSettings {
        let d = MixingSettings::default();
        MixingSettings {
            tts_gain: valid_or(self.tts_gain, 0.0, 10.0, d.tts_gain),
            bgm_gain: valid_or(self.bgm_gain, 0.0, 10.0, d.bgm_gain),
            effect_gain: valid_or(self.effect_gain, 0.0, 10.0, d.effect_gain),
            master_gain: valid_or(self.master_gain, 0.0, 10.0, d.master_gain),
            fade_in: valid_or(self.fade_in, 0.0, 60.0, d.fade_in),
            fade_out: valid_or(self.fade_out, 0.0, 60.0, d.fade_out),
            fade_in_ratio: valid_or(self.fade_in_ratio, 0.0, 100.0, d.fade_in_ratio),
            fade_out_ratio: valid_or(self.fade_out_ratio, 0.0, 100.0, d.fade_out_ratio),
            low_shelf: valid_or(self.low_shelf, -40.0, 40.0, d.low_shelf),
            mid_peaking: valid_or(self.mid_peaking, -40.0, 40.0, d.mid_peaking),
            high_shelf: valid_or(self.high_shelf, -40.0, 40.0, d.high_shelf),
            ducking_enabled: self.ducking_enabled,
            duck_db: valid_or(self.duck_db, -80.0, 0.0, d.duck_db),
            duck_threshold: valid_or(self.duck_threshold, -100.0, 0.0, d.duck_threshold),
            duck_release: valid_or(self.duck_release, 0.0, 30.0, d.duck_release),
            bgm_offset: valid_or(self.bgm_offset, 0.0, 3600.0, d.bgm_offset),
            tts_offset: valid_or(self.tts_offset, 0.0, 3600.0, d.tts_offset),
            bgm_offset_after_tts: valid_or(
                self.bgm_offset_after_tts,
                0.0,
                3600.0,
                d.bgm_offset_after_tts,
            ),
            trim_end_sec: self
                .trim_end_sec
                .filter(|v| v.is_finite() && *v > 0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_unity_ish() {
        let s = MixingSettings::default();
        assert_eq!(s.tts_gain, 1.0);
        assert_eq!(s.bgm_gain, 0.5);
        assert_eq!(s.master_gain, 1.0);
        assert_eq!(s.fade_in_ratio, 100.0);
        assert!(!s.ducking_enabled);
        assert!(s.trim_end_sec.is_none());
    }

    #[test]
    fn sanitize_is_identity_for_valid_settings() {
        let mut s = MixingSettings::default();
        s.bgm_gain = 0.8;
        s.fade_in = 2.5;
        s.low_shelf = -6.0;
        s.duck_db = -18.0;
        assert_eq!(s.sanitized(), s);
    }

    #[test]
    fn sanitize_replaces_nan_with_default() {
        let mut s = MixingSettings::default();
        s.tts_gain = f64::NAN;
        s.fade_out = f64::INFINITY;
        let clean = s.sanitized();
        assert_eq!(clean.tts_gain, 1.0);
        assert_eq!(clean.fade_out, 0.0);
    }

    #[test]
    fn sanitize_replaces_out_of_range_with_default() {
        let mut s = MixingSettings::default();
        s.bgm_gain = -3.0;
        s.master_gain = 25.0;
        s.fade_in = 600.0;
        s.high_shelf = 90.0;
        s.duck_db = 5.0;
        let clean = s.sanitized();
        let d = MixingSettings::default();
        assert_eq!(clean.bgm_gain, d.bgm_gain);
        assert_eq!(clean.master_gain, d.master_gain);
        assert_eq!(clean.fade_in, d.fade_in);
        assert_eq!(clean.high_shelf, d.high_shelf);
        assert_eq!(clean.duck_db, d.duck_db);
    }

    #[test]
    fn sanitize_drops_invalid_trim() {
        let mut s = MixingSettings::default();
        s.trim_end_sec = Some(0.0);
        assert!(s.sanitized().trim_end_sec.is_none());
        s.trim_end_sec = Some(f64::NAN);
        assert!(s.sanitized().trim_end_sec.is_none());
        s.trim_end_sec = Some(12.5);
        assert_eq!(s.sanitized().trim_end_sec, Some(12.5));
    }

    #[test]
    fn sanitize_is_idempotent() {
        let mut s = MixingSettings::default();
        s.effect_gain = f64::NAN;
        s.fade_in_ratio = 250.0;
        let once = s.sanitized();
        assert_eq!(once.sanitized(), once);
    }

    #[test]
    fn deserializes_camel_case_json() {
        let json = r#"{
            "ttsGain": 1.2,
            "bgmGain": 0.4,
            "fadeIn": 0.3,
            "fadeOutRatio": 60,
            "duckingEnabled": true,
            "bgmOffsetAfterTts": 1.5,
            "trimEndSec": 20.0
        }"#;
        let s: MixingSettings = serde_json::from_str(json).unwrap();
        assert_eq!(s.tts_gain, 1.2);
        assert_eq!(s.bgm_gain, 0.4);
        assert_eq!(s.fade_in, 0.3);
        assert_eq!(s.fade_out_ratio, 60.0);
        assert!(s.ducking_enabled);
        assert_eq!(s.bgm_offset_after_tts, 1.5);
        assert_eq!(s.trim_end_sec, Some(20.0));
    }

    #[test]
    fn missing_fields_take_defaults() {
        let s: MixingSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(s, MixingSettings::default());
    }

    #[test]
    fn round_trips_through_json() {
        let mut s = MixingSettings::default();
        s.ducking_enabled = true;
        s.duck_threshold = -35.0;
        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains("duckThreshold"));
        let back: MixingSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }
}
