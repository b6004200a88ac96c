//! Sidechain ducking — windowed RMS loudness detection on the speech track
//! driving the music control gain.
//!
//! The analysis walks fixed 20 ms windows. A window with speech over the
//! threshold steps the gain straight down (fast attack); a quiet window
//! anchors the current value and ramps back toward nominal over
//! `duck_release` seconds. The next window's decision overrides any pending
//! ramp, so the release is window-quantized — this matches the shipped
//! automation behavior and is kept deliberately.

use crate::envelope::GainEnvelope;
use crate::settings::MixingSettings;
use crate::track::AudioTrack;

/// Analysis window length in seconds.
pub const DUCK_WINDOW_SECS: f64 = 0.02;

/// Guards `log10(0)` in the dBFS conversion.
const RMS_EPSILON: f64 = 1e-8;

/// Gain values below this are considered equal when deciding whether a
/// release ramp is still needed.
const GAIN_EPSILON: f64 = 1e-9;

/// RMS of a 20 ms speech window (channel 0) in dBFS.
/// `tt` is time within the speech buffer, already offset-aligned.
fn window_dbfs(tts: &AudioTrack, tt: f64) -> f64 {
    let samples = tts.channel(0);
    let sr = tts.sample_rate() as f64;
    let start = (tt * sr).floor().max(0.0) as usize;
    let len = (DUCK_WINDOW_SECS * sr).ceil() as usize;
    let end = (start + len).min(samples.len());
    if start >= end {
        return 20.0 * RMS_EPSILON.log10();
    }
    let mut sum_sq = 0.0f64;
    for &s in &samples[start..end] {
        sum_sq += s as f64 * s as f64;
    }
    let rms = (sum_sq / (end - start) as f64).sqrt();
    20.0 * (rms + RMS_EPSILON).log10()
}

/// Append ducking decisions to the music control envelope.
///
/// `analyze_end` is the last instant windows are evaluated at: the full
/// render length, or the fade-out start when a fade-out is configured (the
/// tail must fade from full volume, never from a ducked level).
pub fn apply_ducking(
    env: &mut GainEnvelope,
    tts: &AudioTrack,
    settings: &MixingSettings,
    analyze_end: f64,
) {
    let nominal = settings.bgm_gain;
    let ducked = settings.bgm_gain * 10.0_f64.powf(settings.duck_db / 20.0);
    let release = settings.duck_release.max(0.001);
    let tts_len = tts.duration_secs();

    // Track the control value analytically while building so a release can
    // be re-anchored at the value it actually reached.
    let mut cur = env.last_value().unwrap_or(nominal);
    let mut pending: Option<(f64, f64, f64, f64)> = None; // (t0, v0, t1, v1)

    let mut window = 0usize;
    loop {
        let t = window as f64 * DUCK_WINDOW_SECS;
        if t >= analyze_end {
            break;
        }
        window += 1;

        if let Some((t0, v0, t1, v1)) = pending {
            cur = if t >= t1 {
                v1
            } else {
                v0 + (v1 - v0) * (t - t0) / (t1 - t0)
            };
        }

        let tt = t - settings.tts_offset;
        if tt < 0.0 || tt >= tts_len {
            // No speech in this window: pin nominal gain
            env.set_value_at(t, nominal);
            cur = nominal;
            pending = None;
        } else if window_dbfs(tts, tt) > settings.duck_threshold {
            // Speech active: immediate attack
            env.set_value_at(t, ducked);
            cur = ducked;
            pending = None;
        } else if (cur - nominal).abs() > GAIN_EPSILON {
            // Quiet window while still attenuated: release toward nominal
            env.set_value_at(t, cur);
            env.linear_ramp_to(t + release, nominal);
            pending = Some((t, cur, t + release, nominal));
        } else {
            env.set_value_at(t, nominal);
            cur = nominal;
            pending = None;
        }
    }
}

/// Force the control gain back to nominal just before the fade-out window so
/// no residual ducking bleeds into the tail.
pub fn reset_before_fade_out(env: &mut GainEnvelope, nominal: f64, fade_out_start: f64) {
    env.set_value_at((fade_out_start - 0.01).max(0.0), nominal);
    env.linear_ramp_to(fade_out_start.max(0.0), nominal);
}
