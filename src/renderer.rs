//! Offline mix renderer — sums the speech, music, and effect chains into one
//! stereo buffer, sample-accurately, with all envelope and filter state local
//! to a single call. A pure function of (tracks, settings): no locks, no
//! state carried between renders.

use crate::ducking;
use crate::envelope::{self, GainEnvelope};
use crate::eq::EqChain;
use crate::settings::MixingSettings;
use crate::timeline::RenderTimeline;
use crate::track::AudioTrack;
use std::borrow::Cow;

/// One rendered mix: planar stereo float buffers plus the display duration.
#[derive(Debug, Clone)]
pub struct RenderedMix {
    pub left: Vec<f32>,
    pub right: Vec<f32>,
    pub sample_rate: u32,
    pub duration_secs: f64,
}

/// Bring a source to the output rate, borrowing when it already matches.
fn conform(track: Option<&AudioTrack>, sample_rate: u32) -> Option<Cow<'_, AudioTrack>> {
    track.map(|t| {
        if t.sample_rate() == sample_rate {
            Cow::Borrowed(t)
        } else {
            Cow::Owned(t.resampled(sample_rate))
        }
    })
}

/// The music control envelope: fade-in, static gain, and ducking decisions
/// share one breakpoint schedule, exactly as a single automated gain node
/// would. The fade-out stage multiplies on top separately.
fn bgm_control_envelope(
    tts: Option<&AudioTrack>,
    settings: &MixingSettings,
    timeline: &RenderTimeline,
) -> GainEnvelope {
    let mut env = GainEnvelope::new();
    if settings.fade_in > 0.0 {
        envelope::apply_fade_in(
            &mut env,
            settings.bgm_gain,
            settings.fade_in,
            settings.fade_in_ratio,
        );
    } else {
        env.set_value_at(0.0, settings.bgm_gain);
    }

    let fade_out_start = envelope::fade_out_start(timeline.bgm_total_len, settings.fade_out);
    if settings.ducking_enabled {
        if let Some(tts) = tts {
            let analyze_end = if settings.fade_out > 0.0 {
                fade_out_start
            } else {
                timeline.render_len
            };
            ducking::apply_ducking(&mut env, tts, settings, analyze_end);
        }
    }
    if settings.fade_out > 0.0 {
        ducking::reset_before_fade_out(&mut env, settings.bgm_gain, fade_out_start);
    }
    env
}

/// Render the full mix at `sample_rate`. Settings are sanitized on entry;
/// the output buffers never contain NaN or infinity.
pub fn render(
    tts: Option<&AudioTrack>,
    bgm: Option<&AudioTrack>,
    effect: Option<&AudioTrack>,
    settings: &MixingSettings,
    sample_rate: u32,
) -> RenderedMix {
    let settings = settings.sanitized();
    let sample_rate = sample_rate.max(1);

    let tts = conform(tts, sample_rate);
    let tts = tts.as_deref();
    let bgm = conform(bgm.filter(|t| t.frames() > 0), sample_rate);
    let bgm = bgm.as_deref();
    let effect = conform(effect, sample_rate);
    let effect = effect.as_deref();

    let timeline = RenderTimeline::compute(
        tts.map(|t| t.duration_secs()).unwrap_or(0.0),
        bgm.is_some(),
        effect.map(|t| t.duration_secs()).unwrap_or(0.0),
        &settings,
    );

    let total = timeline.render_samples(sample_rate);
    let mut out = [vec![0.0f32; total], vec![0.0f32; total]];
    let sr = sample_rate as f64;
    let master = settings.master_gain;

    // Music chain: source → EQ → control envelope → fade-out stage → master,
    // looping the source until the music bed length is filled.
    if let Some(bgm) = bgm {
        let frames = bgm.frames();
        let bgm_samples = ((timeline.bgm_total_len * sr).ceil() as usize).min(total);
        let control = bgm_control_envelope(tts, &settings, &timeline);
        let fade_out = envelope::fade_out_stage(
            timeline.bgm_total_len,
            settings.fade_out,
            settings.fade_out_ratio,
        );

        for (ch, buf) in out.iter_mut().enumerate() {
            let src = bgm.channel(ch);
            let mut eq = EqChain::new(
                sample_rate,
                settings.low_shelf,
                settings.mid_peaking,
                settings.high_shelf,
            );
            let mut control_cur = control.cursor();
            let mut fade_cur = fade_out.cursor();
            for (n, slot) in buf.iter_mut().enumerate().take(bgm_samples) {
                let t = n as f64 / sr;
                let shaped = eq.process(src[n % frames]);
                let gain = control_cur.value_at(t) * fade_cur.value_at(t) * master;
                *slot += shaped * gain as f32;
            }
        }
    }

    // Speech chain: dry, static gain only, placed at tts_start.
    if let Some(tts) = tts {
        let start = (timeline.tts_start * sr).round() as usize;
        let gain = (settings.tts_gain * master) as f32;
        for (ch, buf) in out.iter_mut().enumerate() {
            for (i, &s) in tts.channel(ch).iter().enumerate() {
                match buf.get_mut(start + i) {
                    Some(slot) => *slot += s * gain,
                    None => break,
                }
            }
        }
    }

    // Effect chain: static gain, from the top of the render.
    if let Some(effect) = effect {
        let gain = (settings.effect_gain * master) as f32;
        for (ch, buf) in out.iter_mut().enumerate() {
            for (i, &s) in effect.channel(ch).iter().enumerate() {
                match buf.get_mut(i) {
                    Some(slot) => *slot += s * gain,
                    None => break,
                }
            }
        }
    }

    let [left, right] = out;
    RenderedMix {
        left,
        right,
        sample_rate,
        duration_secs: timeline.render_len,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mono(samples: Vec<f32>, sr: u32) -> AudioTrack {
        AudioTrack::new(vec![samples], sr).unwrap()
    }

    fn flat_settings() -> MixingSettings {
        let mut s = MixingSettings::default();
        s.tts_gain = 1.0;
        s.bgm_gain = 1.0;
        s.effect_gain = 1.0;
        s.master_gain = 1.0;
        s
    }

    #[test]
    fn no_tracks_renders_one_second_of_silence() {
        let mix = render(None, None, None, &MixingSettings::default(), 8000);
        assert_eq!(mix.left.len(), 8000);
        assert_eq!(mix.duration_secs, 1.0);
        assert!(mix.left.iter().all(|&s| s == 0.0));
        assert!(mix.right.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn tts_starts_at_fade_in_plus_offset() {
        let mut s = flat_settings();
        s.fade_in = 0.25;
        s.bgm_offset = 0.25;
        let tts = mono(vec![0.5; 8000], 8000);
        let mix = render(Some(&tts), None, None, &s, 8000);

        // tts_start = 0.5 s → sample 4000
        assert_eq!(mix.left[3999], 0.0);
        assert_eq!(mix.left[4000], 0.5);
        // Mono speech feeds both channels
        assert_eq!(mix.left, mix.right);
    }

    #[test]
    fn tts_region_is_dry_and_unfaded() {
        let mut s = flat_settings();
        s.fade_in = 0.5;
        s.fade_out = 0.5;
        let tts = mono(vec![0.5; 8000], 8000);
        let mix = render(Some(&tts), None, None, &s, 8000);

        let start = 4000; // fade_in 0.5 s
        for n in start..start + 8000 {
            assert_eq!(mix.left[n], 0.5, "sample {n}");
        }
    }

    #[test]
    fn silence_after_tts_ends() {
        let s = flat_settings();
        let tts = mono(vec![0.5; 4000], 8000);
        let mut with_gap = s.clone();
        with_gap.bgm_offset_after_tts = 0.5;
        let mix = render(Some(&tts), None, None, &with_gap, 8000);

        assert_eq!(mix.left.len(), 8000);
        assert!(mix.left[4000..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn effect_plays_from_render_start() {
        let mut s = flat_settings();
        s.effect_gain = 0.5;
        let effect = mono(vec![0.8; 4000], 8000);
        let tts = mono(vec![0.0; 8000], 8000);
        let mix = render(Some(&tts), None, Some(&effect), &s, 8000);

        assert!((mix.left[0] - 0.4).abs() < 1e-6);
        assert!((mix.left[3999] - 0.4).abs() < 1e-6);
        assert_eq!(mix.left[4000], 0.0);
    }

    #[test]
    fn bgm_loops_sample_exactly() {
        let mut s = flat_settings();
        s.trim_end_sec = Some(1.5);
        // Non-repeating source so a loop seam would show
        let src: Vec<f32> = (0..4000).map(|n| (n as f32 / 4000.0) - 0.5).collect();
        let bgm = mono(src, 8000);
        let mix = render(None, Some(&bgm), None, &s, 8000);

        assert_eq!(mix.left.len(), 12000);
        for n in 4000..12000 {
            assert_eq!(mix.left[n], mix.left[n - 4000], "loop seam at {n}");
        }
    }

    #[test]
    fn master_gain_scales_all_chains() {
        let mut s = flat_settings();
        s.master_gain = 0.5;
        let tts = mono(vec![0.8; 4000], 8000);
        let mix = render(Some(&tts), None, None, &s, 8000);
        assert!((mix.left[0] - 0.4).abs() < 1e-6);
    }

    #[test]
    fn stereo_bgm_keeps_channels_separate() {
        let mut s = flat_settings();
        s.trim_end_sec = Some(0.5);
        let bgm =
            AudioTrack::new(vec![vec![0.25; 4000], vec![-0.25; 4000]], 8000).unwrap();
        let mix = render(None, Some(&bgm), None, &s, 8000);

        assert!((mix.left[100] - 0.25).abs() < 1e-6);
        assert!((mix.right[100] + 0.25).abs() < 1e-6);
    }

    #[test]
    fn sources_are_resampled_to_output_rate() {
        let s = flat_settings();
        // 1 s of speech at 16 kHz rendered into an 8 kHz mix
        let tts = mono(vec![0.5; 16000], 16000);
        let mix = render(Some(&tts), None, None, &s, 8000);
        assert_eq!(mix.left.len(), 8000);
        assert!((mix.left[4000] - 0.5).abs() < 1e-3);
    }

    #[test]
    fn invalid_settings_render_like_defaults() {
        let mut broken = MixingSettings::default();
        broken.tts_gain = f64::NAN;
        broken.bgm_gain = -7.0;
        broken.fade_in = f64::INFINITY;
        broken.low_shelf = 400.0;

        let tts = mono(vec![0.3; 4000], 8000);
        let bgm = mono(vec![0.1; 8000], 8000);
        let clean = render(Some(&tts), Some(&bgm), None, &MixingSettings::default(), 8000);
        let dirty = render(Some(&tts), Some(&bgm), None, &broken, 8000);

        assert_eq!(clean.left, dirty.left);
        assert_eq!(clean.right, dirty.right);
    }

    #[test]
    fn output_is_always_finite() {
        let mut s = flat_settings();
        s.fade_in = 0.1;
        s.fade_out = 0.1;
        s.ducking_enabled = true;
        s.low_shelf = 40.0;
        s.high_shelf = -40.0;
        let tts = mono(vec![0.9; 8000], 8000);
        let bgm = mono(vec![0.9; 2000], 8000);
        let mix = render(Some(&tts), Some(&bgm), None, &s, 8000);
        assert!(mix.left.iter().all(|s| s.is_finite()));
        assert!(mix.right.iter().all(|s| s.is_finite()));
    }
}
