//! Render timeline — derives the total output length and per-track start
//! times from the tracks and settings. Recomputed for every render, never
//! persisted.

use crate::settings::MixingSettings;

/// Derived timing for one render pass. All values in seconds; the music
/// always starts at 0.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTimeline {
    /// Output time at which speech starts: `fade_in + bgm_offset`.
    pub tts_start: f64,
    /// Total length of the music bed, fades and offsets included.
    pub bgm_total_len: f64,
    /// Total render length: the longest of music bed, speech, and effect.
    pub render_len: f64,
}

impl RenderTimeline {
    /// Compute the timeline. `settings` must already be sanitized.
    pub fn compute(
        tts_len: f64,
        bgm_present: bool,
        effect_len: f64,
        settings: &MixingSettings,
    ) -> RenderTimeline {
        let tts_len = if tts_len.is_finite() { tts_len.max(0.0) } else { 0.0 };
        let effect_len = if effect_len.is_finite() {
            effect_len.max(0.0)
        } else {
            0.0
        };

        let bgm_total_len = match settings.trim_end_sec {
            Some(trim) if trim > 0.0 => trim,
            _ if bgm_present => {
                let natural = settings.fade_in
                    + settings.bgm_offset
                    + tts_len
                    + settings.bgm_offset_after_tts
                    + settings.fade_out;
                // Never shorter than speech plus both fades
                natural.max(tts_len + settings.fade_in + settings.fade_out)
            }
            // No music: the sum is still used as a length reference
            _ => {
                tts_len
                    + settings.fade_in
                    + settings.fade_out
                    + settings.bgm_offset
                    + settings.bgm_offset_after_tts
            }
        };

        let mut render_len = bgm_total_len.max(tts_len).max(effect_len);
        if !render_len.is_finite() || render_len <= 0.0 {
            render_len = 1.0;
        }

        RenderTimeline {
            tts_start: settings.fade_in + settings.bgm_offset,
            bgm_total_len,
            render_len,
        }
    }

    /// Output buffer length in frames — always at least one.
    pub fn render_samples(&self, sample_rate: u32) -> usize {
        ((self.render_len * sample_rate as f64).ceil() as usize).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> MixingSettings {
        MixingSettings::default()
    }

    #[test]
    fn bare_tts_sets_all_lengths() {
        let tl = RenderTimeline::compute(3.0, false, 0.0, &settings());
        assert_eq!(tl.tts_start, 0.0);
        assert_eq!(tl.bgm_total_len, 3.0);
        assert_eq!(tl.render_len, 3.0);
    }

    #[test]
    fn fades_and_offsets_extend_bgm() {
        let mut s = settings();
        s.fade_in = 0.5;
        s.fade_out = 1.0;
        s.bgm_offset = 0.25;
        s.bgm_offset_after_tts = 0.75;
        let tl = RenderTimeline::compute(4.0, true, 0.0, &s);
        assert!((tl.bgm_total_len - 6.5).abs() < 1e-9);
        assert!((tl.tts_start - 0.75).abs() < 1e-9);
        assert!((tl.render_len - 6.5).abs() < 1e-9);
    }

    #[test]
    fn bgm_never_shorter_than_tts_plus_fades() {
        let mut s = settings();
        s.fade_in = 0.3;
        s.fade_out = 0.5;
        s.trim_end_sec = None;
        // No offsets: natural sum equals the floor exactly
        let tl = RenderTimeline::compute(3.0, true, 0.0, &s);
        assert!((tl.bgm_total_len - 3.8).abs() < 1e-9);
    }

    #[test]
    fn trim_overrides_natural_length() {
        let mut s = settings();
        s.fade_in = 2.0;
        s.fade_out = 2.0;
        s.trim_end_sec = Some(5.0);
        let tl = RenderTimeline::compute(30.0, true, 0.0, &s);
        assert_eq!(tl.bgm_total_len, 5.0);
        // Speech still dominates the render length
        assert_eq!(tl.render_len, 30.0);
    }

    #[test]
    fn effect_can_dominate_render_length() {
        let tl = RenderTimeline::compute(2.0, false, 9.0, &settings());
        assert_eq!(tl.render_len, 9.0);
    }

    #[test]
    fn empty_inputs_fall_back_to_one_second() {
        let tl = RenderTimeline::compute(0.0, false, 0.0, &settings());
        assert_eq!(tl.render_len, 1.0);
        assert_eq!(tl.render_samples(44100), 44100);
    }

    #[test]
    fn render_samples_rounds_up_and_is_positive() {
        // Tiny but positive lengths are honored, never below one sample
        let tl = RenderTimeline::compute(0.00001, false, 0.0, &settings());
        assert!(tl.render_samples(8000) >= 1);

        let mut s = settings();
        s.trim_end_sec = Some(3.8);
        let tl = RenderTimeline::compute(3.0, true, 0.0, &s);
        assert_eq!(tl.render_samples(8000), 30400);
    }

    #[test]
    fn end_to_end_scenario_lengths() {
        // 3.0 s speech over a 10 s music source, fadeIn 0.3, fadeOut 0.5
        let mut s = settings();
        s.fade_in = 0.3;
        s.fade_out = 0.5;
        let tl = RenderTimeline::compute(3.0, true, 0.0, &s);
        assert!((tl.bgm_total_len - 3.8).abs() < 1e-9);
        assert!((tl.render_len - 3.8).abs() < 1e-9);
        assert!((tl.tts_start - 0.3).abs() < 1e-9);
    }
}
