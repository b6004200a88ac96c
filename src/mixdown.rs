//! Top-level mixdown entry point: (tracks, settings) → WAV bytes plus the
//! display duration. Everything inside is created per call and dropped after
//! encoding; independent mixdowns can run on as many threads as the caller
//! likes.

use crate::renderer;
use crate::settings::MixingSettings;
use crate::track::AudioTrack;
use crate::wav;

/// Output rate used when no input track suggests one.
pub const FALLBACK_SAMPLE_RATE: u32 = 44100;

/// A finished mixdown ready for storage or playback.
#[derive(Debug, Clone)]
pub struct MixdownOutput {
    /// Complete 16-bit PCM WAV file.
    pub wav: Vec<u8>,
    /// Rendered length in seconds, for scheduling displays.
    pub duration_secs: f64,
    pub sample_rate: u32,
}

/// Pick the output rate: speech wins, then music, then effect.
fn pick_sample_rate(
    tts: Option<&AudioTrack>,
    bgm: Option<&AudioTrack>,
    effect: Option<&AudioTrack>,
) -> u32 {
    tts.or(bgm)
        .or(effect)
        .map(|t| t.sample_rate())
        .unwrap_or(FALLBACK_SAMPLE_RATE)
}

/// Mix the given tracks into a broadcast-ready stereo WAV.
pub fn mixdown(
    tts: Option<&AudioTrack>,
    bgm: Option<&AudioTrack>,
    effect: Option<&AudioTrack>,
    settings: &MixingSettings,
) -> MixdownOutput {
    mixdown_with_rate(tts, bgm, effect, settings, pick_sample_rate(tts, bgm, effect))
}

/// Mix at an explicit output sample rate.
pub fn mixdown_with_rate(
    tts: Option<&AudioTrack>,
    bgm: Option<&AudioTrack>,
    effect: Option<&AudioTrack>,
    settings: &MixingSettings,
    sample_rate: u32,
) -> MixdownOutput {
    let mix = renderer::render(tts, bgm, effect, settings, sample_rate);
    let interleaved = wav::interleave(&mix.left, &mix.right);
    MixdownOutput {
        wav: wav::encode(&interleaved, 2, mix.sample_rate),
        duration_secs: mix.duration_secs,
        sample_rate: mix.sample_rate,
    }
}
