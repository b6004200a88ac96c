use rodio::{Decoder, Source};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// A decoded PCM audio track: per-channel sample buffers in [-1, 1].
///
/// Produced by the decoder boundary (or built directly in tests); the mix
/// engine only reads it. Background music is conceptually looped by the
/// renderer without ever mutating the source buffers.
#[derive(Debug, Clone)]
pub struct AudioTrack {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl AudioTrack {
    /// Build a track from per-channel sample buffers (1 = mono, 2 = stereo).
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self, String> {
        if channels.is_empty() || channels.len() > 2 {
            return Err(format!(
                "Unsupported channel count: {} (expected 1 or 2)",
                channels.len()
            ));
        }
        if sample_rate == 0 {
            return Err("Sample rate must be positive".to_string());
        }
        if channels.len() == 2 && channels[0].len() != channels[1].len() {
            return Err(format!(
                "Channel length mismatch: {} vs {}",
                channels[0].len(),
                channels[1].len()
            ));
        }
        Ok(AudioTrack {
            channels,
            sample_rate,
        })
    }

    /// Build a track from an interleaved buffer.
    pub fn from_interleaved(
        samples: &[f32],
        channel_count: u16,
        sample_rate: u32,
    ) -> Result<Self, String> {
        match channel_count {
            1 => AudioTrack::new(vec![samples.to_vec()], sample_rate),
            2 => {
                let frames = samples.len() / 2;
                let mut left = Vec::with_capacity(frames);
                let mut right = Vec::with_capacity(frames);
                for frame in samples.chunks_exact(2) {
                    left.push(frame[0]);
                    right.push(frame[1]);
                }
                AudioTrack::new(vec![left, right], sample_rate)
            }
            n => Err(format!("Unsupported channel count: {} (expected 1 or 2)", n)),
        }
    }

    /// Decode an audio file into a track (the external Decoder capability).
    /// Sources with more than two channels keep their first two.
    pub fn decode_file(path: &Path) -> Result<Self, String> {
        let file = File::open(path)
            .map_err(|e| format!("Cannot open '{}': {}", path.display(), e))?;
        let source = Decoder::new(BufReader::new(file))
            .map_err(|e| format!("Cannot decode '{}': {}", path.display(), e))?;

        let channels = source.channels() as usize;
        let sample_rate = source.sample_rate();
        let samples: Vec<f32> = source.convert_samples::<f32>().collect();

        match channels {
            0 => Err(format!("'{}' has no audio channels", path.display())),
            1 => AudioTrack::from_interleaved(&samples, 1, sample_rate),
            2 => AudioTrack::from_interleaved(&samples, 2, sample_rate),
            n => {
                let frames = samples.len() / n;
                let mut left = Vec::with_capacity(frames);
                let mut right = Vec::with_capacity(frames);
                for frame in samples.chunks_exact(n) {
                    left.push(frame[0]);
                    right.push(frame[1]);
                }
                AudioTrack::new(vec![left, right], sample_rate)
            }
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of sample frames (per-channel samples).
    pub fn frames(&self) -> usize {
        self.channels[0].len()
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Samples for one channel. Requesting a channel beyond what the track
    /// has yields the last one, so mono sources feed both stereo outputs.
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index.min(self.channels.len() - 1)]
    }

    /// Linearly resample to a new rate. Returns a new track; the original is
    /// untouched. Linear interpolation is adequate here — inputs are speech
    /// and program music headed for 16-bit broadcast output.
    pub fn resampled(&self, target_rate: u32) -> AudioTrack {
        if target_rate == self.sample_rate || self.frames() == 0 {
            let mut copy = self.clone();
            copy.sample_rate = target_rate.max(1);
            return copy;
        }

        let ratio = self.sample_rate as f64 / target_rate as f64;
        let out_frames = (self.frames() as f64 / ratio).ceil() as usize;

        let channels = self
            .channels
            .iter()
            .map(|src| {
                let mut out = Vec::with_capacity(out_frames);
                for i in 0..out_frames {
                    let pos = i as f64 * ratio;
                    let idx = pos.floor() as usize;
                    let frac = pos.fract() as f32;
                    let sample = if idx + 1 < src.len() {
                        src[idx] * (1.0 - frac) + src[idx + 1] * frac
                    } else if idx < src.len() {
                        src[idx]
                    } else {
                        0.0
                    };
                    out.push(sample);
                }
                out
            })
            .collect();

        AudioTrack {
            channels,
            sample_rate: target_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_bad_channel_counts() {
        assert!(AudioTrack::new(vec![], 44100).is_err());
        assert!(AudioTrack::new(vec![vec![0.0]; 3], 44100).is_err());
    }

    #[test]
    fn new_rejects_mismatched_channel_lengths() {
        let result = AudioTrack::new(vec![vec![0.0; 10], vec![0.0; 9]], 44100);
        assert!(result.is_err());
    }

    #[test]
    fn new_rejects_zero_sample_rate() {
        assert!(AudioTrack::new(vec![vec![0.0; 10]], 0).is_err());
    }

    #[test]
    fn duration_from_frames_and_rate() {
        let track = AudioTrack::new(vec![vec![0.0; 8000]], 8000).unwrap();
        assert_eq!(track.duration_secs(), 1.0);
        assert_eq!(track.frames(), 8000);
    }

    #[test]
    fn from_interleaved_splits_stereo() {
        let track = AudioTrack::from_interleaved(&[0.1, 0.2, 0.3, 0.4], 2, 44100).unwrap();
        assert_eq!(track.channel(0), &[0.1, 0.3]);
        assert_eq!(track.channel(1), &[0.2, 0.4]);
    }

    #[test]
    fn mono_channel_duplicates_for_right() {
        let track = AudioTrack::new(vec![vec![0.5, 0.6]], 44100).unwrap();
        assert_eq!(track.channel(0), track.channel(1));
    }

    #[test]
    fn decode_rejects_missing_file() {
        let result = AudioTrack::decode_file(Path::new("nonexistent.mp3"));
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Cannot open"));
    }

    #[test]
    fn resample_same_rate_is_identity() {
        let track = AudioTrack::new(vec![vec![0.1, 0.2, 0.3]], 8000).unwrap();
        let out = track.resampled(8000);
        assert_eq!(out.channel(0), track.channel(0));
    }

    #[test]
    fn resample_doubles_frame_count() {
        let track = AudioTrack::new(vec![vec![0.0; 100]], 8000).unwrap();
        let out = track.resampled(16000);
        assert_eq!(out.sample_rate(), 16000);
        assert_eq!(out.frames(), 200);
        assert!((out.duration_secs() - track.duration_secs()).abs() < 0.001);
    }

    #[test]
    fn resample_interpolates_between_samples() {
        let track = AudioTrack::new(vec![vec![0.0, 1.0]], 8000).unwrap();
        let out = track.resampled(16000);
        // Sample 1 sits halfway between the originals
        assert!((out.channel(0)[1] - 0.5).abs() < 1e-6);
    }
}
