//! 16-bit PCM WAV encoding — a stateless transform from float samples to the
//! canonical 44-byte-header RIFF layout. This engine deliberately emits only
//! uncompressed PCM; compressed export belongs to other tooling.

/// Canonical header length: RIFF + fmt + data chunk headers.
pub const HEADER_LEN: usize = 44;

/// Convert one float sample to signed 16-bit PCM. Clamped to [-1, 1] first;
/// negative and positive halves scale by 32768/32767 so full scale cannot
/// overflow. Non-finite input encodes as silence.
#[inline]
pub fn sample_to_i16(sample: f32) -> i16 {
    if !sample.is_finite() {
        return 0;
    }
    let s = sample.clamp(-1.0, 1.0);
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

/// Interleave planar stereo buffers. The shorter channel pads with silence.
pub fn interleave(left: &[f32], right: &[f32]) -> Vec<f32> {
    let frames = left.len().max(right.len());
    let mut out = Vec::with_capacity(frames * 2);
    for i in 0..frames {
        out.push(left.get(i).copied().unwrap_or(0.0));
        out.push(right.get(i).copied().unwrap_or(0.0));
    }
    out
}

/// Encode an interleaved float buffer as a complete WAV file.
pub fn encode(samples: &[f32], channel_count: u16, sample_rate: u32) -> Vec<u8> {
    let data_bytes = (samples.len() * 2) as u32;
    let byte_rate = sample_rate * channel_count as u32 * 2;
    let block_align = channel_count * 2;

    let mut out = Vec::with_capacity(HEADER_LEN + samples.len() * 2);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_bytes).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM format tag
    out.extend_from_slice(&channel_count.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes()); // bits per sample
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_bytes.to_le_bytes());

    for &sample in samples {
        out.extend_from_slice(&sample_to_i16(sample).to_le_bytes());
    }
    out
}

/// The fields a canonical header carries. Parsed back out for verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub channel_count: u16,
    pub sample_rate: u32,
    pub data_bytes: u32,
}

impl WavHeader {
    /// Samples (across all channels) described by the data chunk.
    pub fn sample_count(&self) -> usize {
        self.data_bytes as usize / 2
    }
}

/// Parse the canonical 44-byte header produced by [`encode`].
pub fn parse_header(bytes: &[u8]) -> Result<WavHeader, String> {
    if bytes.len() < HEADER_LEN {
        return Err(format!("WAV too short: {} bytes", bytes.len()));
    }
    if &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err("Not a RIFF/WAVE file".to_string());
    }
    if &bytes[12..16] != b"fmt " || &bytes[36..40] != b"data" {
        return Err("Unexpected chunk layout".to_string());
    }
    let format_tag = u16::from_le_bytes([bytes[20], bytes[21]]);
    if format_tag != 1 {
        return Err(format!("Unsupported format tag: {}", format_tag));
    }
    Ok(WavHeader {
        channel_count: u16::from_le_bytes([bytes[22], bytes[23]]),
        sample_rate: u32::from_le_bytes([bytes[24], bytes[25], bytes[26], bytes[27]]),
        data_bytes: u32::from_le_bytes([bytes[40], bytes[41], bytes[42], bytes[43]]),
    })
}
