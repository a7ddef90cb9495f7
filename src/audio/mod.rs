//! Audio capture and playback
//!
//! `capture` records the microphone and emits fixed-size base64 PCM frames
//! for the live transcription channel. `playback` speaks text through
//! either the platform synthesizer or the Gemini speech model. This module
//! holds the PCM conversion helpers both sides share.

pub mod capture;
pub mod playback;

pub use capture::AudioCapture;
pub use playback::Speaker;

use crate::error::{KaviraError, Result};
use base64::Engine;

/// Convert f32 samples to s16le with clamping
pub fn pcm_f32_to_i16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| (s * 32767.0).clamp(-32768.0, 32767.0) as i16)
        .collect()
}

/// Convert s16le bytes back to f32 samples in [-1, 1]
pub fn pcm_i16_bytes_to_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|c| i16::from_le_bytes([c[0], c[1]]) as f32 / 32768.0)
        .collect()
}

/// Encode one frame of f32 samples as base64 s16le PCM
pub fn frame_to_base64(samples: &[f32]) -> String {
    let ints = pcm_f32_to_i16(samples);
    let mut bytes = Vec::with_capacity(ints.len() * 2);
    for s in ints {
        bytes.extend_from_slice(&s.to_le_bytes());
    }
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Encode f32 samples as a 16-bit mono WAV file
///
/// # Errors
///
/// Returns `KaviraError::Audio` when encoding fails
pub fn wav_bytes(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::new(&mut cursor, spec)
        .map_err(|e| KaviraError::Audio(format!("WAV error: {}", e)))?;

    for &sample in samples {
        let s = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
        writer
            .write_sample(s)
            .map_err(|e| KaviraError::Audio(format!("WAV write error: {}", e)))?;
    }

    writer
        .finalize()
        .map_err(|e| KaviraError::Audio(format!("WAV finalize error: {}", e)))?;

    Ok(cursor.into_inner())
}
