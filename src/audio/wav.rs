use std::io::Cursor;

use anyhow::{Context, Result};
use hound::{SampleFormat, WavSpec, WavWriter};

/// Sample rate every recognizer path expects.
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// Convert a float sample to 16-bit PCM.
///
/// Clamped to [-1, 1], then the negative half-scale maps to 32768 and the
/// non-negative half to 32767, rounded to nearest. The asymmetry makes -1.0
/// land exactly on i16::MIN and 1.0 on i16::MAX.
pub fn sample_to_i16(sample: f32) -> i16 {
    let clamped = sample.clamp(-1.0, 1.0);
    if clamped < 0.0 {
        (clamped * 32768.0).round() as i16
    } else {
        (clamped * 32767.0).round() as i16
    }
}

/// Inverse of [`sample_to_i16`], used when feeding decoded PCM back as floats.
pub fn sample_to_f32(sample: i16) -> f32 {
    if sample < 0 {
        sample as f32 / 32768.0
    } else {
        sample as f32 / 32767.0
    }
}

/// Encode mono float PCM into a canonical 16-bit WAV container: 44-byte
/// header (RIFF chunk, `fmt ` subchunk with PCM=1/mono/16-bit, `data`
/// subchunk) followed by little-endian samples. This is the exact layout the
/// remote protocol requires.
pub fn encode_wav(pcm: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    let mut writer =
        WavWriter::new(&mut cursor, spec).context("Failed to create WAV writer")?;
    for &sample in pcm {
        writer
            .write_sample(sample_to_i16(sample))
            .context("Failed to write WAV sample")?;
    }
    writer.finalize().context("Failed to finalize WAV container")?;

    Ok(cursor.into_inner())
}
