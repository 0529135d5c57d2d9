//! Audio file input
//!
//! Decodes WAV sources into the internal planar float format. All hound
//! bit depths are accepted and normalized to [-1, 1]; the source sample
//! rate is kept as-is, since the pipeline renders at the source rate.

use std::io::Cursor;
use std::path::Path;

use hound::{SampleFormat, WavReader};
use tracing::info;

use crate::buffer::SampleBuffer;
use crate::error::{Result, TapewarpError};

/// Decode a complete WAV byte blob into a planar buffer
pub fn decode_wav(bytes: &[u8]) -> Result<SampleBuffer> {
    let reader = WavReader::new(Cursor::new(bytes)).map_err(|e| TapewarpError::InvalidAudio {
        reason: format!("failed to parse WAV data: {}", e),
        source: Some(Box::new(e)),
    })?;

    let spec = reader.spec();
    let channels = spec.channels as usize;
    if channels == 0 {
        return Err(TapewarpError::InvalidAudio {
            reason: "WAV data declares zero channels".to_string(),
            source: None,
        });
    }

    let interleaved = read_samples_as_f32(reader, spec.bits_per_sample, spec.sample_format)?;
    if interleaved.is_empty() {
        return Err(TapewarpError::InvalidAudio {
            reason: "WAV data contains no samples".to_string(),
            source: None,
        });
    }

    let planar = deinterleave(&interleaved, channels);
    let buffer = SampleBuffer::from_channels(planar, spec.sample_rate)?;
    info!(
        channels,
        sample_rate = spec.sample_rate,
        frames = buffer.num_frames(),
        "decoded WAV source"
    );
    Ok(buffer)
}

/// Load and decode a WAV file from disk
pub fn load_wav(path: &Path) -> Result<SampleBuffer> {
    let bytes = std::fs::read(path)?;
    decode_wav(&bytes)
}

/// Read samples from the WAV reader and normalize to f32
fn read_samples_as_f32<R: std::io::Read>(
    mut reader: WavReader<R>,
    bits_per_sample: u16,
    sample_format: SampleFormat,
) -> Result<Vec<f32>> {
    match sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(|e| TapewarpError::InvalidAudio {
                reason: format!("failed to read float samples: {}", e),
                source: Some(Box::new(e)),
            }),
        SampleFormat::Int => match bits_per_sample {
            8 => reader
                .samples::<i8>()
                .map(|s| s.map(|v| v as f32 / 128.0))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| TapewarpError::InvalidAudio {
                    reason: format!("failed to read 8-bit samples: {}", e),
                    source: Some(Box::new(e)),
                }),
            16 => reader
                .samples::<i16>()
                .map(|s| s.map(|v| v as f32 / 32768.0))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| TapewarpError::InvalidAudio {
                    reason: format!("failed to read 16-bit samples: {}", e),
                    source: Some(Box::new(e)),
                }),
            24 => reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / 8_388_608.0))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| TapewarpError::InvalidAudio {
                    reason: format!("failed to read 24-bit samples: {}", e),
                    source: Some(Box::new(e)),
                }),
            32 => reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / 2_147_483_648.0))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| TapewarpError::InvalidAudio {
                    reason: format!("failed to read 32-bit int samples: {}", e),
                    source: Some(Box::new(e)),
                }),
            other => Err(TapewarpError::InvalidAudio {
                reason: format!("unsupported bit depth: {}-bit integer", other),
                source: None,
            }),
        },
    }
}

/// De-interleave samples from [L,R,L,R,...] to [[L,L,...], [R,R,...]]
fn deinterleave(samples: &[f32], channels: usize) -> Vec<Vec<f32>> {
    let frames = samples.len() / channels;
    let mut planar = vec![Vec::with_capacity(frames); channels];
    for (i, sample) in samples.iter().take(frames * channels).enumerate() {
        planar[i % channels].push(*sample);
    }
    planar
}
