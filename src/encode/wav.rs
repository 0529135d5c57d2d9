//! Uncompressed PCM16 container writer
//!
//! Builds the canonical 44-byte RIFF/WAVE header by hand and streams
//! interleaved little-endian 16-bit samples after it, in bounded blocks
//! with a progress report per block.

use crate::buffer::SampleBuffer;
use crate::error::{Result, TapewarpError};
use crate::render::{Phase, ProgressFn};

/// RIFF header size for a 16-bit PCM file
const HEADER_BYTES: usize = 44;

/// Output bit depth; fixed
const BITS_PER_SAMPLE: u16 = 16;

/// Frames written between progress reports
const BLOCK_FRAMES: usize = 65_536;

/// Convert one float sample to signed 16-bit PCM
///
/// Clamped to [-1, 1] then scaled asymmetrically: negative values use the
/// full -32768 reach, non-negative values top out at 32767, matching the
/// signed 16-bit range exactly.
pub fn pcm16(sample: f32) -> i16 {
    let sample = sample.clamp(-1.0, 1.0);
    if sample < 0.0 {
        (sample * 32768.0).floor().max(-32768.0) as i16
    } else {
        (sample * 32767.0).floor().min(32767.0) as i16
    }
}

/// Encode a buffer as a complete WAV byte blob
pub fn encode_wav(buffer: &SampleBuffer, progress: &mut ProgressFn<'_>) -> Result<Vec<u8>> {
    let num_channels = buffer.num_channels() as u16;
    let sample_rate = buffer.sample_rate();
    let num_frames = buffer.num_frames();

    let block_align = num_channels * (BITS_PER_SAMPLE / 8);
    let data_bytes = num_frames * block_align as usize;

    let mut out = Vec::new();
    out.try_reserve_exact(HEADER_BYTES + data_bytes)
        .map_err(|_| TapewarpError::ResourceExhausted {
            details: format!("WAV blob of {} bytes", HEADER_BYTES + data_bytes),
        })?;

    // RIFF chunk descriptor
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&((HEADER_BYTES - 8 + data_bytes) as u32).to_le_bytes());
    out.extend_from_slice(b"WAVE");

    // fmt sub-chunk
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes()); // sub-chunk size
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM format tag
    out.extend_from_slice(&num_channels.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&(sample_rate * block_align as u32).to_le_bytes()); // byte rate
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    // data sub-chunk
    out.extend_from_slice(b"data");
    out.extend_from_slice(&(data_bytes as u32).to_le_bytes());

    let mut frame = 0;
    while frame < num_frames {
        let block_end = (frame + BLOCK_FRAMES).min(num_frames);
        for i in frame..block_end {
            for channel in buffer.channels() {
                out.extend_from_slice(&pcm16(channel[i]).to_le_bytes());
            }
        }
        frame = block_end;
        progress(
            Phase::Encoding,
            Some(frame as f32 / num_frames as f32 * 100.0),
        );
    }

    Ok(out)
}
