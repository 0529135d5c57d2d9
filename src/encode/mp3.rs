//! Compressed export via an injected frame codec
//!
//! The core never links a codec directly: it converts audio to 16-bit PCM,
//! cuts it into fixed 1152-sample frames, and feeds them to whatever
//! `FrameEncoder` the caller supplies. The `lame` feature ships a LAME
//! adapter for convenience.

use tracing::debug;

use crate::buffer::SampleBuffer;
use crate::encode::wav::pcm16;
use crate::error::{Result, TapewarpError};
use crate::render::{Phase, ProgressFn};

/// Samples per codec frame (MPEG-1 Layer III granule pair)
pub const FRAME_SAMPLES: usize = 1152;

/// Frames fed between progress reports
const PROGRESS_EVERY_FRAMES: usize = 64;

/// Opaque codec failure, surfaced to users as `EncodingFailed`
pub type FrameEncoderError = Box<dyn std::error::Error + Send + Sync>;

/// External frame codec capability
///
/// `encode` receives equal-length left/right PCM slices (at most
/// [`FRAME_SAMPLES`] each; the final frame may be shorter) and returns any
/// bytes the codec emitted. `flush` drains whatever the codec buffered.
pub trait FrameEncoder {
    fn encode(
        &mut self,
        left: &[i16],
        right: &[i16],
    ) -> std::result::Result<Vec<u8>, FrameEncoderError>;

    fn flush(&mut self) -> std::result::Result<Vec<u8>, FrameEncoderError>;
}

/// Encode a buffer as a compressed elementary stream
///
/// Mono sources duplicate their single channel into both codec inputs.
pub fn encode_frames(
    buffer: &SampleBuffer,
    encoder: &mut dyn FrameEncoder,
    progress: &mut ProgressFn<'_>,
) -> Result<Vec<u8>> {
    let left_samples: Vec<i16> = buffer.channel(0).iter().map(|&s| pcm16(s)).collect();
    let right_samples: Vec<i16> = if buffer.num_channels() > 1 {
        buffer.channel(1).iter().map(|&s| pcm16(s)).collect()
    } else {
        left_samples.clone()
    };

    let total_frames = left_samples.len().div_ceil(FRAME_SAMPLES);
    let mut out = Vec::new();

    for (index, (left, right)) in left_samples
        .chunks(FRAME_SAMPLES)
        .zip(right_samples.chunks(FRAME_SAMPLES))
        .enumerate()
    {
        let encoded = encoder
            .encode(left, right)
            .map_err(|e| TapewarpError::EncodingFailed {
                reason: e.to_string(),
            })?;
        out.extend_from_slice(&encoded);

        if (index + 1) % PROGRESS_EVERY_FRAMES == 0 {
            progress(
                Phase::Encoding,
                Some((index + 1) as f32 / total_frames as f32 * 100.0),
            );
        }
    }

    let tail = encoder
        .flush()
        .map_err(|e| TapewarpError::EncodingFailed {
            reason: e.to_string(),
        })?;
    out.extend_from_slice(&tail);
    progress(Phase::Encoding, Some(100.0));

    debug!(bytes = out.len(), total_frames, "compressed stream complete");
    Ok(out)
}

/// LAME-backed frame encoder, available with the `lame` feature
#[cfg(feature = "lame")]
pub mod lame {
    use std::mem::MaybeUninit;

    use mp3lame_encoder::{Bitrate, Builder, Encoder, FlushNoGap, InterleavedPcm, Quality};

    use super::{FrameEncoder, FrameEncoderError};

    /// Frame encoder bound to libmp3lame
    pub struct LameFrameEncoder {
        encoder: Encoder,
    }

    impl LameFrameEncoder {
        /// Configure LAME for the given stream; `None` when the codec
        /// cannot be initialized
        pub fn new(sample_rate: u32, bitrate_kbps: u32) -> Option<Self> {
            let mut builder = Builder::new()?;
            builder.set_sample_rate(sample_rate).ok()?;
            builder.set_num_channels(2).ok()?;
            builder.set_brate(pick_bitrate(bitrate_kbps)).ok()?;
            builder.set_quality(Quality::Best).ok()?;
            let encoder = builder.build().ok()?;
            Some(Self { encoder })
        }
    }

    fn pick_bitrate(kbps: u32) -> Bitrate {
        match kbps {
            0..=96 => Bitrate::Kbps96,
            97..=112 => Bitrate::Kbps112,
            113..=128 => Bitrate::Kbps128,
            129..=160 => Bitrate::Kbps160,
            161..=192 => Bitrate::Kbps192,
            193..=224 => Bitrate::Kbps224,
            225..=256 => Bitrate::Kbps256,
            _ => Bitrate::Kbps320,
        }
    }

    fn drain(buffer: Vec<MaybeUninit<u8>>, written: usize) -> Vec<u8> {
        buffer[..written]
            .iter()
            .map(|b| unsafe { b.assume_init() })
            .collect()
    }

    impl FrameEncoder for LameFrameEncoder {
        fn encode(
            &mut self,
            left: &[i16],
            right: &[i16],
        ) -> Result<Vec<u8>, FrameEncoderError> {
            let mut interleaved = Vec::with_capacity(left.len() * 2);
            for (l, r) in left.iter().zip(right.iter()) {
                interleaved.push(*l);
                interleaved.push(*r);
            }

            // LAME worst case: 1.25x samples + 7200
            let capacity = interleaved.len() * 5 / 4 + 7200;
            let mut out: Vec<MaybeUninit<u8>> = vec![MaybeUninit::uninit(); capacity];
            let written = self
                .encoder
                .encode(InterleavedPcm(&interleaved), &mut out)
                .map_err(|e| format!("{:?}", e))?;
            Ok(drain(out, written))
        }

        fn flush(&mut self) -> Result<Vec<u8>, FrameEncoderError> {
            let mut out: Vec<MaybeUninit<u8>> = vec![MaybeUninit::uninit(); 7200];
            let written = self
                .encoder
                .flush::<FlushNoGap>(&mut out)
                .map_err(|e| format!("{:?}", e))?;
            Ok(drain(out, written))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::sink_progress;

    /// Deterministic stand-in codec: emits a 4-byte length header per frame
    pub struct StubEncoder {
        pub frames: usize,
        pub fail_at: Option<usize>,
    }

    impl StubEncoder {
        pub fn new() -> Self {
            Self {
                frames: 0,
                fail_at: None,
            }
        }
    }

    impl FrameEncoder for StubEncoder {
        fn encode(
            &mut self,
            left: &[i16],
            right: &[i16],
        ) -> std::result::Result<Vec<u8>, FrameEncoderError> {
            assert_eq!(left.len(), right.len());
            if self.fail_at == Some(self.frames) {
                return Err("codec blew up".into());
            }
            self.frames += 1;
            Ok((left.len() as u32).to_le_bytes().to_vec())
        }

        fn flush(&mut self) -> std::result::Result<Vec<u8>, FrameEncoderError> {
            Ok(vec![0xEE])
        }
    }

    #[test]
    fn test_frame_partitioning() {
        // 3000 samples -> frames of 1152, 1152, 696
        let buffer = SampleBuffer::silent(2, 3000, 44100).unwrap();
        let mut encoder = StubEncoder::new();
        let bytes = encode_frames(&buffer, &mut encoder, &mut sink_progress).unwrap();

        assert_eq!(encoder.frames, 3);
        // Three length headers plus the flush marker
        assert_eq!(bytes.len(), 3 * 4 + 1);
        assert_eq!(&bytes[0..4], &1152u32.to_le_bytes());
        assert_eq!(&bytes[8..12], &696u32.to_le_bytes());
        assert_eq!(*bytes.last().unwrap(), 0xEE);
    }

    #[test]
    fn test_mono_duplicates_channel() {
        let buffer = SampleBuffer::silent(1, 1152, 44100).unwrap();
        let mut encoder = StubEncoder::new();
        encode_frames(&buffer, &mut encoder, &mut sink_progress).unwrap();
        assert_eq!(encoder.frames, 1);
    }

    #[test]
    fn test_codec_failure_maps_to_encoding_failed() {
        let buffer = SampleBuffer::silent(2, 5000, 44100).unwrap();
        let mut encoder = StubEncoder::new();
        encoder.fail_at = Some(2);
        let result = encode_frames(&buffer, &mut encoder, &mut sink_progress);
        match result {
            Err(TapewarpError::EncodingFailed { reason }) => {
                assert!(reason.contains("codec blew up"));
            }
            other => panic!("expected EncodingFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_progress_cadence() {
        // 100 frames of samples -> one report at frame 64, one final
        let buffer = SampleBuffer::silent(2, FRAME_SAMPLES * 100, 44100).unwrap();
        let mut encoder = StubEncoder::new();
        let mut reports = Vec::new();
        encode_frames(&buffer, &mut encoder, &mut |_, pct| {
            reports.push(pct.unwrap())
        })
        .unwrap();
        assert_eq!(reports.len(), 2);
        assert!((reports[0] - 64.0).abs() < 1e-4);
        assert_eq!(reports[1], 100.0);
    }
}
