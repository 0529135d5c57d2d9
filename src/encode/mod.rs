//! Output encoders
//!
//! Each encoder consumes a rendered [`SampleBuffer`](crate::buffer::SampleBuffer)
//! and produces a finished byte blob. WAV is always available; compressed
//! export needs a [`FrameEncoder`] capability from the host.

pub mod mp3;
pub mod tags;
pub mod wav;

pub use mp3::{encode_frames, FrameEncoder, FrameEncoderError, FRAME_SAMPLES};
pub use tags::write_tags;
pub use wav::{encode_wav, pcm16};
