//! Sample buffer type shared by the live chain, renderer, and analyzers
//!
//! Samples are stored planar: one `Vec<f32>` per channel, amplitudes
//! nominally in [-1, 1]. The core never mutates a caller's buffer;
//! processing always produces a new one.

use crate::error::{Result, TapewarpError};

/// Planar floating-point audio buffer with a fixed sample rate
#[derive(Clone, Debug)]
pub struct SampleBuffer {
    /// One sample vector per channel, all the same length
    channels: Vec<Vec<f32>>,
    /// Sample rate in Hz
    sample_rate: u32,
}

impl SampleBuffer {
    /// Create a silent buffer with the given shape
    pub fn silent(num_channels: usize, num_frames: usize, sample_rate: u32) -> Result<Self> {
        Self::from_channels(vec![vec![0.0; num_frames]; num_channels.max(1)], sample_rate)
    }

    /// Create a buffer from per-channel sample vectors
    ///
    /// All channels must be the same length and non-empty, and the sample
    /// rate must be non-zero.
    pub fn from_channels(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(TapewarpError::InvalidInput {
                reason: "sample rate must be non-zero".to_string(),
            });
        }
        if channels.is_empty() {
            return Err(TapewarpError::InvalidInput {
                reason: "buffer has no channels".to_string(),
            });
        }
        let frames = channels[0].len();
        if frames == 0 {
            return Err(TapewarpError::InvalidInput {
                reason: "buffer has no samples".to_string(),
            });
        }
        if channels.iter().any(|c| c.len() != frames) {
            return Err(TapewarpError::InvalidInput {
                reason: "channels have mismatched lengths".to_string(),
            });
        }
        Ok(Self {
            channels,
            sample_rate,
        })
    }

    /// Number of channels
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Number of frames (samples per channel)
    pub fn num_frames(&self) -> usize {
        self.channels[0].len()
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        self.num_frames() as f64 / self.sample_rate as f64
    }

    /// Borrow a channel's samples
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    /// Borrow all channels
    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    /// Absolute peak amplitude across all channels
    pub fn peak(&self) -> f32 {
        self.channels
            .iter()
            .flat_map(|c| c.iter())
            .map(|s| s.abs())
            .fold(0.0f32, f32::max)
    }

    /// Average all channels into a single mono vector
    pub fn downmix_mono(&self) -> Vec<f32> {
        let frames = self.num_frames();
        let scale = 1.0 / self.channels.len() as f32;
        let mut mono = vec![0.0f32; frames];
        for channel in &self.channels {
            for (out, sample) in mono.iter_mut().zip(channel.iter()) {
                *out += sample * scale;
            }
        }
        mono
    }
}
