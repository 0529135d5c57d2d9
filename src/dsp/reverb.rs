//! Two reverb algorithms behind one block-processing contract
//!
//! - `CombReverb`: four parallel delay lines summed onto a damped,
//!   lightly fed-back bus. Cheap, additive-sounding tail.
//! - `ConvolutionReverb`: FFT overlap-add convolution with a synthetic
//!   exponentially-decaying noise impulse, generated once per instance.
//!
//! Neither depends on wall-clock time, so both run identically against a
//! live stream or an offline render.

use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

/// Comb delay times in milliseconds, deliberately non-harmonically related
/// to avoid metallic ringing
const COMB_DELAYS_MS: [f32; 4] = [29.0, 73.0, 147.0, 201.0];

/// Feedback gain from the damped bus back into the delay inputs
const COMB_FEEDBACK: f32 = 0.22;

/// Damping low-pass corner on the comb bus
const COMB_DAMP_HZ: f32 = 4000.0;

/// Synthetic impulse length in samples
const IMPULSE_LEN: usize = 16384;

/// Impulse decay exponent
const IMPULSE_DECAY: f32 = 2.5;

/// PRNG seed for the impulse noise; fixed so renders are reproducible
const IMPULSE_SEED: u64 = 0x5EED_5EED_5EED_5EED;

/// Block-processing contract shared by both algorithms
///
/// State persists across calls; feeding a signal block by block is
/// equivalent to feeding it whole.
pub trait ReverbUnit {
    /// Run one channel's block through the reverb, returning the wet signal
    fn process_channel(&mut self, channel: usize, input: &[f32]) -> Vec<f32>;

    /// Drop all internal state (delay lines, pending overlap)
    fn reset(&mut self);
}

// ============================================================================
// Comb network
// ============================================================================

/// Fixed-length ring buffer delay line
#[derive(Debug, Clone)]
struct DelayLine {
    buffer: Vec<f32>,
    write_pos: usize,
}

impl DelayLine {
    fn new(delay_samples: usize) -> Self {
        Self {
            buffer: vec![0.0; delay_samples.max(1)],
            write_pos: 0,
        }
    }

    /// Read the sample written `len` steps ago, then store the new one
    fn tick(&mut self, input: f32) -> f32 {
        let output = self.buffer[self.write_pos];
        self.buffer[self.write_pos] = input;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
        output
    }

    fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}

/// Per-channel comb state
#[derive(Debug, Clone)]
struct CombChannel {
    lines: Vec<DelayLine>,
    /// One-pole low-pass state on the bus
    damp_state: f32,
    /// Last damped bus sample, fed back into the delay inputs
    feedback_sample: f32,
}

/// Delayed-feedback comb reverb network
///
/// Input fans out to the four delay lines; their outputs sum onto a bus
/// that is damped by a 4 kHz one-pole low-pass and fed back into the delay
/// inputs at 0.22. Loop gain stays below unity, so the tail always decays.
#[derive(Debug, Clone)]
pub struct CombReverb {
    channels: Vec<CombChannel>,
    /// One-pole coefficient for the damping filter
    damp_coeff: f32,
}

impl CombReverb {
    pub fn new(sample_rate: u32, num_channels: usize) -> Self {
        let sr = sample_rate as f32;
        let delays: Vec<usize> = COMB_DELAYS_MS
            .iter()
            .map(|ms| (ms / 1000.0 * sr).round() as usize)
            .collect();

        let channel = CombChannel {
            lines: delays.iter().map(|&d| DelayLine::new(d)).collect(),
            damp_state: 0.0,
            feedback_sample: 0.0,
        };

        Self {
            channels: vec![channel; num_channels],
            damp_coeff: 1.0 - (-2.0 * std::f32::consts::PI * COMB_DAMP_HZ / sr).exp(),
        }
    }
}

impl ReverbUnit for CombReverb {
    fn process_channel(&mut self, channel: usize, input: &[f32]) -> Vec<f32> {
        let state = &mut self.channels[channel];
        let mut output = Vec::with_capacity(input.len());

        for &sample in input {
            let mix_in = sample + state.feedback_sample * COMB_FEEDBACK;

            let mut bus = 0.0;
            for line in &mut state.lines {
                bus += line.tick(mix_in);
            }

            state.damp_state += self.damp_coeff * (bus - state.damp_state);
            state.feedback_sample = state.damp_state;
            output.push(state.damp_state);
        }

        output
    }

    fn reset(&mut self) {
        for channel in &mut self.channels {
            for line in &mut channel.lines {
                line.clear();
            }
            channel.damp_state = 0.0;
            channel.feedback_sample = 0.0;
        }
    }
}

// ============================================================================
// Convolution
// ============================================================================

/// xorshift64; deterministic noise source for the synthetic impulse
fn xorshift64(state: &mut u64) -> f32 {
    *state ^= *state << 13;
    *state ^= *state >> 7;
    *state ^= *state << 17;
    (*state as f64 / u64::MAX as f64) as f32
}

/// Generate the synthetic impulse response
///
/// Exponentially decaying white noise, L1-normalized so convolving any
/// signal in [-1, 1] cannot exceed that range.
fn synthetic_impulse() -> Vec<f32> {
    let mut rng = IMPULSE_SEED;
    let len = IMPULSE_LEN as f32;
    let mut impulse: Vec<f32> = (0..IMPULSE_LEN)
        .map(|i| {
            let noise = xorshift64(&mut rng) * 2.0 - 1.0;
            let envelope = (1.0 - i as f32 / len).powf(IMPULSE_DECAY);
            noise * envelope
        })
        .collect();

    let norm: f32 = impulse.iter().map(|s| s.abs()).sum();
    if norm > 0.0 {
        for sample in &mut impulse {
            *sample /= norm;
        }
    }
    impulse
}

/// Pending overlap-add output for one channel
#[derive(Clone)]
struct ConvChannel {
    /// Accumulated convolution tail, `fft_len` samples
    pending: Vec<f32>,
}

/// Synthetic-impulse convolution reverb
///
/// Streams arbitrary-length blocks through FFT overlap-add convolution
/// against the fixed impulse spectrum.
pub struct ConvolutionReverb {
    block_len: usize,
    fft_len: usize,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    /// FFT of the zero-padded impulse
    spectrum: Vec<Complex<f32>>,
    channels: Vec<ConvChannel>,
}

impl ConvolutionReverb {
    pub fn new(num_channels: usize) -> Self {
        let block_len = IMPULSE_LEN;
        let fft_len = (block_len + IMPULSE_LEN - 1).next_power_of_two();

        let mut planner = FftPlanner::<f32>::new();
        let forward = planner.plan_fft_forward(fft_len);
        let inverse = planner.plan_fft_inverse(fft_len);

        let mut spectrum: Vec<Complex<f32>> = synthetic_impulse()
            .into_iter()
            .map(|s| Complex::new(s, 0.0))
            .collect();
        spectrum.resize(fft_len, Complex::new(0.0, 0.0));
        forward.process(&mut spectrum);

        Self {
            block_len,
            fft_len,
            forward,
            inverse,
            spectrum,
            channels: vec![
                ConvChannel {
                    pending: vec![0.0; fft_len],
                };
                num_channels
            ],
        }
    }
}

impl ReverbUnit for ConvolutionReverb {
    fn process_channel(&mut self, channel: usize, input: &[f32]) -> Vec<f32> {
        let state = &mut self.channels[channel];
        let mut output = Vec::with_capacity(input.len());
        let scale = 1.0 / self.fft_len as f32;

        for block in input.chunks(self.block_len) {
            let mut buffer: Vec<Complex<f32>> = block
                .iter()
                .map(|&s| Complex::new(s, 0.0))
                .collect();
            buffer.resize(self.fft_len, Complex::new(0.0, 0.0));

            self.forward.process(&mut buffer);
            for (bin, h) in buffer.iter_mut().zip(self.spectrum.iter()) {
                *bin *= h;
            }
            self.inverse.process(&mut buffer);

            for (pending, bin) in state.pending.iter_mut().zip(buffer.iter()) {
                *pending += bin.re * scale;
            }

            // Emit this block's worth and slide the overlap window
            output.extend_from_slice(&state.pending[..block.len()]);
            state.pending.copy_within(block.len().., 0);
            let keep = self.fft_len - block.len();
            state.pending[keep..].fill(0.0);
        }

        output
    }

    fn reset(&mut self) {
        for channel in &mut self.channels {
            channel.pending.fill(0.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn impulse_signal(len: usize) -> Vec<f32> {
        let mut signal = vec![0.0; len];
        signal[0] = 1.0;
        signal
    }

    #[test]
    fn test_comb_silent_until_first_tap() {
        let sr = 44100u32;
        let mut reverb = CombReverb::new(sr, 1);
        let out = reverb.process_channel(0, &impulse_signal(4000));

        let first_tap = (0.029f32 * sr as f32).round() as usize;
        assert!(out[..first_tap].iter().all(|&s| s == 0.0));
        assert!(out[first_tap] != 0.0);
    }

    #[test]
    fn test_comb_tail_decays() {
        let mut reverb = CombReverb::new(44100, 1);
        let out = reverb.process_channel(0, &impulse_signal(88200));

        let energy = |s: &[f32]| s.iter().map(|x| x * x).sum::<f32>();
        let first = energy(&out[..44100]);
        let second = energy(&out[44100..]);
        assert!(second < first * 0.5, "tail not decaying: {} vs {}", first, second);
    }

    #[test]
    fn test_comb_switchable_state_survives_reset_only() {
        let mut reverb = CombReverb::new(44100, 2);
        let left = reverb.process_channel(0, &[1.0; 2000]);
        let right = reverb.process_channel(1, &[1.0; 2000]);
        // Channels are independent but identically configured
        assert_eq!(left, right);
        reverb.reset();
        let silent = reverb.process_channel(0, &[0.0; 2000]);
        assert!(silent.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_convolution_impulse_reproduces_normalized_ir() {
        let mut reverb = ConvolutionReverb::new(1);
        let mut out = reverb.process_channel(0, &impulse_signal(IMPULSE_LEN));
        out.extend(reverb.process_channel(0, &vec![0.0; IMPULSE_LEN]));

        let l1: f32 = out.iter().map(|s| s.abs()).sum();
        assert!((l1 - 1.0).abs() < 1e-2, "L1 of impulse response: {}", l1);

        let peak = out.iter().map(|s| s.abs()).fold(0.0f32, f32::max);
        assert!(peak < 1.0);
    }

    #[test]
    fn test_convolution_block_size_invariance() {
        let signal: Vec<f32> = (0..6000)
            .map(|i| ((i as f32) * 0.013).sin() * 0.5)
            .collect();

        let mut whole = ConvolutionReverb::new(1);
        let expected = whole.process_channel(0, &signal);

        let mut split = ConvolutionReverb::new(1);
        let mut actual = split.process_channel(0, &signal[..2500]);
        actual.extend(split.process_channel(0, &signal[2500..]));

        assert_eq!(expected.len(), actual.len());
        for (i, (a, b)) in expected.iter().zip(actual.iter()).enumerate() {
            assert!((a - b).abs() < 1e-4, "divergence at {}: {} vs {}", i, a, b);
        }
    }

    #[test]
    fn test_convolution_bounded_output() {
        let loud = vec![1.0f32; 20000];
        let mut reverb = ConvolutionReverb::new(1);
        let out = reverb.process_channel(0, &loud);
        let peak = out.iter().map(|s| s.abs()).fold(0.0f32, f32::max);
        assert!(peak <= 1.0 + 1e-4, "clipped: {}", peak);
    }

    #[test]
    fn test_impulse_is_deterministic() {
        assert_eq!(synthetic_impulse(), synthetic_impulse());
    }
}
