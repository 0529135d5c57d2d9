//! Biquad filters for the tone stages
//!
//! Coefficients follow the Audio EQ Cookbook formulas.
//! Reference: https://www.w3.org/2011/audio/audio-eq-cookbook.html
//! Only the four responses the chain topology needs are implemented:
//! low shelf, high shelf, low-pass, high-pass.

use std::f64::consts::PI;

/// Biquad filter coefficients
/// Transfer function: H(z) = (b0 + b1*z^-1 + b2*z^-2) / (1 + a1*z^-1 + a2*z^-2)
#[derive(Debug, Clone, Copy, Default)]
pub struct BiquadCoeffs {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl BiquadCoeffs {
    /// Low shelf boosting/cutting below `frequency` by `gain_db`
    pub fn low_shelf(sample_rate: f64, frequency: f64, gain_db: f64, q: f64) -> Self {
        let (cos_w0, alpha) = Self::prewarp(sample_rate, frequency, q);
        let a = 10.0f64.powf(gain_db / 40.0);
        let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;
        Self::normalize(
            a * ((a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha),
            2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w0),
            a * ((a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha),
            (a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha,
            -2.0 * ((a - 1.0) + (a + 1.0) * cos_w0),
            (a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha,
        )
    }

    /// High shelf boosting/cutting above `frequency` by `gain_db`
    pub fn high_shelf(sample_rate: f64, frequency: f64, gain_db: f64, q: f64) -> Self {
        let (cos_w0, alpha) = Self::prewarp(sample_rate, frequency, q);
        let a = 10.0f64.powf(gain_db / 40.0);
        let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;
        Self::normalize(
            a * ((a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha),
            -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w0),
            a * ((a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha),
            (a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha,
            2.0 * ((a - 1.0) - (a + 1.0) * cos_w0),
            (a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha,
        )
    }

    /// Butterworth-style low-pass at `frequency`
    pub fn low_pass(sample_rate: f64, frequency: f64, q: f64) -> Self {
        let (cos_w0, alpha) = Self::prewarp(sample_rate, frequency, q);
        Self::normalize(
            (1.0 - cos_w0) / 2.0,
            1.0 - cos_w0,
            (1.0 - cos_w0) / 2.0,
            1.0 + alpha,
            -2.0 * cos_w0,
            1.0 - alpha,
        )
    }

    /// Butterworth-style high-pass at `frequency`
    pub fn high_pass(sample_rate: f64, frequency: f64, q: f64) -> Self {
        let (cos_w0, alpha) = Self::prewarp(sample_rate, frequency, q);
        Self::normalize(
            (1.0 + cos_w0) / 2.0,
            -(1.0 + cos_w0),
            (1.0 + cos_w0) / 2.0,
            1.0 + alpha,
            -2.0 * cos_w0,
            1.0 - alpha,
        )
    }

    fn prewarp(sample_rate: f64, frequency: f64, q: f64) -> (f64, f64) {
        // Keep the corner below Nyquist no matter what the knob mapping says
        let freq = frequency.clamp(10.0, sample_rate / 2.0 - 1.0);
        let q = q.clamp(0.1, 10.0);
        let w0 = 2.0 * PI * freq / sample_rate;
        (w0.cos(), w0.sin() / (2.0 * q))
    }

    fn normalize(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> Self {
        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }
}

/// Filter state for one channel (Direct Form I)
#[derive(Debug, Clone, Copy, Default)]
pub struct BiquadState {
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl BiquadState {
    /// Process a single sample
    pub fn process(&mut self, input: f64, coeffs: &BiquadCoeffs) -> f64 {
        let output = coeffs.b0 * input + coeffs.b1 * self.x1 + coeffs.b2 * self.x2
            - coeffs.a1 * self.y1
            - coeffs.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }

    /// Clear filter history
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// A biquad plus per-channel state, processing f32 blocks in place
#[derive(Debug, Clone)]
pub struct Biquad {
    coeffs: BiquadCoeffs,
    states: Vec<BiquadState>,
}

impl Biquad {
    pub fn new(coeffs: BiquadCoeffs, num_channels: usize) -> Self {
        Self {
            coeffs,
            states: vec![BiquadState::default(); num_channels],
        }
    }

    /// Swap in new coefficients, preserving filter history
    pub fn set_coeffs(&mut self, coeffs: BiquadCoeffs) {
        self.coeffs = coeffs;
    }

    /// Filter one channel's block in place
    pub fn process_channel(&mut self, channel: usize, samples: &mut [f32]) {
        let state = &mut self.states[channel];
        for sample in samples.iter_mut() {
            *sample = state.process(*sample as f64, &self.coeffs) as f32;
        }
    }

    pub fn reset(&mut self) {
        for state in &mut self.states {
            state.reset();
        }
    }
}
