//! The fixed-topology signal chain
//!
//! Stage order: rate/pitch source -> bass shelf -> treble shelf -> low-pass
//! -> high-pass -> {dry, comb send, convolution send} -> dry/wet mix ->
//! master gain. Parameters can be set in any order, any number of times;
//! every setter re-derives the affected coefficients immediately.
//!
//! Both reverb algorithms process every block regardless of which one is
//! selected, so switching algorithms only swaps which wet bus reaches the
//! mixer and is click-free.

use tracing::debug;

use crate::buffer::SampleBuffer;
use crate::dsp::biquad::{Biquad, BiquadCoeffs};
use crate::dsp::resampler::resample_window;
use crate::dsp::reverb::{CombReverb, ConvolutionReverb, ReverbUnit};
use crate::error::{Result, TapewarpError};
use crate::state::{
    highpass_cutoff_hz, lowpass_cutoff_hz, reverb_mix, EffectState, ReverbAlgorithm,
};

/// Bass shelf corner frequency
const BASS_SHELF_HZ: f64 = 200.0;

/// Treble shelf corner frequency
const TREBLE_SHELF_HZ: f64 = 4000.0;

/// Q for all fixed tone stages
const TONE_Q: f64 = std::f64::consts::FRAC_1_SQRT_2;

/// One audio source's effect graph
pub struct SignalChain {
    sample_rate: u32,
    num_channels: usize,
    state: EffectState,

    bass: Biquad,
    treble: Biquad,
    lowpass: Biquad,
    highpass: Biquad,

    comb: CombReverb,
    convolution: ConvolutionReverb,

    disposed: bool,
}

impl SignalChain {
    /// Build the full graph for a source with the given shape
    pub fn new(sample_rate: u32, num_channels: usize, state: &EffectState) -> Self {
        let state = state.clone().clamped();
        let sr = sample_rate as f64;
        let chain = Self {
            sample_rate,
            num_channels,
            bass: Biquad::new(
                BiquadCoeffs::low_shelf(sr, BASS_SHELF_HZ, state.bass_db as f64, TONE_Q),
                num_channels,
            ),
            treble: Biquad::new(
                BiquadCoeffs::high_shelf(sr, TREBLE_SHELF_HZ, state.treble_db as f64, TONE_Q),
                num_channels,
            ),
            lowpass: Biquad::new(
                BiquadCoeffs::low_pass(sr, lowpass_cutoff_hz(state.lowpass) as f64, TONE_Q),
                num_channels,
            ),
            highpass: Biquad::new(
                BiquadCoeffs::high_pass(sr, highpass_cutoff_hz(state.highpass) as f64, TONE_Q),
                num_channels,
            ),
            comb: CombReverb::new(sample_rate, num_channels),
            convolution: ConvolutionReverb::new(num_channels),
            state,
            disposed: false,
        };
        debug!(
            sample_rate,
            num_channels,
            rate = chain.state.effective_rate(),
            "signal chain constructed"
        );
        chain
    }

    /// Current parameter snapshot
    pub fn state(&self) -> &EffectState {
        &self.state
    }

    /// Combined playback rate of the source stage
    pub fn effective_rate(&self) -> f64 {
        self.state.effective_rate()
    }

    /// Scale playback rate; pitch is controlled separately by `set_detune`
    pub fn set_speed(&mut self, speed: f32) {
        self.state.set_speed(speed);
    }

    /// Shift pitch in cents without touching the speed knob
    pub fn set_detune(&mut self, cents: f32) {
        self.state.set_detune(cents);
    }

    pub fn set_bass_db(&mut self, db: f32) {
        self.state.set_bass_db(db);
        self.bass.set_coeffs(BiquadCoeffs::low_shelf(
            self.sample_rate as f64,
            BASS_SHELF_HZ,
            db as f64,
            TONE_Q,
        ));
    }

    pub fn set_treble_db(&mut self, db: f32) {
        self.state.set_treble_db(db);
        self.treble.set_coeffs(BiquadCoeffs::high_shelf(
            self.sample_rate as f64,
            TREBLE_SHELF_HZ,
            db as f64,
            TONE_Q,
        ));
    }

    /// Low-pass amount knob, 0-100 mapped onto an exponential cutoff sweep
    pub fn set_lowpass(&mut self, amount: f32) {
        self.state.set_lowpass(amount);
        self.lowpass.set_coeffs(BiquadCoeffs::low_pass(
            self.sample_rate as f64,
            lowpass_cutoff_hz(self.state.lowpass) as f64,
            TONE_Q,
        ));
    }

    /// High-pass amount knob, 0-100
    pub fn set_highpass(&mut self, amount: f32) {
        self.state.set_highpass(amount);
        self.highpass.set_coeffs(BiquadCoeffs::high_pass(
            self.sample_rate as f64,
            highpass_cutoff_hz(self.state.highpass) as f64,
            TONE_Q,
        ));
    }

    pub fn set_reverb_amount(&mut self, amount: f32) {
        self.state.set_reverb_amount(amount);
    }

    /// Select which reverb bus feeds the wet mixer
    ///
    /// Both algorithms keep running in the background, so toggling back and
    /// forth never resets either tail.
    pub fn set_reverb_algorithm(&mut self, algorithm: ReverbAlgorithm) {
        self.state.set_reverb_algorithm(algorithm);
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.state.set_volume(volume);
    }

    /// Process a source buffer through the whole chain
    ///
    /// Output length is `round(frames / effective_rate)`.
    pub fn process(&mut self, source: &SampleBuffer) -> Result<SampleBuffer> {
        let out_len = (source.num_frames() as f64 / self.effective_rate()).round() as usize;
        self.process_len(source, out_len)
    }

    /// Process a source window into an exact output length
    ///
    /// The offline renderer uses this to make chunk boundaries land on
    /// precomputed frame counts.
    pub fn process_len(&mut self, source: &SampleBuffer, out_len: usize) -> Result<SampleBuffer> {
        if self.disposed {
            return Err(TapewarpError::InvalidInput {
                reason: "signal chain has been disposed".to_string(),
            });
        }
        if source.num_channels() != self.num_channels {
            return Err(TapewarpError::InvalidInput {
                reason: format!(
                    "chain built for {} channels, source has {}",
                    self.num_channels,
                    source.num_channels()
                ),
            });
        }
        if out_len == 0 {
            return Err(TapewarpError::InvalidInput {
                reason: "requested zero output frames".to_string(),
            });
        }

        let rate = self.effective_rate();
        let (dry_gain, wet_gain) = reverb_mix(self.state.reverb_algorithm, self.state.reverb_amount);
        let volume = self.state.volume;

        let mut channels = Vec::with_capacity(self.num_channels);
        for ch in 0..self.num_channels {
            // Source stage: playback-rate resample
            let mut block = resample_window(source.channel(ch), rate, out_len);

            // Tone stages in series
            self.bass.process_channel(ch, &mut block);
            self.treble.process_channel(ch, &mut block);
            self.lowpass.process_channel(ch, &mut block);
            self.highpass.process_channel(ch, &mut block);

            // Both reverb buses always run; only the active one is mixed
            let comb_wet = self.comb.process_channel(ch, &block);
            let conv_wet = self.convolution.process_channel(ch, &block);
            let wet = match self.state.reverb_algorithm {
                ReverbAlgorithm::Comb => &comb_wet,
                ReverbAlgorithm::Convolution => &conv_wet,
            };

            for (sample, wet_sample) in block.iter_mut().zip(wet.iter()) {
                *sample = (*sample * dry_gain + wet_sample * wet_gain) * volume;
            }

            channels.push(block);
        }

        SampleBuffer::from_channels(channels, self.sample_rate)
    }

    /// Release all owned stage state; idempotent
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.comb.reset();
        self.convolution.reset();
        self.bass.reset();
        self.treble.reset();
        self.lowpass.reset();
        self.highpass.reset();
        self.disposed = true;
        debug!("signal chain disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sine_buffer(freq: f32, sample_rate: u32, secs: f32, channels: usize) -> SampleBuffer {
        let frames = (sample_rate as f32 * secs) as usize;
        let channel: Vec<f32> = (0..frames)
            .map(|i| {
                (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin() * 0.5
            })
            .collect();
        SampleBuffer::from_channels(vec![channel; channels], sample_rate).unwrap()
    }

    #[test]
    fn test_neutral_state_preserves_length() {
        let source = sine_buffer(440.0, 44100, 1.0, 2);
        let mut chain = SignalChain::new(44100, 2, &EffectState::new());
        let out = chain.process(&source).unwrap();
        assert_eq!(out.num_frames(), source.num_frames());
        assert_eq!(out.num_channels(), 2);
    }

    #[test]
    fn test_speed_shortens_output() {
        let source = sine_buffer(440.0, 44100, 2.0, 1);
        let mut state = EffectState::new();
        state.set_speed(2.0);
        let mut chain = SignalChain::new(44100, 1, &state);
        let out = chain.process(&source).unwrap();
        assert_eq!(out.num_frames(), source.num_frames() / 2);
    }

    #[test]
    fn test_detune_shortens_output_like_speed() {
        let source = sine_buffer(440.0, 44100, 1.0, 1);
        let mut state = EffectState::new();
        state.set_detune(1200.0); // +1 octave = 2x rate
        let mut chain = SignalChain::new(44100, 1, &state);
        let out = chain.process(&source).unwrap();
        assert_eq!(out.num_frames(), source.num_frames() / 2);
    }

    #[test]
    fn test_volume_scales_output() {
        let source = sine_buffer(440.0, 44100, 0.5, 1);
        let mut state = EffectState::new();
        state.set_volume(0.5);
        let mut chain = SignalChain::new(44100, 1, &state);
        let out = chain.process(&source).unwrap();

        let mut reference_chain = SignalChain::new(44100, 1, &EffectState::new());
        let reference = reference_chain.process(&source).unwrap();

        for (half, full) in out.channel(0).iter().zip(reference.channel(0).iter()) {
            assert_relative_eq!(*half, full * 0.5, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_zero_reverb_comb_is_dry_only() {
        let source = sine_buffer(440.0, 44100, 0.5, 1);
        let mut chain = SignalChain::new(44100, 1, &EffectState::new());
        let out = chain.process(&source).unwrap();

        // Neutral filters are near-transparent away from the band edges;
        // with wet gain 0 the output tracks the dry path
        let rms = |s: &[f32]| (s.iter().map(|x| x * x).sum::<f32>() / s.len() as f32).sqrt();
        let input_rms = rms(source.channel(0));
        let output_rms = rms(out.channel(0));
        assert!((output_rms - input_rms).abs() < input_rms * 0.05);
    }

    #[test]
    fn test_reverb_algorithm_switch_is_state_preserving() {
        let source = sine_buffer(220.0, 44100, 0.25, 1);
        let mut state = EffectState::new();
        state.set_reverb_amount(50.0);
        let mut chain = SignalChain::new(44100, 1, &state);

        chain.process(&source).unwrap();
        chain.set_reverb_algorithm(ReverbAlgorithm::Convolution);
        assert_eq!(
            chain.state().reverb_algorithm,
            ReverbAlgorithm::Convolution
        );
        // Chain keeps processing after the switch without error
        chain.process(&source).unwrap();
        chain.set_reverb_algorithm(ReverbAlgorithm::Comb);
        chain.process(&source).unwrap();
    }

    #[test]
    fn test_dispose_is_idempotent_and_final() {
        let source = sine_buffer(440.0, 44100, 0.1, 1);
        let mut chain = SignalChain::new(44100, 1, &EffectState::new());
        chain.dispose();
        chain.dispose();
        assert!(chain.is_disposed());
        assert!(chain.process(&source).is_err());
    }

    #[test]
    fn test_channel_mismatch_rejected() {
        let source = sine_buffer(440.0, 44100, 0.1, 1);
        let mut chain = SignalChain::new(44100, 2, &EffectState::new());
        assert!(matches!(
            chain.process(&source),
            Err(TapewarpError::InvalidInput { .. })
        ));
    }
}
