//! Effect parameter record and knob-to-parameter mappings
//!
//! `EffectState` is the value snapshot a render job captures. Percentage
//! knobs (0-100) clamp on store; `speed` and `volume` clamp non-negative.
//! The cutoff and dry/wet mappings live here so the live chain and the
//! offline renderer derive identical coefficients from one source.

use serde::{Deserialize, Serialize};

/// Fully-open low-pass cutoff (knob at 0)
pub const LOWPASS_OPEN_HZ: f32 = 20_000.0;

/// Fully-open high-pass cutoff (knob at 0)
pub const HIGHPASS_OPEN_HZ: f32 = 20.0;

/// Exponent span of the low-pass knob sweep (octaves at knob 100)
const LOWPASS_SWEEP_OCTAVES: f32 = 6.64;

/// Exponent span of the high-pass knob sweep (octaves at knob 100)
const HIGHPASS_SWEEP_OCTAVES: f32 = 7.64;

/// Wet ceiling for the comb reverb send (knob at 100)
const COMB_WET_MAX: f32 = 0.45;

/// Wet ceiling for the convolution reverb blend (knob at 100)
const CONVOLUTION_WET_MAX: f32 = 0.5;

/// Which reverb algorithm feeds the wet mix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReverbAlgorithm {
    /// Delayed-feedback comb network; additive wet send, dry stays at unity
    #[default]
    Comb,
    /// Synthetic-impulse convolution; complementary dry/wet blend
    Convolution,
}

/// Parameter snapshot for one signal chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectState {
    /// Playback-rate multiplier (> 0)
    pub speed: f32,
    /// Pitch shift in cents, independent of the speed knob
    pub detune_cents: f32,
    /// Bass shelf gain in dB
    pub bass_db: f32,
    /// Treble shelf gain in dB
    pub treble_db: f32,
    /// Low-pass amount knob, 0-100
    pub lowpass: f32,
    /// High-pass amount knob, 0-100
    pub highpass: f32,
    /// Reverb amount knob, 0-100
    pub reverb_amount: f32,
    /// Active reverb algorithm
    pub reverb_algorithm: ReverbAlgorithm,
    /// Master linear gain (>= 0)
    pub volume: f32,
}

impl Default for EffectState {
    fn default() -> Self {
        Self {
            speed: 1.0,
            detune_cents: 0.0,
            bass_db: 0.0,
            treble_db: 0.0,
            lowpass: 0.0,
            highpass: 0.0,
            reverb_amount: 0.0,
            reverb_algorithm: ReverbAlgorithm::Comb,
            volume: 1.0,
        }
    }
}

impl EffectState {
    /// Neutral state: unity speed and volume, everything else off
    pub fn new() -> Self {
        Self::default()
    }

    /// Clamp every field into its stored range
    ///
    /// Applied by the setters and by anything that accepts a whole record
    /// from outside (deserialized presets, CLI flags).
    pub fn clamped(mut self) -> Self {
        self.speed = self.speed.max(0.0);
        self.volume = self.volume.max(0.0);
        self.lowpass = self.lowpass.clamp(0.0, 100.0);
        self.highpass = self.highpass.clamp(0.0, 100.0);
        self.reverb_amount = self.reverb_amount.clamp(0.0, 100.0);
        self
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed.max(0.0);
    }

    pub fn set_detune(&mut self, cents: f32) {
        self.detune_cents = cents;
    }

    pub fn set_bass_db(&mut self, db: f32) {
        self.bass_db = db;
    }

    pub fn set_treble_db(&mut self, db: f32) {
        self.treble_db = db;
    }

    pub fn set_lowpass(&mut self, amount: f32) {
        self.lowpass = amount.clamp(0.0, 100.0);
    }

    pub fn set_highpass(&mut self, amount: f32) {
        self.highpass = amount.clamp(0.0, 100.0);
    }

    pub fn set_reverb_amount(&mut self, amount: f32) {
        self.reverb_amount = amount.clamp(0.0, 100.0);
    }

    pub fn set_reverb_algorithm(&mut self, algorithm: ReverbAlgorithm) {
        self.reverb_algorithm = algorithm;
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.max(0.0);
    }

    /// Combined playback rate: speed times the detune ratio
    pub fn effective_rate(&self) -> f64 {
        self.speed as f64 * (self.detune_cents as f64 / 1200.0).exp2()
    }

    /// "Nightcore" preset: faster playback, slight brightness
    pub fn nightcore() -> Self {
        Self {
            speed: 1.25,
            treble_db: 2.0,
            ..Self::default()
        }
    }

    /// "Slowed" preset: slower playback with a convolution reverb wash
    pub fn slowed() -> Self {
        Self {
            speed: 0.85,
            reverb_amount: 40.0,
            reverb_algorithm: ReverbAlgorithm::Convolution,
            bass_db: 2.0,
            ..Self::default()
        }
    }
}

/// Map the low-pass knob to a cutoff frequency
///
/// Exponential sweep from fully open (20 kHz) down 6.64 octaves, so a
/// linear knob reads as a perceptually linear sweep.
pub fn lowpass_cutoff_hz(amount: f32) -> f32 {
    let amount = amount.clamp(0.0, 100.0);
    if amount > 0.0 {
        LOWPASS_OPEN_HZ * (-LOWPASS_SWEEP_OCTAVES * amount / 100.0).exp2()
    } else {
        LOWPASS_OPEN_HZ
    }
}

/// Map the high-pass knob to a cutoff frequency
///
/// Exponential sweep from fully open (20 Hz) up 7.64 octaves.
pub fn highpass_cutoff_hz(amount: f32) -> f32 {
    let amount = amount.clamp(0.0, 100.0);
    if amount > 0.0 {
        HIGHPASS_OPEN_HZ * (HIGHPASS_SWEEP_OCTAVES * amount / 100.0).exp2()
    } else {
        HIGHPASS_OPEN_HZ
    }
}

/// Dry and wet mixer gains for a reverb amount under the given algorithm
///
/// The comb network is an additive send: dry stays at unity and only the
/// wet bus scales. The convolution reverb is a true blend: dry gives way
/// as wet rises. The asymmetry is intentional; a feedback-delay tail reads
/// as "added space" while a room convolution reads as replacement.
pub fn reverb_mix(algorithm: ReverbAlgorithm, amount: f32) -> (f32, f32) {
    let amount = amount.clamp(0.0, 100.0) / 100.0;
    match algorithm {
        ReverbAlgorithm::Comb => (1.0, amount * COMB_WET_MAX),
        ReverbAlgorithm::Convolution => {
            let wet = amount * CONVOLUTION_WET_MAX;
            (1.0 - wet, wet)
        }
    }
}
