//! Signal processing stages
//!
//! The chain wires a fixed topology; biquad, resampler, and reverb are its
//! building blocks.

mod biquad;
mod chain;
mod resampler;
mod reverb;

pub use biquad::{Biquad, BiquadCoeffs, BiquadState};
pub use chain::SignalChain;
pub use resampler::resample_window;
pub use reverb::{CombReverb, ConvolutionReverb, ReverbUnit};
