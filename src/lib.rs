//! Tapewarp - tape-style audio effect and export engine
//!
//! Takes decoded PCM through a fixed effect chain (speed/pitch, tone
//! shelves, sweepable filters, two reverb algorithms, volume), renders it
//! offline in bounded chunks, and encodes the result as WAV or - with an
//! injected frame codec - tagged MP3. A small tempo estimator rounds out
//! the analysis side.
//!
//! The library is headless and synchronous; the `tapewarp-cli` binary is a
//! thin front end over [`export::RenderJob`].

pub mod analysis;
pub mod buffer;
pub mod cli;
pub mod dsp;
pub mod encode;
pub mod error;
pub mod export;
pub mod io;
pub mod metadata;
pub mod render;
pub mod state;

pub use buffer::SampleBuffer;
pub use error::{Result, TapewarpError};
pub use export::{OutputFormat, RenderJob};
pub use state::{EffectState, ReverbAlgorithm};
