//! Offline, chunked, non-real-time renderer
//!
//! Reproduces the live chain deterministically over the whole source. The
//! output timeline is cut into fixed 60-second chunks; each chunk gets a
//! fresh, isolated `SignalChain` so no filter state leaks across chunk
//! boundaries. Between chunks the renderer calls the progress sink - the
//! single-threaded host's opportunity to stay responsive.

use tracing::{debug, info};

use crate::buffer::SampleBuffer;
use crate::dsp::SignalChain;
use crate::error::{Result, TapewarpError};
use crate::state::EffectState;

/// Default chunk length on the output timeline
const DEFAULT_CHUNK_SECS: f64 = 60.0;

/// Extra source frames pulled per chunk so interpolation never reads past
/// the window
const WINDOW_GUARD_FRAMES: usize = 2;

/// Which long-running stage a progress report belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Rendering,
    Encoding,
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Rendering => "rendering",
            Phase::Encoding => "encoding",
        }
    }
}

/// Progress sink: `(phase, percent)`; percent is `None` when a stage
/// cannot estimate completion
pub type ProgressFn<'a> = dyn FnMut(Phase, Option<f32>) + 'a;

/// Progress sink that discards every report
pub fn sink_progress(_phase: Phase, _percent: Option<f32>) {}

/// Drives a signal chain across a whole source in bounded chunks
pub struct OfflineRenderer<'a> {
    source: &'a SampleBuffer,
    state: EffectState,
    chunk_secs: f64,
}

impl<'a> OfflineRenderer<'a> {
    pub fn new(source: &'a SampleBuffer, state: EffectState) -> Self {
        Self {
            source,
            state: state.clamped(),
            chunk_secs: DEFAULT_CHUNK_SECS,
        }
    }

    /// Override the chunk length (used by tests to exercise boundaries)
    pub fn with_chunk_seconds(mut self, secs: f64) -> Self {
        self.chunk_secs = secs.max(0.01);
        self
    }

    /// Total output frames for the current state
    pub fn output_frames(&self) -> usize {
        (self.source.num_frames() as f64 / self.state.effective_rate()).round() as usize
    }

    /// Render the whole source, reporting progress per chunk
    pub fn render(&self, progress: &mut ProgressFn<'_>) -> Result<SampleBuffer> {
        let rate = self.state.effective_rate();
        if !rate.is_finite() || rate <= 0.0 {
            return Err(TapewarpError::InvalidInput {
                reason: format!("effective playback rate must be positive, got {}", rate),
            });
        }

        let sample_rate = self.source.sample_rate();
        let num_channels = self.source.num_channels();
        let source_frames = self.source.num_frames();
        let total_frames = self.output_frames();
        if total_frames == 0 {
            return Err(TapewarpError::InvalidInput {
                reason: "render would produce no samples".to_string(),
            });
        }

        let chunk_frames = ((self.chunk_secs * sample_rate as f64).round() as usize).max(1);
        let chunk_count = total_frames.div_ceil(chunk_frames);
        info!(
            total_frames,
            chunk_count,
            rate,
            "starting offline render"
        );

        let mut rendered: Vec<Vec<f32>> = Vec::with_capacity(num_channels);
        for _ in 0..num_channels {
            let mut channel = Vec::new();
            channel
                .try_reserve_exact(total_frames)
                .map_err(|_| TapewarpError::ResourceExhausted {
                    details: format!("output buffer of {} frames", total_frames),
                })?;
            rendered.push(channel);
        }

        for chunk_index in 0..chunk_count {
            let out_start = chunk_index * chunk_frames;
            let out_len = chunk_frames.min(total_frames - out_start);

            let src_start = ((out_start as f64 * rate).floor() as usize).min(source_frames - 1);
            let src_len = ((out_len as f64 * rate).ceil() as usize + WINDOW_GUARD_FRAMES)
                .min(source_frames - src_start);

            let window = self.copy_window(src_start, src_len.max(1))?;

            // Fresh chain per chunk: no cross-chunk filter-state leakage
            let mut chain = SignalChain::new(sample_rate, num_channels, &self.state);
            let chunk = chain.process_len(&window, out_len)?;

            for (channel, rendered_channel) in chunk.channels().iter().zip(rendered.iter_mut()) {
                rendered_channel.extend_from_slice(channel);
            }

            let percent = (chunk_index + 1) as f32 / chunk_count as f32 * 100.0;
            debug!(chunk_index, out_len, percent, "chunk rendered");
            progress(Phase::Rendering, Some(percent));
        }

        SampleBuffer::from_channels(rendered, sample_rate)
    }

    /// Copy a source-time window, failing as `ResourceExhausted` instead of
    /// aborting when the allocation cannot be satisfied
    fn copy_window(&self, start: usize, len: usize) -> Result<SampleBuffer> {
        let mut channels = Vec::with_capacity(self.source.num_channels());
        for channel in self.source.channels() {
            let mut window = Vec::new();
            window
                .try_reserve_exact(len)
                .map_err(|_| TapewarpError::ResourceExhausted {
                    details: format!("chunk window of {} frames", len),
                })?;
            window.extend_from_slice(&channel[start..start + len]);
            channels.push(window);
        }
        SampleBuffer::from_channels(channels, self.source.sample_rate())
    }
}
