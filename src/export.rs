//! One-shot export pipeline: render, encode, tag
//!
//! A [`RenderJob`] bundles everything a single export needs and owns the
//! stage ordering. Progress from both the renderer and the encoder flows
//! through one caller-supplied sink, phase-labelled.

use tracing::info;

use crate::buffer::SampleBuffer;
use crate::encode::{encode_frames, encode_wav, write_tags, FrameEncoder};
use crate::error::{Result, TapewarpError};
use crate::metadata::TrackMetadata;
use crate::render::{OfflineRenderer, ProgressFn};
use crate::state::EffectState;

/// Container the export should produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Wav,
    Mp3 { bitrate_kbps: u32 },
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Wav => "wav",
            OutputFormat::Mp3 { .. } => "mp3",
        }
    }
}

/// A complete export: source, effect settings, target format, metadata
pub struct RenderJob<'a> {
    source: &'a SampleBuffer,
    state: EffectState,
    format: OutputFormat,
    metadata: Option<TrackMetadata>,
    encoder: Option<Box<dyn FrameEncoder + 'a>>,
}

impl<'a> RenderJob<'a> {
    pub fn new(source: &'a SampleBuffer, state: EffectState, format: OutputFormat) -> Self {
        Self {
            source,
            state,
            format,
            metadata: None,
            encoder: None,
        }
    }

    /// Attach tags to write into the exported file
    pub fn with_metadata(mut self, metadata: TrackMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Supply the frame codec the compressed path needs
    pub fn with_encoder(mut self, encoder: Box<dyn FrameEncoder + 'a>) -> Self {
        self.encoder = Some(encoder);
        self
    }

    /// Execute the full pipeline and return the finished file bytes
    pub fn run(mut self, progress: &mut ProgressFn<'_>) -> Result<Vec<u8>> {
        let rendered = OfflineRenderer::new(self.source, self.state.clone()).render(progress)?;
        info!(
            frames = rendered.num_frames(),
            format = self.format.extension(),
            "render finished, encoding"
        );

        match self.format {
            OutputFormat::Wav => encode_wav(&rendered, progress),
            OutputFormat::Mp3 { bitrate_kbps } => {
                let mut encoder = self
                    .encoder
                    .take()
                    .ok_or(TapewarpError::EncoderUnavailable)?;
                info!(bitrate_kbps, "compressed export");
                let stream = encode_frames(&rendered, encoder.as_mut(), progress)?;
                match &self.metadata {
                    Some(metadata) => Ok(write_tags(stream, metadata)),
                    None => Ok(stream),
                }
            }
        }
    }
}
