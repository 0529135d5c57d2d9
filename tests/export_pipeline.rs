//! End-to-end pipeline tests: decode, render, encode, tag
//!
//! These drive the public API exactly the way the CLI does, including a
//! disk round trip through a temporary directory.

use tapewarp::encode::{FrameEncoder, FrameEncoderError};
use tapewarp::io::{decode_wav, load_wav};
use tapewarp::metadata::TrackMetadata;
use tapewarp::render::sink_progress;
use tapewarp::{EffectState, OutputFormat, RenderJob, SampleBuffer, TapewarpError};

/// Stereo 440 Hz sine at 44.1 kHz
fn sine_source(secs: f32) -> SampleBuffer {
    let sample_rate = 44100u32;
    let frames = (sample_rate as f32 * secs) as usize;
    let channel: Vec<f32> = (0..frames)
        .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / sample_rate as f32).sin() * 0.4)
        .collect();
    SampleBuffer::from_channels(vec![channel.clone(), channel], sample_rate).unwrap()
}

/// Codec stand-in that emits one marker byte per frame
struct MarkerEncoder;

impl FrameEncoder for MarkerEncoder {
    fn encode(
        &mut self,
        _left: &[i16],
        _right: &[i16],
    ) -> Result<Vec<u8>, FrameEncoderError> {
        Ok(vec![0xA5])
    }

    fn flush(&mut self) -> Result<Vec<u8>, FrameEncoderError> {
        Ok(vec![0x5A])
    }
}

#[test]
fn wav_export_round_trips_through_decoder() {
    let source = sine_source(2.0);
    let bytes = RenderJob::new(&source, EffectState::new(), OutputFormat::Wav)
        .run(&mut sink_progress)
        .unwrap();

    let decoded = decode_wav(&bytes).unwrap();
    assert_eq!(decoded.num_channels(), 2);
    assert_eq!(decoded.sample_rate(), 44100);
    assert_eq!(decoded.num_frames(), source.num_frames());

    // Neutral settings preserve level; the open filters only contribute a
    // small phase shift
    assert!((decoded.peak() - source.peak()).abs() < 0.02);
}

#[test]
fn nightcore_export_shortens_output() {
    let source = sine_source(5.0);
    let bytes = RenderJob::new(&source, EffectState::nightcore(), OutputFormat::Wav)
        .run(&mut sink_progress)
        .unwrap();

    let decoded = decode_wav(&bytes).unwrap();
    assert!((decoded.duration_secs() - 4.0).abs() < 1e-6);
}

#[test]
fn slowed_export_lengthens_output() {
    let source = sine_source(3.0);
    let bytes = RenderJob::new(&source, EffectState::slowed(), OutputFormat::Wav)
        .run(&mut sink_progress)
        .unwrap();

    let decoded = decode_wav(&bytes).unwrap();
    let expected = 3.0 / 0.85;
    assert!((decoded.duration_secs() - expected).abs() < 0.001);
}

#[test]
fn mp3_export_is_framed_and_tagged() {
    let source = sine_source(1.0);
    let metadata = TrackMetadata {
        title: "Integration".to_string(),
        artist: "Pipeline".to_string(),
        ..Default::default()
    };

    let bytes = RenderJob::new(
        &source,
        EffectState::new(),
        OutputFormat::Mp3 { bitrate_kbps: 192 },
    )
    .with_metadata(metadata)
    .with_encoder(Box::new(MarkerEncoder))
    .run(&mut sink_progress)
    .unwrap();

    assert_eq!(&bytes[0..3], b"ID3");
    assert_eq!(&bytes[bytes.len() - 128..bytes.len() - 125], b"TAG");

    // 44100 samples in 1152-sample frames: 39 markers plus the flush byte
    let marker_count = bytes.iter().filter(|&&b| b == 0xA5).count();
    assert!(marker_count >= 39);
}

#[test]
fn mp3_without_codec_reports_unavailable() {
    let source = sine_source(0.5);
    let result = RenderJob::new(
        &source,
        EffectState::new(),
        OutputFormat::Mp3 { bitrate_kbps: 128 },
    )
    .run(&mut sink_progress);

    match result {
        Err(err @ TapewarpError::EncoderUnavailable) => {
            assert!(err.recovery_hint().unwrap().contains("WAV"));
        }
        other => panic!("expected EncoderUnavailable, got {:?}", other.map(|b| b.len())),
    }
}

#[test]
fn exported_file_loads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("warped.wav");

    let source = sine_source(1.0);
    let bytes = RenderJob::new(&source, EffectState::new(), OutputFormat::Wav)
        .run(&mut sink_progress)
        .unwrap();
    std::fs::write(&path, &bytes).unwrap();

    let loaded = load_wav(&path).unwrap();
    assert_eq!(loaded.num_frames(), source.num_frames());
    assert_eq!(loaded.sample_rate(), 44100);
}

#[test]
fn reverb_settings_change_the_output() {
    let source = sine_source(1.0);

    let dry = RenderJob::new(&source, EffectState::new(), OutputFormat::Wav)
        .run(&mut sink_progress)
        .unwrap();

    let mut state = EffectState::new();
    state.set_reverb_amount(80.0);
    let wet = RenderJob::new(&source, state, OutputFormat::Wav)
        .run(&mut sink_progress)
        .unwrap();

    assert_eq!(dry.len(), wet.len());
    assert_ne!(dry, wet);
}
