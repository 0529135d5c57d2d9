//! CLI command implementations

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::info;

use crate::analysis::{estimate_bpm, TempoEstimate};
use crate::cli::{AlgorithmArg, FormatArg, PresetArg, ProcessArgs};
use crate::export::{OutputFormat, RenderJob};
use crate::io::load_wav;
use crate::metadata::{Artwork, TrackMetadata};
use crate::render::Phase;
use crate::state::{EffectState, ReverbAlgorithm};

/// Apply effects and export.
pub fn process(args: &ProcessArgs) -> Result<()> {
    let source = load_wav(&args.input)
        .with_context(|| format!("failed to load {}", args.input.display()))?;
    info!(
        duration_secs = source.duration_secs(),
        channels = source.num_channels(),
        "source loaded"
    );

    let state = build_state(args)?;
    let format = match args.format {
        FormatArg::Wav => OutputFormat::Wav,
        FormatArg::Mp3 => OutputFormat::Mp3 {
            bitrate_kbps: args.bitrate,
        },
    };

    let mut job = RenderJob::new(&source, state, format);
    if let Some(metadata) = build_metadata(args)? {
        job = job.with_metadata(metadata);
    }
    if let OutputFormat::Mp3 { bitrate_kbps } = format {
        job = job.with_encoder(make_mp3_encoder(source.sample_rate(), bitrate_kbps)?);
    }

    let bytes = job.run(&mut |phase: Phase, percent| {
        if let Some(percent) = percent {
            print!("\r{:<10} {:5.1}%", phase.name(), percent);
            let _ = std::io::stdout().flush();
        }
    })?;
    println!();

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output(&args.input, format.extension()));
    fs::write(&output, &bytes)
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!("Exported: {} ({} bytes)", output.display(), bytes.len());
    Ok(())
}

/// Estimate and print the tempo.
pub fn bpm(input: &Path) -> Result<()> {
    let source =
        load_wav(input).with_context(|| format!("failed to load {}", input.display()))?;

    match estimate_bpm(&source) {
        TempoEstimate::Bpm(bpm) => println!("Estimated tempo: {} BPM", bpm),
        TempoEstimate::Unknown => println!("Tempo: unknown (no clear onset structure)"),
    }
    Ok(())
}

/// Print basic source properties.
pub fn info(input: &Path) -> Result<()> {
    let source =
        load_wav(input).with_context(|| format!("failed to load {}", input.display()))?;

    println!("File:        {}", input.display());
    println!("Channels:    {}", source.num_channels());
    println!("Sample rate: {} Hz", source.sample_rate());
    println!("Frames:      {}", source.num_frames());
    println!("Duration:    {:.2} s", source.duration_secs());
    println!("Peak:        {:.3}", source.peak());
    Ok(())
}

/// Resolve effect settings from file, preset, and per-knob overrides, in
/// that order of increasing precedence.
fn build_state(args: &ProcessArgs) -> Result<EffectState> {
    let mut state = match (&args.settings, args.preset) {
        (Some(path), _) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&json)
                .with_context(|| format!("invalid settings in {}", path.display()))?
        }
        (None, Some(PresetArg::Nightcore)) => EffectState::nightcore(),
        (None, Some(PresetArg::Slowed)) => EffectState::slowed(),
        (None, None) => EffectState::new(),
    };

    if let Some(speed) = args.speed {
        state.set_speed(speed);
    }
    if let Some(detune) = args.detune {
        state.set_detune(detune);
    }
    if let Some(bass) = args.bass {
        state.set_bass_db(bass);
    }
    if let Some(treble) = args.treble {
        state.set_treble_db(treble);
    }
    if let Some(lowpass) = args.lowpass {
        state.set_lowpass(lowpass);
    }
    if let Some(highpass) = args.highpass {
        state.set_highpass(highpass);
    }
    if let Some(reverb) = args.reverb {
        state.set_reverb_amount(reverb);
    }
    if let Some(algorithm) = args.reverb_algorithm {
        state.set_reverb_algorithm(match algorithm {
            AlgorithmArg::Comb => ReverbAlgorithm::Comb,
            AlgorithmArg::Convolution => ReverbAlgorithm::Convolution,
        });
    }
    if let Some(volume) = args.volume {
        state.set_volume(volume);
    }

    Ok(state)
}

fn build_metadata(args: &ProcessArgs) -> Result<Option<TrackMetadata>> {
    let artwork = match &args.artwork {
        Some(path) => {
            let data = fs::read(path)
                .with_context(|| format!("failed to read artwork {}", path.display()))?;
            Some(Artwork::sniffed(data))
        }
        None => None,
    };

    let metadata = TrackMetadata {
        title: args.title.clone().unwrap_or_default(),
        artist: args.artist.clone().unwrap_or_default(),
        album: args.album.clone().unwrap_or_default(),
        year: args.year.clone().unwrap_or_default(),
        artwork,
    };

    Ok(if metadata.is_empty() {
        None
    } else {
        Some(metadata)
    })
}

#[cfg(feature = "lame")]
fn make_mp3_encoder(
    sample_rate: u32,
    bitrate_kbps: u32,
) -> Result<Box<dyn crate::encode::FrameEncoder>> {
    use crate::encode::mp3::lame::LameFrameEncoder;

    match LameFrameEncoder::new(sample_rate, bitrate_kbps) {
        Some(encoder) => Ok(Box::new(encoder)),
        None => bail!("failed to initialize the MP3 codec"),
    }
}

#[cfg(not(feature = "lame"))]
fn make_mp3_encoder(
    _sample_rate: u32,
    _bitrate_kbps: u32,
) -> Result<Box<dyn crate::encode::FrameEncoder>> {
    bail!("MP3 export requires building with the 'lame' feature; use --format wav instead")
}

fn default_output(input: &Path, extension: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{}-warped.{}", stem, extension))
}
