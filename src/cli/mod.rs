//! Command-line interface for Tapewarp
//!
//! Argument definitions live here; the logic behind each subcommand is in
//! [`commands`].

pub mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Tapewarp - tape-style speed, tone, and reverb processor
#[derive(Parser, Debug)]
#[command(name = "tapewarp")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply effects to a WAV file and export the result
    Process(ProcessArgs),

    /// Estimate the tempo of a WAV file
    Bpm {
        /// Input WAV file
        input: PathBuf,
    },

    /// Print basic properties of a WAV file
    Info {
        /// Input WAV file
        input: PathBuf,
    },
}

#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// Input WAV file
    pub input: PathBuf,

    /// Output file (default: input name with a -warped suffix)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Load effect settings from a JSON file
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Start from a named preset instead of neutral settings
    #[arg(long, value_enum)]
    pub preset: Option<PresetArg>,

    /// Playback speed multiplier [0.25, 4.0]
    #[arg(long)]
    pub speed: Option<f32>,

    /// Pitch offset in cents
    #[arg(long)]
    pub detune: Option<f32>,

    /// Bass shelf gain in dB
    #[arg(long)]
    pub bass: Option<f32>,

    /// Treble shelf gain in dB
    #[arg(long)]
    pub treble: Option<f32>,

    /// Lowpass amount [0, 100]
    #[arg(long)]
    pub lowpass: Option<f32>,

    /// Highpass amount [0, 100]
    #[arg(long)]
    pub highpass: Option<f32>,

    /// Reverb amount [0, 100]
    #[arg(long)]
    pub reverb: Option<f32>,

    /// Reverb algorithm
    #[arg(long, value_enum)]
    pub reverb_algorithm: Option<AlgorithmArg>,

    /// Output volume multiplier [0, 2]
    #[arg(long)]
    pub volume: Option<f32>,

    /// Output container
    #[arg(long, value_enum, default_value_t = FormatArg::Wav)]
    pub format: FormatArg,

    /// MP3 bitrate in kbps
    #[arg(long, default_value_t = 192)]
    pub bitrate: u32,

    /// Track title tag
    #[arg(long)]
    pub title: Option<String>,

    /// Track artist tag
    #[arg(long)]
    pub artist: Option<String>,

    /// Track album tag
    #[arg(long)]
    pub album: Option<String>,

    /// Track year tag
    #[arg(long)]
    pub year: Option<String>,

    /// Cover art image (PNG or JPEG)
    #[arg(long)]
    pub artwork: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum FormatArg {
    Wav,
    Mp3,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum PresetArg {
    Nightcore,
    Slowed,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum AlgorithmArg {
    Comb,
    Convolution,
}
