//! Tempo estimation
//!
//! A deliberately lightweight onset-energy estimator: frame-wise RMS,
//! positive energy flux, percentile gating, then a histogram vote over
//! inter-onset intervals. Good enough to label a groove, and honest about
//! failure: anything inconclusive comes back as [`TempoEstimate::Unknown`].

use tracing::debug;

use crate::buffer::SampleBuffer;

/// Analysis window in samples
const FRAME_SIZE: usize = 2048;

/// Hop between successive analysis windows
const HOP_SIZE: usize = 1024;

/// Audio analyzed beyond this point is ignored
const MAX_ANALYSIS_SECS: f64 = 60.0;

/// Flux gate: keep the top 15% of positive flux values
const FLUX_PERCENTILE: f64 = 0.85;

/// A peak must dominate its neighbors within this many frames
const PEAK_NEIGHBORHOOD: usize = 2;

/// Minimum onsets before an estimate is attempted
const MIN_PEAKS: usize = 4;

/// Plausible inter-onset interval range in seconds
const MIN_DELTA_SECS: f64 = 0.2;
const MAX_DELTA_SECS: f64 = 2.0;

/// Histogram over beat periods, in milliseconds
const HIST_MIN_MS: f64 = 300.0;
const HIST_MAX_MS: f64 = 1000.0;
const HIST_BIN_MS: f64 = 20.0;

/// Result of a tempo analysis pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TempoEstimate {
    /// Beats per minute, octave-corrected into [60, 200]
    Bpm(u32),
    /// Too little signal, or no periodic onset structure
    Unknown,
}

/// Estimate the tempo of a buffer
///
/// The source is downmixed to mono and capped at 60 seconds before
/// analysis.
pub fn estimate_bpm(buffer: &SampleBuffer) -> TempoEstimate {
    let mono = buffer.downmix_mono();
    let max_samples = (MAX_ANALYSIS_SECS * buffer.sample_rate() as f64) as usize;
    let mono = &mono[..mono.len().min(max_samples)];

    if mono.len() < FRAME_SIZE + HOP_SIZE {
        return TempoEstimate::Unknown;
    }

    let energies = frame_rms(mono);
    let flux = positive_flux(&energies);
    if flux.is_empty() {
        return TempoEstimate::Unknown;
    }

    let threshold = percentile(&flux, FLUX_PERCENTILE);
    let peaks = pick_peaks(&flux, threshold);
    debug!(
        frames = energies.len(),
        peaks = peaks.len(),
        threshold,
        "onset detection complete"
    );
    if peaks.len() < MIN_PEAKS {
        return TempoEstimate::Unknown;
    }

    let hop_secs = HOP_SIZE as f64 / buffer.sample_rate() as f64;
    let deltas: Vec<f64> = peaks
        .windows(2)
        .map(|pair| (pair[1] - pair[0]) as f64 * hop_secs)
        .filter(|&d| (MIN_DELTA_SECS..=MAX_DELTA_SECS).contains(&d))
        .collect();
    if deltas.len() < 2 {
        return TempoEstimate::Unknown;
    }

    match modal_period_ms(&deltas) {
        Some(period_ms) => {
            let bpm = octave_correct((60_000.0 / period_ms).round());
            debug!(period_ms, bpm, "tempo estimated");
            TempoEstimate::Bpm(bpm)
        }
        None => TempoEstimate::Unknown,
    }
}

/// RMS energy per analysis frame
fn frame_rms(samples: &[f32]) -> Vec<f64> {
    let frame_count = (samples.len() - FRAME_SIZE) / HOP_SIZE + 1;
    (0..frame_count)
        .map(|frame| {
            let start = frame * HOP_SIZE;
            let window = &samples[start..start + FRAME_SIZE];
            let energy: f64 = window.iter().map(|&s| (s as f64) * (s as f64)).sum();
            (energy / FRAME_SIZE as f64).sqrt()
        })
        .collect()
}

/// Half-wave rectified energy difference between successive frames
fn positive_flux(energies: &[f64]) -> Vec<f64> {
    energies
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).max(0.0))
        .collect()
}

fn percentile(values: &[f64], fraction: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let index = ((sorted.len() - 1) as f64 * fraction).floor() as usize;
    sorted[index]
}

/// Indices of flux frames above the gate that dominate their neighborhood
fn pick_peaks(flux: &[f64], threshold: f64) -> Vec<usize> {
    let mut peaks = Vec::new();
    for i in 0..flux.len() {
        if flux[i] <= threshold {
            continue;
        }
        let lo = i.saturating_sub(PEAK_NEIGHBORHOOD);
        let hi = (i + PEAK_NEIGHBORHOOD).min(flux.len() - 1);
        if (lo..=hi).all(|j| flux[j] <= flux[i]) {
            peaks.push(i);
        }
    }
    peaks
}

/// Center of the most-voted 20 ms period bin, or `None` when no interval
/// lands in the plausible beat range
fn modal_period_ms(deltas: &[f64]) -> Option<f64> {
    let bin_count = ((HIST_MAX_MS - HIST_MIN_MS) / HIST_BIN_MS) as usize;
    let mut histogram = vec![0usize; bin_count];

    for &delta in deltas {
        let ms = delta * 1000.0;
        if !(HIST_MIN_MS..=HIST_MAX_MS).contains(&ms) {
            continue;
        }
        let bin = (((ms - HIST_MIN_MS) / HIST_BIN_MS) as usize).min(bin_count - 1);
        histogram[bin] += 1;
    }

    let (best_bin, &votes) = histogram
        .iter()
        .enumerate()
        .max_by_key(|(_, &votes)| votes)?;
    if votes == 0 {
        return None;
    }
    Some(HIST_MIN_MS + (best_bin as f64 + 0.5) * HIST_BIN_MS)
}

/// Fold implausible octaves into the [60, 200] BPM range
fn octave_correct(bpm: f64) -> u32 {
    let mut bpm = bpm;
    if (40.0..80.0).contains(&bpm) && bpm * 2.0 <= 200.0 {
        bpm *= 2.0;
    } else if bpm > 200.0 && bpm <= 400.0 {
        bpm /= 2.0;
    }
    bpm.clamp(60.0, 200.0).round() as u32
}
