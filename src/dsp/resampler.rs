//! Playback-rate source stage
//!
//! Maps output sample positions back into the source window at a fixed
//! rate with linear interpolation. Each chunk render creates a fresh
//! instance, so there is no carried state.

/// Resample one channel of a source window at the given playback rate
///
/// Output sample `i` reads source position `i * rate`; positions past the
/// window's end fall back to the last sample (the renderer sizes windows
/// with a guard so this only happens on the final frames of a track).
pub fn resample_window(window: &[f32], rate: f64, out_len: usize) -> Vec<f32> {
    if window.is_empty() {
        return vec![0.0; out_len];
    }

    let mut output = Vec::with_capacity(out_len);
    let last = window.len() - 1;

    for i in 0..out_len {
        let src_pos = i as f64 * rate;
        let src_idx = src_pos.floor() as usize;
        let frac = (src_pos - src_idx as f64) as f32;

        let sample = if src_idx < last {
            window[src_idx] * (1.0 - frac) + window[src_idx + 1] * frac
        } else {
            window[last]
        };
        output.push(sample);
    }

    output
}
