//! Overlapping frame buffer and analysis windowing.

use cisim_spec::{BufferOption, StrategyConfig};
use ndarray::{Array1, Array2, Axis};
use tracing::debug;

use crate::error::{StrategyError, StrategyResult};

/// Number of frames produced for a signal of `len` samples.
pub fn frame_count(len: usize, frame_len: usize, hop: usize, option: BufferOption) -> usize {
    (len + leading_zeros(frame_len, hop, option)).div_ceil(hop)
}

fn leading_zeros(frame_len: usize, hop: usize, option: BufferOption) -> usize {
    match option {
        BufferOption::NoDelay => 0,
        BufferOption::Delay => frame_len.saturating_sub(hop),
    }
}

/// Splits a signal into overlapping frames, one per column.
///
/// Frame `k` holds samples `k*hop - pre .. k*hop - pre + frame_len`, where
/// `pre` is the number of leading zeros implied by `option`. Samples outside
/// the signal are zero.
pub fn buffer(
    x: &[f64],
    frame_len: usize,
    hop: usize,
    option: BufferOption,
) -> StrategyResult<Array2<f64>> {
    if hop == 0 || frame_len == 0 {
        return Err(StrategyError::invalid_param(
            "hop",
            "frame length and hop must be positive",
        ));
    }
    let pre = leading_zeros(frame_len, hop, option) as isize;
    let n_frames = frame_count(x.len(), frame_len, hop, option);
    let mut frames = Array2::zeros((frame_len, n_frames));
    for (k, mut col) in frames.axis_iter_mut(Axis(1)).enumerate() {
        let start = (k * hop) as isize - pre;
        for (j, v) in col.iter_mut().enumerate() {
            let idx = start + j as isize;
            if idx >= 0 && (idx as usize) < x.len() {
                *v = x[idx as usize];
            }
        }
    }
    Ok(frames)
}

/// Buffers a signal with the strategy's frame length and hop and applies the
/// analysis window to each frame.
///
/// Returns an `n_fft x n_frames` matrix.
pub fn window_buffer(
    x: &[f64],
    strategy: &StrategyConfig,
    option: BufferOption,
) -> StrategyResult<Array2<f64>> {
    let mut frames = buffer(x, strategy.n_fft, strategy.n_hop, option)?;
    let window = Array1::from(strategy.window_coefficients());
    if window.len() != strategy.n_fft {
        return Err(StrategyError::shape(
            "window",
            format!("expected {} coefficients, got {}", strategy.n_fft, window.len()),
        ));
    }
    for mut col in frames.axis_iter_mut(Axis(1)) {
        col *= &window;
    }
    debug!(frames = frames.ncols(), "signal buffered and windowed");
    Ok(frames)
}
