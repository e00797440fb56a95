//! Short-time FFT of buffered frames.

use cisim_spec::{FftFilterbankConfig, StrategyConfig};
use ndarray::{Array2, Axis};
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use tracing::debug;

use crate::error::{StrategyError, StrategyResult};

/// Complex spectrum, bins x frames.
pub type Spectrum = Array2<Complex<f64>>;

/// Transforms each column of `frames` and keeps the non-negative frequency bins.
///
/// Returns `n_fft / 2` rows, or `n_fft / 2 + 1` with the Nyquist bin.
pub fn fft_filterbank(
    frames: &Array2<f64>,
    strategy: &StrategyConfig,
    cfg: &FftFilterbankConfig,
) -> StrategyResult<Spectrum> {
    strategy.validate()?;
    let n_fft = strategy.n_fft;
    if frames.nrows() != n_fft {
        return Err(StrategyError::shape(
            "frames",
            format!("expected {} rows, got {}", n_fft, frames.nrows()),
        ));
    }
    let half = n_fft / 2;
    let n_bins = if cfg.include_nyquist_bin { half + 1 } else { half };
    let scale = if cfg.compensate_fft_length {
        1.0 / half as f64
    } else {
        1.0
    };

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(n_fft);
    let mut out = Array2::zeros((n_bins, frames.ncols()));
    let mut buf = vec![Complex::new(0.0, 0.0); n_fft];

    for (frame, mut col) in frames.axis_iter(Axis(1)).zip(out.axis_iter_mut(Axis(1))) {
        for (dst, &s) in buf.iter_mut().zip(frame.iter()) {
            *dst = Complex::new(s, 0.0);
        }
        fft.process(&mut buf);

        if cfg.combine_dc_ny {
            let dc = buf[0].re;
            let ny = buf[half].re;
            buf[0] = Complex::new(dc + ny, dc - ny);
            buf[half] = Complex::new(0.0, 0.0);
        }
        for (dst, src) in col.iter_mut().zip(&buf[..n_bins]) {
            *dst = src * scale;
        }
    }

    debug!(bins = n_bins, frames = frames.ncols(), "FFT filterbank");
    Ok(out)
}
