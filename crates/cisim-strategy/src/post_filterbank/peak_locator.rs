//! Spectral peak locator with parabolic refinement.

use cisim_spec::{PeakLocatorConfig, StrategyConfig};
use ndarray::{s, Array2};
use tracing::debug;

use crate::error::StrategyResult;
use crate::filterbank::Spectrum;

/// Floor applied to the power spectral density before taking logs.
const PSD_FLOOR: f64 = 1e-6;

/// Peak frequency and cochlear location per channel and frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PeakLocation {
    /// Interpolated peak frequency (Hz), channels x frames.
    pub freq: Array2<f64>,
    /// Interpolated location in channel units, channels x frames.
    pub loc: Array2<f64>,
}

fn psd(spectrum: &Spectrum, bin: isize, frame: usize) -> f64 {
    if bin < 0 || bin as usize >= spectrum.nrows() {
        return PSD_FLOOR;
    }
    (spectrum[[bin as usize, frame]].norm_sqr() / 2.0).max(PSD_FLOOR)
}

/// Fractional bin offset from the log powers around a maximum.
///
/// A strict local maximum uses the vertex of the fitted parabola. Otherwise
/// the offset is half a bin toward the larger neighbour.
fn bin_correction(left: f64, mid: f64, right: f64) -> f64 {
    let side_max = left.max(right);
    if mid > side_max {
        0.5 * (right - left) / (2.0 * mid - left - right)
    } else {
        0.5 * f64::from(u8::from(right == side_max)) - 0.5 * f64::from(u8::from(left == side_max))
    }
}

/// Locates the dominant FFT bin of each channel and refines it by
/// three-point parabolic interpolation in log2 power.
///
/// The refined location interpolates `bin_to_loc_map` toward the neighbour
/// on the side of the correction.
pub fn spectral_peak_locator(
    spectrum: &Spectrum,
    strategy: &StrategyConfig,
    cfg: &PeakLocatorConfig,
) -> StrategyResult<PeakLocation> {
    strategy.validate()?;
    cfg.validate(strategy)?;
    crate::filterbank::check_bins(spectrum, strategy)?;
    let n_frames = spectrum.ncols();
    let bin_width = strategy.bin_width();
    let map = &cfg.bin_to_loc_map;
    let last = map.len().saturating_sub(1);
    let map_at = |b: isize| map[(b.max(0) as usize).min(last)];

    let mut freq = Array2::zeros((strategy.n_chan, n_frames));
    let mut loc = Array2::zeros((strategy.n_chan, n_frames));

    for (ch, range) in strategy.bin_ranges().into_iter().enumerate() {
        for frame in 0..n_frames {
            let mut peak = range.start;
            let mut peak_val = f64::NEG_INFINITY;
            for b in range.clone() {
                let v = psd(spectrum, b as isize, frame);
                if v > peak_val {
                    peak = b;
                    peak_val = v;
                }
            }
            let b = peak as isize;
            let delta = bin_correction(
                psd(spectrum, b - 1, frame).log2(),
                peak_val.log2(),
                psd(spectrum, b + 1, frame).log2(),
            );
            freq[[ch, frame]] = bin_width * (peak as f64 + delta);
            let neighbour = if delta > 0.0 {
                b + 1
            } else if delta < 0.0 {
                b - 1
            } else {
                b
            };
            loc[[ch, frame]] = map_at(b) + delta * (map_at(b) - map_at(neighbour)).abs();
        }
    }

    Ok(PeakLocation { freq, loc })
}

/// Runs the locator on every `frame_decimation`-th frame and holds each
/// result for `frame_decimation` frames.
///
/// The first analysed frame is `frame_decimation - 1`; its result starts at
/// that frame, earlier frames are zero. The output has the full frame count.
pub fn decimated_peak_locator(
    spectrum: &Spectrum,
    strategy: &StrategyConfig,
    cfg: &PeakLocatorConfig,
) -> StrategyResult<PeakLocation> {
    strategy.validate()?;
    cfg.validate(strategy)?;
    let step = cfg.frame_decimation;
    let n_frames = spectrum.ncols();
    let offset = step - 1;
    if n_frames <= offset {
        return Ok(PeakLocation {
            freq: Array2::zeros((strategy.n_chan, n_frames)),
            loc: Array2::zeros((strategy.n_chan, n_frames)),
        });
    }
    let sub = spectrum.slice(s![.., offset..;step]).to_owned();
    let peaks = spectral_peak_locator(&sub, strategy, cfg)?;

    let hold = |m: &Array2<f64>| {
        Array2::from_shape_fn((strategy.n_chan, n_frames), |(ch, f)| {
            if f < offset {
                0.0
            } else {
                m[[ch, ((f - offset) / step).min(m.ncols() - 1)]]
            }
        })
    };
    let out = PeakLocation {
        freq: hold(&peaks.freq),
        loc: hold(&peaks.loc),
    };
    debug!(
        channels = strategy.n_chan,
        frames = n_frames,
        analysed = sub.ncols(),
        "peak locator"
    );
    Ok(out)
}
