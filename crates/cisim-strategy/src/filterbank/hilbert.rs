//! Log2 Hilbert envelope per analysis channel.

use cisim_spec::{HilbertEnvelopeConfig, StrategyConfig};
use ndarray::{Array2, Axis};
use rustfft::num_complex::Complex;
use tracing::debug;

use super::{check_bins, Spectrum};
use crate::error::StrategyResult;

/// Bins summed coherently before squaring.
const BLOCK: usize = 4;

/// Log2 correction for the filter shape, indexed by `min(n_bins, 4) - 1`, in 1/1024 units.
const LOG_FILTER_CORRECTION: [f64; 4] = [2233.0, 952.0, 62.0, 0.0];

/// Computes per-channel log2 envelopes from a short-time spectrum.
///
/// Even bins are negated (half-sample shift of the analysis window), each
/// channel's bins are summed in blocks of four plus one remainder block, and
/// the block powers are accumulated. The result is `log2` power plus a
/// bin-count dependent correction, `16` and `output_offset`.
///
/// Non-finite values (silent channels) become 0 before clamping to the
/// configured bounds.
///
/// # Arguments
/// * `spectrum` - bins x frames, as returned by [`super::fft_filterbank`]
/// * `strategy` - shared channel layout
/// * `cfg` - offset and output bounds
pub fn hilbert_envelope(
    spectrum: &Spectrum,
    strategy: &StrategyConfig,
    cfg: &HilbertEnvelopeConfig,
) -> StrategyResult<Array2<f64>> {
    strategy.validate()?;
    cfg.validate()?;
    check_bins(spectrum, strategy)?;
    let n_frames = spectrum.ncols();
    let mut env = Array2::zeros((strategy.n_chan, n_frames));
    let upper = cfg.output_upper_bound.unwrap_or(f64::INFINITY);

    for (ch, range) in strategy.bin_ranges().into_iter().enumerate() {
        let n_bins = range.len();
        let correction = LOG_FILTER_CORRECTION[n_bins.min(BLOCK) - 1] / 1024.0
            + cfg.output_offset
            + 16.0;
        let bins: Vec<usize> = range.collect();

        for (frame, col) in spectrum.axis_iter(Axis(1)).enumerate() {
            let power: f64 = bins
                .chunks(BLOCK)
                .map(|block| {
                    block
                        .iter()
                        .map(|&b| if b % 2 == 0 { -col[b] } else { col[b] })
                        .sum::<Complex<f64>>()
                        .norm_sqr()
                })
                .sum();
            let mut v = power.log2() + correction;
            if !v.is_finite() {
                v = 0.0;
            }
            env[[ch, frame]] = v.min(upper).max(cfg.output_lower_bound);
        }
    }

    debug!(channels = strategy.n_chan, frames = n_frames, "Hilbert envelope");
    Ok(env)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StrategyError;

    fn unit_spectrum(strategy: &StrategyConfig, frames: usize) -> Spectrum {
        let mut x = Spectrum::zeros((strategy.n_fft / 2, frames));
        for (b, v) in x.iter_mut().enumerate() {
            // alternate sign so that even-bin negation aligns the phases
            let bin = b / frames;
            *v = Complex::new(if bin % 2 == 0 { -1.0 } else { 1.0 }, 0.0);
        }
        x
    }

    #[test]
    fn test_shape_and_silence() {
        let strategy = StrategyConfig::default();
        let x = Spectrum::zeros((128, 4));
        let env = hilbert_envelope(&x, &strategy, &HilbertEnvelopeConfig::default()).unwrap();
        assert_eq!(env.dim(), (15, 4));
        // log2(0) is non-finite and maps to zero
        assert!(env.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_single_bin_channel() {
        let strategy = StrategyConfig::default();
        let x = unit_spectrum(&strategy, 1);
        let env = hilbert_envelope(&x, &strategy, &HilbertEnvelopeConfig::default()).unwrap();
        // channel 2 has a single bin of unit power
        let expected = 0.0 + 62.0 / 1024.0 + 16.0;
        assert!((env[[2, 0]] - expected).abs() < 1e-12);
        // channel 0 has two coherent bins: power 4
        let expected = 2.0 + 952.0 / 1024.0 + 16.0;
        assert!((env[[0, 0]] - expected).abs() < 1e-12);
    }

    #[test]
    fn test_wide_channel_uses_blocks() {
        let strategy = StrategyConfig::default();
        let x = unit_spectrum(&strategy, 1);
        let env = hilbert_envelope(&x, &strategy, &HilbertEnvelopeConfig::default()).unwrap();
        // channel 14: 56 bins = 14 full blocks of coherent power 16
        let expected = (14.0f64 * 16.0).log2() + 16.0;
        assert!((env[[14, 0]] - expected).abs() < 1e-12);
    }

    #[test]
    fn test_bounds_applied() {
        let strategy = StrategyConfig::default();
        let x = unit_spectrum(&strategy, 2);
        let cfg = HilbertEnvelopeConfig {
            output_offset: -10.0,
            output_lower_bound: 7.0,
            output_upper_bound: Some(8.0),
        };
        let env = hilbert_envelope(&x, &strategy, &cfg).unwrap();
        assert!(env.iter().all(|&v| (7.0..=8.0).contains(&v)));
    }

    #[test]
    fn test_too_few_bins() {
        let strategy = StrategyConfig::default();
        let x = Spectrum::zeros((64, 1));
        assert!(hilbert_envelope(&x, &strategy, &HilbertEnvelopeConfig::default()).is_err());
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let strategy = StrategyConfig::default();
        let x = unit_spectrum(&strategy, 1);
        let cfg = HilbertEnvelopeConfig {
            output_lower_bound: 8.0,
            output_upper_bound: Some(7.0),
            ..Default::default()
        };
        assert!(matches!(
            hilbert_envelope(&x, &strategy, &cfg),
            Err(StrategyError::Config(_))
        ));
    }
}
