//! Time-domain front end: pre-emphasis filtering.
//!
//! The filter is a direct-form II transposed IIR of arbitrary order with zero
//! initial state, matching the usual `lfilter(b, a, x)` convention.

use std::f64::consts::PI;

use cisim_spec::PreEmphasisConfig;
use rustfft::num_complex::Complex;
use tracing::debug;

use crate::error::{StrategyError, StrategyResult};

/// IIR filter state.
#[derive(Debug, Clone)]
pub struct IirFilter {
    b: Vec<f64>,
    a: Vec<f64>,
    // One delay element per order
    z: Vec<f64>,
}

impl IirFilter {
    /// Creates a filter from numerator `b` and denominator `a`.
    ///
    /// Coefficients are normalised by `a[0]` and padded to a common order.
    pub fn new(b: &[f64], a: &[f64]) -> StrategyResult<Self> {
        let a0 = match a.first() {
            Some(&a0) if a0 != 0.0 => a0,
            _ => {
                return Err(StrategyError::invalid_param(
                    "coeff_denom",
                    "leading coefficient must be non-zero",
                ))
            }
        };
        if b.is_empty() {
            return Err(StrategyError::invalid_param(
                "coeff_num",
                "at least one coefficient is required",
            ));
        }
        let order = b.len().max(a.len());
        let mut bn = vec![0.0; order];
        let mut an = vec![0.0; order];
        for (dst, src) in bn.iter_mut().zip(b) {
            *dst = src / a0;
        }
        for (dst, src) in an.iter_mut().zip(a) {
            *dst = src / a0;
        }
        Ok(Self {
            b: bn,
            a: an,
            z: vec![0.0; order - 1],
        })
    }

    /// Creates the filter described by a pre-emphasis configuration.
    pub fn from_config(cfg: &PreEmphasisConfig) -> StrategyResult<Self> {
        Self::new(&cfg.coeff_num, &cfg.coeff_denom)
    }

    /// Resets the filter state.
    pub fn reset(&mut self) {
        self.z.iter_mut().for_each(|z| *z = 0.0);
    }

    /// Processes a single sample through the filter.
    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let output = self.b[0] * input + self.z.first().copied().unwrap_or(0.0);
        let n = self.z.len();
        for i in 0..n {
            let next = if i + 1 < n { self.z[i + 1] } else { 0.0 };
            self.z[i] = self.b[i + 1] * input + next - self.a[i + 1] * output;
        }
        output
    }

    /// Processes a buffer of samples, returning a new buffer.
    pub fn process_buffer_copy(&mut self, input: &[f64]) -> Vec<f64> {
        input.iter().map(|&s| self.process(s)).collect()
    }

    /// Magnitude response in dB at `freq` Hz for sampling rate `fs`.
    pub fn magnitude_db(&self, freq: f64, fs: f64) -> f64 {
        let w = 2.0 * PI * freq / fs;
        let eval = |coefs: &[f64]| -> Complex<f64> {
            coefs
                .iter()
                .enumerate()
                .map(|(k, &c)| Complex::from_polar(c, -w * k as f64))
                .sum()
        };
        20.0 * (eval(&self.b).norm() / eval(&self.a).norm()).log10()
    }
}

/// Magnitude response (dB) of the pre-emphasis filter on a frequency grid.
pub fn pre_emphasis_response_db(
    freqs: &[f64],
    fs: f64,
    cfg: &PreEmphasisConfig,
) -> StrategyResult<Vec<f64>> {
    let filter = IirFilter::from_config(cfg)?;
    Ok(freqs.iter().map(|&f| filter.magnitude_db(f, fs)).collect())
}

/// Applies the pre-emphasis filter to a waveform.
pub fn pre_emphasis(samples: &[f64], cfg: &PreEmphasisConfig) -> StrategyResult<Vec<f64>> {
    let mut filter = IirFilter::from_config(cfg)?;
    let out = filter.process_buffer_copy(samples);
    debug!(samples = out.len(), "pre-emphasis applied");
    Ok(out)
}
