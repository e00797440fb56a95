//! Electric field, neural activity and smoothed neural power.
//!
//! Current on each electrode spreads to every neural location through the
//! spread profile. The field above threshold drives a compressive activity
//! function, which a one-pole peak follower integrates into power.

use cisim_spec::{VocoderConfig, N_ELECTRODES};
use ndarray::{Array1, Array2, ArrayView2};

use crate::error::VocoderResult;
use crate::interp::{interp_clamped, interp_extrapolate};

/// Field scaling between electrode currents and neural locations.
#[derive(Debug, Clone)]
pub struct NeuralModel {
    /// Field per µA normalised by the local dynamic range, locations x electrodes.
    norm_ramp: Array2<f64>,
    /// Threshold in dynamic-range units, one per location.
    offset: Array1<f64>,
    /// Peak-follower coefficient per capture sample.
    alpha: f64,
    /// Activity nonlinearity steepness.
    nl: f64,
}

impl NeuralModel {
    /// Builds the model for the given electrode and neural layout.
    ///
    /// # Arguments
    /// * `cfg` - Vocoder parameters (levels, spread, time constant)
    /// * `elec_oct` - Electrode places in log2 Hz
    /// * `locs` - Neural locations in log2 Hz
    pub fn new(cfg: &VocoderConfig, elec_oct: &[f64], locs: &[f64]) -> VocoderResult<Self> {
        let m_levels: Vec<f64> = cfg
            .mcl_mua
            .expand("mcl_mua", N_ELECTRODES)?
            .into_iter()
            .map(|m| m * cfg.mcl_headroom)
            .collect();
        let t_levels = cfg.t_mua.expand("t_mua", N_ELECTRODES)?;

        let n_locs = locs.len();
        let mut norm_ramp = Array2::zeros((n_locs, N_ELECTRODES));
        let mut offset = Array1::zeros(n_locs);
        let mut shifted = vec![0.0; cfg.spread.f_oct.len()];

        for (l, &loc) in locs.iter().enumerate() {
            let m = interp_clamped(loc, elec_oct, &m_levels);
            let t = interp_clamped(loc, elec_oct, &t_levels);
            let range = m - t;
            offset[l] = t / range;
            for (e, &el) in elec_oct.iter().enumerate() {
                for (s, d) in shifted.iter_mut().zip(&cfg.spread.f_oct) {
                    *s = d + el;
                }
                let field = interp_extrapolate(loc, &shifted, &cfg.spread.voltage).max(0.0);
                norm_ramp[[l, e]] = field / range;
            }
        }

        let alpha = (-1.0 / (cfg.tau_env_ms / 1000.0 * cfg.capture_fs)).exp();
        Ok(Self {
            norm_ramp,
            offset,
            alpha,
            nl: cfg.nl,
        })
    }

    /// Number of neural locations.
    pub fn n_locs(&self) -> usize {
        self.offset.len()
    }

    /// Compressive activity for a field value in dynamic-range units, in `[0, 1]`.
    fn activity(&self, field: f64, offset: f64) -> f64 {
        let ceiling = self.nl.exp();
        let drive = (field - offset).max(0.0) / 0.4 * 0.5;
        (((self.nl * drive).exp().min(ceiling) - 1.0).max(0.0)) / (ceiling - 1.0)
    }

    /// Runs one block of current through the model and returns the mean
    /// neural power per location.
    ///
    /// `power` holds `block_len + 1` columns; column 0 carries the follower
    /// state in and is overwritten with the final column on return.
    pub fn integrate_block(
        &self,
        block: ArrayView2<f64>,
        power: &mut Array2<f64>,
        m_avg: f64,
    ) -> Array1<f64> {
        let current = block.mapv(|c| c.max(0.0));
        let field = self.norm_ramp.dot(&current);
        let block_len = field.ncols();

        for l in 0..self.n_locs() {
            let off = self.offset[l];
            for k in 0..block_len {
                let act = self.activity(field[[l, k]], off);
                let prev = power[[l, k]];
                power[[l, k + 1]] = (prev * self.alpha + act * (1.0 - self.alpha)).max(act);
            }
            power[[l, 0]] = power[[l, block_len]];
        }

        power.sum_axis(ndarray::Axis(1)) / m_avg
    }
}
