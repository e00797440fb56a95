//! Channel-to-electrode amplitude mapping.

use cisim_spec::{CarrierMode, MappingConfig, StrategyConfig, N_AMPLITUDE_WORDS};
use ndarray::Array2;
use tracing::debug;

use crate::error::{StrategyError, StrategyResult};
use crate::post_filterbank::Carrier;

/// Converts log2 power to dB.
const LOG2_TO_DB: f64 = 10.0 * std::f64::consts::LOG10_2;

/// Saturation level of the envelope (dB), i.e. 30 log2 units.
const M_SAT_DB: f64 = 30.0 * LOG2_TO_DB;

/// Linear map from envelope dB to current units for one electrode.
#[derive(Debug, Clone, Copy)]
struct ElectrodeMap {
    slope: f64,
    offset: f64,
    clip: f64,
}

impl ElectrodeMap {
    fn new(cfg: &MappingConfig, el: usize) -> Self {
        let slope = (cfg.map_m[el] - cfg.map_t[el]) / cfg.map_idr[el];
        Self {
            slope,
            offset: cfg.map_m[el] + slope * (-M_SAT_DB + 12.0 + cfg.map_gain[el]),
            clip: cfg.map_clip[el],
        }
    }

    fn map(&self, env_db: f64, carrier: f64, mode: CarrierMode) -> f64 {
        let v = match mode {
            CarrierMode::EnvelopeOnly => self.slope * env_db + self.offset,
            CarrierMode::MultiplyEnvelope => self.slope * env_db * carrier + self.offset,
            CarrierMode::MultiplyOutput => (self.slope * env_db + self.offset) * carrier,
        };
        v.min(self.clip).max(0.0)
    }
}

/// Maps channel envelopes onto the 30 amplitude words of a stimulation cycle.
///
/// Channel `ch` drives the electrode pair starting at `chan_to_elec_pair[ch]`.
/// Word `2*el` carries the low electrode and word `2*el + 1` the high one, each
/// scaled by the matching steering weight.
///
/// # Arguments
/// * `envelope` - channels x audio frames log2 envelope
/// * `weights` - `2*n_chan` x audio frames steering weights
/// * `carrier` - per-cycle carrier and audio frame index
/// * `strategy` - channel count
/// * `cfg` - electrode map
pub fn f120_mapping(
    envelope: &Array2<f64>,
    weights: &Array2<f64>,
    carrier: &Carrier,
    strategy: &StrategyConfig,
    cfg: &MappingConfig,
) -> StrategyResult<Array2<f64>> {
    strategy.validate()?;
    cfg.validate(strategy)?;
    let n_chan = strategy.n_chan;
    let n_frames = envelope.ncols();
    if envelope.nrows() != n_chan {
        return Err(StrategyError::shape(
            "envelope",
            format!("expected {} rows, got {}", n_chan, envelope.nrows()),
        ));
    }
    if weights.dim() != (2 * n_chan, n_frames) {
        return Err(StrategyError::shape(
            "weights",
            format!(
                "expected {}x{}, got {}x{}",
                2 * n_chan,
                n_frames,
                weights.nrows(),
                weights.ncols()
            ),
        ));
    }
    if carrier.carrier.nrows() != n_chan || carrier.audio_frame.iter().any(|&f| f >= n_frames) {
        return Err(StrategyError::shape(
            "carrier",
            "carrier must have one row per channel and index existing audio frames",
        ));
    }

    let n_cycles = carrier.n_cycles();
    let mut words = Array2::zeros((N_AMPLITUDE_WORDS, n_cycles));

    for ch in 0..n_chan {
        let el_lo = cfg.chan_to_elec_pair[ch];
        let lo = ElectrodeMap::new(cfg, el_lo);
        let hi = ElectrodeMap::new(cfg, el_lo + 1);
        for (k, &frame) in carrier.audio_frame.iter().enumerate() {
            let env_db = envelope[[ch, frame]] * LOG2_TO_DB;
            let c = carrier.carrier[[ch, k]];
            words[[2 * el_lo, k]] =
                lo.map(env_db, c, cfg.carrier_mode) * weights[[ch, frame]];
            words[[2 * el_lo + 1, k]] =
                hi.map(env_db, c, cfg.carrier_mode) * weights[[ch + n_chan, frame]];
        }
    }

    debug!(cycles = n_cycles, mode = ?cfg.carrier_mode, "F120 mapping");
    Ok(words)
}
