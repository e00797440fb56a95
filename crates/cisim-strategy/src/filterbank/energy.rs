//! Linear channel energy with optional AGC gain compensation.

use cisim_spec::{ChannelEnergyConfig, StrategyConfig};
use ndarray::{Array2, Axis};
use tracing::debug;

use super::{check_bins, Spectrum};
use crate::error::{StrategyError, StrategyResult};

/// Maximum allowed difference between a decimated gain trace and the frame count.
const MAX_FRAME_SLACK: usize = 3;

/// Computes `sqrt(sum |X|^2)` over each channel's bins.
///
/// When `agc_gain` is given the energy is divided by the gain, converted from
/// `cfg.gain_domain` and floored at machine epsilon. A trace longer than the
/// frame count is treated as sample-rate and decimated to frame rate.
pub fn channel_energy(
    spectrum: &Spectrum,
    strategy: &StrategyConfig,
    cfg: &ChannelEnergyConfig,
    agc_gain: Option<&[f64]>,
) -> StrategyResult<Array2<f64>> {
    strategy.validate()?;
    check_bins(spectrum, strategy)?;
    let n_frames = spectrum.ncols();
    let mut energy = Array2::zeros((strategy.n_chan, n_frames));

    for (ch, range) in strategy.bin_ranges().into_iter().enumerate() {
        for (frame, col) in spectrum.axis_iter(Axis(1)).enumerate() {
            let power: f64 = range.clone().map(|b| col[b].norm_sqr()).sum();
            energy[[ch, frame]] = power.sqrt();
        }
    }

    if let Some(gain) = agc_gain {
        let frame_gain = frame_rate_gain(gain, n_frames, strategy.n_hop)?;
        for (mut col, g) in energy.axis_iter_mut(Axis(1)).zip(frame_gain) {
            let g = cfg.gain_domain.to_linear(g).max(f64::EPSILON);
            col.mapv_inplace(|e| e / g);
        }
    }

    debug!(
        channels = strategy.n_chan,
        frames = n_frames,
        gain_compensated = agc_gain.is_some(),
        "channel energy"
    );
    Ok(energy)
}

/// Brings a gain trace to one value per frame.
fn frame_rate_gain(gain: &[f64], n_frames: usize, hop: usize) -> StrategyResult<Vec<f64>> {
    if gain.len() < n_frames {
        return Err(StrategyError::shape(
            "agc_gain",
            format!(
                "gain trace has {} values but the spectrum has {} frames",
                gain.len(),
                n_frames
            ),
        ));
    }
    if gain.len() == n_frames {
        return Ok(gain.to_vec());
    }

    let mut decimated: Vec<f64> = (1..)
        .map(|k| k * hop - 1)
        .take_while(|&i| i < gain.len() - 1)
        .map(|i| gain[i])
        .collect();
    if decimated.len().abs_diff(n_frames) > MAX_FRAME_SLACK {
        return Err(StrategyError::shape(
            "agc_gain",
            format!(
                "decimated gain has {} values, expected about {} frames",
                decimated.len(),
                n_frames
            ),
        ));
    }
    let last = decimated.last().copied().unwrap_or(1.0);
    decimated.resize(n_frames, last);
    Ok(decimated)
}
