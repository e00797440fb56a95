//! Electrodogram synthesis from amplitude words.
//!
//! Every stimulation cycle has `2 * n_chan` phase slots of one pulse width.
//! Channel `ch` fires in slot pair `2 * (channel_order[ch] - 1)` on electrodes
//! `ch` and `ch + 1`. Each pulse is biphasic: a differencing kernel turns the
//! amplitude written at the slot into two opposite phases, so every electrode
//! row sums to zero.

use cisim_spec::{
    Electrodogram, ElectrodogramConfig, StrategyConfig, N_AMPLITUDE_WORDS, N_ELECTRODES,
};
use ndarray::{Array2, Axis};
use tracing::debug;

use crate::error::{StrategyError, StrategyResult};

/// Tolerance when locating an output instant on the phase grid.
const GRID_EPS: f64 = 1e-9;

/// Number of electrodogram samples for `n_cycles` stimulation cycles.
pub fn electrodogram_len(
    n_cycles: usize,
    strategy: &StrategyConfig,
    cfg: &ElectrodogramConfig,
) -> usize {
    let n_phases = n_cycles * 2 * strategy.n_chan;
    match cfg.output_fs {
        None => n_phases,
        Some(fs) => resampled_len(n_phases, strategy.pulse_width_us * 1e-6, fs),
    }
}

fn resampled_len(n_in: usize, dt_in: f64, fs_out: f64) -> usize {
    (n_in as f64 * dt_in * fs_out + GRID_EPS).floor() as usize
}

/// Builds the 16-electrode biphasic pulse pattern.
///
/// # Arguments
/// * `amp_words` - 30 x cycles amplitude words from the mapping stage
/// * `strategy` - channel count and pulse width
/// * `cfg` - pulse order, polarity and optional output rate
pub fn f120_electrodogram(
    amp_words: &Array2<f64>,
    strategy: &StrategyConfig,
    cfg: &ElectrodogramConfig,
) -> StrategyResult<Electrodogram> {
    strategy.validate()?;
    cfg.validate(strategy)?;
    let n_chan = strategy.n_chan;
    if amp_words.nrows() != N_AMPLITUDE_WORDS {
        return Err(StrategyError::shape(
            "amp_words",
            format!("expected {} rows, got {}", N_AMPLITUDE_WORDS, amp_words.nrows()),
        ));
    }

    let phases_per_cycle = 2 * n_chan;
    let n_cycles = amp_words.ncols();
    let n_phases = n_cycles * phases_per_cycle;
    let mut slots = Array2::zeros((N_ELECTRODES, n_phases));

    for (ch, &order) in cfg.channel_order.iter().enumerate() {
        let offset = 2 * (order - 1);
        for (k, words) in amp_words.axis_iter(Axis(1)).enumerate() {
            let t = k * phases_per_cycle + offset;
            slots[[ch, t]] += words[2 * ch];
            slots[[ch + 1, t]] += words[2 * ch + 1];
        }
    }

    let sign = if cfg.cathodic_first { -1.0 } else { 1.0 };
    let mut data = Array2::zeros((N_ELECTRODES, n_phases));
    for (src, mut dst) in slots.axis_iter(Axis(0)).zip(data.axis_iter_mut(Axis(0))) {
        let mut prev = 0.0;
        for (x, y) in src.iter().zip(dst.iter_mut()) {
            *y = sign * (x - prev);
            prev = *x;
        }
    }

    let phase_rate = strategy.phase_rate();
    let elgram = match cfg.output_fs {
        None => Electrodogram::new(data, phase_rate)?,
        Some(fs) => {
            let resampled = resample_previous(&data, strategy.pulse_width_us * 1e-6, fs);
            Electrodogram::new(resampled, fs)?
        }
    };

    debug!(
        cycles = n_cycles,
        samples = elgram.n_samples(),
        sample_rate = elgram.sample_rate(),
        "electrodogram"
    );
    Ok(elgram)
}

/// Zero-order-hold resampling from a grid of `dt_in` seconds to `fs_out`.
fn resample_previous(data: &Array2<f64>, dt_in: f64, fs_out: f64) -> Array2<f64> {
    let n_in = data.ncols();
    let dt_out = 1.0 / fs_out;
    let n_out = resampled_len(n_in, dt_in, fs_out);
    let src: Vec<usize> = (0..n_out)
        .map(|j| ((j as f64 * dt_out / dt_in + GRID_EPS).floor() as usize).min(n_in - 1))
        .collect();
    Array2::from_shape_fn((data.nrows(), n_out), |(r, j)| data[[r, src[j]]])
}
