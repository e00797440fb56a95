//! Acceptance checks for a finished electrodogram.
//!
//! Structural problems (row count, generation rate, length) are errors.
//! Charge imbalance and similarity to a reference are findings recorded in the
//! [`ValidationReport`] and logged as warnings.

use cisim_spec::{PipelineConfig, ValidationConfig, ELGRAM_FS, N_ELECTRODES};
use ndarray::{Array2, ArrayView2, Axis};
use serde::Serialize;
use tracing::{debug, warn};

use crate::electrodogram::electrodogram_len;
use crate::error::{StrategyError, StrategyResult};
use crate::post_filterbank::carrier::stim_cycle_count;
use crate::winbuf::frame_count;

/// Outcome of [`validate_electrodogram`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    /// Whether the electrodogram passes.
    pub accepted: bool,
    /// Electrodes whose samples do not sum to zero.
    pub charge_imbalanced: Vec<usize>,
    /// Electrodes closer to the reference than the difference threshold.
    pub similar_channels: Vec<usize>,
    /// Expected number of samples.
    pub expected_len: usize,
    /// Per-electrode `sum |x - ref|`, when a reference was given.
    pub difference: Option<Vec<f64>>,
}

/// Validates an electrodogram against the expected layout and an optional
/// reference.
///
/// A 16-column matrix is accepted and transposed. Without a reference the
/// expected length is `trunc(source_len / source_fs * 55556)` and the
/// similarity check is skipped.
///
/// # Arguments
/// * `elgram` - 16 x samples matrix
/// * `source_len` - length of the source audio in samples
/// * `source_fs` - source audio rate (Hz)
/// * `reference` - reference electrodogram of identical shape
/// * `cfg` - tolerances
pub fn validate_electrodogram(
    elgram: &Array2<f64>,
    source_len: usize,
    source_fs: f64,
    reference: Option<&Array2<f64>>,
    cfg: &ValidationConfig,
) -> StrategyResult<ValidationReport> {
    let data: ArrayView2<f64> = if elgram.nrows() == N_ELECTRODES {
        elgram.view()
    } else if elgram.ncols() == N_ELECTRODES {
        debug!("electrodogram is samples x electrodes, transposing");
        elgram.t()
    } else {
        return Err(StrategyError::shape(
            "electrodogram",
            format!(
                "expected {} rows (electrodes), found {}",
                N_ELECTRODES,
                elgram.nrows()
            ),
        ));
    };

    if let Some(fs) = cfg.elgram_fs {
        if fs.round() != ELGRAM_FS {
            return Err(StrategyError::invalid_param(
                "elgram_fs",
                format!("electrodogram must be generated at {} Hz, got {}", ELGRAM_FS, fs),
            ));
        }
    }

    let expected_len = match reference {
        Some(r) => {
            if r.dim() != data.dim() {
                return Err(StrategyError::shape(
                    "reference",
                    format!(
                        "reference is {}x{}, electrodogram is {}x{}",
                        r.nrows(),
                        r.ncols(),
                        data.nrows(),
                        data.ncols()
                    ),
                ));
            }
            r.ncols()
        }
        None => {
            warn!("no reference electrodogram, similarity check skipped");
            (source_len as f64 / source_fs * ELGRAM_FS).trunc() as usize
        }
    };

    if expected_len.saturating_sub(data.ncols()) > cfg.length_tolerance {
        return Err(StrategyError::shape(
            "electrodogram",
            format!(
                "expected about {} samples (+-{}), found {}",
                expected_len,
                cfg.length_tolerance,
                data.ncols()
            ),
        ));
    }

    // summed in order so that each biphasic pair cancels exactly
    let charge_imbalanced: Vec<usize> = data
        .axis_iter(Axis(0))
        .map(|row| row.iter().fold(0.0, |acc, &x| acc + x))
        .enumerate()
        .filter(|(_, s)| s.abs() > f64::EPSILON)
        .map(|(el, _)| el)
        .collect();
    if !charge_imbalanced.is_empty() {
        warn!(electrodes = ?charge_imbalanced, "electrodogram is not charge-balanced");
    }

    let difference: Option<Vec<f64>> = reference.map(|r| {
        data.axis_iter(Axis(0))
            .zip(r.axis_iter(Axis(0)))
            .map(|(x, y)| x.iter().zip(y.iter()).map(|(a, b)| (a - b).abs()).sum::<f64>())
            .collect()
    });
    let similar_channels: Vec<usize> = difference
        .iter()
        .flatten()
        .enumerate()
        .filter(|(_, &d)| d < cfg.difference_threshold)
        .map(|(el, _)| el)
        .collect();

    let accepted = if similar_channels.is_empty() || cfg.save_if_similar {
        true
    } else {
        similar_channels.len() <= cfg.max_similar_channels
    };
    if !similar_channels.is_empty() {
        warn!(
            electrodes = ?similar_channels,
            accepted,
            "electrodogram is too similar to the reference"
        );
    }

    Ok(ValidationReport {
        accepted,
        charge_imbalanced,
        similar_channels,
        expected_len,
        difference,
    })
}

/// Electrodogram length produced by the pipeline for `input_len` samples at
/// `input_fs`.
///
/// Input at a different rate is assumed to be resampled to the strategy rate
/// beforehand, rounding the length up.
pub fn expected_electrodogram_len(input_len: usize, input_fs: f64, cfg: &PipelineConfig) -> usize {
    let strategy = &cfg.strategy;
    let resampled = if input_fs == strategy.fs {
        input_len
    } else {
        (input_len as f64 * strategy.fs / input_fs).ceil() as usize
    };
    // the AGC preserves length
    let frames = frame_count(resampled, strategy.n_fft, strategy.n_hop, cfg.buffer);
    let cycles = stim_cycle_count(strategy, frames);
    electrodogram_len(cycles, strategy, &cfg.electrodogram)
}
