//! Mapping from neural power to output tone magnitudes.

use cisim_spec::VocoderConfig;
use cisim_strategy::frontend::pre_emphasis_response_db;
use ndarray::{Array1, Array2};

use crate::error::VocoderResult;
use crate::geometry::BlockTiming;
use crate::interp::{interp_clamped, interp_extrapolate};

/// Grid points used to sample the emphasis response.
const EMPHASIS_GRID: usize = 256;

/// Gain in dB that undoes the pre-emphasis, sampled on `(freqs, gains)`.
///
/// The response is held flat above its maximum, negated, and shifted so the
/// lowest grid frequency has zero gain.
pub fn de_emphasis_curve(cfg: &VocoderConfig) -> VocoderResult<Option<(Vec<f64>, Vec<f64>)>> {
    let Some(emphasis) = &cfg.emphasis else {
        return Ok(None);
    };
    let nyquist = cfg.emphasis_fs / 2.0;
    let freqs: Vec<f64> = (1..=EMPHASIS_GRID)
        .map(|k| k as f64 * nyquist / EMPHASIS_GRID as f64)
        .collect();
    let mut db = pre_emphasis_response_db(&freqs, cfg.emphasis_fs, emphasis)?;

    let peak = db
        .iter()
        .enumerate()
        .fold(0, |best, (i, &v)| if v > db[best] { i } else { best });
    let peak_db = db[peak];
    db[peak + 1..].iter_mut().for_each(|v| *v = peak_db);

    let first = -db[0];
    let gains = db.iter().map(|v| -v - first).collect();
    Ok(Some((freqs, gains)))
}

/// Assignment of neural locations to FFT bins with de-emphasis, bins x locations.
pub fn neural_to_bin(
    timing: &BlockTiming,
    locs: &[f64],
    de_emphasis: Option<&(Vec<f64>, Vec<f64>)>,
) -> Array2<f64> {
    let bin_freqs = timing.bin_freqs();
    let bin_oct: Vec<f64> = bin_freqs.iter().map(|f| f.log2()).collect();
    let mut matrix = Array2::zeros((bin_freqs.len(), locs.len()));

    for (l, &loc) in locs.iter().enumerate() {
        let nearest = bin_oct
            .iter()
            .enumerate()
            .fold((0, f64::INFINITY), |acc, (i, &b)| {
                let d = (b - loc).abs();
                if d < acc.1 {
                    (i, d)
                } else {
                    acc
                }
            })
            .0;
        matrix[[nearest, l]] = 1.0;
    }

    if let Some((freqs, gains)) = de_emphasis {
        let mut xp = Vec::with_capacity(freqs.len() + 1);
        xp.push(0.0);
        xp.extend_from_slice(freqs);
        let mut fp = Vec::with_capacity(gains.len() + 1);
        fp.push(0.0);
        fp.extend_from_slice(gains);
        for (r, mut row) in matrix.rows_mut().into_iter().enumerate() {
            let scale = 10f64.powf(interp_clamped(bin_freqs[r], &xp, &fp) / 20.0);
            row.mapv_inplace(|v| v * scale);
        }
    }
    matrix
}

/// Tone magnitudes read off the bin spectrum at each tone frequency.
pub fn tone_magnitudes(
    matrix: &Array2<f64>,
    energy: &Array1<f64>,
    bin_freqs: &[f64],
    tone_freqs: &[f64],
) -> Vec<f64> {
    let spectrum = matrix.dot(energy).to_vec();
    tone_freqs
        .iter()
        .map(|&f| interp_extrapolate(f, bin_freqs, &spectrum))
        .collect()
}
