//! Block timing and the place-frequency layout of electrodes and neurons.

use cisim_spec::{VocoderConfig, N_ELECTRODES};

use crate::error::{VocoderError, VocoderResult};
use crate::interp::{interp_clamped, linspace};

/// Default lowest electrode place frequency (Hz).
pub const ELEC_FREQ_LO: f64 = 381.5;
/// Default highest electrode place frequency (Hz).
pub const ELEC_FREQ_HI: f64 = 5046.4;

/// How electrodogram blocks line up with output audio blocks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockTiming {
    /// Electrodogram samples per block.
    pub block_len: usize,
    /// Block duration in seconds, a whole number of capture samples.
    pub t_avg: f64,
    /// Output sampling rate, adjusted so a block spans whole samples.
    pub audio_fs: f64,
    /// FFT length of the synthesis spectrum (two blocks of audio).
    pub n_fft: usize,
}

impl BlockTiming {
    /// Derives the block layout from the configured rates and window.
    pub fn new(cfg: &VocoderConfig) -> VocoderResult<Self> {
        let capt_ts = 1.0 / cfg.capture_fs;
        let t_avg = (cfg.t_avg / capt_ts).ceil() * capt_ts;
        let block_len = (t_avg / capt_ts).round() as usize;
        let audio_fs = (t_avg * cfg.audio_fs).ceil() / t_avg;
        let n_fft = (2.0 * t_avg * audio_fs).round() as usize;
        if block_len == 0 || n_fft < 2 {
            return Err(VocoderError::invalid_param(
                "t_avg",
                format!("averaging window {} s is shorter than one sample", cfg.t_avg),
            ));
        }
        Ok(Self {
            block_len,
            t_avg,
            audio_fs,
            n_fft,
        })
    }

    /// Audio samples produced per block.
    pub fn hop(&self) -> usize {
        self.n_fft / 2
    }

    /// Frequencies of FFT bins 1..=n_fft/2.
    pub fn bin_freqs(&self) -> Vec<f64> {
        (1..=self.hop())
            .map(|k| k as f64 * self.audio_fs / self.n_fft as f64)
            .collect()
    }
}

/// Electrode place frequencies in log2 Hz, strictly increasing.
pub fn electrode_octaves(cfg: &VocoderConfig) -> VocoderResult<Vec<f64>> {
    let freqs = match &cfg.elec_freqs {
        Some(f) => f.clone(),
        None => {
            let (lo, hi) = (ELEC_FREQ_LO.log10(), ELEC_FREQ_HI.log10());
            linspace(lo, hi, N_ELECTRODES)
                .into_iter()
                .map(|e| 10f64.powf(e))
                .collect()
        }
    };
    let octaves: Vec<f64> = freqs.iter().map(|f| f.log2()).collect();
    if octaves.windows(2).any(|w| w[1] <= w[0]) {
        return Err(VocoderError::invalid_param(
            "elec_freqs",
            "electrode place frequencies must be strictly increasing",
        ));
    }
    Ok(octaves)
}

/// Neural locations in log2 Hz, resampled to `n_neural_locs` points.
///
/// The default profile places 40 populations linearly between 150 and 850 Hz
/// and 260 log-spaced between 870 and 8000 Hz.
pub fn neural_octaves(cfg: &VocoderConfig) -> Vec<f64> {
    let base = match &cfg.neural_locs_oct {
        Some(locs) => locs.clone(),
        None => {
            let mut locs: Vec<f64> = linspace(150.0, 850.0, 40)
                .into_iter()
                .map(f64::log2)
                .collect();
            locs.extend(linspace(870f64.log2(), 8000f64.log2(), 260));
            locs
        }
    };
    let index: Vec<f64> = (1..=base.len()).map(|i| i as f64).collect();
    linspace(1.0, base.len() as f64, cfg.n_neural_locs)
        .into_iter()
        .map(|x| interp_clamped(x, &index, &base))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timing() {
        let timing = BlockTiming::new(&VocoderConfig::default()).unwrap();
        assert_eq!(timing.block_len, 278);
        assert_eq!(timing.n_fft, 482);
        assert_eq!(timing.hop(), 241);
        assert_eq!(timing.audio_fs.round() as u32, 48162);
    }

    #[test]
    fn test_default_electrode_span() {
        let oct = electrode_octaves(&VocoderConfig::default()).unwrap();
        assert_eq!(oct.len(), 16);
        assert!((oct[0].exp2() - ELEC_FREQ_LO).abs() < 1e-9);
        assert!((oct[15].exp2() - ELEC_FREQ_HI).abs() < 1e-6);
    }

    #[test]
    fn test_decreasing_electrodes_rejected() {
        let mut freqs: Vec<f64> = (0..16).map(|i| 400.0 + 300.0 * i as f64).collect();
        freqs.reverse();
        let cfg = VocoderConfig {
            elec_freqs: Some(freqs),
            ..Default::default()
        };
        assert!(electrode_octaves(&cfg).is_err());
    }

    #[test]
    fn test_neural_profile_resampled() {
        let locs = neural_octaves(&VocoderConfig::default());
        assert_eq!(locs.len(), 300);
        assert!((locs[0] - 150f64.log2()).abs() < 1e-12);
        assert!((locs[299] - 8000f64.log2()).abs() < 1e-12);
        assert!(locs.windows(2).all(|w| w[1] > w[0]));

        let coarse = neural_octaves(&VocoderConfig {
            n_neural_locs: 50,
            ..Default::default()
        });
        assert_eq!(coarse.len(), 50);
        assert!((coarse[49] - 8000f64.log2()).abs() < 1e-12);
    }
}
