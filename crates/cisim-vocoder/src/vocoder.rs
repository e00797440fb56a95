//! Electrodogram-to-audio resynthesis.
//!
//! [`Vocoder::new`] precomputes everything that depends only on the
//! configuration. [`Vocoder::process`] then walks the electrodogram block by
//! block, carrying the neural peak-follower state between blocks and, when
//! given a [`VocoderState`], between calls.

use std::f64::consts::PI;

use cisim_spec::{Electrodogram, Normalization, VocoderConfig, Waveform, N_ELECTRODES};
use ndarray::{s, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::erb::erb_spaced_centres;
use crate::error::{VocoderError, VocoderResult};
use crate::geometry::{electrode_octaves, neural_octaves, BlockTiming};
use crate::interp::interp_extrapolate;
use crate::neural::NeuralModel;
use crate::rng::tone_phases;
use crate::spectrum::{de_emphasis_curve, neural_to_bin, tone_magnitudes};

/// Capture rates further apart than this are reported.
const RATE_TOLERANCE_HZ: f64 = 1.0;

/// Peak-follower state handed from one call to the next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocoderState {
    /// Neural power per location, `block_len + 1` columns.
    pub power: Array2<f64>,
}

impl VocoderState {
    /// Zero state for `n_locs` locations and blocks of `block_len` samples.
    pub fn new(n_locs: usize, block_len: usize) -> Self {
        Self {
            power: Array2::zeros((n_locs, block_len + 1)),
        }
    }
}

/// Result of one resynthesis call.
#[derive(Debug, Clone)]
pub struct VocoderOutput {
    /// Normalised audio at [`Vocoder::audio_fs`] (rounded to whole Hz).
    pub audio: Waveform,
    /// Tone envelopes per block, tones x blocks.
    pub tone_envelopes: Array2<f64>,
    /// State to pass to the next call.
    pub state: VocoderState,
}

/// Precomputed resynthesis engine.
#[derive(Debug, Clone)]
pub struct Vocoder {
    cfg: VocoderConfig,
    timing: BlockTiming,
    neural: NeuralModel,
    bin_matrix: Array2<f64>,
    bin_freqs: Vec<f64>,
    tone_freqs: Vec<f64>,
    phases: Vec<f64>,
}

impl Vocoder {
    /// Validates the configuration and builds the field, bin and tone tables.
    pub fn new(cfg: VocoderConfig) -> VocoderResult<Self> {
        cfg.validate()?;
        let timing = BlockTiming::new(&cfg)?;
        let elec_oct = electrode_octaves(&cfg)?;
        let locs = neural_octaves(&cfg);
        let neural = NeuralModel::new(&cfg, &elec_oct, &locs)?;
        let de_emphasis = de_emphasis_curve(&cfg)?;
        let bin_matrix = neural_to_bin(&timing, &locs, de_emphasis.as_ref());
        let tone_freqs = erb_spaced_centres(cfg.tone_freq_lo, cfg.tone_freq_hi, cfg.n_carriers);
        let phases = tone_phases(cfg.seed, cfg.n_carriers);

        debug!(
            block_len = timing.block_len,
            n_fft = timing.n_fft,
            audio_fs = timing.audio_fs,
            n_locs = locs.len(),
            "vocoder initialised"
        );

        Ok(Self {
            bin_freqs: timing.bin_freqs(),
            cfg,
            timing,
            neural,
            bin_matrix,
            tone_freqs,
            phases,
        })
    }

    /// Configuration in use.
    pub fn config(&self) -> &VocoderConfig {
        &self.cfg
    }

    /// Block layout derived from the configuration.
    pub fn timing(&self) -> &BlockTiming {
        &self.timing
    }

    /// Output sampling rate, rounded to whole Hz.
    pub fn audio_fs(&self) -> f64 {
        self.timing.audio_fs.round()
    }

    /// Carrier tone frequencies in Hz.
    pub fn tone_freqs(&self) -> &[f64] {
        &self.tone_freqs
    }

    /// Fresh peak-follower state.
    pub fn initial_state(&self) -> VocoderState {
        VocoderState::new(self.neural.n_locs(), self.timing.block_len)
    }

    /// Output length for an electrodogram of `n_samples` samples.
    pub fn output_len(&self, n_samples: usize) -> usize {
        (n_samples / self.timing.block_len) * self.timing.hop()
    }

    /// Resynthesises an electrodogram.
    ///
    /// Trailing samples that do not fill a block are dropped.
    pub fn process(
        &self,
        elgram: &Electrodogram,
        state: Option<&VocoderState>,
    ) -> VocoderResult<VocoderOutput> {
        if (elgram.sample_rate() - self.cfg.capture_fs).abs() > RATE_TOLERANCE_HZ {
            warn!(
                elgram_fs = elgram.sample_rate(),
                capture_fs = self.cfg.capture_fs,
                "electrodogram rate differs from the configured capture rate"
            );
        }
        self.process_data(elgram.data().view(), state)
    }

    /// Resynthesises a raw current matrix, electrodes x samples.
    ///
    /// A samples x 16 matrix is accepted and transposed.
    pub fn process_data(
        &self,
        data: ArrayView2<f64>,
        state: Option<&VocoderState>,
    ) -> VocoderResult<VocoderOutput> {
        let data = if data.nrows() == N_ELECTRODES {
            data
        } else if data.ncols() == N_ELECTRODES {
            data.reversed_axes()
        } else {
            return Err(VocoderError::shape(format!(
                "expected {} electrode rows, got {} x {}",
                N_ELECTRODES,
                data.nrows(),
                data.ncols()
            )));
        };

        let block_len = self.timing.block_len;
        let n_blocks = data.ncols() / block_len;
        if n_blocks == 0 {
            return Err(VocoderError::TooShort {
                samples: data.ncols(),
                block: block_len,
            });
        }

        let mut power = match state {
            Some(s) => {
                let expected = (self.neural.n_locs(), block_len + 1);
                if s.power.dim() != expected {
                    return Err(VocoderError::shape(format!(
                        "state has shape {:?}, expected {:?}",
                        s.power.dim(),
                        expected
                    )));
                }
                s.power.clone()
            }
            None => self.initial_state().power,
        };

        let m_avg = block_len as f64;
        let mut envelopes = Array2::zeros((self.tone_freqs.len(), n_blocks));
        for b in 0..n_blocks {
            let block = data.slice(s![.., b * block_len..(b + 1) * block_len]);
            let energy = self.neural.integrate_block(block, &mut power, m_avg);
            let mags = tone_magnitudes(&self.bin_matrix, &energy, &self.bin_freqs, &self.tone_freqs);
            for (t, m) in mags.into_iter().enumerate() {
                envelopes[[t, b]] = m;
            }
        }

        let mut samples = self.synthesize(&envelopes);
        normalize(&mut samples, self.cfg.normalization);
        debug!(blocks = n_blocks, samples = samples.len(), "vocoder output ready");

        Ok(VocoderOutput {
            audio: Waveform::new(samples, self.audio_fs()),
            tone_envelopes: envelopes,
            state: VocoderState { power },
        })
    }

    /// Sums the amplitude-modulated tones over the output grid.
    fn synthesize(&self, envelopes: &Array2<f64>) -> Vec<f64> {
        let hop = self.timing.hop();
        let n_blocks = envelopes.ncols();
        let len = n_blocks * hop;
        let block_times: Vec<f64> = (0..n_blocks).map(|b| (b * hop) as f64).collect();
        let mut out = vec![0.0; len];

        for (t, row) in envelopes.axis_iter(Axis(0)).enumerate() {
            let mags = row.to_vec();
            let omega = 2.0 * PI * self.tone_freqs[t] / self.timing.audio_fs;
            let phase = self.phases[t];
            for (i, o) in out.iter_mut().enumerate() {
                let env = interp_extrapolate(i as f64, &block_times, &mags).abs();
                *o += (omega * i as f64 + phase).sin() * env;
            }
        }
        out
    }
}

/// Scales `samples` to the requested level. Silence is left untouched.
fn normalize(samples: &mut [f64], normalization: Normalization) {
    let (level, target_db) = match normalization {
        Normalization::Rms { target_db } => {
            let mean_sq = samples.iter().map(|s| s * s).sum::<f64>() / samples.len().max(1) as f64;
            (mean_sq.sqrt(), target_db)
        }
        Normalization::Peak { target_db } => (
            samples.iter().fold(0.0f64, |acc, s| acc.max(s.abs())),
            target_db,
        ),
    };
    if level <= f64::EPSILON {
        return;
    }
    let gain = 10f64.powf(target_db / 20.0) / level;
    samples.iter_mut().for_each(|s| *s *= gain);
}

#[cfg(test)]
mod tests {
    use super::*;
    use cisim_spec::ELGRAM_FS;
    use pretty_assertions::assert_eq;

    /// Biphasic pulse train on one electrode.
    fn pulse_train(electrode: usize, amp: f64, n: usize) -> Electrodogram {
        let mut data = Array2::zeros((16, n));
        for k in (0..n.saturating_sub(1)).step_by(30) {
            data[[electrode, k]] = -amp;
            data[[electrode, k + 1]] = amp;
        }
        Electrodogram::new(data, ELGRAM_FS).unwrap()
    }

    fn rms_db(x: &[f64]) -> f64 {
        let rms = (x.iter().map(|s| s * s).sum::<f64>() / x.len() as f64).sqrt();
        20.0 * rms.log10()
    }

    #[test]
    fn test_output_length_and_rate() {
        let voc = Vocoder::new(VocoderConfig::default()).unwrap();
        let out = voc.process(&pulse_train(8, 400.0, 2780), None).unwrap();
        assert_eq!(out.audio.len(), 10 * 241);
        assert_eq!(out.audio.len(), voc.output_len(2780));
        assert_eq!(out.audio.sample_rate, 48162.0);
        assert_eq!(out.tone_envelopes.dim(), (20, 10));
    }

    #[test]
    fn test_rms_normalisation() {
        let voc = Vocoder::new(VocoderConfig::default()).unwrap();
        let out = voc.process(&pulse_train(8, 400.0, 5560), None).unwrap();
        assert!((rms_db(&out.audio.samples) + 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_peak_normalisation() {
        let cfg = VocoderConfig {
            normalization: Normalization::Peak { target_db: -1.0 },
            ..Default::default()
        };
        let voc = Vocoder::new(cfg).unwrap();
        let out = voc.process(&pulse_train(8, 400.0, 5560), None).unwrap();
        let peak = out.audio.samples.iter().fold(0.0f64, |a, s| a.max(s.abs()));
        assert!((20.0 * peak.log10() + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_silence_stays_silent() {
        let voc = Vocoder::new(VocoderConfig::default()).unwrap();
        let elgram = Electrodogram::new(Array2::zeros((16, 1000)), ELGRAM_FS).unwrap();
        let out = voc.process(&elgram, None).unwrap();
        assert!(out.audio.samples.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_too_short_rejected() {
        let voc = Vocoder::new(VocoderConfig::default()).unwrap();
        let elgram = Electrodogram::new(Array2::zeros((16, 100)), ELGRAM_FS).unwrap();
        assert!(matches!(
            voc.process(&elgram, None),
            Err(VocoderError::TooShort { samples: 100, block: 278 })
        ));
    }

    #[test]
    fn test_wrong_shape_rejected() {
        let voc = Vocoder::new(VocoderConfig::default()).unwrap();
        let data = Array2::<f64>::zeros((15, 1000));
        assert!(matches!(
            voc.process_data(data.view(), None),
            Err(VocoderError::InvalidShape { .. })
        ));
    }

    #[test]
    fn test_transposed_input_accepted() {
        let voc = Vocoder::new(VocoderConfig::default()).unwrap();
        let elgram = pulse_train(3, 400.0, 1112);
        let a = voc.process(&elgram, None).unwrap();
        let t = elgram.data().t().to_owned();
        let b = voc.process_data(t.view(), None).unwrap();
        assert_eq!(a.audio.samples, b.audio.samples);
    }

    #[test]
    fn test_deterministic_for_seed() {
        let voc = Vocoder::new(VocoderConfig::default()).unwrap();
        let elgram = pulse_train(5, 450.0, 2780);
        let a = voc.process(&elgram, None).unwrap();
        let b = voc.process(&elgram, None).unwrap();
        assert_eq!(a.audio.samples, b.audio.samples);

        let other = Vocoder::new(VocoderConfig {
            seed: 99,
            ..Default::default()
        })
        .unwrap();
        let c = other.process(&elgram, None).unwrap();
        assert_ne!(a.audio.samples, c.audio.samples);
    }

    #[test]
    fn test_state_carries_between_calls() {
        let voc = Vocoder::new(VocoderConfig::default()).unwrap();
        let elgram = pulse_train(8, 500.0, 1390);
        let first = voc.process(&elgram, None).unwrap();
        assert!(first.state.power.iter().any(|&p| p > 0.0));

        let silent = Electrodogram::new(Array2::zeros((16, 278)), ELGRAM_FS).unwrap();
        let fresh = voc.process(&silent, None).unwrap();
        let carried = voc.process(&silent, Some(&first.state)).unwrap();
        assert!(fresh.tone_envelopes.iter().all(|&m| m == 0.0));
        assert!(carried.tone_envelopes.iter().any(|&m| m > 0.0));
    }

    #[test]
    fn test_state_shape_checked() {
        let voc = Vocoder::new(VocoderConfig::default()).unwrap();
        let bad = VocoderState::new(10, 10);
        assert!(voc.process(&pulse_train(8, 400.0, 600), Some(&bad)).is_err());
    }

    #[test]
    fn test_higher_electrode_raises_spectral_centroid() {
        let voc = Vocoder::new(VocoderConfig::default()).unwrap();
        let centroid = |env: &Array2<f64>| {
            let total: Vec<f64> = env.sum_axis(Axis(1)).to_vec();
            let weight: f64 = total.iter().sum();
            total
                .iter()
                .zip(voc.tone_freqs())
                .map(|(m, f)| m * f.log2())
                .sum::<f64>()
                / weight
        };
        let low = voc.process(&pulse_train(2, 500.0, 2780), None).unwrap();
        let high = voc.process(&pulse_train(13, 500.0, 2780), None).unwrap();
        assert!(centroid(&high.tone_envelopes) > centroid(&low.tone_envelopes));
    }
}
