//! End-to-end strategy: audio in, electrodogram out.

use cisim_spec::{Electrodogram, GainDomain, PipelineConfig, Waveform};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::agc::{dual_loop_agc, AgcOutput, AgcState};
use crate::electrodogram::f120_electrodogram;
use crate::error::{StrategyError, StrategyResult};
use crate::filterbank::{channel_energy, fft_filterbank, hilbert_envelope, Spectrum};
use crate::frontend::pre_emphasis;
use crate::mapping::f120_mapping;
use crate::noise_reduction::{noise_reduction, NoiseReductionOutput, NoiseReductionState};
use crate::post_filterbank::{
    carrier_synthesis, current_steering_weights, decimated_peak_locator, Carrier, PeakLocation,
};
use crate::winbuf::window_buffer;

/// State carried between consecutive calls for continuous operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyState {
    /// AGC trackers.
    pub agc: AgcState,
    /// Noise-reduction trackers; only kept when continuity is enabled.
    pub noise_reduction: Option<NoiseReductionState>,
}

/// Every intermediate product of one pipeline run.
#[derive(Debug, Clone)]
pub struct StrategyOutput {
    /// Pre-emphasised input.
    pub pre_emphasized: Vec<f64>,
    /// AGC output, gain and traces.
    pub agc: AgcOutput,
    /// Short-time spectrum, bins x frames.
    pub spectrum: Spectrum,
    /// Log2 Hilbert envelope, channels x frames.
    pub envelope: Array2<f64>,
    /// Linear channel energy, channels x frames.
    pub energy: Array2<f64>,
    /// Noise-reduction gains and traces.
    pub noise_reduction: NoiseReductionOutput,
    /// Envelope with the noise-reduction gain applied (log2).
    pub envelope_nr: Array2<f64>,
    /// Peak frequency and location at frame rate.
    pub peaks: PeakLocation,
    /// Steering weights, `2*n_chan` x frames.
    pub weights: Array2<f64>,
    /// Carrier at the stimulation-cycle rate.
    pub carrier: Carrier,
    /// Amplitude words, 30 x cycles.
    pub amp_words: Array2<f64>,
    /// Final electrodogram.
    pub electrodogram: Electrodogram,
    /// State for the next call.
    pub state: StrategyState,
}

/// A validated strategy ready to process audio.
#[derive(Debug, Clone)]
pub struct Strategy {
    cfg: PipelineConfig,
}

impl Strategy {
    /// Validates the configuration once and builds the strategy.
    pub fn new(cfg: PipelineConfig) -> StrategyResult<Self> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    /// The configuration this strategy runs with.
    pub fn config(&self) -> &PipelineConfig {
        &self.cfg
    }

    /// Runs every stage on `input`.
    ///
    /// The input must already be at the strategy rate. `state` continues the
    /// AGC and, when enabled, the noise-reduction trackers from a previous
    /// call.
    pub fn process(
        &self,
        input: &Waveform,
        state: Option<&StrategyState>,
    ) -> StrategyResult<StrategyOutput> {
        let cfg = &self.cfg;
        let strategy = &cfg.strategy;
        if input.sample_rate != strategy.fs {
            return Err(StrategyError::SampleRateMismatch {
                expected: strategy.fs,
                actual: input.sample_rate,
            });
        }
        if input.is_empty() {
            return Err(StrategyError::empty("input"));
        }

        let pre_emphasized = pre_emphasis(&input.samples, &cfg.pre_emphasis)?;
        let agc = dual_loop_agc(
            &pre_emphasized,
            None,
            &cfg.agc,
            strategy.fs,
            state.map(|s| &s.agc),
        )?;

        let frames = window_buffer(&agc.wav_out, strategy, cfg.buffer)?;
        let spectrum = fft_filterbank(&frames, strategy, &cfg.filterbank)?;
        let envelope = hilbert_envelope(&spectrum, strategy, &cfg.hilbert)?;

        let agc_gain: Vec<f64> = agc
            .gain
            .iter()
            .map(|&g| cfg.energy.gain_domain.from_linear(g))
            .collect();
        let energy = channel_energy(&spectrum, strategy, &cfg.energy, Some(&agc_gain))?;

        let nr_init = if cfg.noise_reduction.enable_continuous {
            state.and_then(|s| s.noise_reduction.as_ref())
        } else {
            None
        };
        let nr = noise_reduction(&energy, strategy, &cfg.noise_reduction, nr_init)?;
        let nr_domain = cfg.noise_reduction.gain_domain;
        let envelope_nr = &envelope
            + &nr
                .gain
                .mapv(|g| GainDomain::Log2.from_linear(nr_domain.to_linear(g)));

        let peaks = decimated_peak_locator(&spectrum, strategy, &cfg.peak_locator)?;
        let weights = current_steering_weights(&peaks.loc, strategy, &cfg.steering)?;
        let carrier = carrier_synthesis(&peaks.freq, strategy, &cfg.carrier)?;
        let amp_words = f120_mapping(&envelope_nr, &weights, &carrier, strategy, &cfg.mapping)?;
        let electrodogram = f120_electrodogram(&amp_words, strategy, &cfg.electrodogram)?;

        let state = StrategyState {
            agc: agc.state,
            noise_reduction: cfg
                .noise_reduction
                .enable_continuous
                .then(|| nr.state.clone()),
        };

        debug!(
            frames = spectrum.ncols(),
            cycles = carrier.n_cycles(),
            "strategy stages complete"
        );
        info!(
            input_samples = input.len(),
            electrodogram_samples = electrodogram.n_samples(),
            sample_rate = electrodogram.sample_rate(),
            "strategy processed"
        );

        Ok(StrategyOutput {
            pre_emphasized,
            agc,
            spectrum,
            envelope,
            energy,
            noise_reduction: nr,
            envelope_nr,
            peaks,
            weights,
            carrier,
            amp_words,
            electrodogram,
            state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn tone(freq: f64, secs: f64) -> Waveform {
        let fs = 17400.0;
        let n = (secs * fs) as usize;
        Waveform::new(
            (0..n)
                .map(|i| 0.3 * (2.0 * PI * freq * i as f64 / fs).sin())
                .collect(),
            fs,
        )
    }

    #[test]
    fn test_default_pipeline_shapes() {
        let strategy = Strategy::new(PipelineConfig::default()).unwrap();
        let input = tone(1000.0, 0.2);
        let out = strategy.process(&input, None).unwrap();
        let frames = out.spectrum.ncols();
        assert_eq!(frames, input.len().div_ceil(20));
        assert_eq!(out.envelope.dim(), (15, frames));
        assert_eq!(out.weights.dim(), (30, frames));
        assert_eq!(out.amp_words.nrows(), 30);
        assert_eq!(out.electrodogram.n_electrodes(), 16);
        assert_eq!(out.electrodogram.n_samples(), out.amp_words.ncols() * 30);
        assert!(out
            .electrodogram
            .channel_sums()
            .iter()
            .all(|s| s.abs() < 1e-6));
        assert!(out.state.noise_reduction.is_none());
    }

    #[test]
    fn test_tone_drives_its_channel() {
        let strategy = Strategy::new(PipelineConfig::default()).unwrap();
        let out = strategy.process(&tone(1000.0, 0.3), None).unwrap();
        // channel 5 covers 1 kHz; its electrodes (5, 6) carry the most current
        let energy: Vec<f64> = out
            .electrodogram
            .data()
            .rows()
            .into_iter()
            .map(|r| r.iter().map(|v| v.abs()).sum())
            .collect();
        let loudest = energy
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert!(loudest == 5 || loudest == 6, "loudest electrode {}", loudest);
    }

    #[test]
    fn test_rate_mismatch_rejected() {
        let strategy = Strategy::new(PipelineConfig::default()).unwrap();
        let input = Waveform::new(vec![0.0; 100], 16000.0);
        assert!(matches!(
            strategy.process(&input, None),
            Err(StrategyError::SampleRateMismatch { .. })
        ));
    }

    #[test]
    fn test_empty_rejected() {
        let strategy = Strategy::new(PipelineConfig::default()).unwrap();
        let input = Waveform::new(vec![], 17400.0);
        assert!(strategy.process(&input, None).is_err());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut cfg = PipelineConfig::default();
        cfg.strategy.n_fft = 255;
        assert!(Strategy::new(cfg).is_err());
    }

    #[test]
    fn test_continuous_state_returned() {
        let mut cfg = PipelineConfig::default();
        cfg.noise_reduction.enable_continuous = true;
        let strategy = Strategy::new(cfg).unwrap();
        let first = strategy.process(&tone(500.0, 0.1), None).unwrap();
        let nr = first.state.noise_reduction.clone().unwrap();
        assert_eq!(nr.speech.len(), 15);
        let second = strategy
            .process(&tone(500.0, 0.1), Some(&first.state))
            .unwrap();
        // trackers continue instead of restarting from silence
        assert!(second.noise_reduction.speech[[5, 0]] > first.noise_reduction.speech[[5, 0]]);
    }
}
