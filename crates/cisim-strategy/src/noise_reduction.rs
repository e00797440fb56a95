//! Per-channel SNR-driven noise reduction.
//!
//! A fast tracker follows the channel level in dB (speech estimate) and a
//! slow tracker follows the noise floor. The noise tracker pauses for up to
//! `dur_hold` seconds after an onset so that speech does not leak into the
//! noise estimate. The gain is a logistic function of the estimated SNR.

use cisim_spec::{NoiseReductionConfig, StrategyConfig};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{StrategyError, StrategyResult};

/// Lowest level (dB) fed to the trackers.
const LOG_FLOOR_DB: f64 = -100.0;

/// Hold logic phase of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum HoldPhase {
    /// Steady input; the next rise above threshold starts a hold.
    Ready,
    /// Noise tracker frozen after an onset.
    Holding {
        /// Noise updates left before the hold expires.
        remaining: f64,
    },
    /// Hold ran out while the level stayed high; the noise tracker adapts again.
    Expired,
}

/// What a noise-estimate update did for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldEvent {
    /// Level within threshold of the noise floor.
    Steady,
    /// Rise above threshold while ready.
    Onset,
    /// Still holding.
    Holding,
    /// Hold exhausted or already expired.
    HoldExpired,
}

impl HoldPhase {
    /// Applies one noise-estimate update and reports whether the noise
    /// tracker may adapt in this step.
    fn update(&mut self, steady: bool, max_hold: f64) -> (HoldEvent, bool) {
        if steady {
            *self = HoldPhase::Ready;
            return (HoldEvent::Steady, true);
        }
        match *self {
            HoldPhase::Ready => {
                *self = HoldPhase::Holding {
                    remaining: max_hold,
                };
                (HoldEvent::Onset, false)
            }
            HoldPhase::Holding { remaining } => {
                let remaining = remaining - 1.0;
                if remaining <= 0.0 {
                    *self = HoldPhase::Expired;
                    (HoldEvent::HoldExpired, false)
                } else {
                    *self = HoldPhase::Holding { remaining };
                    (HoldEvent::Holding, false)
                }
            }
            HoldPhase::Expired => (HoldEvent::HoldExpired, true),
        }
    }

    /// Whether the noise tracker is currently frozen.
    pub fn is_holding(&self) -> bool {
        matches!(self, HoldPhase::Holding { .. })
    }
}

/// Tracker values carried between calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseReductionState {
    /// Speech level per channel (dB).
    pub speech: Vec<f64>,
    /// Noise level per channel (dB).
    pub noise: Vec<f64>,
    /// Hold phase per channel.
    pub phase: Vec<HoldPhase>,
}

impl NoiseReductionState {
    /// Silent trackers, all channels ready.
    pub fn new(n_chan: usize) -> Self {
        Self::from_levels(n_chan, 0.0, 0.0)
    }

    /// Trackers at the given levels (dB), all channels ready.
    pub fn from_levels(n_chan: usize, speech_db: f64, noise_db: f64) -> Self {
        Self {
            speech: vec![speech_db; n_chan],
            noise: vec![noise_db; n_chan],
            phase: vec![HoldPhase::Ready; n_chan],
        }
    }

    fn check(&self, n_chan: usize) -> StrategyResult<()> {
        if self.speech.len() != n_chan || self.noise.len() != n_chan || self.phase.len() != n_chan
        {
            return Err(StrategyError::shape(
                "noise_reduction_state",
                format!("state must describe {} channels", n_chan),
            ));
        }
        Ok(())
    }
}

/// Result of [`noise_reduction`].
#[derive(Debug, Clone)]
pub struct NoiseReductionOutput {
    /// Gains in the configured domain, channels x frames.
    pub gain: Array2<f64>,
    /// Input amplitudes times the linear gain.
    pub amplitude: Array2<f64>,
    /// Noise estimate (dB) per frame.
    pub noise: Array2<f64>,
    /// Speech estimate (dB) per frame.
    pub speech: Array2<f64>,
    /// Whether each channel was holding at each frame.
    pub hold: Array2<bool>,
    /// Hold transition per channel on noise-estimate frames; `None` between them.
    pub events: Array2<Option<HoldEvent>>,
    /// Tracker state after the last frame.
    pub state: NoiseReductionState,
}

/// Logistic gain curve, see [`noise_reduction`].
#[derive(Debug, Clone, Copy)]
struct GainCurve {
    g_min: f64,
    slope_fact: f64,
    snr_slope: f64,
    snr_floor: f64,
    snr_ceil: f64,
}

impl GainCurve {
    fn new(cfg: &NoiseReductionConfig) -> Self {
        let logistic_at_floor =
            1.0 / (1.0 + (-cfg.slope_fact * (cfg.snr_floor - cfg.snr_slope)).exp());
        // chosen so that the gain at snr_floor equals the maximum attenuation
        let g_min = 1.0 + (cfg.max_att_linear() - 1.0) / (1.0 - logistic_at_floor);
        Self {
            g_min,
            slope_fact: cfg.slope_fact,
            snr_slope: cfg.snr_slope,
            snr_floor: cfg.snr_floor,
            snr_ceil: cfg.snr_ceil,
        }
    }

    fn gain(&self, snr: f64) -> f64 {
        let snr = snr.clamp(self.snr_floor, self.snr_ceil);
        self.g_min + (1.0 - self.g_min) / (1.0 + (-self.slope_fact * (snr - self.snr_slope)).exp())
    }
}

/// Computes channel-by-channel noise-reduction gains.
///
/// # Arguments
/// * `amplitude` - channels x frames linear channel amplitudes
/// * `strategy` - frame timing
/// * `cfg` - tracker and gain-curve parameters
/// * `init` - tracker state from a previous call; silent trackers when `None`
pub fn noise_reduction(
    amplitude: &Array2<f64>,
    strategy: &StrategyConfig,
    cfg: &NoiseReductionConfig,
    init: Option<&NoiseReductionState>,
) -> StrategyResult<NoiseReductionOutput> {
    strategy.validate()?;
    cfg.validate()?;
    let (n_chan, n_frames) = amplitude.dim();
    let mut state = match init {
        Some(s) => {
            s.check(n_chan)?;
            s.clone()
        }
        None => match cfg.init_state {
            Some(levels) => {
                NoiseReductionState::from_levels(n_chan, levels.speech_db, levels.noise_db)
            }
            None => NoiseReductionState::new(n_chan),
        },
    };

    let dt = strategy.frame_duration();
    let alpha_s = (-dt / cfg.tau_speech).exp();
    let alpha_n = (-dt / cfg.tau_noise).exp();
    let max_hold = cfg.dur_hold / (dt * cfg.noise_est_decimation as f64);
    let curve = GainCurve::new(cfg);

    let mut gain = Array2::zeros((n_chan, n_frames));
    let mut noise = Array2::zeros((n_chan, n_frames));
    let mut speech = Array2::zeros((n_chan, n_frames));
    let mut hold = Array2::from_elem((n_chan, n_frames), false);
    let mut events = Array2::from_elem((n_chan, n_frames), None);

    for (frame, col) in amplitude.axis_iter(Axis(1)).enumerate() {
        let update_noise = frame % cfg.noise_est_decimation == 0;
        for (ch, &a) in col.iter().enumerate() {
            let level = (20.0 * a.log10()).max(LOG_FLOOR_DB);
            let vs = alpha_s * state.speech[ch] + (1.0 - alpha_s) * level;
            state.speech[ch] = vs;

            if update_noise {
                let steady = vs - state.noise[ch] < cfg.thresh_hold;
                let (event, adapt) = state.phase[ch].update(steady, max_hold);
                events[[ch, frame]] = Some(event);
                if adapt {
                    state.noise[ch] = alpha_n * state.noise[ch] + (1.0 - alpha_n) * vs;
                }
            }

            gain[[ch, frame]] = curve.gain(vs - state.noise[ch]);
            noise[[ch, frame]] = state.noise[ch];
            speech[[ch, frame]] = vs;
            hold[[ch, frame]] = state.phase[ch].is_holding();
        }
    }

    let attenuated = amplitude * &gain;
    let gain = gain.mapv(|g| cfg.gain_domain.from_linear(g));

    let onsets = events
        .iter()
        .filter(|e| matches!(e, Some(HoldEvent::Onset)))
        .count();
    debug!(
        channels = n_chan,
        frames = n_frames,
        g_min = curve.g_min,
        onsets,
        "noise reduction"
    );
    Ok(NoiseReductionOutput {
        gain,
        amplitude: attenuated,
        noise,
        speech,
        hold,
        events,
        state,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cisim_spec::GainDomain;

    fn linear_cfg() -> NoiseReductionConfig {
        NoiseReductionConfig {
            gain_domain: GainDomain::Linear,
            ..Default::default()
        }
    }

    #[test]
    fn test_gain_curve_limits() {
        let cfg = NoiseReductionConfig::default();
        let curve = GainCurve::new(&cfg);
        assert!((curve.gain(-50.0) - cfg.max_att_linear()).abs() < 1e-12);
        assert!((curve.gain(cfg.snr_floor) - cfg.max_att_linear()).abs() < 1e-12);
        let top = curve.gain(1000.0);
        assert!(top > 0.99 && top <= 1.0);
        assert!(curve.gain(10.0) > curve.gain(5.0));
    }

    #[test]
    fn test_silence_then_tone() {
        let strategy = StrategyConfig::default();
        let cfg = linear_cfg();
        let n = 400;
        let mut a = Array2::from_elem((1, n), 1e-4);
        for f in n / 2..n {
            a[[0, f]] = 1.0;
        }
        let out = noise_reduction(&a, &strategy, &cfg, None).unwrap();
        let floor = cfg.max_att_linear();
        // settled noise: gain near the floor
        assert!(out.gain[[0, n / 2 - 1]] < floor + 0.05);
        // tone onset raises the SNR and the gain
        assert!(out.gain[[0, n / 2 + 50]] > 0.9);
        // onset starts a hold
        assert!(out.hold[[0, n / 2 + 50]]);
        assert!(out.gain.iter().all(|&g| g >= floor - 1e-12 && g <= 1.0));
    }

    #[test]
    fn test_hold_expires() {
        let strategy = StrategyConfig::default();
        let cfg = NoiseReductionConfig {
            dur_hold: 0.05,
            ..linear_cfg()
        };
        let n = 300;
        let mut a = Array2::from_elem((1, n), 1e-4);
        for f in 100..n {
            a[[0, f]] = 1.0;
        }
        let out = noise_reduction(&a, &strategy, &cfg, None).unwrap();
        let max_hold = (0.05 / strategy.frame_duration()).ceil() as usize;
        let onset = (100..n).find(|&f| out.hold[[0, f]]).unwrap();
        assert!(out.hold[[0, onset + max_hold - 2]]);
        assert!(!out.hold[[0, onset + max_hold + 1]]);
        assert!(matches!(out.state.phase[0], HoldPhase::Expired));
        // noise tracker adapts again after the hold
        assert!(out.noise[[0, n - 1]] > out.noise[[0, onset + max_hold]]);
    }

    #[test]
    fn test_hold_phase_transitions() {
        let mut p = HoldPhase::Ready;
        assert_eq!(p.update(false, 2.0), (HoldEvent::Onset, false));
        assert_eq!(p.update(false, 2.0), (HoldEvent::Holding, false));
        assert_eq!(p.update(false, 2.0), (HoldEvent::HoldExpired, false));
        assert_eq!(p, HoldPhase::Expired);
        assert_eq!(p.update(false, 2.0), (HoldEvent::HoldExpired, true));
        assert_eq!(p.update(true, 2.0), (HoldEvent::Steady, true));
        assert_eq!(p, HoldPhase::Ready);
    }

    #[test]
    fn test_events_follow_noise_updates() {
        let strategy = StrategyConfig::default();
        let cfg = NoiseReductionConfig {
            dur_hold: 0.05,
            noise_est_decimation: 2,
            ..linear_cfg()
        };
        let n = 300;
        let mut a = Array2::from_elem((1, n), 1e-4);
        for f in 100..n {
            a[[0, f]] = 1.0;
        }
        let out = noise_reduction(&a, &strategy, &cfg, None).unwrap();
        assert_eq!(out.events.dim(), (1, n));
        for f in 0..n {
            assert_eq!(out.events[[0, f]].is_some(), f % 2 == 0, "frame {}", f);
        }
        // speech tracker falls faster than the noise floor during silence
        assert!((0..100)
            .step_by(2)
            .all(|f| out.events[[0, f]] == Some(HoldEvent::Steady)));

        let onsets: Vec<usize> = (0..n)
            .filter(|&f| out.events[[0, f]] == Some(HoldEvent::Onset))
            .collect();
        assert_eq!(onsets.len(), 1);
        let onset = onsets[0];
        assert!(onset >= 100);
        assert!(out.hold[[0, onset]]);

        let expired = (onset..n)
            .find(|&f| out.events[[0, f]] == Some(HoldEvent::HoldExpired))
            .unwrap();
        assert!(out.hold[[0, expired - 2]]);
        assert!(!out.hold[[0, expired]]);
        assert!((onset + 2..expired)
            .step_by(2)
            .all(|f| out.events[[0, f]] == Some(HoldEvent::Holding)));
    }

    #[test]
    fn test_zero_decimation_rejected() {
        let strategy = StrategyConfig::default();
        let a = Array2::from_elem((15, 4), 0.5);
        let cfg = NoiseReductionConfig {
            noise_est_decimation: 0,
            ..Default::default()
        };
        assert!(matches!(
            noise_reduction(&a, &strategy, &cfg, None),
            Err(StrategyError::Config(_))
        ));
    }

    #[test]
    fn test_idempotent_without_state() {
        let strategy = StrategyConfig::default();
        let cfg = NoiseReductionConfig::default();
        let a = Array2::from_shape_fn((3, 50), |(c, f)| 0.01 * (1 + c + f % 7) as f64);
        let first = noise_reduction(&a, &strategy, &cfg, None).unwrap();
        let second = noise_reduction(&a, &strategy, &cfg, None).unwrap();
        assert_eq!(first.gain, second.gain);
        assert_eq!(first.state, second.state);
    }

    #[test]
    fn test_carried_state_continues() {
        let strategy = StrategyConfig::default();
        let cfg = NoiseReductionConfig::default();
        let a = Array2::from_shape_fn((2, 60), |(c, f)| 0.02 * (1 + c + f % 5) as f64);
        let whole = noise_reduction(&a, &strategy, &cfg, None).unwrap();
        let head = noise_reduction(&a.slice(ndarray::s![.., ..30]).to_owned(), &strategy, &cfg, None)
            .unwrap();
        let tail = noise_reduction(
            &a.slice(ndarray::s![.., 30..]).to_owned(),
            &strategy,
            &cfg,
            Some(&head.state),
        )
        .unwrap();
        for ch in 0..2 {
            assert!((whole.gain[[ch, 59]] - tail.gain[[ch, 29]]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_log2_domain_output() {
        let strategy = StrategyConfig::default();
        let a = Array2::from_elem((1, 10), 1e-3);
        let lin = noise_reduction(&a, &strategy, &linear_cfg(), None).unwrap();
        let log = noise_reduction(&a, &strategy, &NoiseReductionConfig::default(), None).unwrap();
        for (l, g) in lin.gain.iter().zip(log.gain.iter()) {
            assert!((2.0 * l.log2() - g).abs() < 1e-12);
        }
    }

    #[test]
    fn test_state_shape_checked() {
        let strategy = StrategyConfig::default();
        let a = Array2::from_elem((3, 4), 1.0);
        let state = NoiseReductionState::new(2);
        assert!(noise_reduction(&a, &strategy, &NoiseReductionConfig::default(), Some(&state)).is_err());
    }

    #[test]
    fn test_configured_initial_levels() {
        let strategy = StrategyConfig::default();
        let a = Array2::from_elem((3, 1), 1.0);
        let cfg = NoiseReductionConfig {
            init_state: Some(cisim_spec::InitialLevels {
                speech_db: 20.0,
                noise_db: -10.0,
            }),
            ..linear_cfg()
        };
        let seeded = noise_reduction(&a, &strategy, &cfg, None).unwrap();
        let plain = noise_reduction(&a, &strategy, &linear_cfg(), None).unwrap();
        // 0 dB input pulls the speech tracker down from 20 dB
        assert!(seeded.speech[[0, 0]] > plain.speech[[0, 0]]);
        assert!(seeded.speech[[0, 0]] < 20.0);

        let explicit = NoiseReductionState::new(3);
        let overridden = noise_reduction(&a, &strategy, &cfg, Some(&explicit)).unwrap();
        assert_eq!(overridden.speech, plain.speech);
    }
}
