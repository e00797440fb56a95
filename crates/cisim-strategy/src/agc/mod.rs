//! Dual-loop time-domain automatic gain control.
//!
//! The control signal is reduced to one envelope value per decimated block by
//! a weighted sum over the most recent `env_buf_len` samples. Two trackers
//! follow that envelope: a slow loop with a hold counter and a fast loop that
//! reacts to sudden level jumps. The larger tracker sets the compressive gain,
//! which is expanded back to the sample rate, smoothed by a moving average and
//! applied to the input delayed by `env_buf_len - gain_buf_len` samples.

use cisim_spec::{AgcConfig, ClipMode, ControlMode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{StrategyError, StrategyResult};

#[cfg(test)]
mod tests;

/// Fast-loop threshold above the slow tracker (dB).
const FAST_THRESHOLD_DB: f64 = 8.0;
/// Fast-loop floor below the slow tracker (dB).
const FAST_LOW_LIMIT_DB: f64 = -10.0;
/// Floor applied before taking log2 of the tracker level.
const LOG_FLOOR: f64 = 1e-16;

/// Tracker values carried between calls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgcState {
    /// Slow tracker level.
    pub c_slow: f64,
    /// Fast tracker level.
    pub c_fast: f64,
    /// Current lower limit of the fast tracker.
    pub c_fast_low_limit: f64,
    /// Hold counter in blocks.
    pub hold: u32,
}

impl AgcState {
    /// Initial state from explicit or auto-derived levels.
    ///
    /// Unset levels are derived from the mean absolute control value times the
    /// envelope filter gain; the fast level is additionally scaled by the fast
    /// headroom. Both are capped at 1.
    pub fn initial(cfg: &AgcConfig, control: &[f64]) -> Self {
        let mean_abs = if control.is_empty() {
            0.0
        } else {
            control.iter().map(|c| c.abs()).sum::<f64>() / control.len() as f64
        };
        let coef_sum: f64 = cfg.env_coefs.iter().sum();
        let fast_hdrm = fast_headroom(cfg);
        let c_slow = cfg
            .c_slow_init
            .unwrap_or_else(|| (mean_abs * coef_sum).min(1.0));
        let c_fast = cfg
            .c_fast_init
            .unwrap_or_else(|| (mean_abs * coef_sum * fast_hdrm).min(1.0));
        Self {
            c_slow,
            c_fast,
            c_fast_low_limit: c_fast,
            hold: 0,
        }
    }
}

/// Which branch of the loop logic handled a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgcLoopState {
    /// Envelope below the slow tracker, hold expired: both loops release.
    Release,
    /// Envelope below the slow tracker, hold active: slow loop frozen.
    Hold,
    /// Envelope above the slow tracker but below the fast threshold.
    SlowAttackFastRelease,
    /// Envelope above the fast threshold: both loops attack.
    SlowAttackFastAttack,
}

impl AgcLoopState {
    /// Numeric state code 0..=3.
    pub fn code(self) -> u8 {
        match self {
            AgcLoopState::Release => 0,
            AgcLoopState::Hold => 1,
            AgcLoopState::SlowAttackFastRelease => 2,
            AgcLoopState::SlowAttackFastAttack => 3,
        }
    }
}

/// Per-block diagnostic traces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgcTrace {
    /// Envelope.
    pub env: Vec<f64>,
    /// Envelope scaled by the fast headroom.
    pub env_fast: Vec<f64>,
    /// Effective level `max(c_slow, c_fast)`.
    pub c: Vec<f64>,
    /// Slow tracker.
    pub c_slow: Vec<f64>,
    /// Fast tracker.
    pub c_fast: Vec<f64>,
    /// Block gain (linear).
    pub gain: Vec<f64>,
    /// Hold counter.
    pub hold: Vec<u32>,
    /// Loop state.
    pub state: Vec<AgcLoopState>,
}

/// AGC result.
#[derive(Debug, Clone, PartialEq)]
pub struct AgcOutput {
    /// Gain-compensated waveform, same length as the input.
    pub wav_out: Vec<f64>,
    /// Smoothed per-sample gain (linear).
    pub gain: Vec<f64>,
    /// Per-block traces.
    pub trace: AgcTrace,
    /// Final tracker state for continuous operation.
    pub state: AgcState,
}

/// One-pole smoothing weights per block.
#[derive(Debug, Clone, Copy)]
struct LoopWeights {
    att_slow: f64,
    rel_slow: f64,
    att_fast: f64,
    rel_fast: f64,
}

impl LoopWeights {
    fn new(cfg: &AgcConfig, fs: f64) -> Self {
        let w = |tau_ms: f64| (-(cfg.dec_fact as f64) / fs * 1000.0 / tau_ms).exp();
        Self {
            att_slow: w(cfg.tau_att_slow),
            rel_slow: w(cfg.tau_rel_slow),
            att_fast: w(cfg.tau_att_fast),
            rel_fast: w(cfg.tau_rel_fast),
        }
    }
}

fn fast_headroom(cfg: &AgcConfig) -> f64 {
    10f64.powf(-cfg.fast_thresh_rel / 20.0)
}

fn clip1(x: f64) -> f64 {
    x.clamp(-1.0, 1.0)
}

/// One-pole update: `input * (1 - w) + prev * w`.
fn track(prev: f64, input: f64, weight_prev: f64) -> f64 {
    input * (1.0 - weight_prev) + prev * weight_prev
}

/// The two coupled trackers and their hold logic.
#[derive(Debug, Clone)]
struct DualLoop {
    state: AgcState,
    weights: LoopWeights,
    max_hold: u32,
    c0: f64,
}

impl DualLoop {
    /// Advances the loops by one block and returns the branch taken.
    fn step(&mut self, env: f64, env_fast: f64) -> AgcLoopState {
        let s = &mut self.state;
        let w = self.weights;
        let low_limit = s.c_slow * 10f64.powf(FAST_LOW_LIMIT_DB / 20.0);

        let (loop_state, delta_hold): (AgcLoopState, i64) = if env > s.c_slow {
            let fast_thr = clip1(s.c_slow * 10f64.powf(FAST_THRESHOLD_DB / 20.0));
            let branch = if env > fast_thr {
                s.c_fast = track(s.c_fast, env_fast, w.att_fast);
                (AgcLoopState::SlowAttackFastAttack, 0)
            } else {
                s.c_fast_low_limit = low_limit;
                s.c_fast = track(s.c_fast, env_fast, w.rel_fast);
                (AgcLoopState::SlowAttackFastRelease, 2)
            };
            s.c_slow = track(s.c_slow, env.min(fast_thr), w.att_slow);
            branch
        } else if s.hold == 0 {
            s.c_fast_low_limit = low_limit;
            s.c_fast = track(s.c_fast, env_fast, w.rel_fast);
            s.c_slow = track(s.c_slow, env, w.rel_slow);
            (AgcLoopState::Release, 0)
        } else {
            s.c_fast_low_limit = low_limit;
            s.c_fast = track(s.c_fast, env_fast, w.rel_fast);
            (AgcLoopState::Hold, -1)
        };

        s.hold = (s.hold as i64 + delta_hold).clamp(0, self.max_hold as i64) as u32;
        s.c_slow = s.c_slow.max(self.c0);
        s.c_fast = s.c_fast.max(s.c_fast_low_limit);
        loop_state
    }

    fn level(&self) -> f64 {
        self.state.c_slow.max(self.state.c_fast)
    }
}

/// Derives the control signal and trims input and control to a common length.
fn control_signal<'a>(
    wav: &'a [f64],
    control: Option<&[f64]>,
    mode: ControlMode,
) -> (&'a [f64], Vec<f64>) {
    let Some(ctrl) = control else {
        return (wav, wav.to_vec());
    };
    let n = wav.len().min(ctrl.len());
    if wav.len() != ctrl.len() {
        warn!(
            input = wav.len(),
            control = ctrl.len(),
            "AGC input and control differ in length, truncating to {}",
            n
        );
    }
    let wav = &wav[..n];
    let ctrl = match mode {
        ControlMode::Naida => wav
            .iter()
            .zip(&ctrl[..n])
            .map(|(w, c)| 0.75 * w.abs().max(c.abs()))
            .collect(),
        ControlMode::Direct => ctrl[..n].to_vec(),
    };
    (wav, ctrl)
}

/// Applies the configured clipping to the AGC output in place.
pub(crate) fn apply_clip(samples: &mut [f64], mode: &ClipMode) {
    match mode {
        ClipMode::None => {}
        ClipMode::Limit => samples.iter_mut().for_each(|s| *s = clip1(*s)),
        ClipMode::Overflow => samples
            .iter_mut()
            .for_each(|s| *s = (1.0 + *s).rem_euclid(2.0) - 1.0),
        ClipMode::Unrecognized(name) => {
            warn!(clip_mode = %name, "unknown clipping mode, using 'none' instead");
        }
    }
}

/// Expands block gains to the sample rate and smooths them.
///
/// Block `k` covers samples `k*dec .. (k+1)*dec`; one extra copy of the last
/// block gain is appended before the causal `gain_buf_len` moving average.
/// Sample `i` receives the smoothed value one step ahead, saturating at the
/// last value available for the input length.
fn sample_gains(block_gains: &[f64], n_samples: usize, dec: usize, gain_buf_len: usize) -> Vec<f64> {
    let n_frame = block_gains.len();
    let n_exp = n_frame * dec + 1;
    let expanded: Vec<f64> = (0..n_exp)
        .map(|j| block_gains[(j / dec).min(n_frame - 1)])
        .collect();

    let mut smoothed = Vec::with_capacity(n_exp);
    let mut acc = 0.0;
    for j in 0..n_exp {
        acc += expanded[j];
        if j >= gain_buf_len {
            acc -= expanded[j - gain_buf_len];
        }
        smoothed.push(acc / gain_buf_len as f64);
    }

    let last = (n_samples + 1).saturating_sub(gain_buf_len).min(n_exp - 1);
    (0..n_samples)
        .map(|i| smoothed[(i + 1).min(last)])
        .collect()
}

/// Runs the dual-loop AGC.
///
/// # Arguments
/// * `wav` - Input waveform
/// * `control` - Optional side-chain; combined with `wav` per `cfg.control_mode`
/// * `cfg` - AGC parameters
/// * `fs` - Sampling rate in Hz
/// * `init` - Tracker state from a previous call, or `None` to initialise
///
/// # Errors
/// Returns [`StrategyError::EmptyInput`] when no samples remain after
/// aligning input and control.
pub fn dual_loop_agc(
    wav: &[f64],
    control: Option<&[f64]>,
    cfg: &AgcConfig,
    fs: f64,
    init: Option<&AgcState>,
) -> StrategyResult<AgcOutput> {
    cfg.validate()?;
    let (wav, ctrl) = control_signal(wav, control, cfg.control_mode);
    let n = ctrl.len();
    if n == 0 {
        return Err(StrategyError::empty("agc input"));
    }

    let dec = cfg.dec_fact;
    let eb = cfg.env_buf_len;
    let c0_log2 = cfg.knee_pt - 15.0;
    let gain_slope = 1.0 / cfg.comp_ratio - 1.0;
    let fast_hdrm = fast_headroom(cfg);
    let n_frame = n.div_ceil(dec);

    let mut loops = DualLoop {
        state: init
            .copied()
            .unwrap_or_else(|| AgcState::initial(cfg, &ctrl)),
        weights: LoopWeights::new(cfg, fs),
        max_hold: cfg.max_hold,
        c0: 2f64.powf(c0_log2),
    };

    let mut trace = AgcTrace::default();
    for frame in 0..n_frame {
        // window ends one sample before the end of this block
        let start = ((frame + 1) * dec) as isize - eb as isize - 1;
        let lo = start.max(0) as usize;
        let hi = (start + eb as isize).clamp(0, n as isize) as usize;
        let env = if hi > lo {
            let coefs = &cfg.env_coefs[eb - (hi - lo)..];
            ctrl[lo..hi]
                .iter()
                .zip(coefs)
                .map(|(c, w)| c.abs() * w)
                .sum()
        } else {
            0.0
        };
        let env_fast = clip1(env * fast_hdrm);

        let loop_state = loops.step(env, env_fast);
        let c = loops.level();
        let c_log2 = c.max(LOG_FLOOR).log2();
        let gain = 2f64.powf(cfg.g0 + gain_slope * (c_log2 - c0_log2).max(0.0));

        trace.env.push(env);
        trace.env_fast.push(env_fast);
        trace.c.push(c);
        trace.c_slow.push(loops.state.c_slow);
        trace.c_fast.push(loops.state.c_fast);
        trace.gain.push(gain);
        trace.hold.push(loops.state.hold);
        trace.state.push(loop_state);
    }

    let gain = sample_gains(&trace.gain, n, dec, cfg.gain_buf_len);
    let delay = cfg.output_delay();
    let mut wav_out: Vec<f64> = gain
        .iter()
        .enumerate()
        .map(|(i, g)| if i >= delay { g * wav[i - delay] } else { 0.0 })
        .collect();
    apply_clip(&mut wav_out, &cfg.clip_mode);

    debug!(
        samples = n,
        blocks = n_frame,
        c_slow = loops.state.c_slow,
        c_fast = loops.state.c_fast,
        "AGC processed"
    );

    Ok(AgcOutput {
        wav_out,
        gain,
        trace,
        state: loops.state,
    })
}
