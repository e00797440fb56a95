//! Carrier synthesis at the forward-telemetry frame rate.
//!
//! Each stimulation cycle visits every channel once. The carrier of a channel
//! is a square wave whose phase advances by the peak frequency relative to the
//! channel rate, so that low peak frequencies produce a temporal pitch cue.
//! Modulation fades out as the peak frequency approaches the channel rate.

use cisim_spec::{CarrierConfig, StrategyConfig};
use ndarray::Array2;
use tracing::debug;

use crate::error::StrategyResult;

/// Carrier waveform and its alignment to audio frames.
#[derive(Debug, Clone, PartialEq)]
pub struct Carrier {
    /// Carrier amplitude, channels x stimulation cycles.
    pub carrier: Array2<f64>,
    /// Audio frame index of each stimulation cycle.
    pub audio_frame: Vec<usize>,
}

impl Carrier {
    /// Number of stimulation cycles.
    pub fn n_cycles(&self) -> usize {
        self.audio_frame.len()
    }
}

/// Number of stimulation cycles covering `n_frames` audio frames.
pub fn stim_cycle_count(strategy: &StrategyConfig, n_frames: usize) -> usize {
    let cycles = (strategy.frame_duration() * n_frames as f64 / strategy.stim_cycle_duration())
        .ceil() as usize;
    cycles.saturating_sub(1)
}

/// Synthesises the per-channel carrier from peak frequencies.
///
/// # Arguments
/// * `peak_freq` - channels x audio frames peak frequency (Hz)
/// * `strategy` - frame and pulse timing
/// * `cfg` - modulation depth and frequency limits
pub fn carrier_synthesis(
    peak_freq: &Array2<f64>,
    strategy: &StrategyConfig,
    cfg: &CarrierConfig,
) -> StrategyResult<Carrier> {
    strategy.validate()?;
    cfg.validate()?;
    let (n_chan, n_frames) = peak_freq.dim();
    let dur_frame = strategy.frame_duration();
    let dur_cycle = strategy.stim_cycle_duration();
    let rate = strategy.channel_stim_rate();
    let n_cycles = stim_cycle_count(strategy, n_frames);

    let audio_frame: Vec<usize> = (0..n_cycles)
        .map(|k| ((k as f64 * dur_cycle / dur_frame).floor() as usize).min(n_frames - 1))
        .collect();

    let f_on = rate * cfg.f_mod_on;
    let f_off = rate * cfg.f_mod_off;
    let mut carrier = Array2::zeros((n_chan, n_cycles));

    for ch in 0..n_chan {
        let mut phase = 0.0;
        for (k, &frame) in audio_frame.iter().enumerate() {
            let f = peak_freq[[ch, frame]];
            phase = (phase + (f / rate).min(cfg.delta_phase_max)).rem_euclid(1.0);
            let depth = cfg.max_mod_depth * (f_off - f.clamp(f_on, f_off)) / (f_off - f_on);
            carrier[[ch, k]] = if phase < 0.5 { 1.0 - depth } else { 1.0 };
        }
    }

    debug!(channels = n_chan, cycles = n_cycles, rate, "carrier synthesis");
    Ok(Carrier {
        carrier,
        audio_frame,
    })
}
