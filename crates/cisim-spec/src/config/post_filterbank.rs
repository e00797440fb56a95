//! Peak locator, current steering, and carrier synthesis parameters.

use serde::{Deserialize, Serialize};

use crate::config::strategy::StrategyConfig;
use crate::error::{ConfigError, ConfigResult};
use crate::validation::{
    validate_all_finite, validate_len, validate_non_negative, validate_nonzero, validate_positive,
    validate_unit_interval,
};

/// Nominal cochlear location (Q9) of FFT bins 6 through 74.
const BIN_LOC_Q9: [u16; 69] = [
    256, 640, 896, 1280, 1664, 1920, 2176, 2432, 2688, 2944, 3157, 3328, 3499, 3648, 3776, 3904,
    4032, 4160, 4288, 4416, 4544, 4659, 4762, 4864, 4966, 5069, 5163, 5248, 5333, 5419, 5504, 5589,
    5669, 5742, 5815, 5888, 5961, 6034, 6107, 6176, 6240, 6304, 6368, 6432, 6496, 6560, 6624, 6682,
    6733, 6784, 6835, 6886, 6938, 6989, 7040, 7091, 7142, 7189, 7232, 7275, 7317, 7360, 7403, 7445,
    7488, 7531, 7573, 7616, 7659,
];

/// Default bin-to-location map for a 256-point FFT (128 entries, channel units).
pub fn default_bin_to_loc_map() -> Vec<f64> {
    let mut map = vec![0.0; 6];
    map.extend(BIN_LOC_Q9.iter().map(|&q| q as f64 / 512.0));
    map.extend(std::iter::repeat(7679.0 / 512.0).take(53));
    map
}

/// Spectral peak locator parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeakLocatorConfig {
    /// Cochlear location of each FFT bin centre, in channel units.
    pub bin_to_loc_map: Vec<f64>,
    /// The locator runs on every `frame_decimation`-th frame.
    pub frame_decimation: usize,
}

impl Default for PeakLocatorConfig {
    fn default() -> Self {
        Self {
            bin_to_loc_map: default_bin_to_loc_map(),
            frame_decimation: 3,
        }
    }
}

impl PeakLocatorConfig {
    /// Checks the map covers every bin a channel can reach.
    pub fn validate(&self, strategy: &StrategyConfig) -> ConfigResult<()> {
        validate_nonzero("frame_decimation", self.frame_decimation)?;
        validate_all_finite("bin_to_loc_map", &self.bin_to_loc_map)?;
        // parabolic refinement reads one bin past the last channel bin
        let needed = (strategy.end_bin() + 1).min(strategy.n_fft / 2 + 1);
        if self.bin_to_loc_map.len() < needed {
            return Err(ConfigError::invalid_param(
                "bin_to_loc_map",
                format!(
                    "map must cover at least {} bins, got {}",
                    needed,
                    self.bin_to_loc_map.len()
                ),
            ));
        }
        Ok(())
    }
}

/// Steering range: the span of high-electrode weights available to each channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SteeringRange {
    /// Same symmetric range `r` for all channels: weights in `[0.5 - r/2, 0.5 + r/2]`.
    Uniform(f64),
    /// Symmetric range per channel.
    PerChannel(Vec<f64>),
    /// Explicit `[low, high]` bounds per channel.
    Bounds(Vec<[f64; 2]>),
}

impl SteeringRange {
    /// Expands into `[low, high]` bounds for `n_chan` channels.
    pub fn bounds(&self, n_chan: usize) -> ConfigResult<Vec<[f64; 2]>> {
        let bounds: Vec<[f64; 2]> = match self {
            SteeringRange::Uniform(r) => vec![[0.5 - 0.5 * r, 0.5 + 0.5 * r]; n_chan],
            SteeringRange::PerChannel(rs) => {
                validate_len("steering_range", rs, n_chan)?;
                rs.iter().map(|r| [0.5 - 0.5 * r, 0.5 + 0.5 * r]).collect()
            }
            SteeringRange::Bounds(b) => {
                validate_len("steering_range", b, n_chan)?;
                b.clone()
            }
        };
        for (ch, [lo, hi]) in bounds.iter().enumerate() {
            validate_unit_interval(&format!("steering_range[{}].low", ch), *lo)?;
            validate_unit_interval(&format!("steering_range[{}].high", ch), *hi)?;
            if hi < lo {
                return Err(ConfigError::invalid_param(
                    "steering_range",
                    format!("channel {}: high bound {} is below low bound {}", ch, hi, lo),
                ));
            }
        }
        Ok(bounds)
    }
}

/// Current steering parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SteeringConfig {
    /// Number of quantisation steps; 0 is continuous, 1 pins weights at 0.5.
    pub n_discrete_steps: usize,
    /// Range of the high-electrode weight.
    pub steering_range: SteeringRange,
}

impl Default for SteeringConfig {
    fn default() -> Self {
        Self {
            n_discrete_steps: 9,
            steering_range: SteeringRange::Uniform(1.0),
        }
    }
}

impl SteeringConfig {
    /// Checks the steering range against the channel count.
    pub fn validate(&self, strategy: &StrategyConfig) -> ConfigResult<()> {
        self.steering_range.bounds(strategy.n_chan).map(|_| ())
    }
}

/// Carrier synthesis parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarrierConfig {
    /// Peak frequency (fraction of the channel rate) where modulation starts fading.
    pub f_mod_on: f64,
    /// Peak frequency (fraction of the channel rate) where modulation is gone.
    pub f_mod_off: f64,
    /// Maximum modulation depth.
    pub max_mod_depth: f64,
    /// Cap on the per-cycle phase increment.
    pub delta_phase_max: f64,
}

impl Default for CarrierConfig {
    fn default() -> Self {
        Self {
            f_mod_on: 0.5,
            f_mod_off: 1.0,
            max_mod_depth: 1.0,
            delta_phase_max: 0.5,
        }
    }
}

impl CarrierConfig {
    /// Checks parameter domains.
    pub fn validate(&self) -> ConfigResult<()> {
        validate_non_negative("f_mod_on", self.f_mod_on)?;
        validate_positive("f_mod_off", self.f_mod_off)?;
        if self.f_mod_off <= self.f_mod_on {
            return Err(ConfigError::invalid_param(
                "f_mod_off",
                format!(
                    "f_mod_off must exceed f_mod_on ({}), got {}",
                    self.f_mod_on, self.f_mod_off
                ),
            ));
        }
        validate_unit_interval("max_mod_depth", self.max_mod_depth)?;
        validate_positive("delta_phase_max", self.delta_phase_max)
    }
}
