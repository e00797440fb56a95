//! Electrodogram synthesis and output validation parameters.

use serde::{Deserialize, Serialize};

use crate::config::strategy::StrategyConfig;
use crate::error::{ConfigError, ConfigResult};
use crate::signal::N_CHANNELS;
use crate::validation::{validate_len, validate_non_negative, validate_positive};

/// Default pulse order: 1-based stimulation slot of each channel.
pub const DEFAULT_CHANNEL_ORDER: [usize; 15] = [1, 5, 9, 13, 2, 6, 10, 14, 3, 7, 11, 15, 4, 8, 12];

/// Electrodogram synthesis parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElectrodogramConfig {
    /// Emit the cathodic (negative) phase first.
    pub cathodic_first: bool,
    /// 1-based stimulation slot of each channel within a cycle.
    pub channel_order: Vec<usize>,
    /// Resample to this rate; `None` keeps one sample per pulse phase.
    pub output_fs: Option<f64>,
}

impl Default for ElectrodogramConfig {
    fn default() -> Self {
        Self {
            cathodic_first: true,
            channel_order: DEFAULT_CHANNEL_ORDER.to_vec(),
            output_fs: None,
        }
    }
}

impl ElectrodogramConfig {
    /// Checks the channel order is a permutation of `1..=15`.
    pub fn validate(&self, strategy: &StrategyConfig) -> ConfigResult<()> {
        if strategy.n_chan != N_CHANNELS {
            return Err(ConfigError::invalid_param(
                "n_chan",
                format!(
                    "electrodogram synthesis supports only {}-channel strategies, got {}",
                    N_CHANNELS, strategy.n_chan
                ),
            ));
        }
        validate_len("channel_order", &self.channel_order, strategy.n_chan)?;
        let mut seen = vec![false; strategy.n_chan];
        for &slot in &self.channel_order {
            if slot == 0 || slot > strategy.n_chan || seen[slot - 1] {
                return Err(ConfigError::invalid_param(
                    "channel_order",
                    format!(
                        "channel_order must be a permutation of 1..={}, found {}",
                        strategy.n_chan, slot
                    ),
                ));
            }
            seen[slot - 1] = true;
        }
        if let Some(fs) = self.output_fs {
            validate_positive("output_fs", fs)?;
        }
        Ok(())
    }
}

/// Electrodogram acceptance checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Allowed shortfall in samples relative to the expected length.
    pub length_tolerance: usize,
    /// Accept even when many channels match the reference closely.
    pub save_if_similar: bool,
    /// Channels with `sum |x - ref|` below this count as similar.
    pub difference_threshold: f64,
    /// Maximum number of similar channels tolerated when `save_if_similar` is off.
    pub max_similar_channels: usize,
    /// Rate the electrodogram was generated at; must round to 55556 when set.
    pub elgram_fs: Option<f64>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            length_tolerance: 50,
            save_if_similar: true,
            difference_threshold: 1.0,
            max_similar_channels: 8,
            elgram_fs: None,
        }
    }
}

impl ValidationConfig {
    /// Checks parameter domains.
    pub fn validate(&self) -> ConfigResult<()> {
        validate_non_negative("difference_threshold", self.difference_threshold)?;
        if let Some(fs) = self.elgram_fs {
            validate_positive("elgram_fs", fs)?;
        }
        Ok(())
    }
}
