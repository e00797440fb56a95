//! F120 channel-to-electrode mapping parameters.

use serde::{Deserialize, Serialize};

use crate::config::strategy::StrategyConfig;
use crate::error::{ConfigError, ConfigResult};
use crate::signal::N_ELECTRODES;
use crate::validation::{validate_all_finite, validate_len};

/// How the carrier modulates the mapped amplitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CarrierMode {
    /// Ignore the carrier: `A * env + K`.
    EnvelopeOnly,
    /// Modulate the envelope: `A * env * carrier + K`.
    #[default]
    MultiplyEnvelope,
    /// Modulate the mapped output: `(A * env + K) * carrier`.
    MultiplyOutput,
}

/// Per-electrode loudness map and channel routing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    /// Most-comfortable level per electrode (current units).
    pub map_m: Vec<f64>,
    /// Threshold level per electrode.
    pub map_t: Vec<f64>,
    /// Input dynamic range per electrode (dB).
    pub map_idr: Vec<f64>,
    /// Map gain per electrode (dB).
    pub map_gain: Vec<f64>,
    /// Output ceiling per electrode.
    pub map_clip: Vec<f64>,
    /// Lower (apical) electrode of the pair serving each channel, zero-based.
    pub chan_to_elec_pair: Vec<usize>,
    /// Carrier application mode.
    pub carrier_mode: CarrierMode,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            map_m: vec![500.0; N_ELECTRODES],
            map_t: vec![50.0; N_ELECTRODES],
            map_idr: vec![60.0; N_ELECTRODES],
            map_gain: vec![0.0; N_ELECTRODES],
            map_clip: vec![2048.0; N_ELECTRODES],
            chan_to_elec_pair: (0..N_ELECTRODES - 1).collect(),
            carrier_mode: CarrierMode::default(),
        }
    }
}

impl MappingConfig {
    /// Checks vector lengths and channel routing.
    pub fn validate(&self, strategy: &StrategyConfig) -> ConfigResult<()> {
        for (name, values) in [
            ("map_m", &self.map_m),
            ("map_t", &self.map_t),
            ("map_idr", &self.map_idr),
            ("map_gain", &self.map_gain),
            ("map_clip", &self.map_clip),
        ] {
            validate_len(name, values, N_ELECTRODES)?;
            validate_all_finite(name, values)?;
        }
        if let Some(el) = self.map_idr.iter().position(|&idr| idr <= 0.0) {
            return Err(ConfigError::invalid_param(
                "map_idr",
                format!("map_idr[{}] must be positive, got {}", el, self.map_idr[el]),
            ));
        }
        validate_len("chan_to_elec_pair", &self.chan_to_elec_pair, strategy.n_chan)?;
        if let Some(&el) = self
            .chan_to_elec_pair
            .iter()
            .find(|&&el| el + 1 >= N_ELECTRODES)
        {
            return Err(ConfigError::invalid_param(
                "chan_to_elec_pair",
                format!(
                    "electrode pair must start below {}, got {}",
                    N_ELECTRODES - 1,
                    el
                ),
            ));
        }
        Ok(())
    }
}
