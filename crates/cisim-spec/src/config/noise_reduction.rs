//! Noise-reduction parameters.

use serde::{Deserialize, Serialize};

use crate::config::filterbank::GainDomain;
use crate::error::{ConfigError, ConfigResult};
use crate::validation::{validate_finite, validate_nonzero, validate_positive};

/// Tracker levels a run starts from when no state is passed in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InitialLevels {
    /// Speech level on every channel (dB).
    pub speech_db: f64,
    /// Noise level on every channel (dB).
    pub noise_db: f64,
}

/// Per-channel SNR-driven noise reduction parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseReductionConfig {
    /// Domain of the returned gains.
    pub gain_domain: GainDomain,
    /// Speech tracker time constant (s).
    pub tau_speech: f64,
    /// Noise tracker time constant (s).
    pub tau_noise: f64,
    /// Speech-minus-noise level (dB) below which a channel counts as steady.
    pub thresh_hold: f64,
    /// Maximum hold duration (s) before the noise tracker resumes.
    pub dur_hold: f64,
    /// Maximum attenuation (dB, sign ignored).
    pub max_att: f64,
    /// SNR below which the gain saturates at the floor (dB).
    pub snr_floor: f64,
    /// SNR above which the gain saturates at unity (dB).
    pub snr_ceil: f64,
    /// SNR at the midpoint of the gain curve (dB).
    pub snr_slope: f64,
    /// Steepness of the logistic gain curve.
    pub slope_fact: f64,
    /// Noise estimate is updated every this many frames.
    pub noise_est_decimation: usize,
    /// Carry the tracker state across calls.
    pub enable_continuous: bool,
    /// Starting tracker levels; `None` starts both trackers at 0 dB.
    pub init_state: Option<InitialLevels>,
}

impl Default for NoiseReductionConfig {
    fn default() -> Self {
        Self {
            gain_domain: GainDomain::Log2,
            tau_speech: 0.0258,
            tau_noise: 0.219,
            thresh_hold: 3.0,
            dur_hold: 1.6,
            max_att: -12.0,
            snr_floor: -2.0,
            snr_ceil: 45.0,
            snr_slope: 6.5,
            slope_fact: 0.2,
            noise_est_decimation: 1,
            enable_continuous: false,
            init_state: None,
        }
    }
}

impl NoiseReductionConfig {
    /// Checks parameter domains.
    pub fn validate(&self) -> ConfigResult<()> {
        validate_positive("tau_speech", self.tau_speech)?;
        validate_positive("tau_noise", self.tau_noise)?;
        validate_finite("thresh_hold", self.thresh_hold)?;
        validate_positive("dur_hold", self.dur_hold)?;
        validate_finite("max_att", self.max_att)?;
        validate_finite("snr_floor", self.snr_floor)?;
        validate_finite("snr_ceil", self.snr_ceil)?;
        validate_finite("snr_slope", self.snr_slope)?;
        validate_positive("slope_fact", self.slope_fact)?;
        validate_nonzero("noise_est_decimation", self.noise_est_decimation)?;
        if let Some(init) = &self.init_state {
            validate_finite("init_state.speech_db", init.speech_db)?;
            validate_finite("init_state.noise_db", init.noise_db)?;
        }
        if self.snr_ceil < self.snr_floor {
            return Err(ConfigError::invalid_param(
                "snr_ceil",
                format!(
                    "snr_ceil must be >= snr_floor ({}), got {}",
                    self.snr_floor, self.snr_ceil
                ),
            ));
        }
        Ok(())
    }

    /// Linear amplitude floor of the gain curve.
    pub fn max_att_linear(&self) -> f64 {
        10f64.powf(-self.max_att.abs() / 20.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_att_sign_ignored() {
        let a = NoiseReductionConfig::default();
        let b = NoiseReductionConfig {
            max_att: 12.0,
            ..Default::default()
        };
        assert_eq!(a.max_att_linear(), b.max_att_linear());
        assert!((a.max_att_linear() - 0.2512).abs() < 1e-4);
    }

    #[test]
    fn test_unknown_gain_domain_in_json() {
        let err = serde_json::from_str::<NoiseReductionConfig>(r#"{"gain_domain": "bel"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("gain domain"));
    }

    #[test]
    fn test_init_state_json() {
        let cfg: NoiseReductionConfig = serde_json::from_str(
            r#"{"init_state": {"speech_db": -40.0, "noise_db": -60.0}}"#,
        )
        .unwrap();
        assert_eq!(
            cfg.init_state,
            Some(InitialLevels {
                speech_db: -40.0,
                noise_db: -60.0
            })
        );
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_inverted_snr_limits_rejected() {
        let cfg = NoiseReductionConfig {
            snr_floor: 10.0,
            snr_ceil: 5.0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}
