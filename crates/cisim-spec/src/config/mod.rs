//! Typed configuration for every processing stage.
//!
//! All blocks derive serde with `#[serde(default)]`, so a JSON document only
//! needs to name the values it overrides. [`PipelineConfig::validate`] checks
//! every block once, before any signal is processed.

pub mod agc;
pub mod electrodogram;
pub mod filterbank;
pub mod frontend;
pub mod mapping;
pub mod noise_reduction;
pub mod post_filterbank;
pub mod strategy;
pub mod vocoder;

pub use agc::{AgcConfig, ClipMode, ControlMode};
pub use electrodogram::{ElectrodogramConfig, ValidationConfig, DEFAULT_CHANNEL_ORDER};
pub use filterbank::{ChannelEnergyConfig, FftFilterbankConfig, GainDomain, HilbertEnvelopeConfig};
pub use frontend::PreEmphasisConfig;
pub use mapping::{CarrierMode, MappingConfig};
pub use noise_reduction::{InitialLevels, NoiseReductionConfig};
pub use post_filterbank::{
    default_bin_to_loc_map, CarrierConfig, PeakLocatorConfig, SteeringConfig, SteeringRange,
};
pub use strategy::{AnalysisWindow, BufferOption, StrategyConfig, DEFAULT_N_BIN_LIMS};
pub use vocoder::{ElectrodeLevels, Normalization, SpreadProfile, VocoderConfig};

use serde::{Deserialize, Serialize};

use crate::error::ConfigResult;

/// Configuration of the full strategy pipeline, audio in to electrodogram out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PipelineConfig {
    /// Shared strategy parameters.
    pub strategy: StrategyConfig,
    /// Pre-emphasis filter.
    pub pre_emphasis: PreEmphasisConfig,
    /// Automatic gain control.
    pub agc: AgcConfig,
    /// Frame buffering mode.
    pub buffer: BufferOption,
    /// FFT filterbank options.
    pub filterbank: FftFilterbankConfig,
    /// Hilbert envelope scaling.
    pub hilbert: HilbertEnvelopeConfig,
    /// Channel energy options.
    pub energy: ChannelEnergyConfig,
    /// Noise reduction.
    pub noise_reduction: NoiseReductionConfig,
    /// Spectral peak locator.
    pub peak_locator: PeakLocatorConfig,
    /// Current steering.
    pub steering: SteeringConfig,
    /// Carrier synthesis.
    pub carrier: CarrierConfig,
    /// Channel-to-electrode mapping.
    pub mapping: MappingConfig,
    /// Electrodogram synthesis.
    pub electrodogram: ElectrodogramConfig,
}

impl PipelineConfig {
    /// Parses a configuration from JSON.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes the configuration to pretty-printed JSON.
    pub fn to_json_pretty(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validates every stage against the shared strategy parameters.
    pub fn validate(&self) -> ConfigResult<()> {
        self.strategy.validate()?;
        self.pre_emphasis.validate()?;
        self.agc.validate()?;
        self.hilbert.validate()?;
        self.noise_reduction.validate()?;
        self.peak_locator.validate(&self.strategy)?;
        self.steering.validate(&self.strategy)?;
        self.carrier.validate()?;
        self.mapping.validate(&self.strategy)?;
        self.electrodogram.validate(&self.strategy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_pipeline_validates() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_json_roundtrip_preserves_overrides() {
        let mut cfg = PipelineConfig::default();
        cfg.agc.clip_mode = ClipMode::Overflow;
        cfg.steering.n_discrete_steps = 0;
        cfg.buffer = BufferOption::Delay;
        let json = cfg.to_json_pretty().unwrap();
        let parsed = PipelineConfig::from_json(&json).unwrap();
        assert_eq!(parsed.agc.clip_mode, ClipMode::Overflow);
        assert_eq!(parsed.steering, cfg.steering);
        assert_eq!(parsed.buffer, BufferOption::Delay);
        assert_eq!(parsed.electrodogram, cfg.electrodogram);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg = PipelineConfig::from_json(
            r#"{"strategy": {"n_hop": 10}, "noise_reduction": {"gain_domain": "db"}}"#,
        )
        .unwrap();
        assert_eq!(cfg.strategy.n_hop, 10);
        assert_eq!(cfg.strategy.n_fft, 256);
        assert_eq!(cfg.noise_reduction.gain_domain, GainDomain::Db);
        assert_eq!(cfg.mapping, MappingConfig::default());
    }

    #[test]
    fn test_unknown_control_mode_is_config_error() {
        let err = PipelineConfig::from_json(r#"{"agc": {"control_mode": "feedforward"}}"#)
            .unwrap_err();
        assert!(err.to_string().contains("control mode"));
    }
}
