//! Dual-loop AGC parameters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::validation::{
    validate_all_finite, validate_finite, validate_len, validate_nonzero, validate_positive,
};

/// Envelope-detector FIR taps in Q16, symmetric, 32 entries.
const ENV_COEFS_Q16: [i32; 32] = [
    -19, 55, 153, 277, 426, 596, 784, 983, 1189, 1393, 1587, 1763, 1915, 2035, 2118, 2160, 2160,
    2118, 2035, 1915, 1763, 1587, 1393, 1189, 983, 784, 596, 426, 277, 153, 55, -19,
];

/// Converts a per-block smoothing coefficient at 17.4 kHz / 8 into a time constant in ms.
fn tau_from_coef(coef: f64) -> f64 {
    -8.0 / (17400.0 * coef.ln()) * 1000.0
}

/// How the control signal is derived from input and side-chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(try_from = "String", into = "String")]
pub enum ControlMode {
    /// `0.75 * max(|input|, |control|)`.
    #[default]
    Naida,
    /// Use the control signal as given.
    Direct,
}

impl FromStr for ControlMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "naida" => Ok(ControlMode::Naida),
            "direct" => Ok(ControlMode::Direct),
            _ => Err(ConfigError::UnknownOption {
                option: "control mode",
                value: s.to_string(),
                expected: "naida, direct",
            }),
        }
    }
}

impl TryFrom<String> for ControlMode {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ControlMode> for String {
    fn from(mode: ControlMode) -> Self {
        mode.to_string()
    }
}

impl fmt::Display for ControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlMode::Naida => write!(f, "naida"),
            ControlMode::Direct => write!(f, "direct"),
        }
    }
}

/// Output clipping behaviour.
///
/// Parsing never fails: an unknown name is kept as [`ClipMode::Unrecognized`]
/// and treated as `None` (with a warning) when the AGC runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum ClipMode {
    /// No clipping.
    None,
    /// Saturate to [-1, 1].
    #[default]
    Limit,
    /// Two's-complement style wrap-around into [-1, 1).
    Overflow,
    /// Unknown name, processed like `None`.
    Unrecognized(String),
}

impl From<&str> for ClipMode {
    fn from(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "none" => ClipMode::None,
            "limit" => ClipMode::Limit,
            "overflow" => ClipMode::Overflow,
            _ => ClipMode::Unrecognized(s.to_string()),
        }
    }
}

impl From<String> for ClipMode {
    fn from(s: String) -> Self {
        ClipMode::from(s.as_str())
    }
}

impl From<ClipMode> for String {
    fn from(mode: ClipMode) -> Self {
        mode.to_string()
    }
}

impl fmt::Display for ClipMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClipMode::None => write!(f, "none"),
            ClipMode::Limit => write!(f, "limit"),
            ClipMode::Overflow => write!(f, "overflow"),
            ClipMode::Unrecognized(name) => write!(f, "{}", name),
        }
    }
}

/// Dual-loop time-domain AGC parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgcConfig {
    /// Compression knee in log2 units.
    pub knee_pt: f64,
    /// Compression ratio above the knee.
    pub comp_ratio: f64,
    /// Fast-loop release time constant (ms).
    pub tau_rel_fast: f64,
    /// Fast-loop attack time constant (ms).
    pub tau_att_fast: f64,
    /// Slow-loop release time constant (ms).
    pub tau_rel_slow: f64,
    /// Slow-loop attack time constant (ms).
    pub tau_att_slow: f64,
    /// Maximum hold duration in decimated blocks.
    pub max_hold: u32,
    /// Gain below the knee in log2 units.
    pub g0: f64,
    /// Fast-loop threshold relative to the slow loop (dB).
    pub fast_thresh_rel: f64,
    /// Initial slow-loop level; `None` derives it from the mean control level.
    pub c_slow_init: Option<f64>,
    /// Initial fast-loop level; `None` derives it from the mean control level.
    pub c_fast_init: Option<f64>,
    /// Control-signal derivation.
    pub control_mode: ControlMode,
    /// Output clipping behaviour.
    pub clip_mode: ClipMode,
    /// Decimation factor between samples and gain blocks.
    pub dec_fact: usize,
    /// Envelope buffer length in samples.
    pub env_buf_len: usize,
    /// Gain smoothing buffer length in samples.
    pub gain_buf_len: usize,
    /// Envelope FIR taps; length must equal `env_buf_len`.
    pub env_coefs: Vec<f64>,
}

impl Default for AgcConfig {
    fn default() -> Self {
        Self {
            knee_pt: 4.476,
            comp_ratio: 12.0,
            tau_rel_fast: tau_from_coef(0.9901),
            tau_att_fast: tau_from_coef(0.25),
            tau_rel_slow: tau_from_coef(0.9988),
            tau_att_slow: tau_from_coef(0.9967),
            max_hold: 1305,
            g0: 6.908,
            fast_thresh_rel: 8.0,
            c_slow_init: Some(0.5e-3),
            c_fast_init: Some(0.5e-3),
            control_mode: ControlMode::default(),
            clip_mode: ClipMode::default(),
            dec_fact: 8,
            env_buf_len: 32,
            gain_buf_len: 16,
            env_coefs: ENV_COEFS_Q16
                .iter()
                .map(|&c| c as f64 / 65536.0)
                .collect(),
        }
    }
}

impl AgcConfig {
    /// Checks parameter domains and buffer consistency.
    pub fn validate(&self) -> ConfigResult<()> {
        validate_finite("knee_pt", self.knee_pt)?;
        validate_positive("comp_ratio", self.comp_ratio)?;
        validate_positive("tau_rel_fast", self.tau_rel_fast)?;
        validate_positive("tau_att_fast", self.tau_att_fast)?;
        validate_positive("tau_rel_slow", self.tau_rel_slow)?;
        validate_positive("tau_att_slow", self.tau_att_slow)?;
        validate_finite("g0", self.g0)?;
        validate_finite("fast_thresh_rel", self.fast_thresh_rel)?;
        if let Some(c) = self.c_slow_init {
            validate_finite("c_slow_init", c)?;
        }
        if let Some(c) = self.c_fast_init {
            validate_finite("c_fast_init", c)?;
        }
        validate_nonzero("dec_fact", self.dec_fact)?;
        validate_nonzero("env_buf_len", self.env_buf_len)?;
        validate_nonzero("gain_buf_len", self.gain_buf_len)?;
        if self.gain_buf_len > self.env_buf_len {
            return Err(ConfigError::invalid_param(
                "gain_buf_len",
                format!(
                    "gain_buf_len must not exceed env_buf_len ({}), got {}",
                    self.env_buf_len, self.gain_buf_len
                ),
            ));
        }
        validate_len("env_coefs", &self.env_coefs, self.env_buf_len)?;
        validate_all_finite("env_coefs", &self.env_coefs)
    }

    /// Output delay in samples relative to the input.
    pub fn output_delay(&self) -> usize {
        self.env_buf_len - self.gain_buf_len
    }
}
