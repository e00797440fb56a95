//! Filterbank, envelope, and channel-energy parameters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::validation::validate_finite;

/// Scale in which a gain trace is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum GainDomain {
    /// Linear amplitude factor.
    Linear,
    /// `2 * log2(g)`, i.e. log2 of power.
    Log2,
    /// `20 * log10(g)`.
    Db,
}

impl GainDomain {
    /// Converts a gain in this domain to a linear amplitude factor.
    pub fn to_linear(self, g: f64) -> f64 {
        match self {
            GainDomain::Linear => g,
            GainDomain::Log2 => 2f64.powf(g / 2.0),
            GainDomain::Db => 10f64.powf(g / 20.0),
        }
    }

    /// Converts a linear amplitude factor into this domain.
    pub fn from_linear(self, g: f64) -> f64 {
        match self {
            GainDomain::Linear => g,
            GainDomain::Log2 => 2.0 * g.log2(),
            GainDomain::Db => 20.0 * g.log10(),
        }
    }
}

impl FromStr for GainDomain {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "linear" | "lin" => Ok(GainDomain::Linear),
            "log2" | "log" => Ok(GainDomain::Log2),
            "db" => Ok(GainDomain::Db),
            _ => Err(ConfigError::UnknownOption {
                option: "gain domain",
                value: s.to_string(),
                expected: "linear, log2, db",
            }),
        }
    }
}

impl TryFrom<String> for GainDomain {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<GainDomain> for String {
    fn from(domain: GainDomain) -> Self {
        domain.to_string()
    }
}

impl fmt::Display for GainDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GainDomain::Linear => write!(f, "linear"),
            GainDomain::Log2 => write!(f, "log2"),
            GainDomain::Db => write!(f, "db"),
        }
    }
}

/// FFT filterbank output options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FftFilterbankConfig {
    /// Pack DC and Nyquist into bin 0 as `(Re DC + Re Ny) + j(Re DC - Re Ny)`.
    pub combine_dc_ny: bool,
    /// Divide the spectrum by `n_fft / 2`.
    pub compensate_fft_length: bool,
    /// Keep the Nyquist bin (`n_fft / 2 + 1` rows instead of `n_fft / 2`).
    pub include_nyquist_bin: bool,
}

/// Hilbert envelope post-scaling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HilbertEnvelopeConfig {
    /// Offset added to every channel output (log2 units).
    pub output_offset: f64,
    /// Lower clamp for the envelope.
    pub output_lower_bound: f64,
    /// Upper clamp for the envelope; `None` leaves it unbounded.
    pub output_upper_bound: Option<f64>,
}

impl Default for HilbertEnvelopeConfig {
    fn default() -> Self {
        Self {
            output_offset: 0.0,
            output_lower_bound: 0.0,
            output_upper_bound: None,
        }
    }
}

impl HilbertEnvelopeConfig {
    /// Checks the bounds are finite and ordered.
    pub fn validate(&self) -> ConfigResult<()> {
        validate_finite("output_offset", self.output_offset)?;
        validate_finite("output_lower_bound", self.output_lower_bound)?;
        if let Some(upper) = self.output_upper_bound {
            validate_finite("output_upper_bound", upper)?;
            if upper < self.output_lower_bound {
                return Err(ConfigError::invalid_param(
                    "output_upper_bound",
                    format!(
                        "output_upper_bound must be >= output_lower_bound ({}), got {}",
                        self.output_lower_bound, upper
                    ),
                ));
            }
        }
        Ok(())
    }
}

/// Channel energy options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelEnergyConfig {
    /// Domain of the optional AGC gain trace used for compensation.
    pub gain_domain: GainDomain,
}

impl Default for ChannelEnergyConfig {
    fn default() -> Self {
        Self {
            gain_domain: GainDomain::Linear,
        }
    }
}
