//! Pre-emphasis filter coefficients.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::validation::validate_all_finite;

/// Direct-form IIR pre-emphasis filter `b / a`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreEmphasisConfig {
    /// Feed-forward coefficients.
    pub coeff_num: Vec<f64>,
    /// Feedback coefficients; `coeff_denom[0]` must be non-zero.
    pub coeff_denom: Vec<f64>,
}

impl Default for PreEmphasisConfig {
    fn default() -> Self {
        Self {
            coeff_num: vec![0.7688, -1.5376, 0.7688],
            coeff_denom: vec![1.0, -1.5299, 0.5453],
        }
    }
}

impl PreEmphasisConfig {
    /// Checks that both coefficient vectors are usable.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.coeff_num.is_empty() {
            return Err(ConfigError::invalid_param(
                "coeff_num",
                "at least one coefficient is required",
            ));
        }
        if self.coeff_denom.first().map_or(true, |a0| *a0 == 0.0) {
            return Err(ConfigError::invalid_param(
                "coeff_denom",
                "leading coefficient must be non-zero",
            ));
        }
        validate_all_finite("coeff_num", &self.coeff_num)?;
        validate_all_finite("coeff_denom", &self.coeff_denom)
    }
}
