//! Common validation utilities shared by every configuration block.
//!
//! Each helper returns [`ConfigError::InvalidParameter`] with a message of the
//! form "`<name>` must be ..., got `<value>`".

use crate::error::{ConfigError, ConfigResult};

fn check_finite(name: &str, value: f64) -> ConfigResult<()> {
    if !value.is_finite() {
        return Err(ConfigError::invalid_param(
            name,
            format!("{} must be finite, got {}", name, value),
        ));
    }
    Ok(())
}

/// Validate that a value is finite.
pub fn validate_finite(name: &str, value: f64) -> ConfigResult<()> {
    check_finite(name, value)
}

/// Validate that a value is positive (> 0).
///
/// # Example
/// ```
/// use cisim_spec::validation::validate_positive;
///
/// assert!(validate_positive("fs", 17400.0).is_ok());
/// assert!(validate_positive("fs", 0.0).is_err());
/// ```
pub fn validate_positive(name: &str, value: f64) -> ConfigResult<()> {
    check_finite(name, value)?;
    if value <= 0.0 {
        return Err(ConfigError::invalid_param(
            name,
            format!("{} must be positive, got {}", name, value),
        ));
    }
    Ok(())
}

/// Validate that a value is non-negative (>= 0).
pub fn validate_non_negative(name: &str, value: f64) -> ConfigResult<()> {
    check_finite(name, value)?;
    if value < 0.0 {
        return Err(ConfigError::invalid_param(
            name,
            format!("{} must be non-negative, got {}", name, value),
        ));
    }
    Ok(())
}

/// Validate that a value is in [0, 1].
///
/// # Example
/// ```
/// use cisim_spec::validation::validate_unit_interval;
///
/// assert!(validate_unit_interval("steering_range", 0.5).is_ok());
/// assert!(validate_unit_interval("steering_range", 1.5).is_err());
/// ```
pub fn validate_unit_interval(name: &str, value: f64) -> ConfigResult<()> {
    check_finite(name, value)?;
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::invalid_param(
            name,
            format!("{} must be in [0, 1], got {}", name, value),
        ));
    }
    Ok(())
}

/// Validate that a value is within `[min, max]`.
pub fn validate_range(name: &str, value: f64, min: f64, max: f64) -> ConfigResult<()> {
    check_finite(name, value)?;
    if value < min || value > max {
        return Err(ConfigError::invalid_param(
            name,
            format!("{} must be in [{}, {}], got {}", name, min, max, value),
        ));
    }
    Ok(())
}

/// Validate that a count is at least one.
pub fn validate_nonzero(name: &str, value: usize) -> ConfigResult<()> {
    if value == 0 {
        return Err(ConfigError::invalid_param(
            name,
            format!("{} must be at least 1, got 0", name),
        ));
    }
    Ok(())
}

/// Validate that a vector has exactly `expected` entries.
pub fn validate_len<T>(name: &str, values: &[T], expected: usize) -> ConfigResult<()> {
    if values.len() != expected {
        return Err(ConfigError::length_mismatch(name, expected, values.len()));
    }
    Ok(())
}

/// Validate that every entry of a vector is finite.
pub fn validate_all_finite(name: &str, values: &[f64]) -> ConfigResult<()> {
    for (i, v) in values.iter().enumerate() {
        check_finite(&format!("{}[{}]", name, i), *v)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_positive_rejects_nan() {
        let err = validate_positive("tau", f64::NAN).unwrap_err();
        assert!(err.to_string().contains("must be finite"));
    }

    #[test]
    fn test_validate_range_bounds_inclusive() {
        assert!(validate_range("x", 0.0, 0.0, 1.0).is_ok());
        assert!(validate_range("x", 1.0, 0.0, 1.0).is_ok());
        assert!(validate_range("x", 1.01, 0.0, 1.0).is_err());
    }

    #[test]
    fn test_validate_len() {
        assert!(validate_len("m", &[1.0; 16], 16).is_ok());
        let err = validate_len("m", &[1.0; 15], 16).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::LengthMismatch {
                expected: 16,
                actual: 15,
                ..
            }
        ));
    }

    #[test]
    fn test_validate_nonzero() {
        assert!(validate_nonzero("n_hop", 20).is_ok());
        assert!(validate_nonzero("n_hop", 0).is_err());
    }

    #[test]
    fn test_validate_all_finite_names_index() {
        let err = validate_all_finite("env_coefs", &[0.0, f64::INFINITY]).unwrap_err();
        assert!(err.to_string().contains("env_coefs[1]"));
    }
}
