//! Level measurements on floating-point signals.

/// Root-mean-square level. Returns 0.0 for empty input.
///
/// # Example
///
/// ```rust
/// use cisim_tests::analysis::rms;
///
/// assert_eq!(rms(&[0.0; 10]), 0.0);
/// assert_eq!(rms(&[0.5; 10]), 0.5);
/// ```
pub fn rms(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_of_squares: f64 = samples.iter().map(|s| s * s).sum();
    (sum_of_squares / samples.len() as f64).sqrt()
}

/// RMS level in dB relative to full scale (1.0).
///
/// Returns negative infinity for silence.
pub fn rms_dbfs(samples: &[f64]) -> f64 {
    20.0 * rms(samples).log10()
}

/// Maximum absolute sample value. Returns 0.0 for empty input.
pub fn peak_amplitude(samples: &[f64]) -> f64 {
    samples.iter().fold(0.0f64, |max, s| max.max(s.abs()))
}

/// Check if every sample is within `threshold` of zero.
pub fn is_silent(samples: &[f64], threshold: f64) -> bool {
    samples.iter().all(|s| s.abs() <= threshold)
}

/// Fraction of adjacent sample pairs that change sign.
pub fn zero_crossing_rate(samples: &[f64]) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let crossings = samples
        .windows(2)
        .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
        .count();
    crossings as f64 / (samples.len() - 1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rms_dbfs_of_sine() {
        let sine: Vec<f64> = (0..4800)
            .map(|i| (2.0 * std::f64::consts::PI * i as f64 / 48.0).sin())
            .collect();
        assert!((rms_dbfs(&sine) + 3.0103).abs() < 1e-3);
    }

    #[test]
    fn test_peak_and_silence() {
        let x = [-0.8, 0.5, -0.3, 0.9];
        assert_eq!(peak_amplitude(&x), 0.9);
        assert!(!is_silent(&x, 0.5));
        assert!(is_silent(&[1e-6, -1e-6], 1e-5));
    }

    #[test]
    fn test_zero_crossings() {
        assert_eq!(zero_crossing_rate(&[1.0, -1.0, 1.0, -1.0, 1.0]), 1.0);
        assert_eq!(zero_crossing_rate(&[1.0, 2.0, 3.0]), 0.0);
    }
}
