//! Equivalent-rectangular-bandwidth frequency scale.

/// Converts Hz to ERB-rate.
pub fn hz_to_erb(hz: f64) -> f64 {
    11.17 * ((hz + 312.0) / (hz + 14675.0)).ln() + 43.0
}

/// Converts ERB-rate to Hz.
pub fn erb_to_hz(erb: f64) -> f64 {
    let tmp = ((erb - 43.0) / 11.17).exp();
    (0.312 - 14.675 * tmp) / (tmp - 1.0) * 1000.0
}

/// Centre frequencies of `n_bands` bands evenly spaced on the ERB scale
/// between `lo` and `hi` Hz.
pub fn erb_spaced_centres(lo: f64, hi: f64, n_bands: usize) -> Vec<f64> {
    let erb_lo = hz_to_erb(lo);
    let density = n_bands as f64 / (hz_to_erb(hi) - erb_lo);
    (1..=n_bands)
        .map(|i| erb_to_hz(erb_lo + (i as f64 - 0.5) / density))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        for hz in [20.0, 440.0, 1000.0, 8000.0, 20000.0] {
            assert!((erb_to_hz(hz_to_erb(hz)) - hz).abs() < 1e-6 * hz);
        }
    }

    #[test]
    fn test_centres_inside_range_and_increasing() {
        let cfs = erb_spaced_centres(20.0, 20000.0, 20);
        assert_eq!(cfs.len(), 20);
        assert!(cfs[0] > 20.0 && cfs[19] < 20000.0);
        assert!(cfs.windows(2).all(|w| w[1] > w[0]));
    }
}
