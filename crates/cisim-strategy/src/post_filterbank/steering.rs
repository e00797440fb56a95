//! Current-steering weights.

use cisim_spec::{SteeringConfig, StrategyConfig};
use ndarray::Array2;

use crate::error::{StrategyError, StrategyResult};

/// Quantises a raw high-electrode weight.
fn quantise(raw: f64, n_steps: usize) -> f64 {
    match n_steps {
        0 => raw,
        1 => 0.5,
        n => {
            let q = (n - 1) as f64;
            (raw * q + 0.5).floor() / q
        }
    }
}

/// Converts peak locations into per-electrode current weights.
///
/// Channel `ch` drives electrodes `ch` and `ch + 1`. The high-electrode
/// weight is the fractional location within the channel, quantised to
/// `n_discrete_steps` levels and mapped into the channel's steering range.
/// Row `ch` holds the low-electrode weight and row `ch + n_chan` the high one;
/// each pair sums to 1.
pub fn current_steering_weights(
    loc: &Array2<f64>,
    strategy: &StrategyConfig,
    cfg: &SteeringConfig,
) -> StrategyResult<Array2<f64>> {
    strategy.validate()?;
    cfg.validate(strategy)?;
    let n_chan = strategy.n_chan;
    if loc.nrows() != n_chan {
        return Err(StrategyError::shape(
            "loc",
            format!("expected {} rows, got {}", n_chan, loc.nrows()),
        ));
    }
    let bounds = cfg.steering_range.bounds(n_chan)?;
    let mut weights = Array2::zeros((2 * n_chan, loc.ncols()));

    for (ch, [lo, hi]) in bounds.into_iter().enumerate() {
        for (frame, &l) in loc.row(ch).iter().enumerate() {
            let raw = (l - ch as f64).clamp(0.0, 1.0);
            let w_hi = lo + quantise(raw, cfg.n_discrete_steps) * (hi - lo);
            weights[[ch, frame]] = 1.0 - w_hi;
            weights[[ch + n_chan, frame]] = w_hi;
        }
    }
    Ok(weights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cisim_spec::SteeringRange;

    fn loc_ramp(n_chan: usize) -> Array2<f64> {
        Array2::from_shape_fn((n_chan, 21), |(ch, f)| ch as f64 - 0.25 + f as f64 * 0.075)
    }

    #[test]
    fn test_pairs_sum_to_one() {
        let strategy = StrategyConfig::default();
        let w = current_steering_weights(&loc_ramp(15), &strategy, &SteeringConfig::default())
            .unwrap();
        assert_eq!(w.dim(), (30, 21));
        for ch in 0..15 {
            for f in 0..21 {
                assert!((w[[ch, f]] + w[[ch + 15, f]] - 1.0).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_single_step_is_half() {
        let strategy = StrategyConfig::default();
        let cfg = SteeringConfig {
            n_discrete_steps: 1,
            ..Default::default()
        };
        let w = current_steering_weights(&loc_ramp(15), &strategy, &cfg).unwrap();
        assert!(w.iter().all(|&v| v == 0.5));
    }

    #[test]
    fn test_quantisation_levels() {
        assert_eq!(quantise(0.0, 9), 0.0);
        assert_eq!(quantise(0.0624, 9), 0.0);
        assert_eq!(quantise(0.0625, 9), 0.125);
        assert_eq!(quantise(1.0, 9), 1.0);
        assert_eq!(quantise(0.3, 0), 0.3);
    }

    #[test]
    fn test_location_clamped_to_channel() {
        let strategy = StrategyConfig::default();
        let mut loc = Array2::zeros((15, 2));
        loc[[3, 0]] = 1.0; // below channel 3
        loc[[3, 1]] = 9.0; // above channel 3
        let w = current_steering_weights(&loc, &strategy, &SteeringConfig::default()).unwrap();
        assert_eq!(w[[18, 0]], 0.0);
        assert_eq!(w[[18, 1]], 1.0);
    }

    #[test]
    fn test_steering_range_narrows_weights() {
        let strategy = StrategyConfig::default();
        let cfg = SteeringConfig {
            n_discrete_steps: 0,
            steering_range: SteeringRange::Uniform(0.5),
        };
        let w = current_steering_weights(&loc_ramp(15), &strategy, &cfg).unwrap();
        assert!(w.iter().all(|&v| (0.25..=0.75).contains(&v)));
    }

    #[test]
    fn test_row_count_checked() {
        let strategy = StrategyConfig::default();
        assert!(current_steering_weights(
            &Array2::zeros((14, 3)),
            &strategy,
            &SteeringConfig::default()
        )
        .is_err());
    }

    #[test]
    fn test_steering_range_length_checked() {
        let strategy = StrategyConfig::default();
        let cfg = SteeringConfig {
            n_discrete_steps: 0,
            steering_range: SteeringRange::PerChannel(vec![0.5; 14]),
        };
        assert!(matches!(
            current_steering_weights(&loc_ramp(15), &strategy, &cfg),
            Err(StrategyError::Config(_))
        ));
    }
}
