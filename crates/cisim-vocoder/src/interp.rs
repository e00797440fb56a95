//! Piecewise-linear interpolation helpers.
//!
//! Both functions expect `xp` strictly increasing and `xp.len() == fp.len() >= 1`.

/// Index of the segment `[xp[i], xp[i+1]]` used for `x`, clamped to the ends.
fn segment(x: f64, xp: &[f64]) -> usize {
    let i = xp.partition_point(|&v| v <= x);
    i.saturating_sub(1).min(xp.len().saturating_sub(2))
}

fn lerp(x: f64, xp: &[f64], fp: &[f64], i: usize) -> f64 {
    let (x0, x1) = (xp[i], xp[i + 1]);
    fp[i] + (x - x0) * (fp[i + 1] - fp[i]) / (x1 - x0)
}

/// Linear interpolation that holds the end values outside `xp`.
pub fn interp_clamped(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    match xp.len() {
        0 => 0.0,
        1 => fp[0],
        n => {
            if x <= xp[0] {
                fp[0]
            } else if x >= xp[n - 1] {
                fp[n - 1]
            } else {
                lerp(x, xp, fp, segment(x, xp))
            }
        }
    }
}

/// Linear interpolation that extends the first and last segments outside `xp`.
pub fn interp_extrapolate(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    match xp.len() {
        0 => 0.0,
        1 => fp[0],
        _ => lerp(x, xp, fp, segment(x, xp)),
    }
}

/// `n` evenly spaced values from `start` to `stop` inclusive.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n).map(|i| start + i as f64 * step).collect()
        }
    }
}
