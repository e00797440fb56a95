//! Deterministic RNG using PCG32 with BLAKE3 seed derivation.
//!
//! The only randomness in the vocoder is the starting phase of each output
//! tone. It flows through this module so that a fixed seed reproduces the
//! output bit for bit.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

/// Creates a PCG32 RNG from a 32-bit seed.
///
/// The 32-bit seed is expanded to 64 bits by duplicating the value in both
/// halves.
pub fn create_rng(seed: u32) -> Pcg32 {
    let seed64 = (seed as u64) | ((seed as u64) << 32);
    Pcg32::seed_from_u64(seed64)
}

/// Derives a seed for a named component from the base seed.
///
/// # Arguments
/// * `base_seed` - The configured seed
/// * `key` - Component name, e.g. `"tone_phase"`
pub fn derive_component_seed(base_seed: u32, key: &str) -> u32 {
    let mut input = Vec::with_capacity(4 + key.len());
    input.extend_from_slice(&base_seed.to_le_bytes());
    input.extend_from_slice(key.as_bytes());

    let hash = blake3::hash(&input);
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&hash.as_bytes()[..4]);
    u32::from_le_bytes(bytes)
}

/// Uniform random phases in `[0, 2π)`, one per tone.
pub fn tone_phases(seed: u32, n: usize) -> Vec<f64> {
    let mut rng = create_rng(derive_component_seed(seed, "tone_phase"));
    (0..n)
        .map(|_| 2.0 * std::f64::consts::PI * rng.gen::<f64>())
        .collect()
}
