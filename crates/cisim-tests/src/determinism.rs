//! Determinism checks for floating-point outputs.
//!
//! Outputs are compared through their little-endian byte images, so two runs
//! only match when every sample is bit-identical.

use std::fmt;

/// Result of a determinism verification.
#[derive(Debug, Clone)]
pub struct DeterminismResult {
    /// Whether all runs produced identical output.
    pub is_deterministic: bool,
    /// Number of runs performed.
    pub runs: usize,
    /// Number of samples in the output.
    pub output_len: usize,
    /// BLAKE3 hash of the first run's output.
    pub hash: String,
    /// First differing sample, if any.
    pub diff_info: Option<DiffInfo>,
}

/// First sample difference found between runs.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffInfo {
    /// Sample index of the difference.
    pub index: usize,
    /// Value from the first run.
    pub expected: f64,
    /// Value from the differing run.
    pub actual: f64,
    /// Which run (0-indexed) produced the differing output.
    pub run_index: usize,
}

impl fmt::Display for DiffInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "difference at sample {}: expected {:e}, got {:e} (run {})",
            self.index, self.expected, self.actual, self.run_index
        )
    }
}

impl DeterminismResult {
    /// Panics with the first difference when the runs diverged.
    pub fn assert_deterministic(&self) {
        if let Some(diff) = &self.diff_info {
            panic!(
                "non-deterministic output after {} runs: {}",
                self.runs, diff
            );
        }
    }
}

/// Little-endian byte image of a sample vector.
pub fn samples_to_bytes(samples: &[f64]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// BLAKE3 hex digest of `data`.
pub fn compute_hash(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

/// Runs `generate_fn` `runs` times and compares every output to the first.
pub fn verify_determinism<F>(generate_fn: F, runs: usize) -> DeterminismResult
where
    F: Fn() -> Vec<f64>,
{
    assert!(runs >= 2, "Must run at least 2 times to verify determinism");

    let reference = generate_fn();
    let hash = compute_hash(&samples_to_bytes(&reference));

    for run_index in 1..runs {
        let output = generate_fn();
        let diff = reference
            .iter()
            .zip(&output)
            .position(|(a, b)| a.to_bits() != b.to_bits())
            .or_else(|| (output.len() != reference.len()).then(|| reference.len().min(output.len())));

        if let Some(index) = diff {
            return DeterminismResult {
                is_deterministic: false,
                runs,
                output_len: reference.len(),
                hash,
                diff_info: Some(DiffInfo {
                    index,
                    expected: reference.get(index).copied().unwrap_or(f64::NAN),
                    actual: output.get(index).copied().unwrap_or(f64::NAN),
                    run_index,
                }),
            };
        }
    }

    DeterminismResult {
        is_deterministic: true,
        runs,
        output_len: reference.len(),
        hash,
        diff_info: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_verify_determinism_identical() {
        let result = verify_determinism(|| vec![0.1, 0.2, 0.3], 4);
        assert!(result.is_deterministic);
        assert_eq!(result.runs, 4);
        assert_eq!(result.output_len, 3);
        assert_eq!(result.hash.len(), 64);
    }

    #[test]
    fn test_verify_determinism_reports_first_difference() {
        let calls = Cell::new(0);
        let result = verify_determinism(
            || {
                calls.set(calls.get() + 1);
                vec![1.0, calls.get() as f64]
            },
            3,
        );
        assert!(!result.is_deterministic);
        let diff = result.diff_info.unwrap();
        assert_eq!(diff.index, 1);
        assert_eq!(diff.run_index, 1);
    }

    #[test]
    fn test_length_mismatch_detected() {
        let calls = Cell::new(0usize);
        let result = verify_determinism(
            || {
                calls.set(calls.get() + 1);
                vec![0.0; calls.get()]
            },
            2,
        );
        assert_eq!(result.diff_info.map(|d| d.index), Some(1));
    }

    #[test]
    fn test_bytes_are_little_endian() {
        assert_eq!(samples_to_bytes(&[1.0]), 1.0f64.to_le_bytes().to_vec());
    }
}
