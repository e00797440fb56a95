//! Cochlear-Implant Simulator End-to-End Test Infrastructure
//!
//! This crate provides integration tests that run the strategy and the
//! vocoder together:
//!
//! - **Pipeline**: waveform -> electrodogram -> audio
//! - **Determinism**: bit-identical output across runs for a fixed seed
//! - **Properties**: shape, steering and charge-balance invariants under
//!   random inputs
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p cisim-tests
//! ```

pub mod analysis;
pub mod determinism;
pub mod fixtures;

// Re-export commonly used items
pub use determinism::{compute_hash, samples_to_bytes, verify_determinism, DeterminismResult};
pub use fixtures::{speech_like, tone};
