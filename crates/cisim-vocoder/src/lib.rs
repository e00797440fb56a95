//! Electrodogram Vocoder
//!
//! This crate turns a 16-electrode stimulation pattern back into audio, as a
//! rough impression of what a cochlear-implant listener hears.
//!
//! # Overview
//!
//! Current on each electrode spreads along a simulated place axis of neural
//! populations. The field above each population's threshold drives a
//! compressive activity function, which a fast-attack, slow-release follower
//! smooths into power. Block-averaged power is mapped to FFT bins, read off at
//! a handful of ERB-spaced tone frequencies, and used to amplitude-modulate
//! sinusoids with seeded random phases.
//!
//! # Example
//!
//! ```
//! use cisim_spec::{Electrodogram, VocoderConfig, ELGRAM_FS};
//! use cisim_vocoder::Vocoder;
//! use ndarray::Array2;
//!
//! let vocoder = Vocoder::new(VocoderConfig::default()).unwrap();
//! let elgram = Electrodogram::new(Array2::zeros((16, 2780)), ELGRAM_FS).unwrap();
//! let out = vocoder.process(&elgram, None).unwrap();
//! assert_eq!(out.audio.len(), vocoder.output_len(2780));
//! ```
//!
//! # Crate Structure
//!
//! - [`Vocoder`] - precomputed engine and block loop
//! - [`geometry`] - block timing, electrode and neural places
//! - [`neural`] - electric field, activity and power
//! - [`spectrum`] - location-to-bin mapping and tone magnitudes
//! - [`erb`] - ERB frequency scale
//! - [`rng`] - seeded tone phases

pub mod erb;
pub mod error;
pub mod geometry;
pub mod interp;
pub mod neural;
pub mod rng;
pub mod spectrum;
pub mod vocoder;

// Re-export main types at crate root
pub use error::{VocoderError, VocoderResult};
pub use vocoder::{Vocoder, VocoderOutput, VocoderState};
