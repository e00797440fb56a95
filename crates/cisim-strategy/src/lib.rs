//! Cochlear-Implant Strategy
//!
//! This crate implements an F120-style sound-processing strategy that turns a
//! mono waveform into a 16-electrode stimulation pattern (electrodogram).
//!
//! # Overview
//!
//! The stages run in a fixed order, each a pure function of its inputs, its
//! own configuration block and the shared [`cisim_spec::StrategyConfig`]:
//!
//! - **Pre-emphasis** - second-order high-pass IIR
//! - **AGC** - dual-loop (slow/fast) compressive gain control
//! - **Frame buffer** - overlapping windowed frames
//! - **FFT filterbank** - short-time spectrum, Hilbert envelope, channel energy
//! - **Noise reduction** - SNR-driven per-channel gains
//! - **Peak locator / steering / carrier** - spectral peak to current steering
//!   weights and pulse-rate carrier
//! - **Mapping** - envelope to current amplitude words
//! - **Electrodogram** - biphasic pulse pattern on 16 electrodes
//!
//! Stateful stages (AGC, noise reduction) take an optional state argument and
//! return their final state, so audio can be processed in consecutive chunks.
//!
//! # Example
//!
//! ```
//! use cisim_spec::{PipelineConfig, Waveform};
//! use cisim_strategy::Strategy;
//!
//! let strategy = Strategy::new(PipelineConfig::default()).unwrap();
//! let input = Waveform::new(vec![0.0; 1740], 17400.0);
//! let out = strategy.process(&input, None).unwrap();
//! assert_eq!(out.electrodogram.n_electrodes(), 16);
//! ```
//!
//! # Crate Structure
//!
//! - [`Strategy`] - validated pipeline entry point
//! - [`frontend`] - pre-emphasis filter
//! - [`agc`] - dual-loop automatic gain control
//! - [`winbuf`] - frame buffering and windowing
//! - [`filterbank`] - FFT, envelope and energy
//! - [`noise_reduction`] - noise-reduction gains
//! - [`post_filterbank`] - peak locator, steering, carrier
//! - [`mapping`] - amplitude mapping
//! - [`electrodogram`] - pulse pattern synthesis
//! - [`validation`] - electrodogram acceptance checks

pub mod agc;
pub mod electrodogram;
pub mod error;
pub mod filterbank;
pub mod frontend;
pub mod mapping;
pub mod noise_reduction;
pub mod pipeline;
pub mod post_filterbank;
pub mod validation;
pub mod winbuf;

// Re-export main types at crate root
pub use agc::{dual_loop_agc, AgcOutput, AgcState};
pub use electrodogram::f120_electrodogram;
pub use error::{StrategyError, StrategyResult};
pub use noise_reduction::{
    noise_reduction, HoldEvent, HoldPhase, NoiseReductionOutput, NoiseReductionState,
};
pub use pipeline::{Strategy, StrategyOutput, StrategyState};
pub use validation::{expected_electrodogram_len, validate_electrodogram, ValidationReport};
