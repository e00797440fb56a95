//! Cochlear-implant simulator configuration library.
//!
//! This crate holds everything the processing crates share:
//!
//! - **Configuration**: one serde struct per stage plus [`PipelineConfig`],
//!   each with documented defaults for the 15-channel F120 strategy
//! - **Signals**: [`Waveform`] and [`Electrodogram`] containers
//! - **Validation**: parameter checks and the [`ConfigError`] type
//! - **Error reporting**: the [`BackendError`] trait implemented by every
//!   crate error type
//!
//! # Example
//!
//! ```
//! use cisim_spec::{PipelineConfig, GainDomain};
//!
//! let cfg = PipelineConfig::from_json(r#"{"energy": {"gain_domain": "log2"}}"#).unwrap();
//! assert_eq!(cfg.energy.gain_domain, GainDomain::Log2);
//! assert!(cfg.validate().is_ok());
//! ```

pub mod config;
pub mod error;
pub mod signal;
pub mod validation;

pub use config::*;
pub use error::{BackendError, ConfigError, ConfigResult};
pub use signal::{
    Electrodogram, Waveform, ELGRAM_FS, N_AMPLITUDE_WORDS, N_CHANNELS, N_ELECTRODES,
    PULSE_WIDTH_US,
};
