//! Error types for the strategy pipeline.

use cisim_spec::{BackendError, ConfigError};
use thiserror::Error;

/// Result type for strategy operations.
pub type StrategyResult<T> = Result<T, StrategyError>;

/// Errors that can occur while running strategy stages.
#[derive(Debug, Error)]
pub enum StrategyError {
    /// Configuration failed validation.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Input signal is empty.
    #[error("input signal '{name}' is empty")]
    EmptyInput {
        /// Signal name.
        name: String,
    },

    /// Input sampling rate does not match the strategy rate.
    #[error("sample rate mismatch: strategy runs at {expected} Hz, input is {actual} Hz")]
    SampleRateMismatch {
        /// Strategy rate.
        expected: f64,
        /// Input rate.
        actual: f64,
    },

    /// Two signals that must line up do not.
    #[error("shape mismatch for '{name}': {message}")]
    ShapeMismatch {
        /// Signal name.
        name: String,
        /// Error message.
        message: String,
    },

    /// Invalid parameter value passed at call time.
    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter {
        /// Parameter name.
        name: String,
        /// Error message.
        message: String,
    },
}

impl StrategyError {
    /// Creates an empty input error.
    pub fn empty(name: impl Into<String>) -> Self {
        Self::EmptyInput { name: name.into() }
    }

    /// Creates a shape mismatch error.
    pub fn shape(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid parameter error.
    pub fn invalid_param(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            message: message.into(),
        }
    }
}

impl BackendError for StrategyError {
    fn code(&self) -> &'static str {
        match self {
            StrategyError::Config(_) => "STRAT_001",
            StrategyError::EmptyInput { .. } => "STRAT_002",
            StrategyError::SampleRateMismatch { .. } => "STRAT_003",
            StrategyError::ShapeMismatch { .. } => "STRAT_004",
            StrategyError::InvalidParameter { .. } => "STRAT_005",
        }
    }

    fn category(&self) -> &'static str {
        "strategy"
    }
}
