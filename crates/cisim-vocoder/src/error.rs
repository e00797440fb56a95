//! Error types for the vocoder.

use cisim_spec::{BackendError, ConfigError};
use cisim_strategy::StrategyError;
use thiserror::Error;

/// Result type for vocoder operations.
pub type VocoderResult<T> = Result<T, VocoderError>;

/// Errors that can occur during resynthesis.
#[derive(Debug, Error)]
pub enum VocoderError {
    /// Configuration failed validation.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The emphasis filter could not be evaluated.
    #[error("emphasis filter error: {0}")]
    Emphasis(#[from] StrategyError),

    /// Electrodogram does not have the expected layout.
    #[error("invalid electrodogram shape: {message}")]
    InvalidShape {
        /// Error message.
        message: String,
    },

    /// Electrodogram is shorter than one analysis block.
    #[error("electrodogram has {samples} samples, at least one block of {block} is required")]
    TooShort {
        /// Samples supplied.
        samples: usize,
        /// Block length.
        block: usize,
    },

    /// Invalid parameter value.
    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter {
        /// Parameter name.
        name: String,
        /// Error message.
        message: String,
    },
}

impl VocoderError {
    /// Creates an invalid parameter error.
    pub fn invalid_param(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid shape error.
    pub fn shape(message: impl Into<String>) -> Self {
        Self::InvalidShape {
            message: message.into(),
        }
    }
}

impl BackendError for VocoderError {
    fn code(&self) -> &'static str {
        match self {
            VocoderError::Config(_) => "VOC_001",
            VocoderError::Emphasis(_) => "VOC_002",
            VocoderError::InvalidShape { .. } => "VOC_003",
            VocoderError::TooShort { .. } => "VOC_004",
            VocoderError::InvalidParameter { .. } => "VOC_005",
        }
    }

    fn category(&self) -> &'static str {
        "vocoder"
    }
}
