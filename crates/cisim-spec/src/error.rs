//! Error types for configuration and signal-contract validation.

use thiserror::Error;

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while building or validating configuration and signal types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A scalar or vector parameter is out of its valid domain.
    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter {
        /// Parameter name.
        name: String,
        /// Error message.
        message: String,
    },

    /// A string-valued option did not match any known variant.
    #[error("unknown {option} '{value}', expected one of: {expected}")]
    UnknownOption {
        /// Option kind (e.g. "gain domain").
        option: &'static str,
        /// The rejected value.
        value: String,
        /// Comma-separated list of accepted values.
        expected: &'static str,
    },

    /// Two related vectors disagree in length.
    #[error("length mismatch for '{name}': expected {expected}, got {actual}")]
    LengthMismatch {
        /// Parameter name.
        name: String,
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// A matrix or signal has the wrong shape.
    #[error("invalid shape for '{name}': {message}")]
    InvalidShape {
        /// Signal name.
        name: String,
        /// Error message.
        message: String,
    },

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConfigError {
    /// Creates an invalid parameter error.
    pub fn invalid_param(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates a length mismatch error.
    pub fn length_mismatch(name: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::LengthMismatch {
            name: name.into(),
            expected,
            actual,
        }
    }

    /// Creates an invalid shape error.
    pub fn invalid_shape(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidShape {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Common trait for errors raised by the processing crates.
///
/// Each crate's error type implements this trait so callers get a stable
/// code and category regardless of which stage failed.
///
/// # Example
///
/// ```ignore
/// use cisim_spec::error::BackendError;
///
/// fn report<E: BackendError>(err: E) {
///     eprintln!("[{}] {}", err.code(), err.message());
/// }
/// ```
pub trait BackendError: std::error::Error {
    /// Get the error code for reporting.
    ///
    /// Returns a static string like "CFG_001" or "STRAT_003". Codes are
    /// stable and can be matched programmatically.
    fn code(&self) -> &'static str;

    /// Get a human-readable message describing the error.
    fn message(&self) -> String {
        self.to_string()
    }

    /// Get the error category for grouping related errors.
    fn category(&self) -> &'static str;
}

impl BackendError for ConfigError {
    fn code(&self) -> &'static str {
        match self {
            ConfigError::InvalidParameter { .. } => "CFG_001",
            ConfigError::UnknownOption { .. } => "CFG_002",
            ConfigError::LengthMismatch { .. } => "CFG_003",
            ConfigError::InvalidShape { .. } => "CFG_004",
            ConfigError::Json(_) => "CFG_005",
        }
    }

    fn category(&self) -> &'static str {
        "config"
    }
}
