//! Signal containers passed between the strategy and the vocoder.

use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Number of analysis channels in the F120 strategy.
pub const N_CHANNELS: usize = 15;

/// Number of physical electrodes on the array.
pub const N_ELECTRODES: usize = 16;

/// Number of amplitude words per stimulation cycle (two per channel).
pub const N_AMPLITUDE_WORDS: usize = 2 * N_CHANNELS;

/// Biphasic pulse phase width in microseconds.
pub const PULSE_WIDTH_US: f64 = 18.0;

/// Electrodogram sampling rate, rounded to an integer, required by validation.
pub const ELGRAM_FS: f64 = 55556.0;

/// A mono waveform with its sampling rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waveform {
    /// Sample values.
    pub samples: Vec<f64>,
    /// Sampling rate in Hz.
    pub sample_rate: f64,
}

impl Waveform {
    /// Creates a waveform from samples and a sampling rate.
    pub fn new(samples: Vec<f64>, sample_rate: f64) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the waveform holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate
    }

    /// Root-mean-square level. Zero for an empty waveform.
    pub fn rms(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f64 = self.samples.iter().map(|s| s * s).sum();
        (sum_sq / self.samples.len() as f64).sqrt()
    }
}

/// Per-electrode current waveforms: 16 rows, one column per phase sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Electrodogram {
    data: Array2<f64>,
    sample_rate: f64,
}

impl Electrodogram {
    /// Wraps a 16 x N current matrix.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidShape`] when the row count is not 16 and
    /// [`ConfigError::InvalidParameter`] for a non-positive sampling rate.
    pub fn new(data: Array2<f64>, sample_rate: f64) -> ConfigResult<Self> {
        if data.nrows() != N_ELECTRODES {
            return Err(ConfigError::invalid_shape(
                "electrodogram",
                format!(
                    "expected {} rows (electrodes), found {}",
                    N_ELECTRODES,
                    data.nrows()
                ),
            ));
        }
        crate::validation::validate_positive("sample_rate", sample_rate)?;
        Ok(Self { data, sample_rate })
    }

    /// Current matrix, electrodes x samples.
    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    /// Consumes the electrodogram and returns the current matrix.
    pub fn into_data(self) -> Array2<f64> {
        self.data
    }

    /// Sampling rate in Hz.
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Number of electrodes (always 16).
    pub fn n_electrodes(&self) -> usize {
        self.data.nrows()
    }

    /// Number of samples per electrode.
    pub fn n_samples(&self) -> usize {
        self.data.ncols()
    }

    /// Duration in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.n_samples() as f64 / self.sample_rate
    }

    /// Net charge per electrode (row sums).
    pub fn channel_sums(&self) -> Vec<f64> {
        self.data.sum_axis(Axis(1)).to_vec()
    }
}
