//! Shared strategy parameters owned once and passed to every stage.

use std::f64::consts::PI;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::signal::PULSE_WIDTH_US;
use crate::validation::{validate_all_finite, validate_len, validate_nonzero, validate_positive};

/// Default number of FFT bins per analysis channel.
pub const DEFAULT_N_BIN_LIMS: [usize; 15] = [2, 2, 1, 2, 2, 2, 3, 4, 4, 5, 6, 7, 8, 10, 56];

/// Analysis window applied to each buffered frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisWindow {
    /// Average of symmetric Blackman and Hann windows.
    #[default]
    BlackmanHann,
    /// Symmetric Hann window.
    Hann,
    /// Symmetric Blackman window.
    Blackman,
    /// All-ones window.
    Rectangular,
    /// Explicit coefficients; length must equal `n_fft`.
    Custom(Vec<f64>),
}

impl AnalysisWindow {
    /// Returns `len` window coefficients.
    ///
    /// Symmetric windows are evaluated over `len - 1` intervals so the first
    /// and last coefficients coincide. A custom window is returned as-is.
    pub fn coefficients(&self, len: usize) -> Vec<f64> {
        match self {
            AnalysisWindow::BlackmanHann => {
                let b = blackman(len);
                let h = hann(len);
                b.iter().zip(&h).map(|(b, h)| 0.5 * (b + h)).collect()
            }
            AnalysisWindow::Hann => hann(len),
            AnalysisWindow::Blackman => blackman(len),
            AnalysisWindow::Rectangular => vec![1.0; len],
            AnalysisWindow::Custom(coefs) => coefs.clone(),
        }
    }
}

fn hann(len: usize) -> Vec<f64> {
    if len == 1 {
        return vec![1.0];
    }
    let m = (len - 1) as f64;
    (0..len)
        .map(|k| 0.5 - 0.5 * (2.0 * PI * k as f64 / m).cos())
        .collect()
}

fn blackman(len: usize) -> Vec<f64> {
    if len == 1 {
        return vec![1.0];
    }
    let m = (len - 1) as f64;
    (0..len)
        .map(|k| {
            let x = 2.0 * PI * k as f64 / m;
            0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos()
        })
        .collect()
}

/// Frame buffering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BufferOption {
    /// First frame starts at sample 0; `ceil(len / hop)` frames.
    #[default]
    NoDelay,
    /// `frame_len - hop` zeros are prepended before framing.
    Delay,
}

/// Parameters shared by all processing stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Internal audio sampling rate in Hz.
    pub fs: f64,
    /// FFT length (samples per analysis frame).
    pub n_fft: usize,
    /// Hop between successive frames in samples.
    pub n_hop: usize,
    /// Number of analysis channels.
    pub n_chan: usize,
    /// Zero-based index of the lowest FFT bin of channel 0.
    pub start_bin: usize,
    /// Number of FFT bins per channel.
    pub n_bin_lims: Vec<usize>,
    /// Analysis window.
    pub window: AnalysisWindow,
    /// Phase width of a single pulse in microseconds.
    pub pulse_width_us: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            fs: 17400.0,
            n_fft: 256,
            n_hop: 20,
            n_chan: 15,
            start_bin: 5,
            n_bin_lims: DEFAULT_N_BIN_LIMS.to_vec(),
            window: AnalysisWindow::default(),
            pulse_width_us: PULSE_WIDTH_US,
        }
    }
}

impl StrategyConfig {
    /// Checks internal consistency of the shared parameters.
    pub fn validate(&self) -> ConfigResult<()> {
        validate_positive("fs", self.fs)?;
        validate_positive("pulse_width_us", self.pulse_width_us)?;
        validate_nonzero("n_chan", self.n_chan)?;
        validate_nonzero("n_hop", self.n_hop)?;
        if self.n_fft < 2 || self.n_fft % 2 != 0 {
            return Err(ConfigError::invalid_param(
                "n_fft",
                format!("n_fft must be a positive even number, got {}", self.n_fft),
            ));
        }
        if self.n_hop > self.n_fft {
            return Err(ConfigError::invalid_param(
                "n_hop",
                format!("n_hop must not exceed n_fft ({}), got {}", self.n_fft, self.n_hop),
            ));
        }
        validate_len("n_bin_lims", &self.n_bin_lims, self.n_chan)?;
        if let Some(i) = self.n_bin_lims.iter().position(|&n| n == 0) {
            return Err(ConfigError::invalid_param(
                "n_bin_lims",
                format!("channel {} has no FFT bins", i),
            ));
        }
        let last_bin = self.start_bin + self.n_bin_lims.iter().sum::<usize>();
        if last_bin > self.n_fft / 2 + 1 {
            return Err(ConfigError::invalid_param(
                "n_bin_lims",
                format!(
                    "channels span bins up to {} but only {} are available",
                    last_bin,
                    self.n_fft / 2 + 1
                ),
            ));
        }
        if let AnalysisWindow::Custom(coefs) = &self.window {
            validate_len("window", coefs, self.n_fft)?;
            validate_all_finite("window", coefs)?;
        }
        Ok(())
    }

    /// Half-open FFT bin range of every channel.
    pub fn bin_ranges(&self) -> Vec<Range<usize>> {
        let mut start = self.start_bin;
        self.n_bin_lims
            .iter()
            .map(|&n| {
                let range = start..start + n;
                start += n;
                range
            })
            .collect()
    }

    /// Index one past the highest bin used by any channel.
    pub fn end_bin(&self) -> usize {
        self.start_bin + self.n_bin_lims.iter().sum::<usize>()
    }

    /// Window coefficients of length `n_fft`.
    pub fn window_coefficients(&self) -> Vec<f64> {
        self.window.coefficients(self.n_fft)
    }

    /// Duration of one analysis hop in seconds.
    pub fn frame_duration(&self) -> f64 {
        self.n_hop as f64 / self.fs
    }

    /// Duration of one full stimulation cycle (all channels, two phases each).
    pub fn stim_cycle_duration(&self) -> f64 {
        2.0 * self.pulse_width_us * self.n_chan as f64 * 1e-6
    }

    /// Per-channel stimulation rate in pulses per second.
    pub fn channel_stim_rate(&self) -> f64 {
        (1.0 / self.stim_cycle_duration()).round()
    }

    /// Native electrodogram rate, one sample per pulse phase.
    pub fn phase_rate(&self) -> f64 {
        1.0 / (self.pulse_width_us * 1e-6)
    }

    /// FFT bin spacing in Hz.
    pub fn bin_width(&self) -> f64 {
        self.fs / self.n_fft as f64
    }
}
