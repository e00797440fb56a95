//! Vocoder (electrodogram resynthesis) parameters.

use serde::{Deserialize, Serialize};

use crate::config::frontend::PreEmphasisConfig;
use crate::error::{ConfigError, ConfigResult};
use crate::signal::{ELGRAM_FS, N_ELECTRODES};
use crate::validation::{
    validate_all_finite, validate_len, validate_nonzero, validate_positive,
};

/// A level given once for all electrodes or once per electrode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ElectrodeLevels {
    /// Same value on every electrode.
    Uniform(f64),
    /// One value per electrode.
    PerElectrode(Vec<f64>),
}

impl ElectrodeLevels {
    /// Expands to one value per electrode.
    pub fn expand(&self, name: &str, n_elec: usize) -> ConfigResult<Vec<f64>> {
        let values = match self {
            ElectrodeLevels::Uniform(v) => vec![*v; n_elec],
            ElectrodeLevels::PerElectrode(vs) => {
                validate_len(name, vs, n_elec)?;
                vs.clone()
            }
        };
        validate_all_finite(name, &values)?;
        Ok(values)
    }
}

/// Electric-field spread around an electrode: voltage as a function of
/// distance in octaves from the electrode's place frequency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadProfile {
    /// Distance from the electrode in octaves, strictly increasing.
    pub f_oct: Vec<f64>,
    /// Relative voltage at each distance.
    pub voltage: Vec<f64>,
}

impl SpreadProfile {
    /// Symmetric spread decaying by `db_per_octave` on both sides of the electrode.
    ///
    /// # Arguments
    /// * `db_per_octave` - Attenuation slope
    /// * `half_width_oct` - Profile extent on each side of the electrode
    /// * `points` - Number of samples (odd values put a point on the electrode)
    pub fn exponential(db_per_octave: f64, half_width_oct: f64, points: usize) -> Self {
        let points = points.max(2);
        let step = 2.0 * half_width_oct / (points - 1) as f64;
        let f_oct: Vec<f64> = (0..points)
            .map(|i| -half_width_oct + i as f64 * step)
            .collect();
        let voltage = f_oct
            .iter()
            .map(|d| 10f64.powf(-db_per_octave * d.abs() / 20.0))
            .collect();
        Self { f_oct, voltage }
    }

    /// Checks lengths and ordering.
    pub fn validate(&self) -> ConfigResult<()> {
        validate_len("spread.voltage", &self.voltage, self.f_oct.len())?;
        if self.f_oct.len() < 2 {
            return Err(ConfigError::invalid_param(
                "spread.f_oct",
                "at least two points are required",
            ));
        }
        validate_all_finite("spread.f_oct", &self.f_oct)?;
        validate_all_finite("spread.voltage", &self.voltage)?;
        if self.f_oct.windows(2).any(|w| w[1] <= w[0]) {
            return Err(ConfigError::invalid_param(
                "spread.f_oct",
                "distances must be strictly increasing",
            ));
        }
        Ok(())
    }
}

impl Default for SpreadProfile {
    fn default() -> Self {
        Self::exponential(12.0, 8.0, 257)
    }
}

/// Output level normalisation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// Scale so the RMS sits at `target_db` dBFS.
    Rms {
        /// Target level in dBFS.
        target_db: f64,
    },
    /// Scale so the absolute peak sits at `target_db` dBFS.
    Peak {
        /// Target level in dBFS.
        target_db: f64,
    },
}

impl Default for Normalization {
    fn default() -> Self {
        Normalization::Rms { target_db: -25.0 }
    }
}

/// Vocoder parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VocoderConfig {
    /// Electrodogram sampling rate in Hz.
    pub capture_fs: f64,
    /// Requested audio output rate; adjusted so a block spans whole samples.
    pub audio_fs: f64,
    /// Number of output tones.
    pub n_carriers: usize,
    /// Number of simulated neural populations.
    pub n_neural_locs: usize,
    /// Most-comfortable current per electrode (µA).
    pub mcl_mua: ElectrodeLevels,
    /// Headroom factor applied to the M level.
    pub mcl_headroom: f64,
    /// Threshold current per electrode (µA).
    pub t_mua: ElectrodeLevels,
    /// Averaging window in seconds.
    pub t_avg: f64,
    /// Neural envelope time constant in ms.
    pub tau_env_ms: f64,
    /// Steepness of the compressive activity nonlinearity.
    pub nl: f64,
    /// Seed for the tone phases.
    pub seed: u32,
    /// Output level normalisation.
    pub normalization: Normalization,
    /// Place frequency of each electrode; `None` uses a log spacing 381.5–5046.4 Hz.
    pub elec_freqs: Option<Vec<f64>>,
    /// Electric-field spread profile.
    pub spread: SpreadProfile,
    /// Neural locations in log2 Hz; `None` uses the built-in density profile.
    pub neural_locs_oct: Option<Vec<f64>>,
    /// Lowest tone centre frequency (Hz).
    pub tone_freq_lo: f64,
    /// Highest tone centre frequency (Hz).
    pub tone_freq_hi: f64,
    /// Pre-emphasis whose response is undone in the output spectrum.
    pub emphasis: Option<PreEmphasisConfig>,
    /// Sampling rate the emphasis filter was designed for.
    pub emphasis_fs: f64,
}

impl Default for VocoderConfig {
    fn default() -> Self {
        Self {
            capture_fs: ELGRAM_FS,
            audio_fs: 48000.0,
            n_carriers: 20,
            n_neural_locs: 300,
            mcl_mua: ElectrodeLevels::Uniform(500.0),
            mcl_headroom: 1.2,
            t_mua: ElectrodeLevels::Uniform(50.0),
            t_avg: 0.005,
            tau_env_ms: 10.0,
            nl: 5.0,
            seed: 0,
            normalization: Normalization::default(),
            elec_freqs: None,
            spread: SpreadProfile::default(),
            neural_locs_oct: None,
            tone_freq_lo: 20.0,
            tone_freq_hi: 20000.0,
            emphasis: Some(PreEmphasisConfig::default()),
            emphasis_fs: 17400.0,
        }
    }
}

impl VocoderConfig {
    /// Checks parameter domains and vector lengths.
    pub fn validate(&self) -> ConfigResult<()> {
        validate_positive("capture_fs", self.capture_fs)?;
        validate_positive("audio_fs", self.audio_fs)?;
        validate_nonzero("n_carriers", self.n_carriers)?;
        if self.n_neural_locs < 2 {
            return Err(ConfigError::invalid_param(
                "n_neural_locs",
                format!("n_neural_locs must be at least 2, got {}", self.n_neural_locs),
            ));
        }
        validate_positive("mcl_headroom", self.mcl_headroom)?;
        validate_positive("t_avg", self.t_avg)?;
        validate_positive("tau_env_ms", self.tau_env_ms)?;
        validate_positive("nl", self.nl)?;
        validate_positive("tone_freq_lo", self.tone_freq_lo)?;
        if self.tone_freq_hi <= self.tone_freq_lo {
            return Err(ConfigError::invalid_param(
                "tone_freq_hi",
                format!(
                    "tone_freq_hi must exceed tone_freq_lo ({}), got {}",
                    self.tone_freq_lo, self.tone_freq_hi
                ),
            ));
        }
        let m = self.mcl_mua.expand("mcl_mua", N_ELECTRODES)?;
        let t = self.t_mua.expand("t_mua", N_ELECTRODES)?;
        for (el, (m, t)) in m.iter().zip(&t).enumerate() {
            if m * self.mcl_headroom <= *t {
                return Err(ConfigError::invalid_param(
                    "mcl_mua",
                    format!("electrode {}: M level must exceed T level ({})", el, t),
                ));
            }
        }
        if let Some(freqs) = &self.elec_freqs {
            validate_len("elec_freqs", freqs, N_ELECTRODES)?;
            for f in freqs {
                validate_positive("elec_freqs", *f)?;
            }
        }
        if let Some(locs) = &self.neural_locs_oct {
            if locs.len() < 2 {
                return Err(ConfigError::invalid_param(
                    "neural_locs_oct",
                    "at least two locations are required",
                ));
            }
            validate_all_finite("neural_locs_oct", locs)?;
        }
        self.spread.validate()?;
        if let Some(emphasis) = &self.emphasis {
            emphasis.validate()?;
            validate_positive("emphasis_fs", self.emphasis_fs)?;
        }
        match self.normalization {
            Normalization::Rms { target_db } | Normalization::Peak { target_db } => {
                crate::validation::validate_finite("normalization.target_db", target_db)
            }
        }
    }
}
