//! FFT filterbank and per-channel envelope / energy extraction.
//!
//! - [`fft`] - short-time spectrum of windowed frames
//! - [`hilbert`] - log2 Hilbert envelope per analysis channel
//! - [`energy`] - linear channel energy with optional AGC gain compensation

pub mod energy;
pub mod fft;
pub mod hilbert;

pub use energy::channel_energy;
pub use fft::{fft_filterbank, Spectrum};
pub use hilbert::hilbert_envelope;

use cisim_spec::StrategyConfig;

use crate::error::{StrategyError, StrategyResult};

/// Checks that a spectrum has enough bins for every analysis channel.
pub(crate) fn check_bins(spectrum: &Spectrum, strategy: &StrategyConfig) -> StrategyResult<()> {
    if spectrum.nrows() < strategy.end_bin() {
        return Err(StrategyError::shape(
            "spectrum",
            format!(
                "channels need {} bins, spectrum has {}",
                strategy.end_bin(),
                spectrum.nrows()
            ),
        ));
    }
    Ok(())
}
