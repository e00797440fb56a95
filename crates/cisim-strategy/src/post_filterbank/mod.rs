//! Stages between the filterbank and the electrode mapping.
//!
//! - [`peak_locator`] - per-channel dominant frequency and cochlear location
//! - [`steering`] - current-steering weights for each electrode pair
//! - [`carrier`] - pulse-rate carrier following the peak frequency

pub mod carrier;
pub mod peak_locator;
pub mod steering;

pub use carrier::{carrier_synthesis, Carrier};
pub use peak_locator::{decimated_peak_locator, spectral_peak_locator, PeakLocation};
pub use steering::current_steering_weights;
