//! Synthetic input signals.
//!
//! There are no recordings in the tree, so end-to-end tests use a seeded
//! speech-like signal: a harmonic source with a wandering pitch, shaped by
//! slowly moving formant resonances and a syllabic amplitude envelope.

use std::f64::consts::PI;

use cisim_spec::Waveform;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

/// Pure tone at `fs` Hz.
pub fn tone(freq: f64, amplitude: f64, seconds: f64, fs: f64) -> Waveform {
    let n = (seconds * fs).round() as usize;
    let samples = (0..n)
        .map(|i| amplitude * (2.0 * PI * freq * i as f64 / fs).sin())
        .collect();
    Waveform::new(samples, fs)
}

/// Second-order resonator used for formants.
struct Resonator {
    a1: f64,
    a2: f64,
    gain: f64,
    y1: f64,
    y2: f64,
}

impl Resonator {
    fn new(freq: f64, bandwidth: f64, fs: f64) -> Self {
        let r = (-PI * bandwidth / fs).exp();
        let theta = 2.0 * PI * freq / fs;
        Self {
            a1: 2.0 * r * theta.cos(),
            a2: -r * r,
            gain: 1.0 - r,
            y1: 0.0,
            y2: 0.0,
        }
    }

    fn retune(&mut self, freq: f64, bandwidth: f64, fs: f64) {
        let r = (-PI * bandwidth / fs).exp();
        self.a1 = 2.0 * r * (2.0 * PI * freq / fs).cos();
        self.a2 = -r * r;
        self.gain = 1.0 - r;
    }

    fn process(&mut self, x: f64) -> f64 {
        let y = self.gain * x + self.a1 * self.y1 + self.a2 * self.y2;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }
}

/// Seeded speech-like signal normalised to a peak of 0.5.
///
/// # Arguments
/// * `seconds` - Duration
/// * `fs` - Sampling rate in Hz
/// * `seed` - RNG seed; equal seeds give identical signals
pub fn speech_like(seconds: f64, fs: f64, seed: u64) -> Waveform {
    let mut rng = Pcg32::seed_from_u64(seed);
    let n = (seconds * fs).round() as usize;

    // formant targets, retargeted every syllable
    let vowels = [(730.0, 1090.0), (270.0, 2290.0), (530.0, 1840.0), (300.0, 870.0)];
    let syllable = (0.2 * fs) as usize;

    let mut f1 = Resonator::new(vowels[0].0, 90.0, fs);
    let mut f2 = Resonator::new(vowels[0].1, 110.0, fs);
    let mut phase = 0.0;
    let mut samples = Vec::with_capacity(n);

    for i in 0..n {
        if i % syllable.max(1) == 0 {
            let (formant1, formant2) = vowels[rng.gen_range(0..vowels.len())];
            f1.retune(formant1, 90.0, fs);
            f2.retune(formant2, 110.0, fs);
        }
        let t = i as f64 / fs;
        let pitch = 120.0 + 20.0 * (2.0 * PI * 3.0 * t).sin();
        phase += pitch / fs;
        let pulse = if phase >= 1.0 {
            phase -= 1.0;
            1.0
        } else {
            0.0
        };
        let breath = 0.05 * (rng.gen::<f64>() - 0.5);
        let source = pulse + breath;

        let pos = (i % syllable.max(1)) as f64 / syllable.max(1) as f64;
        let envelope = (PI * pos).sin().powi(2);
        samples.push(envelope * (f1.process(source) + 0.5 * f2.process(source)));
    }

    let peak = samples.iter().fold(0.0f64, |m, s| m.max(s.abs()));
    if peak > 0.0 {
        samples.iter_mut().for_each(|s| *s *= 0.5 / peak);
    }
    Waveform::new(samples, fs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{peak_amplitude, rms};

    #[test]
    fn test_speech_like_is_seeded() {
        let a = speech_like(0.5, 17400.0, 1);
        let b = speech_like(0.5, 17400.0, 1);
        let c = speech_like(0.5, 17400.0, 2);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 8700);
    }

    #[test]
    fn test_speech_like_level() {
        let s = speech_like(1.0, 17400.0, 3);
        assert!((peak_amplitude(&s.samples) - 0.5).abs() < 1e-12);
        assert!(rms(&s.samples) > 0.01);
    }

    #[test]
    fn test_tone_length() {
        assert_eq!(tone(1000.0, 0.1, 0.1, 17400.0).len(), 1740);
    }
}
